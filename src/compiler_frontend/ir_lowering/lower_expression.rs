//! Expression Lowering
//!
//! Lowers typed AST expressions into IR instructions. Every handler returns a
//! `ManagedValue` that says whether the caller now owns a pending release.
//!
//! The match over `ExpressionKind` is exhaustive. Kinds the type checker is
//! supposed to have rewritten away dump the node and fail as unimplemented.

use crate::backends::ir::ir_nodes::{AllocKind, IrValue};
use crate::compiler_frontend::ast::ast_nodes::TextLocation;
use crate::compiler_frontend::ast::expression::{Expression, ExpressionKind};
use crate::compiler_frontend::compiler_errors::CompilerError;
use crate::compiler_frontend::ir_lowering::cleanups::CleanupAction;
use crate::compiler_frontend::ir_lowering::function_lowerer::FunctionLowerer;
use crate::compiler_frontend::ir_lowering::managed_value::ManagedValue;
use crate::settings::{ARGUMENTS_CAPACITY, TUPLE_ELEMENTS_CAPACITY};
use crate::{lowering_log, return_invariant_error, return_unimplemented_error};
use saying::say;

impl<'a> FunctionLowerer<'a> {
    pub fn lower_expression(&mut self, expr: &Expression) -> Result<ManagedValue, CompilerError> {
        lowering_log!(format!(
            "[IR] Lowering {} : {} @ {}",
            expr.kind.kind_name(),
            expr.data_type,
            expr.location
        ));

        let location = expr.location;

        match &expr.kind {
            ExpressionKind::Apply { callee, arg } => self.lower_apply(expr, callee, arg),

            ExpressionKind::DeclRef(decl) => self.emit_reference_to_decl(location, *decl),

            // Literals are trivial or immortal, so none of them carries a cleanup
            ExpressionKind::IntegerLiteral(value) => Ok(ManagedValue::unmanaged(
                self.builder
                    .create_integer_literal(location, *value, expr.data_type.clone()),
            )),

            ExpressionKind::FloatLiteral(value) => Ok(ManagedValue::unmanaged(
                self.builder
                    .create_float_literal(location, *value, expr.data_type.clone()),
            )),

            ExpressionKind::CharacterLiteral(value) => Ok(ManagedValue::unmanaged(
                self.builder.create_integer_literal(
                    location,
                    i64::from(u32::from(*value)),
                    expr.data_type.clone(),
                ),
            )),

            ExpressionKind::StringLiteral(value) => Ok(ManagedValue::unmanaged(
                self.builder
                    .create_string_literal(location, *value, expr.data_type.clone()),
            )),

            ExpressionKind::Load(sub) => self.lower_load(sub, location),

            ExpressionKind::Materialize(sub) => self.lower_materialize(sub, location),

            ExpressionKind::Requalify(sub)
            | ExpressionKind::FunctionConversion(sub) => {
                let original = self.lower_expression(sub)?;
                let owned = original.has_cleanup();
                let original = self.forward(original, location)?;
                let converted =
                    self.builder
                        .create_convert(location, &original, expr.data_type.clone());
                Ok(self.rewrap_converted(converted, owned))
            }

            ExpressionKind::Erasure(sub) => {
                let concrete = self.lower_expression(sub)?;
                let owned = concrete.has_cleanup();
                let concrete = self.forward(concrete, location)?;
                let existential =
                    self.builder
                        .create_erase(location, &concrete, expr.data_type.clone());
                Ok(self.rewrap_converted(existential, owned))
            }

            // Generic references are never owned, so there is nothing to re-wrap
            ExpressionKind::Specialize(sub) => {
                let generic = self.lower_expression(sub)?;
                let generic = generic.unmanaged_value(location)?.to_owned();
                Ok(ManagedValue::unmanaged(self.builder.create_specialize(
                    location,
                    &generic,
                    expr.data_type.clone(),
                )))
            }

            ExpressionKind::Paren(sub)
            | ExpressionKind::GetMetatype(sub)
            | ExpressionKind::AddressOf(sub) => self.lower_expression(sub),

            ExpressionKind::Metatype => Ok(ManagedValue::unmanaged(
                self.builder
                    .create_metatype(location, expr.data_type.clone()),
            )),

            ExpressionKind::Tuple(elements) => {
                let mut values = Vec::with_capacity(TUPLE_ELEMENTS_CAPACITY);
                for element in elements {
                    let value = self.lower_expression(element)?;
                    values.push(self.forward(value, element.location)?);
                }

                let tuple = self
                    .builder
                    .create_tuple(location, expr.data_type.clone(), &values);
                Ok(self.managed_rvalue_with_cleanup(tuple))
            }

            ExpressionKind::TupleElement { base, field } => {
                self.lower_tuple_element(expr, base, *field)
            }

            ExpressionKind::TupleShuffle {
                sub,
                mapping,
                variadic_injection,
            } => self.lower_tuple_shuffle(expr, sub, mapping, variadic_injection.as_deref()),

            ExpressionKind::ScalarToTuple {
                sub,
                scalar_field,
                variadic_injection,
            } => self.lower_scalar_to_tuple(
                expr,
                sub,
                *scalar_field,
                variadic_injection.as_deref(),
            ),

            ExpressionKind::NewArray {
                element_type,
                bounds,
                injection,
            } => self.lower_new_array(location, element_type, bounds, injection),

            ExpressionKind::Func(body) | ExpressionKind::Closure(body) => {
                self.lower_capturing_function(body, expr)
            }

            ExpressionKind::Sequence(_)
            | ExpressionKind::UnresolvedDot { .. }
            | ExpressionKind::Assign { .. } => self.unimplemented_expression(expr),
        }
    }

    /// A conversion owns its result only if it took ownership of an owned operand.
    /// Borrowed operands stay borrowed.
    fn rewrap_converted(&mut self, converted: IrValue, owned: bool) -> ManagedValue {
        if owned {
            return self.managed_rvalue_with_cleanup(converted);
        }

        ManagedValue::unmanaged(converted)
    }

    fn unimplemented_expression(&self, expr: &Expression) -> Result<ManagedValue, CompilerError> {
        let kind_name = expr.kind.kind_name();
        say!(Red "No lowering for expression kind ", #kind_name);
        say!(Bright Black #expr);

        return_unimplemented_error!(kind_name, expr.location)
    }

    // ------------------------------------
    // Calls
    // ------------------------------------
    fn lower_apply(
        &mut self,
        expr: &Expression,
        callee: &Expression,
        arg: &Expression,
    ) -> Result<ManagedValue, CompilerError> {
        let location = expr.location;
        let function = self.lower_expression(callee)?;

        let mut args = Vec::with_capacity(ARGUMENTS_CAPACITY);
        self.lower_call_arguments(arg, &mut args)?;

        let function = self.forward(function, location)?;
        let result = self
            .builder
            .create_apply(location, &function, &args, expr.data_type.clone());

        Ok(self.managed_rvalue_with_cleanup(result))
    }

    /// Argument tuples are passed element by element instead of being built
    /// into an intermediate tuple. One level of parentheses is looked through first.
    fn lower_call_arguments(
        &mut self,
        arg: &Expression,
        args: &mut Vec<IrValue>,
    ) -> Result<(), CompilerError> {
        let arg = match &arg.kind {
            ExpressionKind::Paren(sub) => sub.as_ref(),
            _ => arg,
        };

        match &arg.kind {
            ExpressionKind::Tuple(elements) => {
                for element in elements {
                    let value = self.lower_expression(element)?;
                    args.push(self.forward(value, element.location)?);
                }
            }

            // Defaults, the scalar and the variadic array each become one argument
            ExpressionKind::ScalarToTuple {
                sub,
                scalar_field,
                variadic_injection,
            } => {
                let fields = self.lower_scalar_to_tuple_elements(
                    arg,
                    sub,
                    *scalar_field,
                    variadic_injection.as_deref(),
                )?;
                args.extend(fields);
            }

            _ => {
                let value = self.lower_expression(arg)?;
                args.push(self.forward(value, arg.location)?);
            }
        }

        Ok(())
    }

    // ------------------------------------
    // Memory
    // ------------------------------------
    fn lower_load(
        &mut self,
        sub: &Expression,
        location: TextLocation,
    ) -> Result<ManagedValue, CompilerError> {
        if !sub.data_type.is_address() {
            return_invariant_error!(
                "Load from an expression that is not an address",
                location,
                { FoundType => sub.data_type.to_string() }
            );
        }

        let address = self.lower_expression(sub)?;
        let loaded = self.builder.create_load(location, address.value());
        self.emit_retain_rvalue(location, &loaded);

        Ok(self.managed_rvalue_with_cleanup(loaded))
    }

    /// The temporary's cleanup belongs to the enclosing scope, not to the
    /// returned address. Forwarding the address never cancels the deallocation.
    fn lower_materialize(
        &mut self,
        sub: &Expression,
        location: TextLocation,
    ) -> Result<ManagedValue, CompilerError> {
        let value = self.lower_expression(sub)?;
        let value = self.forward(value, location)?;

        let temporary = self
            .builder
            .create_alloc_var(location, AllocKind::Stack, value.ty.clone());
        self.builder.create_store(location, &value, &temporary);
        self.cleanups.push(CleanupAction::DestroyTemporary {
            address: temporary.clone(),
        });

        Ok(ManagedValue::unmanaged(temporary))
    }

    // ------------------------------------
    // Tuples
    // ------------------------------------
    fn lower_tuple_element(
        &mut self,
        expr: &Expression,
        base: &Expression,
        field: usize,
    ) -> Result<ManagedValue, CompilerError> {
        let location = expr.location;
        let base_value = self.lower_expression(base)?;

        if expr.data_type.is_address() {
            let element = self.builder.create_element_addr(
                location,
                base_value.value(),
                field,
                expr.data_type.clone(),
            );
            return Ok(ManagedValue::unmanaged(element));
        }

        let element = self.builder.create_extract(
            location,
            base_value.value(),
            field,
            expr.data_type.clone(),
        );
        self.emit_retain_rvalue(location, &element);

        Ok(self.managed_rvalue_with_cleanup(element))
    }
}
