//! Nested function values.
//!
//! A `func` or closure expression is lowered twice: its body becomes a separate
//! IR function, and the expression itself becomes a reference to that function
//! bundled with whatever it captures from the enclosing scope.

use crate::backends::ir::ir_nodes::IrValue;
use crate::compiler_frontend::ast::ast_nodes::{FunctionBody, TextLocation};
use crate::compiler_frontend::ast::expression::Expression;
use crate::compiler_frontend::compiler_errors::CompilerError;
use crate::compiler_frontend::datatypes::DataType;
use crate::compiler_frontend::ir_lowering::function_lowerer::{FunctionLowerer, lower_function};
use crate::compiler_frontend::ir_lowering::managed_value::ManagedValue;
use crate::compiler_frontend::ir_lowering::var_locations::CaptureKind;
use crate::return_invariant_error;
use crate::settings::CAPTURES_CAPACITY;

impl<'a> FunctionLowerer<'a> {
    pub(crate) fn lower_capturing_function(
        &mut self,
        body: &FunctionBody,
        expr: &Expression,
    ) -> Result<ManagedValue, CompilerError> {
        // The nested body gets fresh function-local state
        let mut functions = lower_function(self.context, body)?;
        self.emitted_functions.append(&mut functions);

        let function_ref = self.builder.create_constant_ref(
            expr.location,
            body.constant,
            body.function_type.clone(),
        );

        self.emit_closure_for_capturing_expr(expr.location, body, function_ref, &expr.data_type)
    }

    /// Bundles `function_ref` with the captures of `body`.
    ///
    /// Capture arguments are laid out in capture order:
    /// - owning-box captures pass the retained box then the address
    /// - by-reference captures pass the address
    /// - constant captures pass the forwarded value
    pub(crate) fn emit_closure_for_capturing_expr(
        &mut self,
        location: TextLocation,
        body: &FunctionBody,
        function_ref: IrValue,
        closure_type: &DataType,
    ) -> Result<ManagedValue, CompilerError> {
        if body.captures.is_empty() {
            return Ok(ManagedValue::unmanaged(function_ref));
        }

        let mut capture_args = Vec::with_capacity(CAPTURES_CAPACITY);

        for &capture in &body.captures {
            let declaration = self.declaration_or_error(capture, location)?;

            match self.context.capture_classifier.capture_kind(declaration) {
                CaptureKind::LValue => {
                    let Some(var_location) = self.bindings.var_location(capture) else {
                        return_invariant_error!(
                            "No location for captured variable",
                            location,
                            { DeclarationName => self.declaration_name(declaration) }
                        );
                    };

                    let Some(owning_box) = var_location.owning_box.clone() else {
                        return_invariant_error!(
                            "Captured variable has no owning box",
                            location,
                            { DeclarationName => self.declaration_name(declaration) }
                        );
                    };
                    let address = var_location.address.clone();

                    self.builder.create_retain(location, &owning_box);
                    capture_args.push(owning_box);
                    capture_args.push(address);
                }

                CaptureKind::Byref => {
                    let Some(var_location) = self.bindings.var_location(capture) else {
                        return_invariant_error!(
                            "No location for captured variable",
                            location,
                            { DeclarationName => self.declaration_name(declaration) }
                        );
                    };

                    capture_args.push(var_location.address.clone());
                }

                CaptureKind::Constant => {
                    let value = self.emit_reference_to_decl(location, capture)?;
                    capture_args.push(self.forward(value, location)?);
                }
            }
        }

        let closure =
            self.builder
                .create_closure(location, &function_ref, &capture_args, closure_type.clone());

        Ok(self.managed_rvalue_with_cleanup(closure))
    }
}
