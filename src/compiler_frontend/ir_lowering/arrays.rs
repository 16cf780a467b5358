//! Array construction.
//!
//! A raw allocation becomes an array value only through the injection function
//! the type checker attached to the expression. Fixed-size array expressions
//! and variadic argument packing both go through `emit_array_injection_call`.

use crate::backends::ir::ir_nodes::IrValue;
use crate::compiler_frontend::ast::ast_nodes::TextLocation;
use crate::compiler_frontend::ast::expression::Expression;
use crate::compiler_frontend::compiler_errors::CompilerError;
use crate::compiler_frontend::datatypes::DataType;
use crate::compiler_frontend::ir_lowering::function_lowerer::FunctionLowerer;
use crate::compiler_frontend::ir_lowering::managed_value::ManagedValue;
use crate::return_invariant_error;

impl<'a> FunctionLowerer<'a> {
    /// Calls `injection(base, object, count)` and takes ownership of the array it returns.
    ///
    /// Consumes the ownership token of the allocation.
    pub(crate) fn emit_array_injection_call(
        &mut self,
        location: TextLocation,
        object: IrValue,
        base: IrValue,
        count: IrValue,
        injection: &Expression,
    ) -> Result<ManagedValue, CompilerError> {
        let Some(array_type) = injection.data_type.function_output().cloned() else {
            return_invariant_error!(
                "Array injection is not a function",
                location,
                { FoundType => injection.data_type.to_string() }
            );
        };

        let base = if base.ty == DataType::RawPointer {
            base
        } else {
            self.builder
                .create_convert(location, &base, DataType::RawPointer)
        };

        let function = self.lower_expression(injection)?;
        let function = self.forward(function, location)?;

        let array = self
            .builder
            .create_apply(location, &function, &[base, object, count], array_type);

        Ok(self.managed_rvalue_with_cleanup(array))
    }

    /// `new T[n]`. Elements are left uninitialized unless the config asks for zeroing.
    pub(crate) fn lower_new_array(
        &mut self,
        location: TextLocation,
        element_type: &DataType,
        bounds: &[Expression],
        injection: &Expression,
    ) -> Result<ManagedValue, CompilerError> {
        let Some(first_bound) = bounds.first() else {
            return_invariant_error!("Array allocation has no size", location);
        };

        let count = self.lower_expression(first_bound)?;
        let count = self.forward(count, first_bound.location)?;

        let (object, base) = self
            .builder
            .create_alloc_array(location, element_type.clone(), &count);

        if self.context.config.zero_initialize_new_arrays {
            self.builder.create_zero_initialize(location, &base, &count);
        }

        self.emit_array_injection_call(location, object, base, count, injection)
    }
}
