use crate::compiler_frontend::ast::ast_nodes::{Constant, DeclId, TextLocation};
use crate::compiler_frontend::compiler_errors::CompilerError;
use crate::compiler_frontend::datatypes::DataType;
use crate::compiler_frontend::ir_lowering::function_lowerer::FunctionLowerer;
use crate::compiler_frontend::ir_lowering::managed_value::ManagedValue;
use crate::return_invariant_error;

impl<'a> FunctionLowerer<'a> {
    /// Produces the value or storage address a declaration reference denotes.
    ///
    /// - Mutable storage yields its address, found locally or through the global's accessor
    /// - Local constants are retained and handed out with a cleanup
    /// - Anything else is a direct reference that nobody owns
    pub(crate) fn emit_reference_to_decl(
        &mut self,
        location: TextLocation,
        decl: DeclId,
    ) -> Result<ManagedValue, CompilerError> {
        let declaration = self.declaration_or_error(decl, location)?;

        if declaration.reference_type.is_address() {
            if let Some(var_location) = self.bindings.var_location(decl) {
                return Ok(ManagedValue::unmanaged(var_location.address.clone()));
            }

            if declaration.is_local() {
                return_invariant_error!(
                    "No location for local variable",
                    location,
                    { DeclarationName => self.declaration_name(declaration) }
                );
            }

            // Globals are reached through a zero-argument accessor that returns the address
            let accessor_type =
                DataType::function(DataType::unit(), declaration.reference_type.clone());
            let accessor = self.builder.create_constant_ref(
                location,
                Constant::GlobalAccessor(decl),
                accessor_type,
            );
            let address = self.builder.create_apply(
                location,
                &accessor,
                &[],
                declaration.reference_type.clone(),
            );

            return Ok(ManagedValue::unmanaged(address));
        }

        if let Some(value) = self.bindings.local_constant(decl).cloned() {
            self.emit_retain_rvalue(location, &value);
            return Ok(self.managed_rvalue_with_cleanup(value));
        }

        let reference = self.builder.create_constant_ref(
            location,
            Constant::Decl(decl),
            declaration.reference_type.clone(),
        );

        Ok(ManagedValue::unmanaged(reference))
    }
}
