//! Managed Values
//!
//! The result of lowering one expression. A managed value either owns nothing
//! (addresses, trivial values, references to globals) or owns exactly one
//! pending release on the cleanup stack.
//!
//! Ownership leaves a managed value in one of two ways:
//! - `forward` hands the value to an instruction that consumes it and kills the cleanup
//! - dropping the managed value leaves the cleanup to run at scope exit
//!
//! Reading through `value` never changes who owns the value.

use crate::backends::ir::ir_nodes::IrValue;
use crate::compiler_frontend::ast::ast_nodes::TextLocation;
use crate::compiler_frontend::compiler_errors::CompilerError;
use crate::compiler_frontend::ir_lowering::cleanups::{CleanupHandle, CleanupStack};
use crate::return_invariant_error;

#[must_use]
#[derive(Debug)]
pub struct ManagedValue {
    value: IrValue,
    cleanup: Option<CleanupHandle>,
}

impl ManagedValue {
    /// A value nobody has to release.
    pub fn unmanaged(value: IrValue) -> Self {
        ManagedValue {
            value,
            cleanup: None,
        }
    }

    pub(crate) fn with_cleanup(value: IrValue, cleanup: CleanupHandle) -> Self {
        ManagedValue {
            value,
            cleanup: Some(cleanup),
        }
    }

    /// Borrows the underlying value. The pending release (if any) stays active.
    pub fn value(&self) -> &IrValue {
        &self.value
    }

    pub fn has_cleanup(&self) -> bool {
        self.cleanup.is_some()
    }

    pub fn cleanup(&self) -> Option<CleanupHandle> {
        self.cleanup
    }

    /// The underlying value of a managed value that must not own anything.
    pub fn unmanaged_value(&self, location: TextLocation) -> Result<&IrValue, CompilerError> {
        if self.cleanup.is_some() {
            return_invariant_error!(
                format!(
                    "Expected an unmanaged value but {} has a pending release",
                    self.value.id
                ),
                location
            );
        }

        Ok(&self.value)
    }

    /// Transfers ownership of the value to the caller and kills its cleanup.
    ///
    /// Consumes `self`, so a managed value can only ever be forwarded once.
    pub fn forward(
        self,
        cleanups: &mut CleanupStack,
        location: TextLocation,
    ) -> Result<IrValue, CompilerError> {
        if let Some(handle) = self.cleanup {
            cleanups.forward(handle, location)?;
        }

        Ok(self.value)
    }
}
