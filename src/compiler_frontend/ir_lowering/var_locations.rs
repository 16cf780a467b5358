//! Per-function binding tables.
//!
//! Filled by the function prologue and by the statement lowerer, read by
//! declaration references and closure captures. One instance per function
//! being lowered, never shared between functions.

use crate::backends::ir::ir_nodes::IrValue;
use crate::compiler_frontend::ast::ast_nodes::{DeclId, DeclKind, Declaration};
use rustc_hash::FxHashMap;

/// Where a local mutable variable lives.
#[derive(Debug, Clone, PartialEq)]
pub struct VarLoc {
    pub address: IrValue,

    /// Heap box that keeps the storage alive. `None` for storage the function
    /// does not own, such as inout parameters.
    pub owning_box: Option<IrValue>,
}

impl VarLoc {
    pub fn boxed(owning_box: IrValue, address: IrValue) -> Self {
        VarLoc {
            address,
            owning_box: Some(owning_box),
        }
    }

    pub fn unboxed(address: IrValue) -> Self {
        VarLoc {
            address,
            owning_box: None,
        }
    }
}

/// How a nested function value holds on to one free variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureKind {
    /// Shares the variable's box: captures the box and the address.
    LValue,

    /// Captures only the address. The caller guarantees the storage outlives the closure.
    Byref,

    /// Captures the current value.
    Constant,
}

/// Decides the capture discipline of a declaration.
pub trait CaptureClassifier: Send + Sync {
    fn capture_kind(&self, declaration: &Declaration) -> CaptureKind;
}

/// Classifies captures from the declaration kind alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclarationCaptureRules;

impl CaptureClassifier for DeclarationCaptureRules {
    fn capture_kind(&self, declaration: &Declaration) -> CaptureKind {
        match declaration.kind {
            DeclKind::Var => CaptureKind::LValue,
            DeclKind::InOutParam => CaptureKind::Byref,
            DeclKind::Let | DeclKind::Func => CaptureKind::Constant,
        }
    }
}

#[derive(Debug, Default)]
pub struct LocalBindings {
    var_locations: FxHashMap<DeclId, VarLoc>,

    // Values bound once and referenced by retaining them, such as materialized local functions
    local_constants: FxHashMap<DeclId, IrValue>,
}

impl LocalBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind_var_location(&mut self, decl: DeclId, location: VarLoc) {
        self.var_locations.insert(decl, location);
    }

    pub fn bind_local_constant(&mut self, decl: DeclId, value: IrValue) {
        self.local_constants.insert(decl, value);
    }

    pub fn var_location(&self, decl: DeclId) -> Option<&VarLoc> {
        self.var_locations.get(&decl)
    }

    pub fn local_constant(&self, decl: DeclId) -> Option<&IrValue> {
        self.local_constants.get(&decl)
    }
}
