//! Cleanup Stack
//!
//! Deferred work that must happen when a lexical scope ends: releasing owned
//! values and tearing down stack temporaries. Entries run strictly in reverse
//! order of registration, and each entry runs at most once per exit path.
//!
//! Scopes are marked by a `CleanupsDepth`. Leaving a scope pops every entry
//! above its depth and emits the active ones into the current instruction stream.
//! A return emits every active entry without popping, since the enclosing scopes
//! still own them on other paths.

use crate::backends::ir::ir_builder::IrBuilder;
use crate::backends::ir::ir_nodes::{AllocKind, IrValue};
use crate::compiler_frontend::ast::ast_nodes::TextLocation;
use crate::compiler_frontend::compiler_errors::CompilerError;
use crate::{cleanup_log, return_invariant_error};

/// Identifies one pushed cleanup. The serial guards against handles that
/// outlive the scope of their entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanupHandle {
    index: usize,
    serial: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CleanupsDepth(usize);

impl CleanupsDepth {
    pub const ROOT: CleanupsDepth = CleanupsDepth(0);
}

#[derive(Debug, Clone, PartialEq)]
pub enum CleanupAction {
    /// Release one reference to a value.
    ReleaseValue(IrValue),

    /// Load the value out of a stack temporary, release it, then free the temporary.
    DestroyTemporary { address: IrValue },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CleanupState {
    Active,
    Forwarded,
}

#[derive(Debug)]
struct CleanupEntry {
    action: CleanupAction,
    state: CleanupState,
    serial: u32,

    // Set once the entry has run on at least one exit path
    emitted: bool,
}

/// Running totals used to check ownership balance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupStats {
    pub pushed: usize,
    pub forwarded: usize,

    /// Entries emitted on at least one exit path.
    pub emitted: usize,

    /// Entries popped after the instruction stream was already terminated.
    pub unreachable: usize,
}

impl CleanupStats {
    pub fn is_balanced(&self) -> bool {
        self.pushed == self.forwarded + self.emitted + self.unreachable
    }
}

#[derive(Debug, Default)]
pub struct CleanupStack {
    entries: Vec<CleanupEntry>,
    next_serial: u32,
    stats: CleanupStats,
}

impl CleanupStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> CleanupsDepth {
        CleanupsDepth(self.entries.len())
    }

    pub fn stats(&self) -> CleanupStats {
        self.stats
    }

    pub fn is_active(&self, handle: CleanupHandle) -> bool {
        self.entries
            .get(handle.index)
            .is_some_and(|entry| {
                entry.serial == handle.serial && entry.state == CleanupState::Active
            })
    }

    pub fn push(&mut self, action: CleanupAction) -> CleanupHandle {
        let handle = CleanupHandle {
            index: self.entries.len(),
            serial: self.next_serial,
        };
        self.next_serial += 1;

        cleanup_log!(format!("[Cleanups] Push {action:?}"));

        self.entries.push(CleanupEntry {
            action,
            state: CleanupState::Active,
            serial: handle.serial,
            emitted: false,
        });
        self.stats.pushed += 1;

        handle
    }

    /// Deactivates a cleanup because ownership of its value moved elsewhere.
    pub fn forward(
        &mut self,
        handle: CleanupHandle,
        location: TextLocation,
    ) -> Result<(), CompilerError> {
        let Some(entry) = self.entries.get_mut(handle.index) else {
            return_invariant_error!(
                "Forwarded a value whose cleanup scope has already ended",
                location
            );
        };

        if entry.serial != handle.serial {
            return_invariant_error!(
                "Forwarded a value whose cleanup scope has already ended",
                location
            );
        }

        if entry.state != CleanupState::Active {
            return_invariant_error!("Value was forwarded twice", location);
        }

        if entry.emitted {
            return_invariant_error!("Forwarded a value that was already released", location);
        }

        cleanup_log!(format!("[Cleanups] Forward {:?}", entry.action));

        entry.state = CleanupState::Forwarded;
        self.stats.forwarded += 1;
        Ok(())
    }

    /// Emits every active entry above `depth`, innermost first, without popping.
    pub fn emit_active_cleanups(
        &mut self,
        builder: &mut IrBuilder,
        location: TextLocation,
        depth: CleanupsDepth,
    ) {
        if !builder.has_valid_insertion_point() {
            return;
        }

        let start = depth.0.min(self.entries.len());
        for entry in self.entries[start..].iter_mut().rev() {
            if entry.state != CleanupState::Active {
                continue;
            }

            Self::emit_action(&entry.action, builder, location);
            if !entry.emitted {
                entry.emitted = true;
                self.stats.emitted += 1;
            }
        }
    }

    /// Leaves a scope: emits the active entries above `depth` and pops them.
    ///
    /// If the instruction stream is already terminated, nothing is emitted.
    pub fn pop_to_depth(
        &mut self,
        builder: &mut IrBuilder,
        location: TextLocation,
        depth: CleanupsDepth,
    ) -> Result<(), CompilerError> {
        if depth > self.depth() {
            return_invariant_error!(
                format!(
                    "Cleanup scope depth {} exceeds stack depth {}",
                    depth.0,
                    self.entries.len()
                ),
                location
            );
        }

        self.emit_active_cleanups(builder, location, depth);

        for entry in self.entries.drain(depth.0..) {
            if entry.state == CleanupState::Active && !entry.emitted {
                self.stats.unreachable += 1;
            }
        }

        Ok(())
    }

    /// Fails if an entry is still on the stack or was neither forwarded nor run.
    pub fn verify_balanced(&self, location: TextLocation) -> Result<(), CompilerError> {
        if !self.entries.is_empty() || !self.stats.is_balanced() {
            let stats = self.stats;
            return_invariant_error!(
                format!(
                    "Unbalanced cleanups: {} pushed, {} forwarded, {} emitted, \
                     {} unreachable, {} still on the stack",
                    stats.pushed,
                    stats.forwarded,
                    stats.emitted,
                    stats.unreachable,
                    self.entries.len()
                ),
                location,
                { CompilationStage => "Expression Lowering" }
            );
        }

        Ok(())
    }

    fn emit_action(action: &CleanupAction, builder: &mut IrBuilder, location: TextLocation) {
        cleanup_log!(format!("[Cleanups] Emit {action:?}"));

        match action {
            CleanupAction::ReleaseValue(value) => {
                builder.create_release(location, value);
            }
            CleanupAction::DestroyTemporary { address } => {
                let value = builder.create_load(location, address);
                if !value.ty.is_trivial() {
                    builder.create_release(location, &value);
                }
                builder.create_dealloc_var(location, AllocKind::Stack, address);
            }
        }
    }
}
