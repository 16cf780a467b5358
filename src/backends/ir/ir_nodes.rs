//! ============================================================
//!                         IR Nodes
//! ============================================================
//! Single-assignment instruction stream produced by expression lowering.
//!  - Every value is produced exactly once and never changes
//!  - Reference counting is explicit (retain / release)
//!  - Stack temporaries are explicitly allocated and deallocated
//!
//! Values are opaque handles. Lowering never inspects an instruction after
//! emitting it, it only threads the returned values into later instructions.

use crate::compiler_frontend::ast::ast_nodes::{Constant, TextLocation};
use crate::compiler_frontend::datatypes::DataType;
use crate::compiler_frontend::string_interning::StringId;
use serde::Serialize;

// ============================================================
// Values
// ============================================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ValueId(pub u32);

impl std::fmt::Display for ValueId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "%{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IrValue {
    pub id: ValueId,
    pub ty: DataType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AllocKind {
    Stack,
    Heap,
}

// ============================================================
// Instructions
// ============================================================
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Instruction {
    /// Values defined by this instruction. Most define one, stores define none
    /// and array allocation defines two.
    pub results: Vec<IrValue>,
    pub kind: InstructionKind,
    pub location: TextLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum InstructionKind {
    // Literals
    IntegerLiteral(i64),
    FloatLiteral(f64),
    StringLiteral(StringId),

    /// Builtin integer known at compile time, such as an element count.
    IntegerValue(u64),

    ConstantRef(Constant),
    Metatype,

    Apply {
        callee: ValueId,
        args: Vec<ValueId>,
    },

    // Memory
    Load {
        address: ValueId,
    },
    Store {
        value: ValueId,
        address: ValueId,
    },
    AllocVar {
        kind: AllocKind,
        allocated_type: DataType,
    },
    DeallocVar {
        kind: AllocKind,
        address: ValueId,
    },

    /// Defines the ownership token and the base address of the elements.
    AllocArray {
        element_type: DataType,
        count: ValueId,
    },
    IndexAddr {
        base: ValueId,
        index: u64,
    },
    ElementAddr {
        base: ValueId,
        field: usize,
    },
    ZeroInitialize {
        address: ValueId,
        count: ValueId,
    },

    // Aggregates
    Tuple {
        elements: Vec<ValueId>,
    },
    Extract {
        tuple: ValueId,
        field: usize,
    },

    // Conversions
    Convert {
        value: ValueId,
    },
    Specialize {
        value: ValueId,
    },
    Erase {
        value: ValueId,
    },

    // Reference counting
    Retain {
        value: ValueId,
    },
    Release {
        value: ValueId,
    },

    /// Builds a function value that owns its captured arguments.
    Closure {
        function: ValueId,
        captures: Vec<ValueId>,
    },

    // Terminators
    Return {
        value: ValueId,
    },
    Unreachable,
}

impl InstructionKind {
    pub fn is_terminator(&self) -> bool {
        matches!(self, InstructionKind::Return { .. } | InstructionKind::Unreachable)
    }
}

// ============================================================
// Functions and Modules
// ============================================================
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IrFunction {
    pub constant: Constant,
    pub arguments: Vec<IrValue>,
    pub instructions: Vec<Instruction>,
}

impl IrFunction {
    /// Instructions that satisfy `predicate`, in emission order.
    pub fn instructions_matching<'a>(
        &'a self,
        predicate: impl Fn(&InstructionKind) -> bool + 'a,
    ) -> impl Iterator<Item = &'a Instruction> + 'a {
        self.instructions
            .iter()
            .filter(move |instruction| predicate(&instruction.kind))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IrModule {
    pub functions: Vec<IrFunction>,
}

impl IrModule {
    pub fn function(&self, constant: Constant) -> Option<&IrFunction> {
        self.functions
            .iter()
            .find(|function| function.constant == constant)
    }

    /// Machine readable dump of the whole module.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
