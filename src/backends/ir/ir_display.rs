//! IR Display
//!
//! Text form of lowered functions for debugging and log output.
//! One instruction per line, results on the left:
//!
//! ```text
//! @decl3(%0: Int) {
//!   %1 = integer_literal 42 : Int
//!   return %1
//! }
//! ```

use crate::backends::ir::ir_nodes::{Instruction, InstructionKind, IrFunction, IrModule, ValueId};
use std::fmt::{Display, Formatter, Result as FmtResult};

fn write_value_list(f: &mut Formatter<'_>, values: &[ValueId]) -> FmtResult {
    for (index, value) in values.iter().enumerate() {
        if index > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{value}")?;
    }
    Ok(())
}

impl Display for InstructionKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            InstructionKind::IntegerLiteral(value) => write!(f, "integer_literal {value}"),
            InstructionKind::FloatLiteral(value) => write!(f, "float_literal {value}"),
            InstructionKind::StringLiteral(id) => write!(f, "string_literal #{}", id.as_u32()),
            InstructionKind::IntegerValue(value) => write!(f, "integer_value {value}"),
            InstructionKind::ConstantRef(constant) => write!(f, "constant_ref {constant}"),
            InstructionKind::Metatype => write!(f, "metatype"),
            InstructionKind::Apply { callee, args } => {
                write!(f, "apply {callee}(")?;
                write_value_list(f, args)?;
                write!(f, ")")
            }
            InstructionKind::Load { address } => write!(f, "load {address}"),
            InstructionKind::Store { value, address } => write!(f, "store {value} to {address}"),
            InstructionKind::AllocVar {
                kind,
                allocated_type,
            } => write!(f, "alloc_var {kind:?} {allocated_type}"),
            InstructionKind::DeallocVar { kind, address } => {
                write!(f, "dealloc_var {kind:?} {address}")
            }
            InstructionKind::AllocArray {
                element_type,
                count,
            } => write!(f, "alloc_array {element_type}, {count}"),
            InstructionKind::IndexAddr { base, index } => write!(f, "index_addr {base}, {index}"),
            InstructionKind::ElementAddr { base, field } => {
                write!(f, "element_addr {base}, {field}")
            }
            InstructionKind::ZeroInitialize { address, count } => {
                write!(f, "zero_initialize {address}, {count}")
            }
            InstructionKind::Tuple { elements } => {
                write!(f, "tuple (")?;
                write_value_list(f, elements)?;
                write!(f, ")")
            }
            InstructionKind::Extract { tuple, field } => write!(f, "extract {tuple}, {field}"),
            InstructionKind::Convert { value } => write!(f, "convert {value}"),
            InstructionKind::Specialize { value } => write!(f, "specialize {value}"),
            InstructionKind::Erase { value } => write!(f, "erase {value}"),
            InstructionKind::Retain { value } => write!(f, "retain {value}"),
            InstructionKind::Release { value } => write!(f, "release {value}"),
            InstructionKind::Closure { function, captures } => {
                write!(f, "closure {function}(")?;
                write_value_list(f, captures)?;
                write!(f, ")")
            }
            InstructionKind::Return { value } => write!(f, "return {value}"),
            InstructionKind::Unreachable => write!(f, "unreachable"),
        }
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        if !self.results.is_empty() {
            for (index, result) in self.results.iter().enumerate() {
                if index > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", result.id)?;
            }
            write!(f, " = ")?;
        }

        write!(f, "{}", self.kind)?;

        if let [result] = self.results.as_slice() {
            write!(f, " : {}", result.ty)?;
        }

        Ok(())
    }
}

impl Display for IrFunction {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}(", self.constant)?;
        for (index, argument) in self.arguments.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", argument.id, argument.ty)?;
        }
        writeln!(f, ") {{")?;

        for instruction in &self.instructions {
            writeln!(f, "  {instruction}")?;
        }

        write!(f, "}}")
    }
}

impl Display for IrModule {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        for (index, function) in self.functions.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            writeln!(f, "{function}")?;
        }
        Ok(())
    }
}
