//! Typed AST declarations and source locations.
//!
//! The type checker hands lowering a fully resolved module. Nothing here is
//! mutated during lowering, so the whole module can be shared across threads.

use crate::compiler_frontend::ast::expression::Expression;
use crate::compiler_frontend::datatypes::DataType;
use crate::compiler_frontend::string_interning::StringId;
use serde::Serialize;
use std::fmt::{Display, Formatter, Result as FmtResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize)]
pub struct CharPosition {
    pub line_number: i32,
    pub char_column: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize)]
pub struct TextLocation {
    pub start_pos: CharPosition,
    pub end_pos: CharPosition,
}

impl TextLocation {
    pub fn new(start: CharPosition, end: CharPosition) -> Self {
        Self {
            start_pos: start,
            end_pos: end,
        }
    }

    pub fn new_just_line(line: i32) -> Self {
        Self {
            start_pos: CharPosition {
                line_number: line,
                char_column: 0,
            },
            end_pos: CharPosition {
                line_number: line,
                char_column: 120, // Arbitrary number
            },
        }
    }
}

impl Display for TextLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "{}:{}",
            self.start_pos.line_number + 1,
            self.start_pos.char_column + 1
        )
    }
}

// ============================================================
// Declarations
// ============================================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DeclId(pub u32);

/// Identity of an anonymous function (closure or local `func` expression).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ClosureId(pub u32);

impl Display for DeclId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "decl{}", self.0)
    }
}

impl Display for ClosureId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "closure{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeclContext {
    Local,
    Global,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeclKind {
    /// Mutable variable. Local ones live in a heap box so closures can share them.
    Var,

    /// Parameter passed by reference. Has an address but no box.
    InOutParam,

    /// Immutable value binding.
    Let,

    /// Named function.
    Func,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Declaration {
    pub id: DeclId,
    pub name: StringId,

    /// Type of an expression that refers to this declaration.
    /// Mutable storage has an `LValue` reference type.
    pub reference_type: DataType,
    pub context: DeclContext,
    pub kind: DeclKind,
}

impl Declaration {
    pub fn is_local(&self) -> bool {
        self.context == DeclContext::Local
    }
}

/// Every declaration in the module, indexed by `DeclId`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeclarationTable {
    declarations: Vec<Declaration>,
}

impl DeclarationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a declaration and assigns its id.
    pub fn declare(
        &mut self,
        name: StringId,
        reference_type: DataType,
        context: DeclContext,
        kind: DeclKind,
    ) -> DeclId {
        let id = DeclId(self.declarations.len() as u32);
        self.declarations.push(Declaration {
            id,
            name,
            reference_type,
            context,
            kind,
        });
        id
    }

    pub fn get(&self, id: DeclId) -> Option<&Declaration> {
        self.declarations.get(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}

// ============================================================
// Functions
// ============================================================

/// What an IR function is emitted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Constant {
    /// A named function or global.
    Decl(DeclId),

    /// Zero-argument function returning the address of a global variable.
    GlobalAccessor(DeclId),

    /// Out-of-line body of a closure or local function expression.
    Closure(ClosureId),
}

impl Display for Constant {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Constant::Decl(decl) => write!(f, "@{decl}"),
            Constant::GlobalAccessor(decl) => write!(f, "@{decl}.accessor"),
            Constant::Closure(closure) => write!(f, "@{closure}"),
        }
    }
}

/// A function body to lower. Used for top-level functions and for nested
/// function and closure expressions alike.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionBody {
    pub constant: Constant,
    pub function_type: DataType,
    pub params: Vec<DeclId>,

    /// Free variables of the body, in capture order. Empty for top-level functions.
    pub captures: Vec<DeclId>,
    pub body: Box<Expression>,
    pub location: TextLocation,
}

/// Output of the type checker for one translation unit.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AstModule {
    pub declarations: DeclarationTable,
    pub functions: Vec<FunctionBody>,
}
