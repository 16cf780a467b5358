use crate::compiler_frontend::ast::ast_nodes::{DeclId, FunctionBody, TextLocation};
use crate::compiler_frontend::datatypes::DataType;
use crate::compiler_frontend::string_interning::StringId;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Expression {
    pub kind: ExpressionKind,
    pub data_type: DataType,
    pub location: TextLocation,
}

/// Where one destination tuple field gets its value from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ShuffleEntry {
    /// Element `index` of the source values.
    FromSource(usize),

    /// The destination field's default value expression.
    UseDefault,

    /// Start of the variadic arguments. Every entry after this one is a
    /// `FromSource` feeding the variadic array.
    VariadicStart,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ExpressionKind {
    /// Call of `callee` with `arg`. The argument is a tuple for multi-argument calls.
    Apply {
        callee: Box<Expression>,
        arg: Box<Expression>,
    },

    DeclRef(DeclId),

    IntegerLiteral(i64),
    FloatLiteral(f64),
    CharacterLiteral(char),
    StringLiteral(StringId),

    /// Reads the value stored at an address.
    Load(Box<Expression>),

    /// Stores a value into a fresh stack temporary and produces its address.
    Materialize(Box<Expression>),

    /// Changes qualifiers of a type without changing its representation.
    Requalify(Box<Expression>),
    FunctionConversion(Box<Expression>),

    /// Wraps a concrete value in an existential of `data_type`.
    Erasure(Box<Expression>),

    Paren(Box<Expression>),
    Tuple(Vec<Expression>),

    /// `x.dynamicType`. The metatype comes from the operand.
    GetMetatype(Box<Expression>),

    /// Literal reference to the metatype of `data_type`.
    Metatype,

    /// Generic function reference specialized to `data_type`.
    Specialize(Box<Expression>),

    /// `&x`, the operand is already an address.
    AddressOf(Box<Expression>),

    TupleElement {
        base: Box<Expression>,
        field: usize,
    },

    TupleShuffle {
        sub: Box<Expression>,
        mapping: Vec<ShuffleEntry>,
        variadic_injection: Option<Box<Expression>>,
    },

    ScalarToTuple {
        sub: Box<Expression>,
        scalar_field: usize,
        variadic_injection: Option<Box<Expression>>,
    },

    /// `new T[n]`. Only the first bound is used to size the allocation.
    NewArray {
        element_type: DataType,
        bounds: Vec<Expression>,
        injection: Box<Expression>,
    },

    /// Local `func` declaration used as a value.
    Func(Box<FunctionBody>),

    Closure(Box<FunctionBody>),

    // Frontend residue. These are rewritten by the type checker and have no lowering.
    Sequence(Vec<Expression>),
    UnresolvedDot {
        base: Box<Expression>,
        name: StringId,
    },
    Assign {
        dest: Box<Expression>,
        source: Box<Expression>,
    },
}

impl ExpressionKind {
    pub fn kind_name(&self) -> &'static str {
        match self {
            ExpressionKind::Apply { .. } => "Apply",
            ExpressionKind::DeclRef(_) => "DeclRef",
            ExpressionKind::IntegerLiteral(_) => "IntegerLiteral",
            ExpressionKind::FloatLiteral(_) => "FloatLiteral",
            ExpressionKind::CharacterLiteral(_) => "CharacterLiteral",
            ExpressionKind::StringLiteral(_) => "StringLiteral",
            ExpressionKind::Load(_) => "Load",
            ExpressionKind::Materialize(_) => "Materialize",
            ExpressionKind::Requalify(_) => "Requalify",
            ExpressionKind::FunctionConversion(_) => "FunctionConversion",
            ExpressionKind::Erasure(_) => "Erasure",
            ExpressionKind::Paren(_) => "Paren",
            ExpressionKind::Tuple(_) => "Tuple",
            ExpressionKind::GetMetatype(_) => "GetMetatype",
            ExpressionKind::Metatype => "Metatype",
            ExpressionKind::Specialize(_) => "Specialize",
            ExpressionKind::AddressOf(_) => "AddressOf",
            ExpressionKind::TupleElement { .. } => "TupleElement",
            ExpressionKind::TupleShuffle { .. } => "TupleShuffle",
            ExpressionKind::ScalarToTuple { .. } => "ScalarToTuple",
            ExpressionKind::NewArray { .. } => "NewArray",
            ExpressionKind::Func(_) => "Func",
            ExpressionKind::Closure(_) => "Closure",
            ExpressionKind::Sequence(_) => "Sequence",
            ExpressionKind::UnresolvedDot { .. } => "UnresolvedDot",
            ExpressionKind::Assign { .. } => "Assign",
        }
    }
}

impl Expression {
    pub fn new(kind: ExpressionKind, data_type: DataType, location: TextLocation) -> Self {
        Self {
            kind,
            data_type,
            location,
        }
    }

    pub fn int(value: i64, location: TextLocation) -> Self {
        Self::new(ExpressionKind::IntegerLiteral(value), DataType::Int, location)
    }

    pub fn float(value: f64, location: TextLocation) -> Self {
        Self::new(ExpressionKind::FloatLiteral(value), DataType::Float, location)
    }

    pub fn char(value: char, location: TextLocation) -> Self {
        Self::new(
            ExpressionKind::CharacterLiteral(value),
            DataType::Char,
            location,
        )
    }

    pub fn string(value: StringId, location: TextLocation) -> Self {
        Self::new(
            ExpressionKind::StringLiteral(value),
            DataType::String,
            location,
        )
    }

    pub fn decl_ref(decl: DeclId, data_type: DataType, location: TextLocation) -> Self {
        Self::new(ExpressionKind::DeclRef(decl), data_type, location)
    }

    /// Load from an address-typed expression.
    pub fn load(address: Expression) -> Self {
        let data_type = address.data_type.rvalue_type().clone();
        let location = address.location;
        Self::new(ExpressionKind::Load(Box::new(address)), data_type, location)
    }

    pub fn paren(inner: Expression) -> Self {
        let data_type = inner.data_type.clone();
        let location = inner.location;
        Self::new(ExpressionKind::Paren(Box::new(inner)), data_type, location)
    }

    pub fn tuple(elements: Vec<Expression>, location: TextLocation) -> Self {
        let data_type =
            DataType::tuple_of(elements.iter().map(|e| e.data_type.clone()).collect());
        Self::new(ExpressionKind::Tuple(elements), data_type, location)
    }

    pub fn apply(callee: Expression, arg: Expression, result_type: DataType) -> Self {
        let location = callee.location;
        Self::new(
            ExpressionKind::Apply {
                callee: Box::new(callee),
                arg: Box::new(arg),
            },
            result_type,
            location,
        )
    }
}
