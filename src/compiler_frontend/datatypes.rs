use crate::compiler_frontend::ast::expression::Expression;
use crate::compiler_frontend::string_interning::StringId;
use serde::Serialize;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Fully checked static type of an expression or IR value.
///
/// Types arrive resolved from the type checker. Lowering only asks two
/// questions of them: is this an address, and does it need reference counting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DataType {
    // Trivial builtin values
    Int,
    Float,
    Char,
    Bool,
    RawPointer,

    // Reference counted
    String,

    /// Owner of a heap allocation backing an array. Retain count lives here.
    ObjectPointer,

    /// Nominal reference type.
    Named(StringId),

    /// Value erased to a protocol type.
    Existential(StringId),

    /// Thick function value (function reference plus captured context).
    Function {
        input: Box<DataType>,
        output: Box<DataType>,
    },

    /// The array view produced by the array injection function.
    Array(Box<DataType>),

    Tuple(Vec<TupleField>),

    /// Runtime representation of a type. Trivial.
    Metatype(Box<DataType>),

    /// Storage address of a value of the inner type.
    LValue(Box<DataType>),
}

/// One field of a tuple type.
///
/// Argument lists are tuples, so defaults and variadics live here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TupleField {
    pub name: Option<StringId>,
    pub data_type: DataType,
    pub default_value: Option<Box<Expression>>,

    /// Only the last field of a tuple may be variadic.
    /// Its `data_type` is the `Array` of its base type.
    pub is_variadic: bool,
}

impl TupleField {
    pub fn new(data_type: DataType) -> Self {
        TupleField {
            name: None,
            data_type,
            default_value: None,
            is_variadic: false,
        }
    }

    pub fn with_default(data_type: DataType, default_value: Expression) -> Self {
        TupleField {
            name: None,
            data_type,
            default_value: Some(Box::new(default_value)),
            is_variadic: false,
        }
    }

    pub fn variadic(base_type: DataType) -> Self {
        TupleField {
            name: None,
            data_type: DataType::Array(Box::new(base_type)),
            default_value: None,
            is_variadic: true,
        }
    }

    pub fn named(mut self, name: StringId) -> Self {
        self.name = Some(name);
        self
    }

    /// Element type of the array a variadic field packs its arguments into.
    pub fn variadic_base_type(&self) -> Option<&DataType> {
        if !self.is_variadic {
            return None;
        }

        match &self.data_type {
            DataType::Array(base) => Some(base),
            _ => None,
        }
    }
}

impl DataType {
    pub fn unit() -> DataType {
        DataType::Tuple(Vec::new())
    }

    pub fn tuple_of(types: Vec<DataType>) -> DataType {
        DataType::Tuple(types.into_iter().map(TupleField::new).collect())
    }

    pub fn function(input: DataType, output: DataType) -> DataType {
        DataType::Function {
            input: Box::new(input),
            output: Box::new(output),
        }
    }

    pub fn lvalue(inner: DataType) -> DataType {
        DataType::LValue(Box::new(inner))
    }

    pub fn is_address(&self) -> bool {
        matches!(self, DataType::LValue(_))
    }

    /// Trivial values are copied bit for bit and never retained or released.
    pub fn is_trivial(&self) -> bool {
        match self {
            DataType::Int
            | DataType::Float
            | DataType::Char
            | DataType::Bool
            | DataType::RawPointer
            | DataType::Metatype(_) => true,

            DataType::Tuple(fields) => fields.iter().all(|field| field.data_type.is_trivial()),

            DataType::String
            | DataType::ObjectPointer
            | DataType::Named(_)
            | DataType::Existential(_)
            | DataType::Function { .. }
            | DataType::Array(_) => false,

            // Addresses are not values, so there is nothing to count
            DataType::LValue(_) => true,
        }
    }

    /// The type of the value stored behind an address, or the type itself.
    pub fn rvalue_type(&self) -> &DataType {
        match self {
            DataType::LValue(inner) => inner,
            other => other,
        }
    }

    pub fn tuple_fields(&self) -> Option<&[TupleField]> {
        match self {
            DataType::Tuple(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn function_output(&self) -> Option<&DataType> {
        match self {
            DataType::Function { output, .. } => Some(output),
            _ => None,
        }
    }
}

impl Display for DataType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            DataType::Int => write!(f, "Int"),
            DataType::Float => write!(f, "Float"),
            DataType::Char => write!(f, "Char"),
            DataType::Bool => write!(f, "Bool"),
            DataType::RawPointer => write!(f, "RawPointer"),
            DataType::String => write!(f, "String"),
            DataType::ObjectPointer => write!(f, "ObjectPointer"),
            DataType::Named(name) => write!(f, "named#{}", name.as_u32()),
            DataType::Existential(name) => write!(f, "any#{}", name.as_u32()),
            DataType::Function { input, output } => write!(f, "{input} -> {output}"),
            DataType::Array(element) => write!(f, "[{element}]"),
            DataType::Tuple(fields) => {
                write!(f, "(")?;
                for (index, field) in fields.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    match field.variadic_base_type() {
                        Some(base) => write!(f, "{base}...")?,
                        None => write!(f, "{}", field.data_type)?,
                    }
                }
                write!(f, ")")
            }
            DataType::Metatype(instance) => write!(f, "{instance}.Type"),
            DataType::LValue(inner) => write!(f, "@lvalue {inner}"),
        }
    }
}
