use crate::compiler_frontend::ast::ast_nodes::TextLocation;
use std::collections::HashMap;
use std::fmt::{Display, Formatter, Result as FmtResult};

// The final set of errors and warnings emitted from the lowering of a module
#[derive(Debug, Default)]
pub struct CompilerMessages {
    pub errors: Vec<CompilerError>,
    pub warnings: Vec<String>,
}

impl CompilerMessages {
    pub fn from_errors(errors: Vec<CompilerError>) -> Self {
        CompilerMessages {
            errors,
            warnings: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, Hash, PartialEq)]
pub enum ErrorMetaDataKey {
    CompilationStage,
    ExpressionKind,
    DeclarationName,
    ExpectedType,
    FoundType,
    PrimarySuggestion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorType {
    /// An expression kind reached lowering without a handler.
    Unimplemented,

    /// Internal consistency failure. Always a compiler bug, never the user's fault.
    InvariantViolation,

    Config,
    File,
}

pub fn error_type_to_str(e_type: &ErrorType) -> &'static str {
    match e_type {
        ErrorType::Unimplemented => "Not Yet Implemented",
        ErrorType::InvariantViolation => "Compiler Bug",
        ErrorType::Config => "Malformed Config",
        ErrorType::File => "File Error",
    }
}

#[derive(Debug, Clone)]
pub struct CompilerError {
    pub msg: String,
    pub location: TextLocation,
    pub error_type: ErrorType,

    // Extra structured detail for more helpful messages
    pub metadata: HashMap<ErrorMetaDataKey, String>,
}

impl CompilerError {
    pub fn new(msg: impl Into<String>, location: TextLocation, error_type: ErrorType) -> Self {
        CompilerError {
            msg: msg.into(),
            location,
            error_type,
            metadata: HashMap::new(),
        }
    }

    /// Create an invariant violation (internal bug, not user's fault)
    pub fn invariant_violation(msg: impl Into<String>, location: TextLocation) -> Self {
        Self::new(msg, location, ErrorType::InvariantViolation)
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(msg, TextLocation::default(), ErrorType::Config)
    }

    pub fn file_error(path: &std::path::Path, msg: impl Into<String>) -> Self {
        let mut error = Self::new(msg, TextLocation::default(), ErrorType::File);
        error.new_metadata_entry(
            ErrorMetaDataKey::PrimarySuggestion,
            format!("Check that {} exists and is readable", path.display()),
        );
        error
    }

    pub fn new_metadata_entry(&mut self, key: ErrorMetaDataKey, value: impl Into<String>) {
        self.metadata.insert(key, value.into());
    }
}

impl Display for CompilerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "{} at {}: {}",
            error_type_to_str(&self.error_type),
            self.location,
            self.msg
        )
    }
}

impl std::error::Error for CompilerError {}

/// Returns a new CompilerError for broken internal invariants.
///
/// These are compiler bugs: a handler produced or consumed a value in a way
/// the ownership rules forbid, or the typed AST broke a contract semantic
/// checking was supposed to enforce.
///
/// Usage:
/// ```ignore
/// return_invariant_error!("No location for local variable", location, {
///     DeclarationName => name
/// });
/// ```
#[macro_export]
macro_rules! return_invariant_error {
    ($msg:expr, $location:expr, { $( $key:ident => $value:expr ),* $(,)? }) => {
        return Err($crate::compiler_frontend::compiler_errors::CompilerError {
            msg: $msg.into(),
            location: $location,
            error_type: $crate::compiler_frontend::compiler_errors::ErrorType::InvariantViolation,
            metadata: {
                let mut map = std::collections::HashMap::new();
                $( map.insert(
                    $crate::compiler_frontend::compiler_errors::ErrorMetaDataKey::$key,
                    String::from($value),
                ); )*
                map
            },
        })
    };
    ($msg:expr, $location:expr) => {
        return Err($crate::compiler_frontend::compiler_errors::CompilerError::invariant_violation(
            $msg,
            $location,
        ))
    };
}

/// Returns a new CompilerError for expression kinds that have no lowering handler.
///
/// Usage: `return_unimplemented_error!("Sequence", location)`;
#[macro_export]
macro_rules! return_unimplemented_error {
    ($kind_name:expr, $location:expr) => {{
        let mut error = $crate::compiler_frontend::compiler_errors::CompilerError::new(
            format!("Lowering of '{}' expressions is not implemented", $kind_name),
            $location,
            $crate::compiler_frontend::compiler_errors::ErrorType::Unimplemented,
        );
        error.new_metadata_entry(
            $crate::compiler_frontend::compiler_errors::ErrorMetaDataKey::ExpressionKind,
            $kind_name,
        );
        error.new_metadata_entry(
            $crate::compiler_frontend::compiler_errors::ErrorMetaDataKey::CompilationStage,
            "Expression Lowering",
        );
        return Err(error);
    }};
}

/// Returns a new CompilerError for configuration problems.
///
/// Usage: `return_config_error!("message")`;
#[macro_export]
macro_rules! return_config_error {
    ($msg:expr) => {
        return Err($crate::compiler_frontend::compiler_errors::CompilerError::config_error($msg))
    };
}
