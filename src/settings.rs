use crate::compiler_frontend::compiler_errors::CompilerError;
use crate::return_config_error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const CONFIG_FILE_NAME: &str = "irgen.toml";

// Rough starting capacities. These only avoid early reallocations.
pub const MINIMUM_STRING_TABLE_CAPACITY: usize = 64;
pub const ARGUMENTS_CAPACITY: usize = 10;
pub const TUPLE_ELEMENTS_CAPACITY: usize = 8;
pub const CAPTURES_CAPACITY: usize = 4;

/// Settings that change how expressions are lowered.
///
/// Every key is optional in the TOML file. Missing keys take the defaults below.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoweringConfig {
    /// Lower independent top-level functions on the rayon thread pool.
    pub parallel_functions: bool,

    /// Emit a zero-initialize instruction over freshly allocated fixed-size arrays.
    /// When false the elements are left uninitialized for later stores.
    pub zero_initialize_new_arrays: bool,

    /// Check after each function body that every pushed cleanup was either
    /// forwarded or emitted.
    pub verify_cleanup_balance: bool,
}

impl Default for LoweringConfig {
    fn default() -> Self {
        LoweringConfig {
            parallel_functions: true,
            zero_initialize_new_arrays: false,
            verify_cleanup_balance: true,
        }
    }
}

impl LoweringConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, CompilerError> {
        match toml::from_str::<LoweringConfig>(source) {
            Ok(config) => Ok(config),
            Err(e) => return_config_error!(format!("Invalid lowering config: {e}")),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, CompilerError> {
        let source = match fs::read_to_string(path) {
            Ok(source) => source,
            Err(e) => {
                return Err(CompilerError::file_error(
                    path,
                    format!("Could not read lowering config: {e}"),
                ));
            }
        };

        Self::from_toml_str(&source)
    }
}
