pub mod backends;
pub mod compiler_frontend;
pub mod settings;

pub use backends::ir::ir_nodes::{IrFunction, IrModule};
pub use compiler_frontend::compiler_errors::{CompilerError, CompilerMessages};
pub use compiler_frontend::ir_lowering::function_lowerer::{
    lower_module, lower_module_with_classifier,
};
pub use settings::LoweringConfig;
