pub mod ast;

pub mod compiler_messages {
    pub mod compiler_dev_logging;
    pub mod compiler_errors;
    pub mod display_messages;
}
pub use compiler_messages::compiler_errors;
pub use compiler_messages::display_messages;

pub mod datatypes;
pub mod ir_lowering;
pub mod string_interning;
