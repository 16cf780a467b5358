pub mod ir_builder;
pub mod ir_display;
pub mod ir_nodes;
