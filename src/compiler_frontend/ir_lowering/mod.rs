pub mod cleanups;
pub mod function_lowerer;
pub mod managed_value;
pub mod tuple_shuffle;
pub mod var_locations;

// Expression handlers on `FunctionLowerer`
mod arrays;
mod closures;
mod decl_reference;
mod lower_expression;

#[cfg(test)]
mod tests;
