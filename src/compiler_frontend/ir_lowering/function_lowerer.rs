//! Function Lowering
//!
//! Lowers one typed function body into one IR function.
//!
//! This stage:
//! - Binds parameters and captures in the prologue
//! - Lowers the body expression inside its own cleanup scope
//! - Emits the return together with every pending cleanup
//! - Collects the out-of-line bodies of nested function expressions
//!
//! All mutable state lives in `FunctionLowerer` and is private to one function,
//! so independent functions can be lowered on separate threads.

use crate::backends::ir::ir_builder::IrBuilder;
use crate::backends::ir::ir_nodes::{IrFunction, IrModule, IrValue};
use crate::compiler_frontend::ast::ast_nodes::{
    AstModule, Constant, DeclId, Declaration, DeclarationTable, FunctionBody, TextLocation,
};
use crate::compiler_frontend::ast::expression::Expression;
use crate::compiler_frontend::compiler_errors::{CompilerError, CompilerMessages};
use crate::compiler_frontend::datatypes::DataType;
use crate::compiler_frontend::ir_lowering::cleanups::{
    CleanupAction, CleanupStack, CleanupsDepth,
};
use crate::compiler_frontend::ir_lowering::managed_value::ManagedValue;
use crate::compiler_frontend::ir_lowering::var_locations::{
    CaptureClassifier, CaptureKind, DeclarationCaptureRules, LocalBindings, VarLoc,
};
use crate::compiler_frontend::string_interning::StringTable;
use crate::settings::LoweringConfig;
use crate::{lowering_log, return_invariant_error, timer_log};
use rayon::prelude::*;
use std::time::Instant;

// -----------
// Entry Point
// -----------
pub fn lower_module(
    module: &AstModule,
    string_table: &StringTable,
    config: &LoweringConfig,
) -> Result<IrModule, CompilerMessages> {
    lower_module_with_classifier(module, string_table, config, &DeclarationCaptureRules)
}

/// Lowers every top-level function of `module`.
///
/// Each function is lowered independently. If any of them fails, every error is
/// reported and no module is returned.
pub fn lower_module_with_classifier(
    module: &AstModule,
    string_table: &StringTable,
    config: &LoweringConfig,
    capture_classifier: &dyn CaptureClassifier,
) -> Result<IrModule, CompilerMessages> {
    let time = Instant::now();

    let context = LoweringContext {
        declarations: &module.declarations,
        string_table,
        config,
        capture_classifier,
    };

    let results: Vec<Result<Vec<IrFunction>, CompilerError>> = if config.parallel_functions {
        module
            .functions
            .par_iter()
            .map(|function| lower_function(context, function))
            .collect()
    } else {
        module
            .functions
            .iter()
            .map(|function| lower_function(context, function))
            .collect()
    };

    let mut ir_module = IrModule::default();
    let mut errors = Vec::new();
    for result in results {
        match result {
            Ok(functions) => ir_module.functions.extend(functions),
            Err(e) => errors.push(e),
        }
    }

    timer_log!(time, "Expressions lowered in: ");

    if !errors.is_empty() {
        return Err(CompilerMessages::from_errors(errors));
    }

    Ok(ir_module)
}

/// Lowers one function body. The first IR function is the body itself,
/// followed by the bodies of any nested function expressions.
pub fn lower_function(
    context: LoweringContext<'_>,
    function: &FunctionBody,
) -> Result<Vec<IrFunction>, CompilerError> {
    lowering_log!(format!("[IR] Lowering function {}", function.constant));

    let mut lowerer = FunctionLowerer::new(context, function.constant);
    lowerer.emit_prologue(function)?;
    lowerer.emit_function_body(&function.body)?;
    lowerer.finish(function.location)
}

// ----------------
// Lowering Context
// ----------------

/// Read-only state shared by every function lowering of one module.
#[derive(Clone, Copy)]
pub struct LoweringContext<'a> {
    pub declarations: &'a DeclarationTable,
    pub string_table: &'a StringTable,
    pub config: &'a LoweringConfig,
    pub capture_classifier: &'a dyn CaptureClassifier,
}

pub struct FunctionLowerer<'a> {
    pub(crate) context: LoweringContext<'a>,
    pub(crate) builder: IrBuilder,
    pub(crate) cleanups: CleanupStack,
    pub(crate) bindings: LocalBindings,

    // Out-of-line bodies of nested function expressions, in emission order
    pub(crate) emitted_functions: Vec<IrFunction>,
}

impl<'a> FunctionLowerer<'a> {
    pub fn new(context: LoweringContext<'a>, constant: Constant) -> FunctionLowerer<'a> {
        FunctionLowerer {
            context,
            builder: IrBuilder::new(constant),
            cleanups: CleanupStack::new(),
            bindings: LocalBindings::new(),
            emitted_functions: Vec::new(),
        }
    }

    pub fn builder(&self) -> &IrBuilder {
        &self.builder
    }

    pub fn cleanups(&self) -> &CleanupStack {
        &self.cleanups
    }

    // ------------------------------------
    // Bindings made by the statement lowerer
    // ------------------------------------
    pub fn bind_var_location(&mut self, decl: DeclId, location: VarLoc) {
        self.bindings.bind_var_location(decl, location);
    }

    pub fn bind_local_constant(&mut self, decl: DeclId, value: IrValue) {
        self.bindings.bind_local_constant(decl, value);
    }

    pub(crate) fn declaration_or_error(
        &self,
        decl: DeclId,
        location: TextLocation,
    ) -> Result<&'a Declaration, CompilerError> {
        match self.context.declarations.get(decl) {
            Some(declaration) => Ok(declaration),
            None => return_invariant_error!(
                format!("Reference to undeclared {decl}"),
                location,
                { CompilationStage => "Expression Lowering" }
            ),
        }
    }

    pub(crate) fn declaration_name(&self, declaration: &Declaration) -> &'a str {
        self.context.string_table.resolve(declaration.name)
    }

    // ------------------------------------
    // Ownership helpers
    // ------------------------------------
    pub(crate) fn emit_retain_rvalue(&mut self, location: TextLocation, value: &IrValue) {
        if !value.ty.is_trivial() {
            self.builder.create_retain(location, value);
        }
    }

    /// Takes ownership of a +1 value. Addresses and trivial values need no cleanup.
    pub(crate) fn managed_rvalue_with_cleanup(&mut self, value: IrValue) -> ManagedValue {
        if value.ty.is_address() || value.ty.is_trivial() {
            return ManagedValue::unmanaged(value);
        }

        let handle = self.cleanups.push(CleanupAction::ReleaseValue(value.clone()));
        ManagedValue::with_cleanup(value, handle)
    }

    pub(crate) fn forward(
        &mut self,
        value: ManagedValue,
        location: TextLocation,
    ) -> Result<IrValue, CompilerError> {
        value.forward(&mut self.cleanups, location)
    }

    /// Runs `lower` inside a cleanup scope. Every cleanup it pushes is emitted
    /// and popped when it returns, so the result must not own anything.
    pub fn in_full_expression_scope<T>(
        &mut self,
        location: TextLocation,
        lower: impl FnOnce(&mut Self) -> Result<T, CompilerError>,
    ) -> Result<T, CompilerError> {
        let depth = self.cleanups.depth();
        let result = lower(self)?;
        self.cleanups.pop_to_depth(&mut self.builder, location, depth)?;
        Ok(result)
    }

    /// Runs every active cleanup of the function, innermost first, then returns `value`.
    pub fn emit_return_and_cleanups(
        &mut self,
        location: TextLocation,
        value: &IrValue,
    ) -> Result<(), CompilerError> {
        self.cleanups.emit_active_cleanups(&mut self.builder, location, CleanupsDepth::ROOT);
        self.builder.create_return(location, value)
    }

    // ------------------------------------
    // Function structure
    // ------------------------------------

    /// Turns parameters and captures into IR arguments and binds them.
    ///
    /// Parameters are owned by the callee. Captures are borrowed from the closure context.
    pub fn emit_prologue(&mut self, function: &FunctionBody) -> Result<(), CompilerError> {
        for &param in &function.params {
            let declaration = self.declaration_or_error(param, function.location)?;
            let argument = self
                .builder
                .add_argument(declaration.reference_type.clone());

            if declaration.reference_type.is_address() {
                self.bind_var_location(param, VarLoc::unboxed(argument));
                continue;
            }

            if !argument.ty.is_trivial() {
                self.cleanups.push(CleanupAction::ReleaseValue(argument.clone()));
            }
            self.bind_local_constant(param, argument);
        }

        for &capture in &function.captures {
            let declaration = self.declaration_or_error(capture, function.location)?;

            match self.context.capture_classifier.capture_kind(declaration) {
                CaptureKind::LValue => {
                    let address_type =
                        self.capture_address_type(declaration, function.location)?;
                    let owning_box = self.builder.add_argument(DataType::ObjectPointer);
                    let address = self.builder.add_argument(address_type);
                    self.bind_var_location(capture, VarLoc::boxed(owning_box, address));
                }

                CaptureKind::Byref => {
                    let address_type =
                        self.capture_address_type(declaration, function.location)?;
                    let address = self.builder.add_argument(address_type);
                    self.bind_var_location(capture, VarLoc::unboxed(address));
                }

                CaptureKind::Constant => {
                    let value = self
                        .builder
                        .add_argument(declaration.reference_type.clone());
                    self.bind_local_constant(capture, value);
                }
            }
        }

        Ok(())
    }

    fn capture_address_type(
        &self,
        declaration: &Declaration,
        location: TextLocation,
    ) -> Result<DataType, CompilerError> {
        if !declaration.reference_type.is_address() {
            return_invariant_error!(
                "Captured by reference but the declaration has no storage",
                location,
                {
                    DeclarationName => self.declaration_name(declaration),
                    FoundType => declaration.reference_type.to_string(),
                }
            );
        }

        Ok(declaration.reference_type.clone())
    }

    /// Lowers the body expression and returns its value.
    ///
    /// Temporaries of the body are cleaned up before the return. If the body
    /// already ended the instruction stream, no return is emitted.
    pub fn emit_function_body(&mut self, body: &Expression) -> Result<(), CompilerError> {
        let location = body.location;

        let result = self.in_full_expression_scope(location, |lowerer| {
            let value = lowerer.lower_expression(body)?;
            lowerer.forward(value, location)
        })?;

        if self.builder.has_valid_insertion_point() {
            self.emit_return_and_cleanups(location, &result)?;
        }

        Ok(())
    }

    fn finish(mut self, location: TextLocation) -> Result<Vec<IrFunction>, CompilerError> {
        self.cleanups.pop_to_depth(&mut self.builder, location, CleanupsDepth::ROOT)?;

        if self.context.config.verify_cleanup_balance {
            self.cleanups.verify_balanced(location)?;
        }

        let mut functions = Vec::with_capacity(self.emitted_functions.len() + 1);
        functions.push(self.builder.finish());
        functions.append(&mut self.emitted_functions);
        Ok(functions)
    }
}
