//! IR Builder
//!
//! Appends instructions for a single function and hands back the values they define.
//! Value ids are unique within one function.

use crate::backends::ir::ir_nodes::{
    AllocKind, Instruction, InstructionKind, IrFunction, IrValue, ValueId,
};
use crate::compiler_frontend::ast::ast_nodes::{Constant, TextLocation};
use crate::compiler_frontend::compiler_errors::CompilerError;
use crate::compiler_frontend::datatypes::DataType;
use crate::compiler_frontend::string_interning::StringId;
use crate::return_invariant_error;

#[derive(Debug)]
pub struct IrBuilder {
    constant: Constant,
    arguments: Vec<IrValue>,
    instructions: Vec<Instruction>,
    next_value_id: u32,

    // Cleared by terminators
    has_insertion_point: bool,
}

impl IrBuilder {
    pub fn new(constant: Constant) -> Self {
        IrBuilder {
            constant,
            arguments: Vec::new(),
            instructions: Vec::new(),
            next_value_id: 0,
            has_insertion_point: true,
        }
    }

    pub fn constant(&self) -> Constant {
        self.constant
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// False once a terminator ended the instruction stream.
    pub fn has_valid_insertion_point(&self) -> bool {
        self.has_insertion_point
    }

    pub fn finish(self) -> IrFunction {
        IrFunction {
            constant: self.constant,
            arguments: self.arguments,
            instructions: self.instructions,
        }
    }

    fn allocate_value(&mut self, ty: DataType) -> IrValue {
        let id = ValueId(self.next_value_id);
        self.next_value_id += 1;
        IrValue { id, ty }
    }

    fn push(&mut self, location: TextLocation, kind: InstructionKind, results: Vec<IrValue>) {
        self.instructions.push(Instruction {
            results,
            kind,
            location,
        });
    }

    fn push_with_result(
        &mut self,
        location: TextLocation,
        kind: InstructionKind,
        ty: DataType,
    ) -> IrValue {
        let value = self.allocate_value(ty);
        self.push(location, kind, vec![value.clone()]);
        value
    }

    pub fn add_argument(&mut self, ty: DataType) -> IrValue {
        let value = self.allocate_value(ty);
        self.arguments.push(value.clone());
        value
    }

    // ------------------------------------------------------------
    // Literals and references
    // ------------------------------------------------------------
    pub fn create_integer_literal(
        &mut self,
        location: TextLocation,
        value: i64,
        ty: DataType,
    ) -> IrValue {
        self.push_with_result(location, InstructionKind::IntegerLiteral(value), ty)
    }

    pub fn create_float_literal(
        &mut self,
        location: TextLocation,
        value: f64,
        ty: DataType,
    ) -> IrValue {
        self.push_with_result(location, InstructionKind::FloatLiteral(value), ty)
    }

    pub fn create_string_literal(
        &mut self,
        location: TextLocation,
        value: StringId,
        ty: DataType,
    ) -> IrValue {
        self.push_with_result(location, InstructionKind::StringLiteral(value), ty)
    }

    pub fn create_integer_value(&mut self, location: TextLocation, value: u64) -> IrValue {
        self.push_with_result(location, InstructionKind::IntegerValue(value), DataType::Int)
    }

    pub fn create_constant_ref(
        &mut self,
        location: TextLocation,
        constant: Constant,
        ty: DataType,
    ) -> IrValue {
        self.push_with_result(location, InstructionKind::ConstantRef(constant), ty)
    }

    pub fn create_metatype(&mut self, location: TextLocation, ty: DataType) -> IrValue {
        self.push_with_result(location, InstructionKind::Metatype, ty)
    }

    pub fn create_apply(
        &mut self,
        location: TextLocation,
        callee: &IrValue,
        args: &[IrValue],
        result_type: DataType,
    ) -> IrValue {
        self.push_with_result(
            location,
            InstructionKind::Apply {
                callee: callee.id,
                args: args.iter().map(|arg| arg.id).collect(),
            },
            result_type,
        )
    }

    // ------------------------------------------------------------
    // Memory
    // ------------------------------------------------------------
    pub fn create_load(&mut self, location: TextLocation, address: &IrValue) -> IrValue {
        let ty = address.ty.rvalue_type().clone();
        self.push_with_result(
            location,
            InstructionKind::Load {
                address: address.id,
            },
            ty,
        )
    }

    pub fn create_store(&mut self, location: TextLocation, value: &IrValue, address: &IrValue) {
        self.push(
            location,
            InstructionKind::Store {
                value: value.id,
                address: address.id,
            },
            vec![],
        );
    }

    pub fn create_alloc_var(
        &mut self,
        location: TextLocation,
        kind: AllocKind,
        allocated_type: DataType,
    ) -> IrValue {
        let address_type = DataType::lvalue(allocated_type.clone());
        self.push_with_result(
            location,
            InstructionKind::AllocVar {
                kind,
                allocated_type,
            },
            address_type,
        )
    }

    pub fn create_dealloc_var(
        &mut self,
        location: TextLocation,
        kind: AllocKind,
        address: &IrValue,
    ) {
        self.push(
            location,
            InstructionKind::DeallocVar {
                kind,
                address: address.id,
            },
            vec![],
        );
    }

    /// Returns (ownership token, base address of element zero).
    pub fn create_alloc_array(
        &mut self,
        location: TextLocation,
        element_type: DataType,
        count: &IrValue,
    ) -> (IrValue, IrValue) {
        let object = self.allocate_value(DataType::ObjectPointer);
        let base = self.allocate_value(DataType::lvalue(element_type.clone()));
        self.push(
            location,
            InstructionKind::AllocArray {
                element_type,
                count: count.id,
            },
            vec![object.clone(), base.clone()],
        );
        (object, base)
    }

    pub fn create_index_addr(
        &mut self,
        location: TextLocation,
        base: &IrValue,
        index: u64,
    ) -> IrValue {
        let ty = base.ty.clone();
        self.push_with_result(
            location,
            InstructionKind::IndexAddr {
                base: base.id,
                index,
            },
            ty,
        )
    }

    pub fn create_element_addr(
        &mut self,
        location: TextLocation,
        base: &IrValue,
        field: usize,
        ty: DataType,
    ) -> IrValue {
        self.push_with_result(
            location,
            InstructionKind::ElementAddr {
                base: base.id,
                field,
            },
            ty,
        )
    }

    pub fn create_zero_initialize(
        &mut self,
        location: TextLocation,
        address: &IrValue,
        count: &IrValue,
    ) {
        self.push(
            location,
            InstructionKind::ZeroInitialize {
                address: address.id,
                count: count.id,
            },
            vec![],
        );
    }

    // ------------------------------------------------------------
    // Aggregates and conversions
    // ------------------------------------------------------------
    pub fn create_tuple(
        &mut self,
        location: TextLocation,
        ty: DataType,
        elements: &[IrValue],
    ) -> IrValue {
        self.push_with_result(
            location,
            InstructionKind::Tuple {
                elements: elements.iter().map(|element| element.id).collect(),
            },
            ty,
        )
    }

    pub fn create_extract(
        &mut self,
        location: TextLocation,
        tuple: &IrValue,
        field: usize,
        ty: DataType,
    ) -> IrValue {
        self.push_with_result(
            location,
            InstructionKind::Extract {
                tuple: tuple.id,
                field,
            },
            ty,
        )
    }

    pub fn create_convert(
        &mut self,
        location: TextLocation,
        value: &IrValue,
        ty: DataType,
    ) -> IrValue {
        self.push_with_result(location, InstructionKind::Convert { value: value.id }, ty)
    }

    pub fn create_specialize(
        &mut self,
        location: TextLocation,
        value: &IrValue,
        ty: DataType,
    ) -> IrValue {
        self.push_with_result(location, InstructionKind::Specialize { value: value.id }, ty)
    }

    pub fn create_erase(
        &mut self,
        location: TextLocation,
        value: &IrValue,
        ty: DataType,
    ) -> IrValue {
        self.push_with_result(location, InstructionKind::Erase { value: value.id }, ty)
    }

    // ------------------------------------------------------------
    // Reference counting
    // ------------------------------------------------------------
    pub fn create_retain(&mut self, location: TextLocation, value: &IrValue) {
        self.push(location, InstructionKind::Retain { value: value.id }, vec![]);
    }

    pub fn create_release(&mut self, location: TextLocation, value: &IrValue) {
        self.push(location, InstructionKind::Release { value: value.id }, vec![]);
    }

    pub fn create_closure(
        &mut self,
        location: TextLocation,
        function: &IrValue,
        captures: &[IrValue],
        ty: DataType,
    ) -> IrValue {
        self.push_with_result(
            location,
            InstructionKind::Closure {
                function: function.id,
                captures: captures.iter().map(|capture| capture.id).collect(),
            },
            ty,
        )
    }

    // ------------------------------------------------------------
    // Terminators
    // ------------------------------------------------------------
    pub fn create_return(
        &mut self,
        location: TextLocation,
        value: &IrValue,
    ) -> Result<(), CompilerError> {
        self.terminate(location, InstructionKind::Return { value: value.id })
    }

    pub fn create_unreachable(&mut self, location: TextLocation) -> Result<(), CompilerError> {
        self.terminate(location, InstructionKind::Unreachable)
    }

    fn terminate(
        &mut self,
        location: TextLocation,
        kind: InstructionKind,
    ) -> Result<(), CompilerError> {
        if !self.has_insertion_point {
            return_invariant_error!(
                format!("{} already has a terminator", self.constant),
                location
            );
        }

        self.push(location, kind, vec![]);
        self.has_insertion_point = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler_frontend::ast::ast_nodes::DeclId;

    #[test]
    fn terminators_close_the_insertion_point() {
        let mut builder = IrBuilder::new(Constant::Decl(DeclId(0)));
        let location = TextLocation::new_just_line(1);
        let value = builder.create_integer_literal(location, 7, DataType::Int);

        assert!(builder.has_valid_insertion_point());
        builder
            .create_return(location, &value)
            .expect("first terminator is fine");
        assert!(!builder.has_valid_insertion_point());
        assert!(builder.create_unreachable(location).is_err());
    }

    #[test]
    fn array_allocation_defines_token_and_base_address() {
        let mut builder = IrBuilder::new(Constant::Decl(DeclId(0)));
        let location = TextLocation::default();
        let count = builder.create_integer_value(location, 3);
        let (object, base) = builder.create_alloc_array(location, DataType::Int, &count);

        assert_eq!(object.ty, DataType::ObjectPointer);
        assert_eq!(base.ty, DataType::lvalue(DataType::Int));
        assert_eq!(builder.instructions()[1].results.len(), 2);
    }
}
