use super::lowering_test_support::{
    TestModule, injection_ref, is_release, is_retain, loc,
};
use crate::backends::ir::ir_nodes::InstructionKind;
use crate::compiler_frontend::ast::ast_nodes::{Constant, DeclContext, DeclKind};
use crate::compiler_frontend::ast::expression::{Expression, ExpressionKind};
use crate::compiler_frontend::compiler_errors::{ErrorMetaDataKey, ErrorType};
use crate::compiler_frontend::datatypes::{DataType, TupleField};
use crate::compiler_frontend::ir_lowering::var_locations::VarLoc;

#[test]
fn literals_are_never_managed() {
    let mut module = TestModule::new();
    let text = module.string_table.intern("hello");
    let mut lowerer = module.lowerer();

    let int = lowerer
        .lower_expression(&Expression::int(42, loc(1)))
        .expect("integer literal should lower");
    let float = lowerer
        .lower_expression(&Expression::float(1.5, loc(1)))
        .expect("float literal should lower");
    let character = lowerer
        .lower_expression(&Expression::char('a', loc(1)))
        .expect("character literal should lower");
    let string = lowerer
        .lower_expression(&Expression::string(text, loc(1)))
        .expect("string literal should lower");

    assert!(!int.has_cleanup());
    assert!(!float.has_cleanup());
    assert!(!character.has_cleanup());
    assert!(!string.has_cleanup());
    assert_eq!(lowerer.cleanups().stats().pushed, 0);

    let kinds: Vec<&InstructionKind> = lowerer
        .test_instructions()
        .iter()
        .map(|instruction| &instruction.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            &InstructionKind::IntegerLiteral(42),
            &InstructionKind::FloatLiteral(1.5),
            &InstructionKind::IntegerLiteral(97),
            &InstructionKind::StringLiteral(text),
        ]
    );
    assert_eq!(character.value().ty, DataType::Char);
}

#[test]
fn load_retains_reference_counted_values() {
    let mut module = TestModule::new();
    let name = module.declare(
        "name",
        DataType::lvalue(DataType::String),
        DeclContext::Local,
        DeclKind::Var,
    );
    let mut lowerer = module.lowerer();
    let owning_box = lowerer.test_argument(DataType::ObjectPointer);
    let address = lowerer.test_argument(DataType::lvalue(DataType::String));
    lowerer.bind_var_location(name, VarLoc::boxed(owning_box, address.clone()));

    let load = Expression::load(Expression::decl_ref(
        name,
        DataType::lvalue(DataType::String),
        loc(2),
    ));
    let value = lowerer
        .lower_expression(&load)
        .expect("load should lower");

    assert!(value.has_cleanup());
    assert_eq!(value.value().ty, DataType::String);

    let instructions = lowerer.test_instructions();
    assert_eq!(
        instructions[0].kind,
        InstructionKind::Load {
            address: address.id
        }
    );
    assert_eq!(
        instructions[1].kind,
        InstructionKind::Retain {
            value: value.value().id
        }
    );
}

#[test]
fn load_of_trivial_value_needs_no_cleanup() {
    let mut module = TestModule::new();
    let count = module.declare(
        "count",
        DataType::lvalue(DataType::Int),
        DeclContext::Local,
        DeclKind::Var,
    );
    let mut lowerer = module.lowerer();
    let owning_box = lowerer.test_argument(DataType::ObjectPointer);
    let address = lowerer.test_argument(DataType::lvalue(DataType::Int));
    lowerer.bind_var_location(count, VarLoc::boxed(owning_box, address));

    let load = Expression::load(Expression::decl_ref(
        count,
        DataType::lvalue(DataType::Int),
        loc(1),
    ));
    let value = lowerer.lower_expression(&load).expect("load should lower");

    assert!(!value.has_cleanup());
    assert_eq!(lowerer.test_count(is_retain), 0);
}

#[test]
fn local_variable_without_location_is_an_invariant_violation() {
    let mut module = TestModule::new();
    let orphan = module.declare(
        "orphan",
        DataType::lvalue(DataType::Int),
        DeclContext::Local,
        DeclKind::Var,
    );
    let mut lowerer = module.lowerer();

    let error = lowerer
        .lower_expression(&Expression::decl_ref(
            orphan,
            DataType::lvalue(DataType::Int),
            loc(4),
        ))
        .expect_err("missing location should fail");

    assert_eq!(error.error_type, ErrorType::InvariantViolation);
    assert_eq!(
        error.metadata.get(&ErrorMetaDataKey::DeclarationName),
        Some(&String::from("orphan"))
    );
}

#[test]
fn global_variable_is_reached_through_its_accessor() {
    let mut module = TestModule::new();
    let counter = module.declare(
        "counter",
        DataType::lvalue(DataType::Int),
        DeclContext::Global,
        DeclKind::Var,
    );
    let mut lowerer = module.lowerer();

    let address = lowerer
        .lower_expression(&Expression::decl_ref(
            counter,
            DataType::lvalue(DataType::Int),
            loc(1),
        ))
        .expect("global reference should lower");

    assert!(!address.has_cleanup());
    assert_eq!(address.value().ty, DataType::lvalue(DataType::Int));

    let instructions = lowerer.test_instructions();
    assert_eq!(instructions.len(), 2);
    assert_eq!(
        instructions[0].kind,
        InstructionKind::ConstantRef(Constant::GlobalAccessor(counter))
    );
    assert_eq!(
        instructions[1].kind,
        InstructionKind::Apply {
            callee: instructions[0].results[0].id,
            args: vec![],
        }
    );
}

#[test]
fn local_constant_reference_is_retained() {
    let mut module = TestModule::new();
    let callback_type = DataType::function(DataType::unit(), DataType::Int);
    let callback = module.declare(
        "callback",
        callback_type.clone(),
        DeclContext::Local,
        DeclKind::Let,
    );
    let mut lowerer = module.lowerer();
    let value = lowerer.test_argument(callback_type.clone());
    lowerer.bind_local_constant(callback, value.clone());

    let reference = lowerer
        .lower_expression(&Expression::decl_ref(callback, callback_type, loc(1)))
        .expect("local constant should lower");

    assert!(reference.has_cleanup());
    assert_eq!(reference.value(), &value);
    assert_eq!(
        lowerer.test_instructions()[0].kind,
        InstructionKind::Retain { value: value.id }
    );
}

#[test]
fn global_function_reference_is_unmanaged() {
    let mut module = TestModule::new();
    let function_type = DataType::function(DataType::unit(), DataType::Int);
    let main = module.declare(
        "main",
        function_type.clone(),
        DeclContext::Global,
        DeclKind::Func,
    );
    let mut lowerer = module.lowerer();

    let reference = lowerer
        .lower_expression(&Expression::decl_ref(main, function_type, loc(1)))
        .expect("function reference should lower");

    assert!(!reference.has_cleanup());
    assert_eq!(lowerer.test_count(is_retain), 0);
    assert_eq!(
        lowerer.test_instructions()[0].kind,
        InstructionKind::ConstantRef(Constant::Decl(main))
    );
}

#[test]
fn tuple_element_of_value_is_extracted_and_retained() {
    let mut module = TestModule::new();
    let pair_type = DataType::tuple_of(vec![DataType::Int, DataType::String]);
    let pair = module.declare("pair", pair_type.clone(), DeclContext::Local, DeclKind::Let);
    let mut lowerer = module.lowerer();
    let pair_value = lowerer.test_argument(pair_type.clone());
    lowerer.bind_local_constant(pair, pair_value);

    let element = Expression::new(
        ExpressionKind::TupleElement {
            base: Box::new(Expression::decl_ref(pair, pair_type, loc(1))),
            field: 1,
        },
        DataType::String,
        loc(1),
    );
    let value = lowerer
        .lower_expression(&element)
        .expect("tuple element should lower");

    assert!(value.has_cleanup());
    let extract = lowerer
        .test_last(|kind| matches!(kind, InstructionKind::Extract { .. }))
        .expect("extract should be emitted");
    assert_eq!(extract.results[0].id, value.value().id);

    // One retain for the tuple reference and one for the element
    assert_eq!(lowerer.test_count(is_retain), 2);
    assert_eq!(lowerer.cleanups().stats().pushed, 2);
}

#[test]
fn tuple_element_of_address_is_an_element_address() {
    let mut module = TestModule::new();
    let pair_type = DataType::tuple_of(vec![DataType::Int, DataType::String]);
    let pair = module.declare(
        "pair",
        DataType::lvalue(pair_type.clone()),
        DeclContext::Local,
        DeclKind::Var,
    );
    let mut lowerer = module.lowerer();
    let owning_box = lowerer.test_argument(DataType::ObjectPointer);
    let address = lowerer.test_argument(DataType::lvalue(pair_type.clone()));
    lowerer.bind_var_location(pair, VarLoc::boxed(owning_box, address.clone()));

    let element = Expression::new(
        ExpressionKind::TupleElement {
            base: Box::new(Expression::decl_ref(
                pair,
                DataType::lvalue(pair_type),
                loc(1),
            )),
            field: 1,
        },
        DataType::lvalue(DataType::String),
        loc(1),
    );
    let value = lowerer
        .lower_expression(&element)
        .expect("element address should lower");

    assert!(!value.has_cleanup());
    assert_eq!(
        lowerer.test_instructions()[0].kind,
        InstructionKind::ElementAddr {
            base: address.id,
            field: 1
        }
    );
    assert_eq!(lowerer.test_count(is_retain), 0);
}

#[test]
fn tuple_construction_forwards_every_element() {
    let mut module = TestModule::new();
    let text = module.string_table.intern("x");
    let callback_type = DataType::function(DataType::unit(), DataType::Int);
    let callback = module.declare(
        "callback",
        callback_type.clone(),
        DeclContext::Local,
        DeclKind::Let,
    );
    let mut lowerer = module.lowerer();
    let callback_value = lowerer.test_argument(callback_type.clone());
    lowerer.bind_local_constant(callback, callback_value);

    let tuple = Expression::tuple(
        vec![
            Expression::string(text, loc(1)),
            Expression::decl_ref(callback, callback_type, loc(1)),
        ],
        loc(1),
    );
    let value = lowerer.lower_expression(&tuple).expect("tuple should lower");

    assert!(value.has_cleanup());
    let stats = lowerer.cleanups().stats();
    assert_eq!(stats.pushed, 2);
    assert_eq!(stats.forwarded, 1);
}

#[test]
fn function_conversion_rewraps_ownership() {
    let mut module = TestModule::new();
    let callback_type = DataType::function(DataType::unit(), DataType::Int);
    let callback = module.declare(
        "callback",
        callback_type.clone(),
        DeclContext::Local,
        DeclKind::Let,
    );
    let mut lowerer = module.lowerer();
    let callback_value = lowerer.test_argument(callback_type.clone());
    lowerer.bind_local_constant(callback, callback_value);

    let converted_type = DataType::function(DataType::tuple_of(vec![]), DataType::Int);
    let conversion = Expression::new(
        ExpressionKind::FunctionConversion(Box::new(Expression::decl_ref(
            callback,
            callback_type,
            loc(1),
        ))),
        converted_type.clone(),
        loc(1),
    );
    let value = lowerer
        .lower_expression(&conversion)
        .expect("conversion should lower");

    assert!(value.has_cleanup());
    assert_eq!(value.value().ty, converted_type);
    let stats = lowerer.cleanups().stats();
    assert_eq!(stats.pushed, 2);
    assert_eq!(stats.forwarded, 1);
}

#[test]
fn conversions_of_borrowed_values_stay_borrowed() {
    let mut module = TestModule::new();
    let protocol = module.string_table.intern("Callable");
    let callback_type = DataType::function(DataType::unit(), DataType::Int);
    let callback = module.declare(
        "callback",
        callback_type.clone(),
        DeclContext::Global,
        DeclKind::Func,
    );
    let mut lowerer = module.lowerer();

    let reference = || Expression::decl_ref(callback, callback_type.clone(), loc(1));
    let conversion = Expression::new(
        ExpressionKind::FunctionConversion(Box::new(reference())),
        DataType::function(DataType::tuple_of(vec![]), DataType::Int),
        loc(1),
    );
    let erasure = Expression::new(
        ExpressionKind::Erasure(Box::new(reference())),
        DataType::Existential(protocol),
        loc(1),
    );

    lowerer
        .in_full_expression_scope(loc(1), |lowerer| {
            let converted = lowerer.lower_expression(&conversion)?;
            assert!(!converted.has_cleanup());
            let erased = lowerer.lower_expression(&erasure)?;
            assert!(!erased.has_cleanup());
            Ok(())
        })
        .expect("conversions should lower");

    assert_eq!(lowerer.test_count(is_retain), lowerer.test_count(is_release));
    assert_eq!(lowerer.test_count(is_release), 0);
    assert!(lowerer.cleanups().stats().is_balanced());
}

#[test]
fn specialize_requires_an_unowned_operand() {
    let mut module = TestModule::new();
    let generic_type = DataType::function(DataType::Int, DataType::Int);
    let identity = module.declare(
        "identity",
        generic_type.clone(),
        DeclContext::Global,
        DeclKind::Func,
    );
    let local = module.declare("local", generic_type.clone(), DeclContext::Local, DeclKind::Let);
    let mut lowerer = module.lowerer();
    let local_value = lowerer.test_argument(generic_type.clone());
    lowerer.bind_local_constant(local, local_value);

    let specialize = |decl| {
        Expression::new(
            ExpressionKind::Specialize(Box::new(Expression::decl_ref(
                decl,
                generic_type.clone(),
                loc(1),
            ))),
            generic_type.clone(),
            loc(1),
        )
    };

    let value = lowerer
        .lower_expression(&specialize(identity))
        .expect("global specialization should lower");
    assert!(!value.has_cleanup());
    assert!(lowerer
        .test_last(|kind| matches!(kind, InstructionKind::Specialize { .. }))
        .is_some());

    let error = lowerer
        .lower_expression(&specialize(local))
        .expect_err("owned operand should be rejected");
    assert_eq!(error.error_type, ErrorType::InvariantViolation);
}

#[test]
fn paren_and_metatype_extraction_pass_through() {
    let module = TestModule::new();
    let mut lowerer = module.lowerer();

    let paren = lowerer
        .lower_expression(&Expression::paren(Expression::int(3, loc(1))))
        .expect("paren should lower");
    assert_eq!(lowerer.test_instructions().len(), 1);
    assert_eq!(paren.value(), &lowerer.test_instructions()[0].results[0]);

    let metatype_type = DataType::Metatype(Box::new(DataType::Int));
    let metatype = Expression::new(ExpressionKind::Metatype, metatype_type.clone(), loc(1));
    let value = lowerer
        .lower_expression(&metatype)
        .expect("metatype should lower");
    assert!(!value.has_cleanup());
    assert_eq!(value.value().ty, metatype_type);
}

#[test]
fn call_arguments_are_passed_individually() {
    let mut module = TestModule::new();
    let function_type = DataType::function(
        DataType::tuple_of(vec![DataType::Int, DataType::Int]),
        DataType::String,
    );
    let join = module.declare("join", function_type.clone(), DeclContext::Global, DeclKind::Func);
    let mut lowerer = module.lowerer();

    let call = Expression::apply(
        Expression::decl_ref(join, function_type, loc(1)),
        Expression::tuple(
            vec![Expression::int(1, loc(1)), Expression::int(2, loc(1))],
            loc(1),
        ),
        DataType::String,
    );
    let result = lowerer.lower_expression(&call).expect("call should lower");

    assert!(result.has_cleanup());
    assert_eq!(
        lowerer.test_count(|kind| matches!(kind, InstructionKind::Tuple { .. })),
        0
    );

    let apply = lowerer
        .test_last(|kind| matches!(kind, InstructionKind::Apply { .. }))
        .expect("apply should be emitted");
    let InstructionKind::Apply { args, .. } = &apply.kind else {
        unreachable!()
    };
    assert_eq!(args.len(), 2);
}

#[test]
fn parenthesized_argument_tuple_is_passed_individually() {
    let mut module = TestModule::new();
    let function_type = DataType::function(
        DataType::tuple_of(vec![DataType::Int, DataType::Int]),
        DataType::Int,
    );
    let add = module.declare("add", function_type.clone(), DeclContext::Global, DeclKind::Func);
    let mut lowerer = module.lowerer();

    let call = Expression::apply(
        Expression::decl_ref(add, function_type, loc(1)),
        Expression::paren(Expression::tuple(
            vec![Expression::int(1, loc(1)), Expression::int(2, loc(1))],
            loc(1),
        )),
        DataType::Int,
    );
    let _result = lowerer.lower_expression(&call).expect("call should lower");

    assert_eq!(
        lowerer.test_count(|kind| matches!(kind, InstructionKind::Tuple { .. })),
        0
    );
    let first = lowerer.test_instructions()[1].results[0].id;
    let second = lowerer.test_instructions()[2].results[0].id;
    let apply = lowerer
        .test_last(|kind| matches!(kind, InstructionKind::Apply { .. }))
        .expect("apply should be emitted");
    let InstructionKind::Apply { args, .. } = &apply.kind else {
        unreachable!()
    };
    assert_eq!(args, &vec![first, second]);
}

#[test]
fn scalar_promoted_into_single_field_is_passed_directly() {
    let mut module = TestModule::new();
    let argument_type = DataType::Tuple(vec![TupleField::new(DataType::Int)]);
    let function_type = DataType::function(argument_type.clone(), DataType::Int);
    let negate = module.declare(
        "negate",
        function_type.clone(),
        DeclContext::Global,
        DeclKind::Func,
    );
    let mut lowerer = module.lowerer();

    let call = Expression::apply(
        Expression::decl_ref(negate, function_type, loc(1)),
        Expression::new(
            ExpressionKind::ScalarToTuple {
                sub: Box::new(Expression::int(5, loc(1))),
                scalar_field: 0,
                variadic_injection: None,
            },
            argument_type,
            loc(1),
        ),
        DataType::Int,
    );
    let result = lowerer.lower_expression(&call).expect("call should lower");

    assert!(!result.has_cleanup());
    let literal = &lowerer.test_instructions()[1];
    let apply = lowerer
        .test_last(|kind| matches!(kind, InstructionKind::Apply { .. }))
        .expect("apply should be emitted");
    let InstructionKind::Apply { args, .. } = &apply.kind else {
        unreachable!()
    };
    assert_eq!(args, &vec![literal.results[0].id]);
}

#[test]
fn scalar_promotion_in_a_call_passes_defaults_as_arguments() {
    let mut module = TestModule::new();
    let argument_type = DataType::Tuple(vec![
        TupleField::with_default(DataType::Int, Expression::int(7, loc(1))),
        TupleField::new(DataType::Int),
    ]);
    let function_type = DataType::function(argument_type.clone(), DataType::Int);
    let offset = module.declare(
        "offset",
        function_type.clone(),
        DeclContext::Global,
        DeclKind::Func,
    );
    let mut lowerer = module.lowerer();

    let call = Expression::apply(
        Expression::decl_ref(offset, function_type, loc(1)),
        Expression::new(
            ExpressionKind::ScalarToTuple {
                sub: Box::new(Expression::int(5, loc(1))),
                scalar_field: 1,
                variadic_injection: None,
            },
            argument_type,
            loc(1),
        ),
        DataType::Int,
    );
    let _result = lowerer.lower_expression(&call).expect("call should lower");

    assert_eq!(
        lowerer.test_count(|kind| matches!(kind, InstructionKind::Tuple { .. })),
        0
    );

    // The scalar is lowered before the defaults around it
    let scalar = &lowerer.test_instructions()[1];
    assert_eq!(scalar.kind, InstructionKind::IntegerLiteral(5));
    let default = &lowerer.test_instructions()[2];
    assert_eq!(default.kind, InstructionKind::IntegerLiteral(7));

    let apply = lowerer
        .test_last(|kind| matches!(kind, InstructionKind::Apply { .. }))
        .expect("apply should be emitted");
    let InstructionKind::Apply { args, .. } = &apply.kind else {
        unreachable!()
    };
    assert_eq!(args, &vec![default.results[0].id, scalar.results[0].id]);
}

#[test]
fn scalar_promotion_in_a_call_passes_the_variadic_array() {
    let mut module = TestModule::new();
    let injection = injection_ref(&mut module, DataType::Int);
    let argument_type = DataType::Tuple(vec![
        TupleField::new(DataType::Int),
        TupleField::variadic(DataType::Int),
    ]);
    let function_type = DataType::function(argument_type.clone(), DataType::Int);
    let sum = module.declare("sum", function_type.clone(), DeclContext::Global, DeclKind::Func);
    let mut lowerer = module.lowerer();

    let call = Expression::apply(
        Expression::decl_ref(sum, function_type, loc(1)),
        Expression::new(
            ExpressionKind::ScalarToTuple {
                sub: Box::new(Expression::int(5, loc(1))),
                scalar_field: 0,
                variadic_injection: Some(Box::new(injection)),
            },
            argument_type,
            loc(1),
        ),
        DataType::Int,
    );
    let result = lowerer.lower_expression(&call).expect("call should lower");

    // Injection call, then the call itself
    let applies: Vec<_> = lowerer
        .test_instructions()
        .iter()
        .filter(|instruction| matches!(instruction.kind, InstructionKind::Apply { .. }))
        .collect();
    assert_eq!(applies.len(), 2);
    let array = applies[0].results[0].id;
    let scalar = lowerer.test_instructions()[1].results[0].id;

    let InstructionKind::Apply { args, .. } = &applies[1].kind else {
        unreachable!()
    };
    assert_eq!(args, &vec![scalar, array]);
    assert_eq!(&applies[1].results[0], result.value());
    assert_eq!(
        lowerer.test_count(|kind| matches!(kind, InstructionKind::Tuple { .. })),
        0
    );
}

#[test]
fn new_array_calls_the_injection_function() {
    let mut module = TestModule::new();
    let injection = injection_ref(&mut module, DataType::Int);
    let mut lowerer = module.lowerer();

    let new_array = Expression::new(
        ExpressionKind::NewArray {
            element_type: DataType::Int,
            bounds: vec![Expression::int(3, loc(1))],
            injection: Box::new(injection),
        },
        DataType::Array(Box::new(DataType::Int)),
        loc(1),
    );
    let array = lowerer
        .lower_expression(&new_array)
        .expect("array should lower");
    assert!(array.has_cleanup());

    let instructions = lowerer.test_instructions();
    let count = &instructions[0].results[0];
    let object = &instructions[1].results[0];
    let base = &instructions[1].results[1];
    assert_eq!(
        instructions[2].kind,
        InstructionKind::Convert { value: base.id }
    );
    let raw_base = &instructions[2].results[0];
    assert_eq!(raw_base.ty, DataType::RawPointer);

    let InstructionKind::Apply { args, .. } = &instructions[4].kind else {
        panic!("expected injection call, found {:?}", instructions[4].kind);
    };
    assert_eq!(args, &vec![raw_base.id, object.id, count.id]);
    assert_eq!(
        lowerer.test_count(|kind| matches!(kind, InstructionKind::ZeroInitialize { .. })),
        0
    );
}

#[test]
fn new_array_can_be_zero_initialized() {
    let mut module = TestModule::new();
    module.config.zero_initialize_new_arrays = true;
    let injection = injection_ref(&mut module, DataType::Int);
    let mut lowerer = module.lowerer();

    let new_array = Expression::new(
        ExpressionKind::NewArray {
            element_type: DataType::Int,
            bounds: vec![Expression::int(8, loc(1))],
            injection: Box::new(injection),
        },
        DataType::Array(Box::new(DataType::Int)),
        loc(1),
    );
    let _array = lowerer
        .lower_expression(&new_array)
        .expect("array should lower");

    assert_eq!(
        lowerer.test_count(|kind| matches!(kind, InstructionKind::ZeroInitialize { .. })),
        1
    );
}

#[test]
fn frontend_residue_kinds_are_unimplemented() {
    let mut module = TestModule::new();
    let member = module.string_table.intern("member");
    let mut lowerer = module.lowerer();

    let residue = [
        Expression::new(
            ExpressionKind::Sequence(vec![Expression::int(1, loc(1))]),
            DataType::Int,
            loc(1),
        ),
        Expression::new(
            ExpressionKind::UnresolvedDot {
                base: Box::new(Expression::int(1, loc(2))),
                name: member,
            },
            DataType::Int,
            loc(2),
        ),
        Expression::new(
            ExpressionKind::Assign {
                dest: Box::new(Expression::int(1, loc(3))),
                source: Box::new(Expression::int(2, loc(3))),
            },
            DataType::unit(),
            loc(3),
        ),
    ];

    for expr in &residue {
        let error = lowerer
            .lower_expression(expr)
            .expect_err("residue kinds have no lowering");
        assert_eq!(error.error_type, ErrorType::Unimplemented);
        assert_eq!(error.location, expr.location);
        assert_eq!(
            error.metadata.get(&ErrorMetaDataKey::ExpressionKind),
            Some(&String::from(expr.kind.kind_name()))
        );
    }
}

#[test]
fn erasure_wraps_the_existential() {
    let mut module = TestModule::new();
    let protocol = module.string_table.intern("Printable");
    let name = module.declare("name", DataType::String, DeclContext::Local, DeclKind::Let);
    let mut lowerer = module.lowerer();
    let name_value = lowerer.test_argument(DataType::String);
    lowerer.bind_local_constant(name, name_value);

    let erasure = Expression::new(
        ExpressionKind::Erasure(Box::new(Expression::decl_ref(
            name,
            DataType::String,
            loc(1),
        ))),
        DataType::Existential(protocol),
        loc(1),
    );
    let value = lowerer
        .lower_expression(&erasure)
        .expect("erasure should lower");

    // The retained string moves into the existential
    assert!(value.has_cleanup());
    assert_eq!(value.value().ty, DataType::Existential(protocol));
    assert_eq!(lowerer.test_count(is_retain), 1);
    assert_eq!(lowerer.test_count(is_release), 0);
    assert_eq!(lowerer.cleanups().stats().forwarded, 1);
}
