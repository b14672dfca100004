mod common;

use std::collections::BTreeMap;
use std::sync::Arc;

use common::*;
use ffront_ast::{past, Dimension, Dims, FunctionType, ScalarKind, Symbol, SymbolType};
use ffront_core::{
    Argument, CallError, CapturedValue, CapturedVars, FieldArgument, FrontendConfig,
    FrontendError, OffsetProvider, OffsetTarget, Program, ScalarValue,
};

fn copy_program(h: &Harness, backend: Option<String>) -> Program {
    let copy = typed_operator(h, identity_operator("copy"), CapturedVars::default());
    let captured = CapturedVars::default().with_global("copy", CapturedValue::callable(copy));
    let ty = SymbolType::Function(FunctionType::new(
        vec![field(&["I"], ScalarKind::Float64)],
        field(&["I"], ScalarKind::Float64),
    ));
    Program::from_past(
        Arc::clone(&h.toolchain),
        program_calling("run", "copy", Some(ty)),
        captured,
        Default::default(),
        backend,
    )
}

fn f64_field(shape: &[usize]) -> Argument {
    Argument::Field(FieldArgument::new(ScalarKind::Float64, shape.to_vec()))
}

#[test]
fn arity_is_checked_before_lowering() {
    let h = harness(StubParser::default());
    let prog = copy_program(&h, None);

    let err = prog
        .call(
            vec![f64_field(&[4]), f64_field(&[4]), f64_field(&[4])],
            BTreeMap::new(),
            &OffsetProvider::new(),
        )
        .unwrap_err();

    assert!(matches!(
        err,
        FrontendError::Call(CallError::ArityMismatch { expected: 2, given: 3, .. })
    ));
    assert_eq!(err.to_string(), "function `run` takes 2 arguments, but 3 were given");
    assert_eq!(h.lowering.program_count(), 0);
    assert_eq!(h.lowering.operator_count(), 0);
    assert!(h.executions.runs().is_empty());
}

#[test]
fn keyword_arguments_are_rejected() {
    let h = harness(StubParser::default());
    let prog = copy_program(&h, None);
    let mut kwargs = BTreeMap::new();
    kwargs.insert("scale".to_string(), Argument::Scalar(ScalarValue::Float64(2.0)));

    let err = prog
        .call(vec![f64_field(&[4]), f64_field(&[4])], kwargs, &OffsetProvider::new())
        .unwrap_err();
    assert!(matches!(
        err,
        FrontendError::Call(CallError::UnsupportedKeywordArguments { ref names }) if names == &["scale"]
    ));
    assert!(h.executions.runs().is_empty());
}

#[test]
fn default_backend_is_used_with_a_warning() {
    let h = harness(StubParser::default());
    let prog = copy_program(&h, None);
    let mut offsets = OffsetProvider::new();
    offsets.insert("Ioff".into(), OffsetTarget::Axis(Dimension::new("I")));

    let report = prog
        .call(vec![f64_field(&[4]), f64_field(&[4])], BTreeMap::new(), &offsets)
        .unwrap();

    assert_eq!(report.backend, "roundtrip");
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].message.contains("`run`"));
    assert!(report.warnings[0].message.contains("default (roundtrip) backend"));

    let runs = h.executions.runs();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].backend, "roundtrip");
    assert_eq!(runs[0].offsets, vec!["Ioff"]);
    assert_eq!(runs[0].size_args, vec![Some(4), Some(4)]);
    assert_eq!(runs[0].fencil.function_definitions[0].id, "copy");
}

#[test]
fn configured_default_backend_can_be_silent() {
    let config = FrontendConfig::from_toml_str(
        "default_backend = \"gtfn\"\nwarn_on_default_backend = false\n",
    )
    .unwrap();
    let h = harness_with_config(StubParser::default(), config);
    let prog = copy_program(&h, None);

    let report = prog
        .call(vec![f64_field(&[3]), f64_field(&[3])], BTreeMap::new(), &OffsetProvider::new())
        .unwrap();
    assert_eq!(report.backend, "gtfn");
    assert!(report.warnings.is_empty());
}

#[test]
fn explicit_backend_does_not_warn() {
    let h = harness(StubParser::default());
    let prog = copy_program(&h, Some("gtfn".into()));

    let report = prog
        .call(vec![f64_field(&[3]), f64_field(&[3])], BTreeMap::new(), &OffsetProvider::new())
        .unwrap();
    assert_eq!(report.backend, "gtfn");
    assert!(report.warnings.is_empty());
    assert_eq!(h.executions.runs()[0].backend, "gtfn");
}

#[test]
fn repeated_calls_lower_once() {
    let h = harness(StubParser::default());
    let prog = copy_program(&h, Some("gtfn".into()));
    for _ in 0..3 {
        prog.call(vec![f64_field(&[2]), f64_field(&[2])], BTreeMap::new(), &OffsetProvider::new())
            .unwrap();
    }
    assert_eq!(h.lowering.program_count(), 1);
    assert_eq!(h.executions.runs().len(), 3);
}

fn scaled_program(h: &Harness) -> Program {
    let mut node = program_calling("scaled", "copy", None);
    node.params = vec![
        Symbol::local("alpha", SymbolType::scalar(ScalarKind::Float32), loc(1)),
        Symbol::local("inp", SymbolType::field(Dims::Any, ScalarKind::Float32), loc(1)),
        Symbol::local("out", field(&["I", "K"], ScalarKind::Float32), loc(1)),
    ];
    node.body = vec![past::Expr::call(
        past::Expr::name("copy", loc(2)),
        vec![past::Expr::name("inp", loc(2))],
        vec![("out".into(), past::Expr::name("out", loc(2)))],
        loc(2),
    )];
    let copy = typed_operator(h, identity_operator("copy"), CapturedVars::default());
    node.captured_vars = vec![Symbol::new(
        "copy",
        Some(SymbolType::deferred(Some(ffront_ast::TypeConstraint::Function))),
        ffront_ast::Namespace::Closure,
        loc(1),
    )];
    let captured = CapturedVars::default().with_global("copy", CapturedValue::callable(copy));
    Program::from_past(Arc::clone(&h.toolchain), node, captured, Default::default(), Some("gtfn".into()))
}

#[test]
fn scalars_are_lifted_and_field_extents_become_size_args() {
    let h = harness(StubParser::default());
    let prog = scaled_program(&h);

    prog.call(
        vec![
            Argument::Scalar(ScalarValue::Float32(0.5)),
            Argument::Field(FieldArgument::new(ScalarKind::Float32, vec![5, 6, 7])),
            Argument::Field(FieldArgument::new(ScalarKind::Float32, vec![8, 9, 10])),
        ],
        BTreeMap::new(),
        &OffsetProvider::new(),
    )
    .unwrap();

    let runs = h.executions.runs();
    let run = &runs[0];
    assert_eq!(
        run.args[0],
        Argument::ConstantField {
            value: ScalarValue::Float32(0.5),
            dtype: ScalarKind::Float32,
        }
    );
    assert!(matches!(run.args[1], Argument::Field(_)));
    // `inp` has unconstrained dimensions and contributes every extent;
    // `out` declares two.
    assert_eq!(
        run.size_args,
        vec![Some(5), Some(6), Some(7), Some(8), Some(9)]
    );
}

#[test]
fn unallocated_field_contributes_a_single_unknown_size() {
    let h = harness(StubParser::default());
    let prog = scaled_program(&h);

    prog.call(
        vec![
            Argument::Scalar(ScalarValue::Float32(1.0)),
            Argument::Field(FieldArgument::unallocated(ScalarKind::Float32)),
            Argument::Field(FieldArgument::new(ScalarKind::Float32, vec![2, 3])),
        ],
        BTreeMap::new(),
        &OffsetProvider::new(),
    )
    .unwrap();

    assert_eq!(h.executions.runs()[0].size_args, vec![None, Some(2), Some(3)]);
}

#[test]
fn field_with_too_few_extents_is_rejected() {
    let h = harness(StubParser::default());
    let prog = scaled_program(&h);

    let err = prog
        .call(
            vec![
                Argument::Scalar(ScalarValue::Float32(1.0)),
                Argument::Field(FieldArgument::new(ScalarKind::Float32, vec![4])),
                Argument::Field(FieldArgument::new(ScalarKind::Float32, vec![4])),
            ],
            BTreeMap::new(),
            &OffsetProvider::new(),
        )
        .unwrap_err();

    assert!(matches!(
        err,
        FrontendError::Call(CallError::ArgumentShape { expected: 2, given: 1, .. })
    ));
    assert!(err.to_string().starts_with("argument `out` has 1 extents"));
    assert!(h.executions.runs().is_empty());
}

#[test]
fn operator_call_runs_the_wrapping_program() {
    let h = harness(StubParser::default());
    let copy = typed_operator(&h, identity_operator("copy"), CapturedVars::default()).with_backend("gtfn");

    let report = copy
        .call(vec![f64_field(&[6])], f64_field(&[6]), &OffsetProvider::new())
        .unwrap();
    assert_eq!(report.backend, "gtfn");

    let runs = h.executions.runs();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].fencil.id, "__field_operator_copy");
    assert_eq!(runs[0].args.len(), 2);
    assert_eq!(runs[0].size_args, vec![Some(6), Some(6)]);
    assert_eq!(runs[0].fencil.function_definitions[0].id, "copy");
    let closure = &runs[0].fencil.closures[0];
    assert_eq!(closure.output.to_string(), "out");
    assert_eq!(closure.inputs[0].to_string(), "__sym_0");
}
