mod common;

use std::collections::BTreeMap;
use std::sync::Arc;

use common::*;
use ffront_ast::{ScalarKind, SymbolType, TypeConstraint};
use ffront_core::type_info::{broadcast_types, TypeInfo};
use ffront_core::{
    Argument, CallError, CapturedVars, FieldArgument, FrontendError, OffsetProvider, Program,
    ScalarValue,
};
use proptest::{
    prelude::{prop_assert, prop_assert_eq},
    test_runner::{Config, TestCaseError, TestRunner},
};

const AXES: &[&str] = &["I", "J", "K", "Edge", "Vertex"];
const KINDS: &[ScalarKind] = &[
    ScalarKind::Bool,
    ScalarKind::Int32,
    ScalarKind::Int64,
    ScalarKind::Float32,
    ScalarKind::Float64,
];

fn runner() -> TestRunner {
    TestRunner::new(Config {
        cases: 256,
        ..Config::default()
    })
}

/// Rank 0 is a scalar; otherwise a field over the first `rank` axes.
fn sample_type(kind: usize, rank: usize) -> SymbolType {
    if rank == 0 {
        SymbolType::scalar(KINDS[kind])
    } else {
        field(&AXES[..rank], KINDS[kind])
    }
}

fn pick(left: &SymbolType, right: &SymbolType) -> Option<SymbolType> {
    broadcast_types(TypeInfo::of(left), TypeInfo::of(right)).and_then(|t| t.ty().cloned())
}

#[test]
fn broadcast_prefers_field_then_longer_dims_then_left() {
    let strat = (1usize..=AXES.len(), 0u8..=255, 0u8..=255, 0..KINDS.len());
    runner()
        .run(&strat, |(big_len, start, len, kind)| {
            let kind = KINDS[kind];
            let big = &AXES[..big_len];
            let start = start as usize % big_len;
            let len = 1 + len as usize % (big_len - start);
            let small = &big[start..start + len];

            let big_ty = field(big, kind);
            let small_ty = field(small, kind);
            let scalar = SymbolType::scalar(kind);

            prop_assert_eq!(pick(&scalar, &small_ty), Some(small_ty.clone()));
            prop_assert_eq!(pick(&small_ty, &scalar), Some(small_ty.clone()));
            if small.len() < big.len() {
                prop_assert_eq!(pick(&small_ty, &big_ty), Some(big_ty.clone()));
                prop_assert_eq!(pick(&big_ty, &small_ty), Some(big_ty.clone()));
            } else {
                prop_assert_eq!(pick(&small_ty, &big_ty), Some(small_ty.clone()));
            }
            Ok(())
        })
        .unwrap();
}

#[test]
fn refinement_only_specializes() {
    let strat = (0..KINDS.len(), 0usize..=3, 0..KINDS.len(), 0usize..=3);
    runner()
        .run(&strat, |(ka, ra, kb, rb)| {
            let a = sample_type(ka, ra);
            let b = sample_type(kb, rb);

            prop_assert_eq!(
                TypeInfo::of(&a).can_be_refined_to(TypeInfo::of(&b)),
                a == b
            );

            let deferred = SymbolType::deferred(TypeConstraint::of(&a));
            prop_assert!(TypeInfo::of(&deferred).can_be_refined_to(TypeInfo::of(&a)));
            if TypeConstraint::of(&a) != TypeConstraint::of(&b) {
                prop_assert!(!TypeInfo::of(&deferred).can_be_refined_to(TypeInfo::of(&b)));
            }

            let any_type = SymbolType::deferred(None);
            prop_assert!(TypeInfo::of(&any_type).can_be_refined_to(TypeInfo::of(&b)));
            Ok(())
        })
        .unwrap();
}

#[test]
fn wrong_argument_count_always_fails_before_lowering() {
    let h = harness(StubParser::default());
    let prog = Program::from_past(
        Arc::clone(&h.toolchain),
        program_calling("run", "copy", None),
        CapturedVars::default(),
        Default::default(),
        None,
    );

    runner()
        .run(&(0usize..8), |k| {
            if k == 2 {
                return Ok(());
            }
            let args = (0..k)
                .map(|i| {
                    if i % 2 == 0 {
                        Argument::Field(FieldArgument::new(ScalarKind::Float64, vec![1]))
                    } else {
                        Argument::Scalar(ScalarValue::Int32(i as i32))
                    }
                })
                .collect();
            let err = prog
                .call(args, BTreeMap::new(), &OffsetProvider::new())
                .err()
                .ok_or_else(|| TestCaseError::fail("call with a wrong argument count succeeded"))?;
            prop_assert!(matches!(
                err,
                FrontendError::Call(CallError::ArityMismatch { expected: 2, given, .. }) if given == k
            ), "expected ArityMismatch {{ expected: 2, given: {} }}, got {:?}", k, err);
            Ok(())
        })
        .unwrap();

    assert_eq!(h.lowering.program_count(), 0);
    assert!(h.executions.runs().is_empty());
}
