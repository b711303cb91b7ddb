//! Full prove/verify round trips over small protocols.

use halo2curves::ff::Field;
use wizard::column::{Column, ColumnId, PatchworkColumn, PatchworkPart};
use wizard::query::QueryError;
use wizard::runtime::VerifierFailure;
use wizard::{
    compile, compiler, prove, prove_with_sponge, verify, verify_proof_in_circuit,
    verify_with_sponge, Accessor, Builder, Expression, Proof, ProverError, ProverRuntime,
    SmartVector,
};
use wizard::Fr;
use wizard_shared_types::circuit::CircuitBuilder;
use wizard_shared_types::config::EngineConfig;
use wizard_shared_types::transcript::test_sponges::ConstSponge;

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn no_self_check() -> EngineConfig {
    EngineConfig {
        check_queries_during_proving: false,
        capture_tracebacks: false,
    }
}

fn regular(values: &[u64]) -> SmartVector<Fr> {
    SmartVector::Regular(values.iter().map(|v| Fr::from(*v)).collect())
}

/// Two rounds: a committed column, a coin, and the constraint that every
/// entry of the column equals the coin. Provable only because the rigged
/// sponge makes the coin land on 5.
#[test]
fn column_equals_coin_round_trip() {
    init_logging();
    let comp = compile::<Fr>(
        no_self_check(),
        |api: &mut Builder<Fr>| {
            let col = api.commit("witness", 0, 4);
            let coin = api.coin_field("alpha", 1);
            api.global_constraint(
                "witness - alpha",
                col.expr() - Accessor::Coin(coin).expr(),
            );
        },
        &[&compiler::dummy::compile],
    );

    let col = comp.column_info(ColumnId(0)).as_column::<Fr>();
    let proof = prove_with_sponge(
        &comp,
        move |rt: &mut ProverRuntime<Fr>| -> Result<(), ProverError> {
            rt.assign_column(&col, regular(&[5, 5, 5, 5]));
            Ok(())
        },
        ConstSponge::with_value(5),
    )
    .unwrap();

    verify_with_sponge(&comp, &proof, ConstSponge::with_value(5)).unwrap();
}

#[test]
fn mutated_witness_rejected_with_aggregated_error() {
    let comp = compile::<Fr>(
        no_self_check(),
        |api: &mut Builder<Fr>| {
            let col = api.commit("witness", 0, 4);
            let coin = api.coin_field("alpha", 1);
            api.global_constraint(
                "witness - alpha",
                col.expr() - Accessor::Coin(coin).expr(),
            );
        },
        &[&compiler::dummy::compile],
    );

    let col = comp.column_info(ColumnId(0)).as_column::<Fr>();
    let proof = prove_with_sponge(
        &comp,
        move |rt: &mut ProverRuntime<Fr>| -> Result<(), ProverError> {
            rt.assign_column(&col, regular(&[5, 6, 5, 5]));
            Ok(())
        },
        ConstSponge::with_value(5),
    )
    .unwrap();

    let err = verify_with_sponge(&comp, &proof, ConstSponge::with_value(5)).unwrap_err();
    assert_eq!(err.failures.len(), 1);
    match &err.failures[0] {
        VerifierFailure::Query(QueryError::GlobalConstraintFailed { rows, .. }) => {
            assert_eq!(rows, &vec![1]);
        }
        other => panic!("expected a global constraint failure, got {other}"),
    }
}

#[test]
fn all_failing_queries_reported_together() {
    let comp = compile::<Fr>(
        no_self_check(),
        |api: &mut Builder<Fr>| {
            let col = api.commit("witness", 0, 4);
            api.global_constraint(
                "forces zero",
                col.clone().expr(),
            );
            api.range("small", col, 4);
        },
        &[&compiler::dummy::compile],
    );

    let col = comp.column_info(ColumnId(0)).as_column::<Fr>();
    let proof = prove(&comp, move |rt: &mut ProverRuntime<Fr>| -> Result<(), ProverError> {
        // Nonzero and out of range at once.
        rt.assign_column(&col, regular(&[9, 0, 0, 0]));
        Ok(())
    })
    .unwrap();

    let err = verify(&comp, &proof).unwrap_err();
    assert_eq!(err.failures.len(), 2);
}

#[test]
fn shifted_columns_compose_additively() {
    // shift(2).shift(3) and shift(5) must agree pointwise, which the
    // self-checking prover confirms through a vanishing constraint.
    let comp = compile::<Fr>(
        EngineConfig::default(),
        |api: &mut Builder<Fr>| {
            let col = api.commit("cells", 0, 8);
            api.global_constraint(
                "shift composition",
                col.shift(2).shift(3).expr() - col.shift(5).expr(),
            );
        },
        &[&compiler::dummy::compile],
    );

    let col = comp.column_info(ColumnId(0)).as_column::<Fr>();
    let proof = prove(&comp, move |rt: &mut ProverRuntime<Fr>| -> Result<(), ProverError> {
        rt.assign_column(&col, regular(&[3, 1, 4, 1, 5, 9, 2, 6]));
        Ok(())
    })
    .unwrap();
    verify(&comp, &proof).unwrap();
}

fn permutation_protocol() -> wizard::CompiledIOP<Fr> {
    compile::<Fr>(
        no_self_check(),
        |api: &mut Builder<Fr>| {
            let a1 = api.commit("a1", 0, 4);
            let a2 = api.commit("a2", 0, 4);
            let b1 = api.commit("b1", 0, 4);
            let b2 = api.commit("b2", 0, 4);
            api.permutation("rows of b are rows of a", vec![vec![a1, a2]], vec![vec![b1, b2]]);
        },
        &[&compiler::dummy::compile],
    )
}

fn assign_permutation_witness(
    comp: &wizard::CompiledIOP<Fr>,
    b1: &[u64],
    b2: &[u64],
) -> Proof<Fr> {
    let columns: Vec<_> = (0..4)
        .map(|i| comp.column_info(ColumnId(i)).as_column::<Fr>())
        .collect();
    let b1 = regular(b1);
    let b2 = regular(b2);
    prove(
        comp,
        move |rt: &mut ProverRuntime<Fr>| -> Result<(), ProverError> {
            rt.assign_column(&columns[0], regular(&[1, 2, 3, 4]));
            rt.assign_column(&columns[1], regular(&[5, 6, 7, 8]));
            rt.assign_column(&columns[2], b1.clone());
            rt.assign_column(&columns[3], b2.clone());
            Ok(())
        },
    )
    .unwrap()
}

#[test]
fn permutation_round_trip_and_rejection() {
    let comp = permutation_protocol();

    // Rows of b: (3,7), (1,5), (4,8), (2,6) permute the rows of a.
    let honest = assign_permutation_witness(&comp, &[3, 1, 4, 2], &[7, 5, 8, 6]);
    verify(&comp, &honest).unwrap();

    // Swapping two entries of one column without moving its partner breaks
    // the row pairing.
    let broken = assign_permutation_witness(&comp, &[3, 1, 4, 2], &[5, 7, 8, 6]);
    let err = verify(&comp, &broken).unwrap_err();
    assert!(matches!(
        err.failures[0],
        VerifierFailure::Query(QueryError::PermutationMismatch { .. })
    ));
}

#[test]
fn fixed_permutation_round_trip_and_rejection() {
    let build = |b_values: &'static [u64]| {
        let comp = compile::<Fr>(
            no_self_check(),
            |api: &mut Builder<Fr>| {
                let a = api.commit("a", 0, 4);
                let b = api.commit("b", 0, 4);
                api.fixed_permutation(
                    "b is a swapped pairwise",
                    vec![a],
                    vec![b],
                    vec![vec![1, 0, 3, 2]],
                );
            },
            &[&compiler::dummy::compile],
        );
        let a = comp.column_info(ColumnId(0)).as_column::<Fr>();
        let b = comp.column_info(ColumnId(1)).as_column::<Fr>();
        let proof = prove(
            &comp,
            move |rt: &mut ProverRuntime<Fr>| -> Result<(), ProverError> {
                rt.assign_column(&a, regular(&[10, 20, 30, 40]));
                rt.assign_column(&b, regular(b_values));
                Ok(())
            },
        )
        .unwrap();
        (comp, proof)
    };

    let (comp, honest) = build(&[20, 10, 40, 30]);
    verify(&comp, &honest).unwrap();

    let (comp, broken) = build(&[20, 10, 30, 40]);
    let err = verify(&comp, &broken).unwrap_err();
    assert!(matches!(
        err.failures[0],
        VerifierFailure::Query(QueryError::FixedPermutationMismatch { .. })
    ));
}

#[test]
fn range_check_accepts_and_rejects() {
    let build = |values: &'static [u64]| {
        let comp = compile::<Fr>(
            no_self_check(),
            |api: &mut Builder<Fr>| {
                let col = api.commit("limbs", 0, 4);
                api.range("limbs below 4", col, 4);
            },
            &[&compiler::dummy::compile],
        );
        let col = comp.column_info(ColumnId(0)).as_column::<Fr>();
        let proof = prove(
            &comp,
            move |rt: &mut ProverRuntime<Fr>| -> Result<(), ProverError> {
                rt.assign_column(&col, regular(values));
                Ok(())
            },
        )
        .unwrap();
        (comp, proof)
    };

    let (comp, good) = build(&[0, 1, 2, 3]);
    verify(&comp, &good).unwrap();

    let (comp, bad) = build(&[0, 1, 2, 7]);
    let err = verify(&comp, &bad).unwrap_err();
    match &err.failures[0] {
        VerifierFailure::Query(QueryError::RangeExceeded { row, bound, .. }) => {
            assert_eq!((*row, *bound), (3, 4));
        }
        other => panic!("expected a range failure, got {other}"),
    }
}

/// A coin-driven opening chain: the column is opened at a fixed position,
/// evaluated at a transcript-sampled point, and paired for an inner
/// product, all checked by the verifier from the proof alone.
#[test]
fn opening_evaluation_and_inner_product_chain() {
    let comp = compile::<Fr>(
        EngineConfig::default(),
        |api: &mut Builder<Fr>| {
            let coeffs = api.commit("coeffs", 0, 4);
            let weights = api.commit("weights", 0, 4);
            let opened = api.local_opening("third coefficient", coeffs.clone(), 2);
            api.local_constraint(
                "opened value is 3",
                coeffs.shift(2).expr() - opened.expr(),
            );
            let x = api.coin_field("evaluation point", 1);
            api.univariate_eval(
                "both at x",
                vec![coeffs.clone(), weights.clone()],
                Accessor::Coin(x),
            );
            api.inner_product("<coeffs, weights>", coeffs, weights);
        },
        &[&compiler::dummy::compile],
    );

    let coeffs = comp.column_info(ColumnId(0)).as_column::<Fr>();
    let weights = comp.column_info(ColumnId(1)).as_column::<Fr>();
    let proof = prove(
        &comp,
        move |rt: &mut ProverRuntime<Fr>| -> Result<(), ProverError> {
            rt.assign_column(&coeffs, regular(&[1, 2, 3, 4]));
            rt.assign_column(&weights, regular(&[4, 3, 2, 1]));
            Ok(())
        },
    )
    .unwrap();

    // <[1,2,3,4], [4,3,2,1]> = 20.
    assert_eq!(
        proof.query_results.get(&wizard::QueryId(3)).cloned(),
        Some(wizard::QueryResult::Scalar(Fr::from(20)))
    );
    verify(&comp, &proof).unwrap();
}

#[test]
fn proof_missing_a_column_fails_validation() {
    let comp = compile::<Fr>(
        no_self_check(),
        |api: &mut Builder<Fr>| {
            let col = api.commit("witness", 0, 4);
            api.global_constraint("vanishes", col.expr());
        },
        &[&compiler::dummy::compile],
    );
    let col = comp.column_info(ColumnId(0)).as_column::<Fr>();
    let mut proof = prove(
        &comp,
        move |rt: &mut ProverRuntime<Fr>| -> Result<(), ProverError> {
            rt.assign_column(&col, regular(&[0, 0, 0, 0]));
            Ok(())
        },
    )
    .unwrap();

    proof.columns.remove(&ColumnId(0));
    let err = verify(&comp, &proof).unwrap_err();
    assert!(matches!(
        err.failures[0],
        VerifierFailure::MissingColumn(ColumnId(0))
    ));
}

/// A patchwork column concatenating a committed column, a constant pad and
/// an opened value behaves like one natural column, rotations included,
/// natively and in-circuit.
#[test]
fn patchwork_concatenation_matches_natively_and_in_circuit() {
    let comp = compile::<Fr>(
        EngineConfig::default(),
        |api: &mut Builder<Fr>| {
            let head = api.commit("head", 0, 4);
            let expected = api.commit("expected", 0, 8);
            let opened = api.local_opening("head tail", head.clone(), 3);
            let patchwork = Column::Patchwork(PatchworkColumn::new(
                vec![
                    PatchworkPart::Column(head),
                    PatchworkPart::Column(Column::Constant {
                        value: Fr::from(2),
                        size: 3,
                    }),
                    PatchworkPart::Accessor(opened),
                ],
                8,
            ));
            api.global_constraint(
                "patchwork matches the expected layout",
                patchwork.clone().expr() - expected.expr(),
            );
            // Entry 4 of the patchwork is the first pad cell.
            api.local_constraint(
                "rotation lands on the pad",
                patchwork.shift(4).expr() - Expression::Constant(Fr::from(2)),
            );
        },
        &[&compiler::dummy::compile],
    );

    let head = comp.column_info(ColumnId(0)).as_column::<Fr>();
    let expected = comp.column_info(ColumnId(1)).as_column::<Fr>();
    let proof = prove(
        &comp,
        move |rt: &mut ProverRuntime<Fr>| -> Result<(), ProverError> {
            rt.assign_column(&head, regular(&[1, 2, 3, 4]));
            rt.assign_column(&expected, regular(&[1, 2, 3, 4, 2, 2, 2, 4]));
            Ok(())
        },
    )
    .unwrap();
    verify(&comp, &proof).unwrap();

    let mut builder = CircuitBuilder::<Fr>::new();
    verify_proof_in_circuit(&comp, &proof, &mut builder);
    builder.finalize().unwrap();
}

/// Deferring a result-bearing query drops it from the transcript on both
/// sides but not from checking. The coin-dependent evaluation only verifies
/// if prover and verifier derive the same coin across the skipped
/// absorption.
#[test]
fn deferred_opening_skips_transcript_but_is_still_checked() {
    let comp = compile::<Fr>(
        no_self_check(),
        |api: &mut Builder<Fr>| {
            let coeffs = api.commit("coeffs", 0, 4);
            let opened = api.local_opening("second coefficient", coeffs.clone(), 1);
            let Accessor::LocalOpening { query, .. } = &opened else {
                panic!("expected an opening accessor, got {opened:?}")
            };
            api.defer_to_verifier(*query);
            let x = api.coin_field("evaluation point", 1);
            api.univariate_eval("coeffs at x", vec![coeffs], Accessor::Coin(x));
        },
        &[&compiler::dummy::compile],
    );

    let coeffs = comp.column_info(ColumnId(0)).as_column::<Fr>();
    let proof = prove(
        &comp,
        move |rt: &mut ProverRuntime<Fr>| -> Result<(), ProverError> {
            rt.assign_column(&coeffs, regular(&[1, 2, 3, 4]));
            Ok(())
        },
    )
    .unwrap();
    verify(&comp, &proof).unwrap();

    // Faking the deferred result leaves the transcript untouched, so the
    // evaluation at the coin still passes; only the direct check fails.
    let mut tampered = proof.clone();
    tampered
        .query_results
        .insert(wizard::QueryId(0), wizard::QueryResult::Scalar(Fr::from(9)));
    let err = verify(&comp, &tampered).unwrap_err();
    assert_eq!(err.failures.len(), 1);
    assert!(matches!(
        err.failures[0],
        VerifierFailure::Query(QueryError::LocalOpeningMismatch { .. })
    ));
}

#[test]
fn mutated_local_constraint_row_rejected() {
    let comp = compile::<Fr>(
        no_self_check(),
        |api: &mut Builder<Fr>| {
            let col = api.commit("anchor", 0, 4);
            api.local_constraint(
                "first entry is 1",
                col.expr() - Expression::Constant(Fr::ONE),
            );
        },
        &[&compiler::dummy::compile],
    );

    let col = comp.column_info(ColumnId(0)).as_column::<Fr>();
    let proof = prove(
        &comp,
        move |rt: &mut ProverRuntime<Fr>| -> Result<(), ProverError> {
            rt.assign_column(&col, regular(&[1, 9, 9, 9]));
            Ok(())
        },
    )
    .unwrap();
    verify(&comp, &proof).unwrap();

    let mut tampered = proof.clone();
    match tampered.columns.get_mut(&ColumnId(0)).unwrap() {
        SmartVector::Regular(values) => values[0] = Fr::from(5),
        other => panic!("expected a dense assignment, got {other:?}"),
    }
    let err = verify(&comp, &tampered).unwrap_err();
    assert_eq!(err.failures.len(), 1);
    assert!(matches!(
        err.failures[0],
        VerifierFailure::Query(QueryError::LocalConstraintFailed { .. })
    ));
}

/// A 2048-row product relation over a random witness, wide enough that
/// expression evaluation takes the parallel path.
#[test]
fn large_random_product_relation_round_trip() {
    init_logging();
    let comp = compile::<Fr>(
        no_self_check(),
        |api: &mut Builder<Fr>| {
            let a = api.commit("a", 0, 2048);
            let b = api.commit("b", 0, 2048);
            let c = api.commit("c", 0, 2048);
            api.global_constraint("c = a * b", a.expr() * b.expr() - c.expr());
        },
        &[&compiler::dummy::compile],
    );

    let mut rng = rand::thread_rng();
    let a_values: Vec<Fr> = (0..2048).map(|_| Fr::random(&mut rng)).collect();
    let b_values: Vec<Fr> = (0..2048).map(|_| Fr::random(&mut rng)).collect();
    let c_values: Vec<Fr> = a_values
        .iter()
        .zip(b_values.iter())
        .map(|(x, y)| x * y)
        .collect();

    let columns: Vec<_> = (0..3)
        .map(|i| comp.column_info(ColumnId(i)).as_column::<Fr>())
        .collect();
    let proof = prove(
        &comp,
        move |rt: &mut ProverRuntime<Fr>| -> Result<(), ProverError> {
            rt.assign_column(&columns[0], SmartVector::Regular(a_values.clone()));
            rt.assign_column(&columns[1], SmartVector::Regular(b_values.clone()));
            rt.assign_column(&columns[2], SmartVector::Regular(c_values.clone()));
            Ok(())
        },
    )
    .unwrap();
    verify(&comp, &proof).unwrap();

    // One corrupted product among 2048 rows is still pinpointed.
    let mut tampered = proof.clone();
    match tampered.columns.get_mut(&ColumnId(2)).unwrap() {
        SmartVector::Regular(values) => values[1000] += Fr::ONE,
        other => panic!("expected a dense assignment, got {other:?}"),
    }
    let err = verify(&comp, &tampered).unwrap_err();
    match &err.failures[0] {
        VerifierFailure::Query(QueryError::GlobalConstraintFailed { rows, .. }) => {
            assert_eq!(rows, &vec![1000]);
        }
        other => panic!("expected a global constraint failure, got {other}"),
    }
}

#[test]
fn prover_self_check_catches_bad_witness_early() {
    let comp = compile::<Fr>(
        EngineConfig {
            check_queries_during_proving: true,
            capture_tracebacks: false,
        },
        |api: &mut Builder<Fr>| {
            let col = api.commit("witness", 0, 4);
            api.global_constraint("vanishes", col.expr());
        },
        &[&compiler::dummy::compile],
    );
    let col = comp.column_info(ColumnId(0)).as_column::<Fr>();
    let err = prove(
        &comp,
        move |rt: &mut ProverRuntime<Fr>| -> Result<(), ProverError> {
            rt.assign_column(&col, regular(&[0, 1, 0, 0]));
            Ok(())
        },
    )
    .unwrap_err();
    assert!(matches!(err, ProverError::SelfCheck(_)));
}
