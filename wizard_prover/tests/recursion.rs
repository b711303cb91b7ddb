//! Verifying a proof inside an arithmetic circuit.

use wizard::column::ColumnId;
use wizard::{
    compile, compiler, prove, verify, verify_proof_in_circuit, Accessor, Builder, CompiledIOP,
    Fr, Proof, ProverError, ProverRuntime, SmartVector,
};
use wizard_shared_types::circuit::CircuitBuilder;
use wizard_shared_types::config::EngineConfig;
use wizard_shared_types::mimc;

fn regular(values: &[u64]) -> SmartVector<Fr> {
    SmartVector::Regular(values.iter().map(|v| Fr::from(*v)).collect())
}

/// Opening, coin-point evaluation and row-wise hash compression; every
/// check here has a circuit mirror.
fn protocol() -> (CompiledIOP<Fr>, Proof<Fr>) {
    let comp = compile::<Fr>(
        EngineConfig::default(),
        |api: &mut Builder<Fr>| {
            let coeffs = api.commit("coeffs", 0, 4);
            let blocks = api.commit("blocks", 0, 4);
            let old_states = api.commit("old states", 0, 4);
            let new_states = api.commit("new states", 0, 4);

            api.local_opening("second coefficient", coeffs.clone(), 1);
            let x = api.coin_field("evaluation point", 1);
            api.univariate_eval("coeffs at x", vec![coeffs], Accessor::Coin(x));
            api.mimc_compression("state transitions", blocks, old_states, new_states);
        },
        &[&compiler::dummy::compile],
    );

    let columns: Vec<_> = (0..4)
        .map(|i| comp.column_info(ColumnId(i)).as_column::<Fr>())
        .collect();
    let blocks = [2u64, 3, 5, 7].map(Fr::from);
    let old_states = [11u64, 13, 17, 19].map(Fr::from);
    let new_states: Vec<Fr> = blocks
        .iter()
        .zip(old_states.iter())
        .map(|(block, state)| mimc::compress(*state, *block))
        .collect();

    let proof = prove(
        &comp,
        move |rt: &mut ProverRuntime<Fr>| -> Result<(), ProverError> {
            rt.assign_column(&columns[0], regular(&[1, 2, 3, 4]));
            rt.assign_column(&columns[1], SmartVector::Regular(blocks.to_vec()));
            rt.assign_column(&columns[2], SmartVector::Regular(old_states.to_vec()));
            rt.assign_column(&columns[3], SmartVector::Regular(new_states.clone()));
            Ok(())
        },
    )
    .unwrap();
    (comp, proof)
}

#[test]
fn honest_proof_verifies_in_circuit() {
    let (comp, proof) = protocol();
    verify(&comp, &proof).unwrap();

    let mut builder = CircuitBuilder::<Fr>::new();
    verify_proof_in_circuit(&comp, &proof, &mut builder);
    // The transcript replay and the compression query both feed the
    // deferred hash batch.
    assert!(builder.num_deferred_compressions() > 4);
    builder.finalize().unwrap();
}

#[test]
fn tampered_opening_fails_in_circuit() {
    let (comp, proof) = protocol();

    let mut tampered = proof.clone();
    match tampered.columns.get_mut(&ColumnId(0)).unwrap() {
        SmartVector::Regular(values) => values[1] += Fr::from(1),
        other => panic!("expected a dense assignment, got {other:?}"),
    }

    let mut builder = CircuitBuilder::<Fr>::new();
    verify_proof_in_circuit(&comp, &tampered, &mut builder);
    assert!(builder.finalize().is_err());
}

#[test]
fn tampered_hash_column_fails_in_circuit() {
    let (comp, proof) = protocol();

    let mut tampered = proof.clone();
    match tampered.columns.get_mut(&ColumnId(3)).unwrap() {
        SmartVector::Regular(values) => values[0] = Fr::from(999),
        other => panic!("expected a dense assignment, got {other:?}"),
    }

    let mut builder = CircuitBuilder::<Fr>::new();
    verify_proof_in_circuit(&comp, &tampered, &mut builder);
    assert!(builder.finalize().is_err());
}
