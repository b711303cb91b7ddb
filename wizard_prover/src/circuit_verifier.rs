//! The circuit-mirrored verifier.
//!
//! Embeds "verify this proof" as a sub-circuit: proof data becomes input
//! wires, the transcript replays through [CircuitFiatShamir] with every
//! compression routed to the deferred batch, and each query check turns
//! into collected circuit assertions. The native verifier and this mirror
//! walk the same [crate::runtime::round_schedule], so the sampled coin
//! wires carry exactly the native coin values.

use std::collections::BTreeMap;

use tracing::debug;
use wizard_shared_types::circuit::{CircuitBuilder, Wire};
use wizard_shared_types::transcript::CircuitFiatShamir;
use wizard_shared_types::FieldExt;

use crate::coin::{CoinId, CoinWires};
use crate::column::{ColumnId, Visibility};
use crate::compiled::CompiledIOP;
use crate::query::{QueryId, ResultArity};
use crate::runtime::{round_schedule, Proof};

/// Wire-level counterpart of the verifier's state maps.
pub struct CircuitRuntime<'a, F: FieldExt> {
    comp: &'a CompiledIOP<F>,
    columns: BTreeMap<ColumnId, Vec<Wire>>,
    coins: BTreeMap<CoinId, CoinWires>,
    query_results: BTreeMap<QueryId, Vec<Wire>>,
}

impl<'a, F: FieldExt> CircuitRuntime<'a, F> {
    pub fn compiled(&self) -> &'a CompiledIOP<F> {
        self.comp
    }

    pub fn column_wires(&self, id: ColumnId) -> &[Wire] {
        self.columns
            .get(&id)
            .unwrap_or_else(|| panic!("{id} has no wires in the verifier circuit"))
    }

    pub fn coin_wires(&self, id: CoinId) -> &CoinWires {
        self.coins
            .get(&id)
            .unwrap_or_else(|| panic!("{id} read before its round replayed in-circuit"))
    }

    pub fn result_wires(&self, id: QueryId) -> &[Wire] {
        self.query_results
            .get(&id)
            .unwrap_or_else(|| panic!("{id} has no result wires in the verifier circuit"))
    }
}

/// An inner-proof verifier embedded in a larger circuit. Allocate, assign
/// from a proof, then verify; the surrounding circuit settles everything
/// at finalization.
pub struct WizardVerifierCircuit<'a, F: FieldExt> {
    runtime: CircuitRuntime<'a, F>,
}

impl<'a, F: FieldExt> WizardVerifierCircuit<'a, F> {
    /// Allocates input wires for every exported column and every
    /// result-bearing query; verifying-key columns become constants.
    pub fn allocate(comp: &'a CompiledIOP<F>, builder: &mut CircuitBuilder<F>) -> Self {
        comp.assert_compiled();

        let mut columns = BTreeMap::new();
        for (id, info) in comp.columns.iter() {
            let id = ColumnId(id);
            match info.visibility {
                Visibility::ProofMsg => {
                    let wires = (0..info.natural.size)
                        .map(|_| builder.alloc_input())
                        .collect();
                    columns.insert(id, wires);
                }
                Visibility::VerifyingKey => {
                    let values = comp
                        .precomputed
                        .get(&id)
                        .unwrap_or_else(|| panic!("{id} has no precomputed assignment"));
                    let wires = values
                        .to_vec()
                        .into_iter()
                        .map(|value| builder.constant(value))
                        .collect();
                    columns.insert(id, wires);
                }
                Visibility::Ignored => {}
                Visibility::Committed | Visibility::Precomputed => {
                    unreachable!("assert_compiled rules these out")
                }
            }
        }

        let mut query_results = BTreeMap::new();
        for (id, record) in comp.queries.iter() {
            let arity = record.query.result_arity();
            let num_wires = match arity {
                ResultArity::None => continue,
                ResultArity::Scalar => 1,
                ResultArity::Vector(len) => len,
            };
            let wires = (0..num_wires).map(|_| builder.alloc_input()).collect();
            query_results.insert(QueryId(id), wires);
        }

        Self {
            runtime: CircuitRuntime {
                comp,
                columns,
                coins: BTreeMap::new(),
                query_results,
            },
        }
    }

    /// Assigns the allocated input wires from a proof. Panics on missing
    /// or misshapen proof entries; run the native pre-validation first if
    /// the proof is untrusted.
    pub fn assign(&self, builder: &mut CircuitBuilder<F>, proof: &Proof<F>) {
        for (id, wires) in &self.runtime.columns {
            if !self.runtime.comp.column_info(*id).visibility.is_exported() {
                continue;
            }
            let values = proof
                .columns
                .get(id)
                .unwrap_or_else(|| panic!("proof is missing the assignment of {id}"));
            assert_eq!(values.len(), wires.len(), "{id} assignment length mismatch");
            for (index, wire) in wires.iter().enumerate() {
                builder.assign_input(*wire, values.get(index));
            }
        }
        for (id, wires) in &self.runtime.query_results {
            let result = proof
                .query_results
                .get(id)
                .unwrap_or_else(|| panic!("proof is missing the result of {id}"));
            let elements = result.to_elements();
            assert_eq!(elements.len(), wires.len(), "{id} result shape mismatch");
            for (wire, value) in wires.iter().zip(elements) {
                builder.assign_input(*wire, value);
            }
        }
    }

    /// Replays the round schedule in-circuit, then mirrors every query
    /// check and verifier action.
    pub fn verify(&mut self, builder: &mut CircuitBuilder<F>) {
        let comp = self.runtime.comp;
        let mut fs = CircuitFiatShamir::new(builder);

        for round in 0..comp.num_rounds() {
            if round == 0 {
                let hash = builder.constant(comp.protocol_hash());
                fs.update(builder, &[hash]);
            }
            let schedule = round_schedule(comp, round);
            for id in &schedule.absorb_columns {
                let wires = self.runtime.column_wires(*id).to_vec();
                fs.update(builder, &wires);
            }
            for id in &schedule.absorb_queries {
                let wires = self
                    .runtime
                    .query_results
                    .get(id)
                    .cloned()
                    .unwrap_or_default();
                fs.update(builder, &wires);
            }
            for id in &schedule.sample_coins {
                let wires = comp.coin(*id).sample_circuit(builder, &mut fs);
                self.runtime.coins.insert(*id, wires);
            }
        }

        for (_, record) in comp.queries.iter() {
            if record.marked_compiled {
                continue;
            }
            record.query.check_circuit(builder, &self.runtime);
        }
        for (_, action) in comp.verifier_actions.iter() {
            action.run_circuit(builder, &self.runtime);
        }
        debug!(
            wires = builder.num_wires(),
            deferred = builder.num_deferred_compressions(),
            "verifier circuit built"
        );
    }

    /// The sampled coin wires, available after [Self::verify].
    pub fn coin_wires(&self, id: CoinId) -> &CoinWires {
        self.runtime.coin_wires(id)
    }
}

/// Convenience wrapper: allocate, assign and verify in one call. The
/// caller finalizes the builder.
pub fn verify_proof_in_circuit<F: FieldExt>(
    comp: &CompiledIOP<F>,
    proof: &Proof<F>,
    builder: &mut CircuitBuilder<F>,
) {
    let mut circuit = WizardVerifierCircuit::allocate(comp, builder);
    circuit.assign(builder, proof);
    circuit.verify(builder);
}
