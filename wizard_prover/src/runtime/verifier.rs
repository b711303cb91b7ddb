//! The verifier runtime: replays the round schedule from a proof and
//! aggregates every failing check.

use std::collections::BTreeMap;
use std::sync::Mutex;

use tracing::debug;
use wizard_shared_types::transcript::{BoxSponge, FiatShamir, MimcSponge, TranscriptSponge};
use wizard_shared_types::FieldExt;

use crate::coin::{CoinId, CoinValue};
use crate::column::{ColumnId, Visibility};
use crate::compiled::CompiledIOP;
use crate::query::{QueryId, QueryResult, ResultArity};
use crate::smartvec::SmartVector;

use super::{round_schedule, Proof, RuntimeAccess, VerifierError, VerifierFailure};

pub struct VerifierRuntime<'a, F: FieldExt> {
    comp: &'a CompiledIOP<F>,
    proof: &'a Proof<F>,
    coins: Mutex<BTreeMap<CoinId, CoinValue<F>>>,
}

impl<'a, F: FieldExt> VerifierRuntime<'a, F> {
    fn new(comp: &'a CompiledIOP<F>, proof: &'a Proof<F>) -> Self {
        Self {
            comp,
            proof,
            coins: Mutex::new(BTreeMap::new()),
        }
    }

    /// Identical transcript work to the prover's, with the proof standing
    /// in for live assignment.
    fn run_fs_for_round(&self, fs: &mut FiatShamir<F, BoxSponge<F>>, round: usize) {
        if round == 0 {
            fs.update(&[self.comp.protocol_hash()]);
        }
        let schedule = round_schedule(self.comp, round);
        for id in &schedule.absorb_columns {
            fs.update(&self.column_assignment(*id).to_vec());
        }
        for id in &schedule.absorb_queries {
            fs.update(&self.query_result(*id).to_elements());
        }
        for id in &schedule.sample_coins {
            let value = self.comp.coin(*id).sample(fs);
            let mut coins = self.coins.lock().expect("verifier coin lock");
            coins.insert(*id, value);
        }
    }
}

impl<F: FieldExt> RuntimeAccess<F> for VerifierRuntime<'_, F> {
    fn compiled(&self) -> &CompiledIOP<F> {
        self.comp
    }

    fn column_assignment(&self, id: ColumnId) -> SmartVector<F> {
        let info = self.comp.column_info(id);
        match info.visibility {
            Visibility::Precomputed | Visibility::VerifyingKey => self
                .comp
                .precomputed
                .get(&id)
                .cloned()
                .unwrap_or_else(|| panic!("{id} has no precomputed assignment")),
            Visibility::ProofMsg => self
                .proof
                .columns
                .get(&id)
                .cloned()
                .unwrap_or_else(|| panic!("{id} missing from a pre-validated proof")),
            Visibility::Ignored | Visibility::Committed => {
                panic!("{id} is not available to the verifier")
            }
        }
    }

    fn coin_value(&self, id: CoinId) -> CoinValue<F> {
        let coins = self.coins.lock().expect("verifier coin lock");
        coins
            .get(&id)
            .cloned()
            .unwrap_or_else(|| panic!("{id} read before its round replayed"))
    }

    fn query_result(&self, id: QueryId) -> QueryResult<F> {
        match self.proof.query_results.get(&id) {
            Some(result) => result.clone(),
            None => QueryResult::None,
        }
    }
}

/// Structural pre-validation: every exported column and result-bearing
/// query must be present in the proof with the declared shape. Runs before
/// any transcript work so the replay never panics on missing data.
fn validate_proof<F: FieldExt>(comp: &CompiledIOP<F>, proof: &Proof<F>) -> Vec<VerifierFailure> {
    let mut failures = Vec::new();
    for (id, info) in comp.columns.iter() {
        if !info.visibility.is_exported() {
            continue;
        }
        let id = ColumnId(id);
        match proof.columns.get(&id) {
            None => failures.push(VerifierFailure::MissingColumn(id)),
            Some(values) if values.len() != info.natural.size => {
                failures.push(VerifierFailure::ColumnSizeMismatch {
                    id,
                    got: values.len(),
                    want: info.natural.size,
                })
            }
            Some(_) => {}
        }
    }
    for (id, record) in comp.queries.iter() {
        let arity = record.query.result_arity();
        if arity == ResultArity::None {
            continue;
        }
        let id = QueryId(id);
        match proof.query_results.get(&id) {
            None => failures.push(VerifierFailure::MissingQueryResult(id)),
            Some(result) => {
                let shape_ok = match (arity, result) {
                    (ResultArity::Scalar, QueryResult::Scalar(_)) => true,
                    (ResultArity::Vector(len), QueryResult::Vector(values)) => {
                        values.len() == len
                    }
                    _ => false,
                };
                if !shape_ok {
                    failures.push(VerifierFailure::ResultShapeMismatch { id });
                }
            }
        }
    }
    failures
}

/// Verifies with the default MiMC-sponge transcript.
pub fn verify<F: FieldExt>(comp: &CompiledIOP<F>, proof: &Proof<F>) -> Result<(), VerifierError> {
    verify_with_sponge(comp, proof, MimcSponge::new())
}

/// Replays the schedule, checks every non-compiled query and runs every
/// verifier action, returning all failures in one aggregated error.
pub fn verify_with_sponge<F: FieldExt, S: TranscriptSponge<F> + 'static>(
    comp: &CompiledIOP<F>,
    proof: &Proof<F>,
    sponge: S,
) -> Result<(), VerifierError> {
    comp.assert_compiled();

    let failures = validate_proof(comp, proof);
    if !failures.is_empty() {
        return Err(VerifierError { failures });
    }

    let runtime = VerifierRuntime::new(comp, proof);
    let mut fs = FiatShamir::with_sponge(BoxSponge::from_sponge(sponge));
    for round in 0..comp.num_rounds() {
        runtime.run_fs_for_round(&mut fs, round);
    }

    let mut failures = Vec::new();
    for (id, record) in comp.queries.iter() {
        if record.marked_compiled {
            continue;
        }
        if let Err(failure) = record.query.check(&runtime) {
            debug!(query = id, %failure, "query check failed");
            failures.push(failure.into());
        }
    }
    for (_, action) in comp.verifier_actions.iter() {
        if let Err(failure) = action.run(&runtime) {
            failures.push(failure);
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(VerifierError { failures })
    }
}
