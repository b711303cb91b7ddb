//! The round-based prover and verifier runtimes.
//!
//! Both runtimes replay the same state machine: at round 0 the protocol
//! hash is absorbed; at round `n > 0` the public columns of round `n - 1`
//! are absorbed in id order, then the non-deferred query results of round
//! `n - 1`, then the coins of round `n` are sampled. Prover and verifier
//! must reconstruct identical coin sequences or soundness breaks, so the
//! schedule lives in one place and is shared by the native runtimes and
//! the circuit mirror.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use wizard_shared_types::circuit::CircuitBuilder;
use wizard_shared_types::FieldExt;

use crate::circuit_verifier::CircuitRuntime;
use crate::coin::{CoinId, CoinValue};
use crate::column::ColumnId;
use crate::compiled::CompiledIOP;
use crate::query::{QueryError, QueryId, QueryResult};
use crate::smartvec::SmartVector;

pub mod handoff;
pub mod prover;
pub mod verifier;

pub use handoff::{challenge_handoff, ChallengeReceiver, ChallengeSupplier, HandoffError};
pub use prover::{prove, prove_with_sponge, ProverRuntime};
pub use verifier::{verify, verify_with_sponge, VerifierRuntime};

/// Read access to a runtime's state, shared by native evaluation of
/// columns, expressions and queries on either side of the protocol.
pub trait RuntimeAccess<F: FieldExt> {
    fn compiled(&self) -> &CompiledIOP<F>;

    /// The assignment of a registered column. Panics if it is not
    /// available to this runtime (programmer or schedule error).
    fn column_assignment(&self, id: ColumnId) -> SmartVector<F>;

    /// The value of an already-sampled coin. Panics if the coin's round
    /// has not run yet.
    fn coin_value(&self, id: CoinId) -> CoinValue<F>;

    /// The result of a query, computed lazily on the prover side and read
    /// from the proof on the verifier side.
    fn query_result(&self, id: QueryId) -> QueryResult<F>;
}

/// Work the prover executes during a round, typically assigning columns.
pub trait ProverAction<F: FieldExt>: Send + Sync {
    fn run(&self, runtime: &mut ProverRuntime<'_, F>) -> Result<(), ProverError>;
}

impl<F: FieldExt, T> ProverAction<F> for T
where
    T: for<'a, 'b> Fn(&'b mut ProverRuntime<'a, F>) -> Result<(), ProverError> + Send + Sync,
{
    fn run(&self, runtime: &mut ProverRuntime<'_, F>) -> Result<(), ProverError> {
        self(runtime)
    }
}

/// A custom check the verifier executes after the rounds have replayed.
pub trait VerifierAction<F: FieldExt>: Send + Sync {
    fn run(&self, runtime: &VerifierRuntime<'_, F>) -> Result<(), VerifierFailure>;

    /// Circuit mirror of the check. Actions without one must be compiled
    /// away before circuit verification.
    fn run_circuit(&self, _builder: &mut CircuitBuilder<F>, _runtime: &CircuitRuntime<'_, F>) {
        panic!("verifier action has no circuit mirror; compile it away first")
    }
}

impl<F: FieldExt, T> VerifierAction<F> for T
where
    T: for<'a, 'b> Fn(&'b VerifierRuntime<'a, F>) -> Result<(), VerifierFailure> + Send + Sync,
{
    fn run(&self, runtime: &VerifierRuntime<'_, F>) -> Result<(), VerifierFailure> {
        self(runtime)
    }
}

/// What the prover hands to the verifier: exported column assignments and
/// query results, keyed by dense identifiers.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(bound = "F: FieldExt")]
pub struct Proof<F: FieldExt> {
    pub columns: BTreeMap<ColumnId, SmartVector<F>>,
    pub query_results: BTreeMap<QueryId, QueryResult<F>>,
}

/// A failure in the prover's own pipeline.
#[derive(Error, Debug)]
pub enum ProverError {
    #[error("prover action failed: {0}")]
    Action(String),
    #[error("prover self-check rejected the witness: {0}")]
    SelfCheck(#[from] QueryError),
    #[error(transparent)]
    Handoff(#[from] HandoffError),
}

/// One reason the verifier rejects a proof.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerifierFailure {
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error("verifier action rejected: {0}")]
    Action(String),
    #[error("proof is missing the assignment of {0}")]
    MissingColumn(ColumnId),
    #[error("proof assignment of {id} has length {got}, declared {want}")]
    ColumnSizeMismatch { id: ColumnId, got: usize, want: usize },
    #[error("proof is missing the result of {0}")]
    MissingQueryResult(QueryId),
    #[error("proof result of {id} has the wrong shape")]
    ResultShapeMismatch { id: QueryId },
}

/// Everything that went wrong during verification, in one diagnostic. The
/// verifier never stops at the first failing check.
#[derive(Error, Debug)]
#[error("verification failed with {} error(s): {}", .failures.len(), join_failures(.failures))]
pub struct VerifierError {
    pub failures: Vec<VerifierFailure>,
}

fn join_failures(failures: &[VerifierFailure]) -> String {
    failures
        .iter()
        .map(|failure| failure.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// The transcript work of one round, in the exact absorption order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct RoundSchedule {
    pub absorb_columns: Vec<ColumnId>,
    pub absorb_queries: Vec<QueryId>,
    pub sample_coins: Vec<CoinId>,
}

pub(crate) fn round_schedule<F: FieldExt>(
    comp: &CompiledIOP<F>,
    round: usize,
) -> RoundSchedule {
    let mut schedule = RoundSchedule::default();
    if round > 0 {
        for (id, info) in comp.columns.at_round(round - 1) {
            if info.visibility.is_public() {
                schedule.absorb_columns.push(ColumnId(id));
            }
        }
        for (id, record) in comp.queries.at_round(round - 1) {
            if !record.deferred_to_verifier {
                schedule.absorb_queries.push(QueryId(id));
            }
        }
    }
    for (id, _) in comp.coins.at_round(round) {
        schedule.sample_coins.push(CoinId(id));
    }
    schedule
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiled::{compile, Builder};
    use crate::compiler;
    use wizard_shared_types::config::EngineConfig;
    use wizard_shared_types::Fr;

    #[test]
    fn schedule_orders_by_id_and_skips_deferred() {
        let comp = compile::<Fr>(
            EngineConfig::default(),
            |api: &mut Builder<Fr>| {
                let a = api.commit("a", 0, 4);
                let b = api.commit("b", 0, 4);
                let coin = api.coin_field("alpha", 1);
                let q = api.global_constraint(
                    "a - b",
                    a.clone().expr() - b.expr(),
                );
                api.defer_to_verifier(q);
                api.local_opening("open a", a, 0);
                let _ = coin;
            },
            &[&compiler::dummy::compile],
        );

        let round0 = round_schedule(&comp, 0);
        assert!(round0.absorb_columns.is_empty());
        assert!(round0.absorb_queries.is_empty());
        assert!(round0.sample_coins.is_empty());

        let round1 = round_schedule(&comp, 1);
        assert_eq!(round1.absorb_columns, vec![ColumnId(0), ColumnId(1)]);
        // The deferred global constraint is skipped, the opening is kept.
        assert_eq!(round1.absorb_queries, vec![QueryId(1)]);
        assert_eq!(round1.sample_coins, vec![CoinId(0)]);
    }
}
