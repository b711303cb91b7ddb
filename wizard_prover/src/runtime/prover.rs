//! The prover runtime: executes every round against a live transcript and
//! seals the proof.

use std::collections::BTreeMap;
use std::sync::Mutex;

use ark_std::{end_timer, start_timer};
use tracing::debug;
use wizard_shared_types::transcript::{BoxSponge, FiatShamir, MimcSponge, TranscriptSponge};
use wizard_shared_types::FieldExt;

use crate::coin::{CoinId, CoinValue};
use crate::column::{Column, ColumnId, Visibility};
use crate::compiled::CompiledIOP;
use crate::query::{QueryId, QueryResult, ResultArity};
use crate::smartvec::SmartVector;

use super::{round_schedule, Proof, ProverAction, ProverError, RuntimeAccess};

/// Mutable per-run state, guarded by one coarse mutex so prover actions
/// may assign independent columns concurrently.
struct RuntimeState<F: FieldExt> {
    columns: BTreeMap<ColumnId, SmartVector<F>>,
    coins: BTreeMap<CoinId, CoinValue<F>>,
    query_results: BTreeMap<QueryId, QueryResult<F>>,
}

pub struct ProverRuntime<'a, F: FieldExt> {
    comp: &'a CompiledIOP<F>,
    fs: FiatShamir<F, BoxSponge<F>>,
    state: Mutex<RuntimeState<F>>,
    current_round: usize,
}

impl<'a, F: FieldExt> ProverRuntime<'a, F> {
    fn new(comp: &'a CompiledIOP<F>, sponge: BoxSponge<F>) -> Self {
        Self {
            comp,
            fs: FiatShamir::with_sponge(sponge),
            state: Mutex::new(RuntimeState {
                columns: BTreeMap::new(),
                coins: BTreeMap::new(),
                query_results: BTreeMap::new(),
            }),
            current_round: 0,
        }
    }

    pub fn current_round(&self) -> usize {
        self.current_round
    }

    /// Assigns a natural column declared for the current round. Panics on
    /// variant, round or size mismatch and on double assignment; all of
    /// these are protocol-definition bugs.
    pub fn assign_column(&self, column: &Column<F>, values: SmartVector<F>) {
        let Column::Natural(natural) = column else {
            panic!("only natural columns can be assigned, got {column:?}")
        };
        assert_eq!(
            natural.round, self.current_round,
            "{} is declared for round {}, assigned during round {}",
            natural.id, natural.round, self.current_round
        );
        assert_eq!(
            values.len(),
            natural.size,
            "{} is declared with size {}, assigned {} values",
            natural.id,
            natural.size,
            values.len()
        );
        let mut state = self.state.lock().expect("runtime state lock");
        let replaced = state.columns.insert(natural.id, values);
        assert!(replaced.is_none(), "{} assigned twice", natural.id);
    }

    /// Absorptions and samplings owed before the actions of `round` run.
    fn run_fs_for_round(&mut self, round: usize) {
        if round == 0 {
            self.fs.update(&[self.comp.protocol_hash()]);
        }
        let schedule = round_schedule(self.comp, round);
        for id in &schedule.absorb_columns {
            let assignment = self.column_assignment(*id);
            self.fs.update(&assignment.to_vec());
        }
        for id in &schedule.absorb_queries {
            let result = self.query_result(*id);
            self.fs.update(&result.to_elements());
        }
        for id in &schedule.sample_coins {
            let coin = *self.comp.coin(*id);
            let value = coin.sample(&mut self.fs);
            let mut state = self.state.lock().expect("runtime state lock");
            let replaced = state.coins.insert(*id, value);
            assert!(replaced.is_none(), "{id} sampled twice");
        }
        debug!(
            round,
            columns = schedule.absorb_columns.len(),
            queries = schedule.absorb_queries.len(),
            coins = schedule.sample_coins.len(),
            "prover transcript advanced"
        );
    }

    /// Exports the proof: every exported column's assignment and every
    /// result-bearing query's result. Panics if a required assignment is
    /// missing, meaning some prover action never ran or never assigned it.
    fn proof(&self) -> Proof<F> {
        let mut columns = BTreeMap::new();
        for (id, info) in self.comp.columns.iter() {
            if info.visibility.is_exported() {
                columns.insert(ColumnId(id), self.column_assignment(ColumnId(id)));
            }
        }
        let mut query_results = BTreeMap::new();
        for (id, record) in self.comp.queries.iter() {
            if record.query.result_arity() != ResultArity::None {
                query_results.insert(QueryId(id), self.query_result(QueryId(id)));
            }
        }
        Proof {
            columns,
            query_results,
        }
    }
}

impl<F: FieldExt> RuntimeAccess<F> for ProverRuntime<'_, F> {
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
            _ => {
                let state = self.state.lock().expect("runtime state lock");
                state.columns.get(&id).cloned().unwrap_or_else(|| {
                    panic!(
                        "missing assignment of {id} '{}'",
                        self.comp.columns.metadata(id.0).full_name()
                    )
                })
            }
        }
    }

    fn coin_value(&self, id: CoinId) -> CoinValue<F> {
        let state = self.state.lock().expect("runtime state lock");
        state
            .coins
            .get(&id)
            .cloned()
            .unwrap_or_else(|| panic!("{id} read before its round was sampled"))
    }

    /// Computed lazily the first time it is needed, then cached.
    fn query_result(&self, id: QueryId) -> QueryResult<F> {
        {
            let state = self.state.lock().expect("runtime state lock");
            if let Some(result) = state.query_results.get(&id) {
                return result.clone();
            }
        }
        // Computed outside the lock: the computation itself reads columns.
        let result = self.comp.query(id).query.compute_result(self);
        let mut state = self.state.lock().expect("runtime state lock");
        state
            .query_results
            .entry(id)
            .or_insert(result)
            .clone()
    }
}

/// Proves with the default MiMC-sponge transcript.
pub fn prove<F: FieldExt>(
    comp: &CompiledIOP<F>,
    main: impl ProverAction<F>,
) -> Result<Proof<F>, ProverError> {
    prove_with_sponge(comp, main, MimcSponge::new())
}

/// Runs every round in order. The main action runs during round 0,
/// registered prover actions run during their declared round, each after
/// the round's transcript work.
pub fn prove_with_sponge<F: FieldExt, S: TranscriptSponge<F> + 'static>(
    comp: &CompiledIOP<F>,
    main: impl ProverAction<F>,
    sponge: S,
) -> Result<Proof<F>, ProverError> {
    comp.assert_compiled();
    let timer = start_timer!(|| "wizard prove");
    let mut runtime = ProverRuntime::new(comp, BoxSponge::from_sponge(sponge));

    for round in 0..comp.num_rounds() {
        runtime.current_round = round;
        runtime.run_fs_for_round(round);
        if round == 0 {
            main.run(&mut runtime)?;
        }
        for (_, action) in comp.prover_actions.at_round(round) {
            action.run(&mut runtime)?;
        }
    }

    if comp.config.check_queries_during_proving {
        for (_, record) in comp.queries.iter() {
            if !record.marked_compiled {
                record.query.check(&runtime)?;
            }
        }
    }

    let proof = runtime.proof();
    end_timer!(timer);
    Ok(proof)
}
