//! The compiled protocol description.
//!
//! A [CompiledIOP] owns five per-round registries (columns, coins, queries,
//! prover actions, verifier actions), the precomputed column dictionary and
//! the protocol hash binding the transcript to the exact protocol shape. It
//! is built incrementally through [api::Builder] and frozen once proving or
//! verifying begins.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};
use tracing::debug;
use wizard_shared_types::config::EngineConfig;
use wizard_shared_types::{mimc, FieldExt};

use crate::coin::{Coin, CoinId};
use crate::column::{Column, ColumnId, NaturalColumn, Visibility};
use crate::query::{Query, QueryId};
use crate::runtime::{ProverAction, VerifierAction};
use crate::smartvec::SmartVector;

pub mod api;
pub mod metadata;
pub mod register;

pub use api::{compile, Builder};
pub use metadata::Metadata;
pub use register::ByRoundRegister;

use halo2curves::ff::FromUniformBytes;

/// A registered column declaration: the natural shape plus its visibility.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub natural: NaturalColumn,
    pub visibility: Visibility,
}

impl ColumnInfo {
    pub fn as_column<F: FieldExt>(&self) -> Column<F> {
        Column::Natural(self.natural)
    }
}

/// A registered query plus its compilation bookkeeping.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "F: FieldExt")]
pub struct QueryRecord<F: FieldExt> {
    pub query: Query<F>,
    /// Deferred queries skip transcript absorption; the verifier checks
    /// them directly instead.
    pub deferred_to_verifier: bool,
    /// Set by a compiler pass that replaced the query with other
    /// constructs; the runtimes then skip checking it.
    pub marked_compiled: bool,
}

/// Serialized shape of the protocol, hashed into the transcript seed.
/// Actions and diagnostics are excluded on purpose.
#[derive(Serialize)]
#[serde(bound = "F: FieldExt")]
struct Description<'a, F: FieldExt> {
    columns: &'a ByRoundRegister<ColumnInfo>,
    coins: &'a ByRoundRegister<Coin>,
    queries: &'a ByRoundRegister<QueryRecord<F>>,
}

pub struct CompiledIOP<F: FieldExt> {
    pub config: EngineConfig,
    pub columns: ByRoundRegister<ColumnInfo>,
    pub coins: ByRoundRegister<Coin>,
    pub queries: ByRoundRegister<QueryRecord<F>>,
    pub prover_actions: ByRoundRegister<Box<dyn ProverAction<F>>>,
    pub verifier_actions: ByRoundRegister<Box<dyn VerifierAction<F>>>,
    /// Offline-known assignments of precomputed and verifying-key columns.
    pub precomputed: BTreeMap<ColumnId, SmartVector<F>>,
    protocol_hash: Option<F>,
}

impl<F: FieldExt> CompiledIOP<F> {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            columns: ByRoundRegister::new(),
            coins: ByRoundRegister::new(),
            queries: ByRoundRegister::new(),
            prover_actions: ByRoundRegister::new(),
            verifier_actions: ByRoundRegister::new(),
            precomputed: BTreeMap::new(),
            protocol_hash: None,
        }
    }

    pub fn column_info(&self, id: ColumnId) -> &ColumnInfo {
        self.columns.get(id.0)
    }

    pub fn coin(&self, id: CoinId) -> &Coin {
        self.coins.get(id.0)
    }

    pub fn query(&self, id: QueryId) -> &QueryRecord<F> {
        self.queries.get(id.0)
    }

    /// The common round count: every registry is addressable up to the
    /// same maximum round once [Self::equalize_rounds] has run.
    pub fn num_rounds(&self) -> usize {
        [
            self.columns.num_rounds(),
            self.coins.num_rounds(),
            self.queries.num_rounds(),
            self.prover_actions.num_rounds(),
            self.verifier_actions.num_rounds(),
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }

    /// Pads every registry with empty buckets up to the common round count.
    pub fn equalize_rounds(&mut self) {
        let rounds = self.num_rounds();
        if rounds == 0 {
            return;
        }
        self.columns.reserve_for(rounds - 1);
        self.coins.reserve_for(rounds - 1);
        self.queries.reserve_for(rounds - 1);
        self.prover_actions.reserve_for(rounds - 1);
        self.verifier_actions.reserve_for(rounds - 1);
    }

    /// Computes the protocol hash over the declared shape: one field
    /// element absorbed at round 0 so that two different protocols can
    /// never share a transcript prefix.
    pub fn seal(&mut self) {
        let description = Description {
            columns: &self.columns,
            coins: &self.coins,
            queries: &self.queries,
        };
        let encoded =
            serde_json::to_vec(&description).expect("protocol description is serializable");
        let digest = Sha3_256::digest(&encoded);

        // Fold the 32-byte digest into the field: two 16-byte limbs, each
        // widened for uniform reduction, compressed into one element.
        let mut low = [0u8; 64];
        let mut high = [0u8; 64];
        low[..16].copy_from_slice(&digest[..16]);
        high[..16].copy_from_slice(&digest[16..]);
        let hash = mimc::compress(F::from_uniform_bytes(&low), F::from_uniform_bytes(&high));

        debug!(
            columns = self.columns.len(),
            coins = self.coins.len(),
            queries = self.queries.len(),
            rounds = self.num_rounds(),
            "protocol sealed"
        );
        self.protocol_hash = Some(hash);
    }

    /// The sealed protocol hash. Panics if [Self::seal] never ran.
    pub fn protocol_hash(&self) -> F {
        self.protocol_hash
            .expect("protocol not sealed; build it through compile()")
    }

    /// Panics unless every column visibility has been resolved to a
    /// runtime-executable one.
    pub fn assert_compiled(&self) {
        for (id, info) in self.columns.iter() {
            if matches!(
                info.visibility,
                Visibility::Committed | Visibility::Precomputed
            ) {
                panic!(
                    "{} '{}' still has visibility {:?}; run a compiler pass \
                     (e.g. compiler::dummy) before proving or verifying",
                    ColumnId(id),
                    self.columns.metadata(id).full_name(),
                    info.visibility,
                );
            }
        }
    }
}
