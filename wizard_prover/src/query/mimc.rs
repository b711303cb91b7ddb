//! Hash-compression consistency over three parallel columns.
//!
//! Row by row, `new_state = compress(old_state, block)` must hold. The
//! circuit mirror routes every row through the deferred compression batch
//! instead of constraining the permutation inline.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use wizard_shared_types::circuit::CircuitBuilder;
use wizard_shared_types::{mimc, FieldExt};

use crate::circuit_verifier::CircuitRuntime;
use crate::column::Column;
use crate::runtime::RuntimeAccess;

use super::{QueryError, QueryId};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "F: FieldExt")]
pub struct MimcCompression<F: FieldExt> {
    pub id: QueryId,
    pub block: Column<F>,
    pub old_state: Column<F>,
    pub new_state: Column<F>,
}

impl<F: FieldExt> MimcCompression<F> {
    pub fn round(&self) -> usize {
        self.block
            .round()
            .max(self.old_state.round())
            .max(self.new_state.round())
    }

    pub fn check(&self, runtime: &dyn RuntimeAccess<F>) -> Result<(), QueryError> {
        let block = self.block.get_assignment(runtime).to_vec();
        let old_state = self.old_state.get_assignment(runtime).to_vec();
        let new_state = self.new_state.get_assignment(runtime).to_vec();
        assert!(
            block.len() == old_state.len() && block.len() == new_state.len(),
            "{} over mismatched column sizes",
            self.id
        );
        let rows: Vec<usize> = (0..block.len())
            .into_par_iter()
            .filter(|&row| mimc::compress(old_state[row], block[row]) != new_state[row])
            .collect();
        if rows.is_empty() {
            Ok(())
        } else {
            Err(QueryError::MimcMismatch { query: self.id, rows })
        }
    }

    pub fn check_circuit(
        &self,
        builder: &mut CircuitBuilder<F>,
        runtime: &CircuitRuntime<'_, F>,
    ) {
        let block = self.block.get_assignment_circuit(builder, runtime);
        let old_state = self.old_state.get_assignment_circuit(builder, runtime);
        let new_state = self.new_state.get_assignment_circuit(builder, runtime);
        for row in 0..block.len() {
            let out = builder.defer_compress(old_state[row], block[row]);
            builder.assert_eq(
                out,
                new_state[row],
                format!("{} compression at row {row}", self.id),
            );
        }
    }
}
