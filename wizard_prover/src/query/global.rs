//! Global constraints: an expression that must vanish at every row.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use wizard_shared_types::circuit::CircuitBuilder;
use wizard_shared_types::FieldExt;

use crate::circuit_verifier::CircuitRuntime;
use crate::runtime::RuntimeAccess;
use crate::symbolic::Expression;

use super::{QueryError, QueryId};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "F: FieldExt")]
pub struct GlobalConstraint<F: FieldExt> {
    pub id: QueryId,
    pub expr: Expression<F>,
}

impl<F: FieldExt> GlobalConstraint<F> {
    pub fn round(&self) -> usize {
        self.expr.round()
    }

    /// Evaluates the expression over every row and reports all rows where
    /// it does not vanish.
    pub fn check(&self, runtime: &dyn RuntimeAccess<F>) -> Result<(), QueryError> {
        let values = self
            .expr
            .eval_native(runtime)
            .unwrap_or_else(|err| panic!("malformed global constraint {}: {err}", self.id))
            .to_vec();
        let rows: Vec<usize> = values
            .par_iter()
            .enumerate()
            .filter(|(_, v)| !bool::from(v.is_zero()))
            .map(|(i, _)| i)
            .collect();
        if rows.is_empty() {
            Ok(())
        } else {
            Err(QueryError::GlobalConstraintFailed { query: self.id, rows })
        }
    }

    /// One vanishing assertion per row.
    pub fn check_circuit(
        &self,
        builder: &mut CircuitBuilder<F>,
        runtime: &CircuitRuntime<'_, F>,
    ) {
        let wires = self
            .expr
            .eval_circuit(builder, runtime)
            .unwrap_or_else(|err| panic!("malformed global constraint {}: {err}", self.id));
        for (row, wire) in wires.iter().enumerate() {
            builder.assert_zero(*wire, format!("{} row {row}", self.id));
        }
    }
}
