//! Local constraints and local openings, both anchored at one row.
//!
//! A local constraint checks an expression at row 0 only; callers shift
//! the columns beforehand to target another row. A local opening declares
//! the value of a column at a fixed position and doubles as an accessor.

use serde::{Deserialize, Serialize};
use wizard_shared_types::circuit::CircuitBuilder;
use wizard_shared_types::FieldExt;

use crate::circuit_verifier::CircuitRuntime;
use crate::column::Column;
use crate::runtime::RuntimeAccess;
use crate::symbolic::Expression;

use super::{QueryError, QueryId, QueryResult};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "F: FieldExt")]
pub struct LocalConstraint<F: FieldExt> {
    pub id: QueryId,
    pub expr: Expression<F>,
}

impl<F: FieldExt> LocalConstraint<F> {
    pub fn round(&self) -> usize {
        self.expr.round()
    }

    pub fn check(&self, runtime: &dyn RuntimeAccess<F>) -> Result<(), QueryError> {
        let value = self
            .expr
            .eval_native(runtime)
            .unwrap_or_else(|err| panic!("malformed local constraint {}: {err}", self.id))
            .get(0);
        if bool::from(value.is_zero()) {
            Ok(())
        } else {
            Err(QueryError::LocalConstraintFailed {
                query: self.id,
                value: format!("{value:?}"),
            })
        }
    }

    pub fn check_circuit(
        &self,
        builder: &mut CircuitBuilder<F>,
        runtime: &CircuitRuntime<'_, F>,
    ) {
        let wires = self
            .expr
            .eval_circuit(builder, runtime)
            .unwrap_or_else(|err| panic!("malformed local constraint {}: {err}", self.id));
        builder.assert_zero(wires[0], format!("{} row 0", self.id));
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "F: FieldExt")]
pub struct LocalOpening<F: FieldExt> {
    pub id: QueryId,
    pub column: Column<F>,
    pub position: usize,
}

impl<F: FieldExt> LocalOpening<F> {
    pub fn round(&self) -> usize {
        self.column.round()
    }

    pub fn compute_result(&self, runtime: &dyn RuntimeAccess<F>) -> QueryResult<F> {
        QueryResult::Scalar(self.column.get_assignment(runtime).get(self.position))
    }

    /// Recomputes the opening and compares it with the claimed result.
    pub fn check(&self, runtime: &dyn RuntimeAccess<F>) -> Result<(), QueryError> {
        let actual = self.column.get_assignment(runtime).get(self.position);
        let claimed = match runtime.query_result(self.id) {
            QueryResult::Scalar(value) => value,
            other => panic!("{} expected a scalar result, got {other:?}", self.id),
        };
        if claimed == actual {
            Ok(())
        } else {
            Err(QueryError::LocalOpeningMismatch {
                query: self.id,
                claimed: format!("{claimed:?}"),
                actual: format!("{actual:?}"),
            })
        }
    }

    pub fn check_circuit(
        &self,
        builder: &mut CircuitBuilder<F>,
        runtime: &CircuitRuntime<'_, F>,
    ) {
        let wires = self.column.get_assignment_circuit(builder, runtime);
        let claimed = runtime.result_wires(self.id)[0];
        builder.assert_eq(
            wires[self.position],
            claimed,
            format!("{} opening at {}", self.id, self.position),
        );
    }
}
