//! Inner products between two equal-size columns.

use serde::{Deserialize, Serialize};
use wizard_shared_types::circuit::CircuitBuilder;
use wizard_shared_types::FieldExt;

use crate::circuit_verifier::CircuitRuntime;
use crate::column::Column;
use crate::runtime::RuntimeAccess;

use super::{QueryError, QueryId, QueryResult};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "F: FieldExt")]
pub struct InnerProduct<F: FieldExt> {
    pub id: QueryId,
    pub a: Column<F>,
    pub b: Column<F>,
}

impl<F: FieldExt> InnerProduct<F> {
    pub fn round(&self) -> usize {
        self.a.round().max(self.b.round())
    }

    pub fn compute_result(&self, runtime: &dyn RuntimeAccess<F>) -> QueryResult<F> {
        let a = self.a.get_assignment(runtime);
        let b = self.b.get_assignment(runtime);
        QueryResult::Scalar(a.inner_product(&b))
    }

    pub fn check(&self, runtime: &dyn RuntimeAccess<F>) -> Result<(), QueryError> {
        let actual = self
            .a
            .get_assignment(runtime)
            .inner_product(&self.b.get_assignment(runtime));
        let claimed = match runtime.query_result(self.id) {
            QueryResult::Scalar(value) => value,
            other => panic!("{} expected a scalar result, got {other:?}", self.id),
        };
        if claimed == actual {
            Ok(())
        } else {
            Err(QueryError::InnerProductMismatch {
                query: self.id,
                claimed: format!("{claimed:?}"),
                actual: format!("{actual:?}"),
            })
        }
    }

    /// Accumulates the pointwise products in-circuit and compares against
    /// the claimed scalar.
    pub fn check_circuit(
        &self,
        builder: &mut CircuitBuilder<F>,
        runtime: &CircuitRuntime<'_, F>,
    ) {
        let a = self.a.get_assignment_circuit(builder, runtime);
        let b = self.b.get_assignment_circuit(builder, runtime);
        let mut acc = builder.constant(F::ZERO);
        for (x, y) in a.iter().zip(b.iter()) {
            let term = builder.mul(*x, *y);
            acc = builder.add(acc, term);
        }
        let claimed = runtime.result_wires(self.id)[0];
        builder.assert_eq(acc, claimed, format!("{} inner product", self.id));
    }
}
