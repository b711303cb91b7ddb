//! Batched univariate evaluation of several columns at one shared point.
//!
//! Columns are read as polynomial coefficients in ascending degree order
//! and evaluated with Horner's rule, natively and in-circuit alike.

use serde::{Deserialize, Serialize};
use wizard_shared_types::circuit::CircuitBuilder;
use wizard_shared_types::FieldExt;

use crate::accessor::Accessor;
use crate::circuit_verifier::CircuitRuntime;
use crate::column::Column;
use crate::runtime::RuntimeAccess;

use super::{QueryError, QueryId, QueryResult};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "F: FieldExt")]
pub struct UnivariateEval<F: FieldExt> {
    pub id: QueryId,
    pub columns: Vec<Column<F>>,
    /// The shared evaluation point, typically a sampled coin.
    pub point: Accessor<F>,
}

impl<F: FieldExt> UnivariateEval<F> {
    pub fn round(&self) -> usize {
        self.columns
            .iter()
            .map(|column| column.round())
            .chain([self.point.round()])
            .max()
            .expect("univariate evaluation over at least one column")
    }

    pub fn compute_result(&self, runtime: &dyn RuntimeAccess<F>) -> QueryResult<F> {
        let x = self.point.get_val(runtime);
        QueryResult::Vector(
            self.columns
                .iter()
                .map(|column| column.get_assignment(runtime).eval_coeff(x))
                .collect(),
        )
    }

    pub fn check(&self, runtime: &dyn RuntimeAccess<F>) -> Result<(), QueryError> {
        let x = self.point.get_val(runtime);
        let claimed = match runtime.query_result(self.id) {
            QueryResult::Vector(values) => values,
            other => panic!("{} expected a vector result, got {other:?}", self.id),
        };
        assert_eq!(
            claimed.len(),
            self.columns.len(),
            "{} result arity does not match its column count",
            self.id
        );
        for (index, (column, claimed)) in self.columns.iter().zip(claimed.iter()).enumerate() {
            let actual = column.get_assignment(runtime).eval_coeff(x);
            if *claimed != actual {
                return Err(QueryError::UnivariateMismatch {
                    query: self.id,
                    index,
                    claimed: format!("{claimed:?}"),
                    actual: format!("{actual:?}"),
                });
            }
        }
        Ok(())
    }

    /// In-circuit Horner evaluation per column against the claimed vector.
    pub fn check_circuit(
        &self,
        builder: &mut CircuitBuilder<F>,
        runtime: &CircuitRuntime<'_, F>,
    ) {
        let x = self.point.get_val_circuit(builder, runtime);
        let claimed = runtime.result_wires(self.id).to_vec();
        for (index, column) in self.columns.iter().enumerate() {
            let coeffs = column.get_assignment_circuit(builder, runtime);
            let mut acc = builder.constant(F::ZERO);
            for coeff in coeffs.iter().rev() {
                let scaled = builder.mul(acc, x);
                acc = builder.add(scaled, *coeff);
            }
            builder.assert_eq(
                acc,
                claimed[index],
                format!("{} evaluation of column {index}", self.id),
            );
        }
    }
}
