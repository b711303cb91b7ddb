//! Permutation arguments between two multi-fragment, multi-column tables.
//!
//! The check is the randomized grand-product test: rows are folded into
//! single values with powers of a challenge `alpha`, then the products of
//! `folded_row + gamma` over both sides must agree. Both challenges are
//! derived from a dedicated transcript absorbing the full contents of both
//! tables, so the prover cannot pick the table after seeing them.

use serde::{Deserialize, Serialize};
use wizard_shared_types::transcript::{FiatShamir, MimcSponge};
use wizard_shared_types::FieldExt;

use crate::column::Column;
use crate::runtime::RuntimeAccess;

use super::{QueryError, QueryId};

/// One fragment of a table: a list of same-size columns read as row tuples.
pub type TableFragment<F> = Vec<Column<F>>;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "F: FieldExt")]
pub struct Permutation<F: FieldExt> {
    pub id: QueryId,
    pub a: Vec<TableFragment<F>>,
    pub b: Vec<TableFragment<F>>,
}

impl<F: FieldExt> Permutation<F> {
    pub fn round(&self) -> usize {
        table_round(&self.a).max(table_round(&self.b))
    }

    pub fn check(&self, runtime: &dyn RuntimeAccess<F>) -> Result<(), QueryError> {
        let (alpha, gamma) = self.challenges(runtime);
        let lhs = grand_product(&self.a, runtime, alpha, gamma);
        let rhs = grand_product(&self.b, runtime, alpha, gamma);
        if lhs == rhs {
            Ok(())
        } else {
            Err(QueryError::PermutationMismatch { query: self.id })
        }
    }

    /// Derives `(alpha, gamma)` from a transcript seeded with both tables.
    fn challenges(&self, runtime: &dyn RuntimeAccess<F>) -> (F, F) {
        let mut fs = FiatShamir::<F, MimcSponge<F>>::new();
        for table in [&self.a, &self.b] {
            for fragment in table.iter() {
                for column in fragment {
                    fs.update(&column.get_assignment(runtime).to_vec());
                }
            }
        }
        (fs.random_field(), fs.random_field())
    }
}

fn table_round<F: FieldExt>(table: &[TableFragment<F>]) -> usize {
    table
        .iter()
        .flatten()
        .map(|column| column.round())
        .max()
        .unwrap_or(0)
}

/// `prod over fragments, rows of (sum_j col_j[row] * alpha^j + gamma)`.
pub(super) fn grand_product<F: FieldExt>(
    table: &[TableFragment<F>],
    runtime: &dyn RuntimeAccess<F>,
    alpha: F,
    gamma: F,
) -> F {
    let mut product = F::ONE;
    for fragment in table {
        let assignments: Vec<_> = fragment
            .iter()
            .map(|column| column.get_assignment(runtime))
            .collect();
        let num_rows = assignments
            .first()
            .map(|a| a.len())
            .expect("permutation fragment with no columns");
        for assignment in &assignments {
            assert_eq!(
                assignment.len(),
                num_rows,
                "permutation fragment with mismatched column sizes"
            );
        }
        for row in 0..num_rows {
            let mut folded = F::ZERO;
            let mut coeff = F::ONE;
            for assignment in &assignments {
                folded += assignment.get(row) * coeff;
                coeff *= alpha;
            }
            product *= folded + gamma;
        }
    }
    product
}
