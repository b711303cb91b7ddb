//! Copy-constraint arguments under a known, fixed permutation.
//!
//! Unlike [super::Permutation], the mapping is part of the declaration:
//! `sigma[j][i]` gives the flat index (column-major over the a side) that
//! position `(j, i)` of the b side is copied from. Each side is folded with
//! its own index polynomial, identity on the a side and `sigma` on the b
//! side, and the grand products must match.

use serde::{Deserialize, Serialize};
use wizard_shared_types::transcript::{FiatShamir, MimcSponge};
use wizard_shared_types::FieldExt;

use crate::column::Column;
use crate::runtime::RuntimeAccess;

use super::{QueryError, QueryId};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "F: FieldExt")]
pub struct FixedPermutation<F: FieldExt> {
    pub id: QueryId,
    pub a: Vec<Column<F>>,
    pub b: Vec<Column<F>>,
    /// `sigma[j][i]` is the flat a-side index backing entry `i` of b
    /// column `j`.
    pub sigma: Vec<Vec<usize>>,
}

impl<F: FieldExt> FixedPermutation<F> {
    pub fn round(&self) -> usize {
        self.a
            .iter()
            .chain(self.b.iter())
            .map(|column| column.round())
            .max()
            .unwrap_or(0)
    }

    pub fn check(&self, runtime: &dyn RuntimeAccess<F>) -> Result<(), QueryError> {
        assert_eq!(
            self.a.len(),
            self.b.len(),
            "{} has mismatched table widths",
            self.id
        );
        let (beta, gamma) = self.challenges(runtime);

        let mut lhs = F::ONE;
        let mut flat = 0usize;
        for column in &self.a {
            let assignment = column.get_assignment(runtime);
            for row in 0..assignment.len() {
                lhs *= assignment.get(row) + beta * F::from(flat as u64) + gamma;
                flat += 1;
            }
        }

        let mut rhs = F::ONE;
        for (j, column) in self.b.iter().enumerate() {
            let assignment = column.get_assignment(runtime);
            assert_eq!(
                assignment.len(),
                self.sigma[j].len(),
                "{} sigma column {j} does not cover the table",
                self.id
            );
            for row in 0..assignment.len() {
                let index = self.sigma[j][row];
                rhs *= assignment.get(row) + beta * F::from(index as u64) + gamma;
            }
        }

        if lhs == rhs {
            Ok(())
        } else {
            Err(QueryError::FixedPermutationMismatch { query: self.id })
        }
    }

    fn challenges(&self, runtime: &dyn RuntimeAccess<F>) -> (F, F) {
        let mut fs = FiatShamir::<F, MimcSponge<F>>::new();
        for column in self.a.iter().chain(self.b.iter()) {
            fs.update(&column.get_assignment(runtime).to_vec());
        }
        (fs.random_field(), fs.random_field())
    }
}
