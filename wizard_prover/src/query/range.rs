//! Range checks: every entry of a column lies in `[0, bound)`.

use serde::{Deserialize, Serialize};
use wizard_shared_types::{field_to_u64, FieldExt};

use crate::column::Column;
use crate::runtime::RuntimeAccess;

use super::{QueryError, QueryId};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "F: FieldExt")]
pub struct Range<F: FieldExt> {
    pub id: QueryId,
    pub column: Column<F>,
    pub bound: usize,
}

impl<F: FieldExt> Range<F> {
    pub fn round(&self) -> usize {
        self.column.round()
    }

    pub fn check(&self, runtime: &dyn RuntimeAccess<F>) -> Result<(), QueryError> {
        let assignment = self.column.get_assignment(runtime);
        for row in 0..assignment.len() {
            let value = assignment.get(row);
            let in_range = field_to_u64(&value)
                .map(|v| v < self.bound as u64)
                .unwrap_or(false);
            if !in_range {
                return Err(QueryError::RangeExceeded {
                    query: self.id,
                    row,
                    value: format!("{value:?}"),
                    bound: self.bound,
                });
            }
        }
        Ok(())
    }
}
