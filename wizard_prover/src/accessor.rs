//! Accessors: scalar values usable inside expressions.
//!
//! An accessor resolves to one field element at runtime: a sampled coin, a
//! local-opening query result, or a literal constant. Local openings make a
//! query result referenceable by later rounds the same way a coin is.

use serde::{Deserialize, Serialize};
use wizard_shared_types::circuit::{CircuitBuilder, Wire};
use wizard_shared_types::FieldExt;

use crate::circuit_verifier::CircuitRuntime;
use crate::coin::Coin;
use crate::query::{QueryId, QueryResult};
use crate::runtime::RuntimeAccess;
use crate::symbolic::Expression;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "F: FieldExt")]
pub enum Accessor<F: FieldExt> {
    /// The value sampled for a field coin.
    Coin(Coin),
    /// The scalar result of a local-opening query.
    LocalOpening { query: QueryId, round: usize },
    /// A literal.
    Constant(F),
}

impl<F: FieldExt> Accessor<F> {
    /// The round at which the value becomes available.
    pub fn round(&self) -> usize {
        match self {
            Accessor::Coin(coin) => coin.round,
            Accessor::LocalOpening { round, .. } => *round,
            Accessor::Constant(_) => 0,
        }
    }

    /// Resolves the accessor against a runtime. Panics if the backing coin
    /// or query result is absent or of the wrong shape (programmer error).
    pub fn get_val(&self, runtime: &dyn RuntimeAccess<F>) -> F {
        match self {
            Accessor::Coin(coin) => runtime.coin_value(coin.id).as_field(),
            Accessor::LocalOpening { query, .. } => match runtime.query_result(*query) {
                QueryResult::Scalar(value) => value,
                other => panic!(
                    "local-opening accessor over {query} expected a scalar result, got {other:?}"
                ),
            },
            Accessor::Constant(value) => *value,
        }
    }

    /// Circuit mirror of [Self::get_val].
    pub fn get_val_circuit(
        &self,
        builder: &mut CircuitBuilder<F>,
        runtime: &CircuitRuntime<'_, F>,
    ) -> Wire {
        match self {
            Accessor::Coin(coin) => runtime.coin_wires(coin.id).as_field(),
            Accessor::LocalOpening { query, .. } => {
                let wires = runtime.result_wires(*query);
                assert_eq!(
                    wires.len(),
                    1,
                    "local-opening accessor over {query} expected a scalar result"
                );
                wires[0]
            }
            Accessor::Constant(value) => builder.constant(*value),
        }
    }

    /// Wraps the accessor into an expression leaf.
    pub fn expr(self) -> Expression<F> {
        Expression::Accessor(self)
    }
}
