//! Coins: verifier challenges sampled from the transcript at a declared
//! round.

use std::fmt;

use serde::{Deserialize, Serialize};
use wizard_shared_types::circuit::{CircuitBuilder, Wire};
use wizard_shared_types::transcript::{CircuitFiatShamir, FiatShamir, TranscriptSponge};
use wizard_shared_types::FieldExt;

/// Dense handle of a declared coin.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct CoinId(pub usize);

impl fmt::Display for CoinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "coin#{}", self.0)
    }
}

/// What kind of challenge the coin yields.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoinKind {
    /// One field element.
    Field,
    /// `size` integers, each uniform in `[0, upper_bound)`; the bound must
    /// be a power of two.
    IntegerVec { size: usize, upper_bound: usize },
}

/// A challenge declaration. The value itself lives in the runtime that
/// sampled it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub id: CoinId,
    pub round: usize,
    pub kind: CoinKind,
}

impl Coin {
    /// Squeezes this coin's value out of the transcript.
    pub fn sample<F: FieldExt, S: TranscriptSponge<F>>(
        &self,
        fs: &mut FiatShamir<F, S>,
    ) -> CoinValue<F> {
        match self.kind {
            CoinKind::Field => CoinValue::Field(fs.random_field()),
            CoinKind::IntegerVec { size, upper_bound } => {
                CoinValue::IntegerVec(fs.random_many_integers(size, upper_bound))
            }
        }
    }

    /// Circuit mirror of [Self::sample].
    pub fn sample_circuit<F: FieldExt>(
        &self,
        builder: &mut CircuitBuilder<F>,
        fs: &mut CircuitFiatShamir,
    ) -> CoinWires {
        match self.kind {
            CoinKind::Field => CoinWires::Field(fs.random_field(builder)),
            CoinKind::IntegerVec { size, upper_bound } => {
                CoinWires::IntegerVec(fs.random_many_integers(builder, size, upper_bound))
            }
        }
    }
}

/// A sampled challenge.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "F: FieldExt")]
pub enum CoinValue<F: FieldExt> {
    Field(F),
    IntegerVec(Vec<usize>),
}

impl<F: FieldExt> CoinValue<F> {
    /// The single field element of a [CoinKind::Field] coin. Panics on an
    /// integer-vec coin (programmer error).
    pub fn as_field(&self) -> F {
        match self {
            CoinValue::Field(value) => *value,
            CoinValue::IntegerVec(_) => {
                panic!("integer-vec coin used where a field coin was expected")
            }
        }
    }
}

/// Circuit counterpart of [CoinValue].
#[derive(Clone, Debug)]
pub enum CoinWires {
    Field(Wire),
    IntegerVec(Vec<Wire>),
}

impl CoinWires {
    pub fn as_field(&self) -> Wire {
        match self {
            CoinWires::Field(wire) => *wire,
            CoinWires::IntegerVec(_) => {
                panic!("integer-vec coin used where a field coin was expected")
            }
        }
    }
}
