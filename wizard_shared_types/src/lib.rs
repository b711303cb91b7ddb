pub mod circuit;
pub mod config;
pub mod domain;
pub mod mimc;
pub mod transcript;

use std::hash::Hash;

use halo2curves::ff::{Field, FromUniformBytes, PrimeField, WithSmallOrderMulGroup};
use serde::{Deserialize, Serialize};

pub use halo2curves;
pub use halo2curves::bn256::Fr;

///External definition of Field element trait, will remain an Alias for now
pub trait FieldExt:
    PrimeField
    + Field
    + FromUniformBytes<64>
    + WithSmallOrderMulGroup<3>
    + Hash
    + Ord
    + Serialize
    + for<'de> Deserialize<'de>
{
}

impl<
        F: PrimeField
            + Field
            + FromUniformBytes<64>
            + WithSmallOrderMulGroup<3>
            + Hash
            + Ord
            + Serialize
            + for<'de> Deserialize<'de>,
    > FieldExt for F
{
}

/// Interprets a field element as a `u64`, returning `None` when the value
/// does not fit. Used by bounded-integer challenges and range checks.
pub fn field_to_u64<F: FieldExt>(value: &F) -> Option<u64> {
    let repr = value.to_repr();
    let bytes = repr.as_ref();
    if bytes[8..].iter().any(|b| *b != 0) {
        return None;
    }
    let mut low = [0u8; 8];
    low.copy_from_slice(&bytes[..8]);
    Some(u64::from_le_bytes(low))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_to_u64_roundtrip() {
        assert_eq!(field_to_u64(&Fr::from(0)), Some(0));
        assert_eq!(field_to_u64(&Fr::from(u64::MAX)), Some(u64::MAX));
        let big = Fr::from(u64::MAX) + Fr::ONE;
        assert_eq!(field_to_u64(&big), None);
    }
}
