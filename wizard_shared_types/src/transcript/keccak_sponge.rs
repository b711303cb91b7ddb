//! A Keccak-based sponge, cheaper natively than MiMC but with no circuit
//! mirror. Useful for protocols that will never be verified recursively.

use itertools::Itertools;
use sha3::{Digest, Keccak512};

use super::TranscriptSponge;
use crate::FieldExt;

#[derive(Clone, Debug, Default)]
pub struct KeccakSponge {
    hasher: Keccak512,
}

impl<F: FieldExt> TranscriptSponge<F> for KeccakSponge {
    fn new() -> Self {
        Self::default()
    }

    fn absorb(&mut self, elem: F) {
        self.hasher.update(elem.to_repr().as_ref());
    }

    fn absorb_elements(&mut self, elements: &[F]) {
        let bytes = elements
            .iter()
            .flat_map(|elem| elem.to_repr().as_ref().to_vec())
            .collect_vec();
        self.hasher.update(&bytes);
    }

    fn squeeze(&mut self) -> F {
        let out = self.hasher.clone().finalize();
        F::from_uniform_bytes(out.as_slice().try_into().unwrap())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::FiatShamir;
    use crate::Fr;

    #[test]
    fn keccak_transcript_is_deterministic() {
        let run = || {
            let mut fs = FiatShamir::<Fr, KeccakSponge>::new();
            fs.update(&[Fr::from(11), Fr::from(13)]);
            (fs.random_field(), fs.random_many_integers(4, 32))
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn safeguard_separates_squeezes() {
        let mut fs = FiatShamir::<Fr, KeccakSponge>::new();
        let a = fs.random_field();
        let b = fs.random_field();
        assert_ne!(a, b);
    }
}
