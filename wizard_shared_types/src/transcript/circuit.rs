//! The circuit-mirrored Fiat-Shamir transcript.
//!
//! Replays the native [super::FiatShamir] over [Wire]s, compression by
//! compression, routing every hash through the builder's deferred batch.
//! The native side must use [super::MimcSponge] for the mirror to agree.

use halo2curves::ff::Field;

use crate::circuit::{CircuitBuilder, Wire};
use crate::FieldExt;

use super::TRUSTED_DIGEST_BYTES;

/// Transcript state living inside a circuit.
#[derive(Clone, Copy, Debug)]
pub struct CircuitFiatShamir {
    state: Wire,
}

impl CircuitFiatShamir {
    pub fn new<F: FieldExt>(builder: &mut CircuitBuilder<F>) -> Self {
        let state = builder.constant(F::ZERO);
        Self { state }
    }

    /// Absorbs `wires` in order.
    pub fn update<F: FieldExt>(&mut self, builder: &mut CircuitBuilder<F>, wires: &[Wire]) {
        for wire in wires {
            self.state = builder.defer_compress(self.state, *wire);
        }
    }

    /// Mirror of [super::FiatShamir::random_field]: one squeezed digest
    /// followed by the safeguard update. For the MiMC sponge both amount to
    /// compressing a zero block, so the digest becomes the next state.
    pub fn random_field<F: FieldExt>(&mut self, builder: &mut CircuitBuilder<F>) -> Wire {
        let zero = builder.constant(F::ZERO);
        let digest = builder.defer_compress(self.state, zero);
        self.state = digest;
        digest
    }

    /// Mirror of [super::FiatShamir::random_many_integers]. Each returned
    /// wire carries one integer in `[0, upper_bound)`, recomposed from the
    /// bit decomposition of the squeezed digests.
    pub fn random_many_integers<F: FieldExt>(
        &mut self,
        builder: &mut CircuitBuilder<F>,
        num: usize,
        upper_bound: usize,
    ) -> Vec<Wire> {
        assert!(
            upper_bound >= 1 && upper_bound.is_power_of_two(),
            "upper_bound must be a power of two >= 1, got {upper_bound}"
        );
        let bits_per = upper_bound.trailing_zeros() as usize;
        if num == 0 || bits_per == 0 {
            let zero = builder.constant(F::ZERO);
            return vec![zero; num];
        }

        let trusted_bits = TRUSTED_DIGEST_BYTES * 8;
        let mut out = Vec::with_capacity(num);
        while out.len() < num {
            let digest = self.random_field(builder);
            // Decompose the full repr so the recomposition constraint holds,
            // then drop the untrusted most-significant byte like the native
            // bit reader does.
            let all_bits = builder.to_bits(digest, 256);
            for chunk in all_bits[..trusted_bits].chunks_exact(bits_per) {
                if out.len() == num {
                    break;
                }
                let mut coeff = F::ONE;
                let terms: Vec<(Wire, F)> = chunk
                    .iter()
                    .map(|bit| {
                        let term = (*bit, coeff);
                        coeff = coeff.double();
                        term
                    })
                    .collect();
                out.push(builder.linear_combination(&terms));
            }
        }
        out
    }

    /// Mirror of [super::FiatShamir::sub_derivation]: derives one element
    /// bound to `label` without perturbing the main accumulator.
    pub fn sub_derivation<F: FieldExt>(
        &mut self,
        builder: &mut CircuitBuilder<F>,
        label: &[Wire],
    ) -> Wire {
        let saved = self.checkpoint();
        self.update(builder, label);
        let out = self.random_field(builder);
        self.restore(saved);
        out
    }

    /// Snapshot of the mirrored accumulator.
    pub fn checkpoint(&self) -> Wire {
        self.state
    }

    /// Rolls the mirrored accumulator back to a previous checkpoint.
    pub fn restore(&mut self, saved: Wire) {
        self.state = saved;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::{FiatShamir, MimcSponge};
    use crate::Fr;

    #[test]
    fn mirrors_native_challenges() {
        let mut native = FiatShamir::<Fr, MimcSponge<Fr>>::new();
        native.update(&[Fr::from(10), Fr::from(20)]);
        let native_challenge = native.random_field();
        let native_ints = native.random_many_integers(5, 16);

        let mut builder = CircuitBuilder::<Fr>::new();
        let mut mirrored = CircuitFiatShamir::new(&mut builder);
        let inputs = [
            builder.constant(Fr::from(10)),
            builder.constant(Fr::from(20)),
        ];
        mirrored.update(&mut builder, &inputs);
        let challenge = mirrored.random_field(&mut builder);
        let ints = mirrored.random_many_integers(&mut builder, 5, 16);

        assert_eq!(builder.value(challenge), native_challenge);
        for (wire, expected) in ints.iter().zip(native_ints) {
            assert_eq!(builder.value(*wire), Fr::from(expected as u64));
        }
        assert!(builder.finalize().is_ok());
    }

    #[test]
    fn sub_derivation_mirrors_native_and_preserves_state() {
        let mut native = FiatShamir::<Fr, MimcSponge<Fr>>::new();
        native.update(&[Fr::from(8)]);
        let native_sub = native.sub_derivation(&[Fr::from(77)]);
        let native_next = native.random_field();

        let mut builder = CircuitBuilder::<Fr>::new();
        let mut mirrored = CircuitFiatShamir::new(&mut builder);
        let input = builder.constant(Fr::from(8));
        mirrored.update(&mut builder, &[input]);
        let label = builder.constant(Fr::from(77));
        let sub = mirrored.sub_derivation(&mut builder, &[label]);
        let next = mirrored.random_field(&mut builder);

        assert_eq!(builder.value(sub), native_sub);
        assert_eq!(builder.value(next), native_next);
    }

    #[test]
    fn checkpoint_restores_mirrored_state() {
        let mut builder = CircuitBuilder::<Fr>::new();
        let mut fs = CircuitFiatShamir::new(&mut builder);
        let input = builder.constant(Fr::from(3));
        fs.update(&mut builder, &[input]);
        let saved = fs.checkpoint();
        let a = fs.random_field(&mut builder);
        fs.restore(saved);
        let b = fs.random_field(&mut builder);
        assert_eq!(builder.value(a), builder.value(b));
    }
}
