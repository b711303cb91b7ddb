//! MiMC block compression over the scalar field.
//!
//! This is the hash primitive shared by the native transcript sponge, the
//! protocol-hash folding and the hash-compression consistency query. The
//! circuit-mirrored verifier re-runs the exact same round schedule over
//! wires, so both sides agree bit for bit.

use once_cell::sync::Lazy;
use sha3::{Digest, Keccak512};

use crate::FieldExt;

/// Number of S-box rounds of the permutation.
pub const MIMC_ROUNDS: usize = 110;

/// Uniform 64-byte seeds for the round constants, derived once from Keccak512
/// over a fixed domain-separation string. Kept as raw bytes so the table
/// stays independent of the concrete field.
static ROUND_CONSTANT_SEEDS: Lazy<Vec<[u8; 64]>> = Lazy::new(|| {
    (0..MIMC_ROUNDS)
        .map(|i| {
            let mut hasher = Keccak512::new();
            hasher.update(format!("wizard.mimc.round.{i}").as_bytes());
            let out = hasher.finalize();
            let mut seed = [0u8; 64];
            seed.copy_from_slice(&out);
            seed
        })
        .collect()
});

/// The round constants mapped into `F`.
pub fn round_constants<F: FieldExt>() -> Vec<F> {
    ROUND_CONSTANT_SEEDS
        .iter()
        .map(|seed| F::from_uniform_bytes(seed))
        .collect()
}

fn pow5<F: FieldExt>(x: F) -> F {
    let x2 = x.square();
    x2.square() * x
}

/// Encrypts `block` under key `state` with the raw MiMC permutation.
pub fn encrypt<F: FieldExt>(state: F, block: F) -> F {
    let mut tmp = block;
    for c in round_constants::<F>() {
        tmp = pow5(tmp + state + c);
    }
    tmp
}

/// One-block compression: Miyaguchi-Preneel feed-forward around [encrypt].
pub fn compress<F: FieldExt>(state: F, block: F) -> F {
    encrypt(state, block) + block + state
}
