//! Compact representations of column assignments.
//!
//! The engine treats assignments as opaque vectors with a handful of cheap
//! structural forms: fully constant, dense, and dense-with-padding. This is
//! the interface the runtime and the queries consume; heavy arithmetic
//! (batch interpolation, coset evaluation) lives behind the free functions
//! at the bottom.

use halo2curves::ff::Field;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use wizard_shared_types::domain;
use wizard_shared_types::FieldExt;

/// A sized, immutable vector of field elements.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(bound = "F: FieldExt")]
pub enum SmartVector<F: FieldExt> {
    /// Every entry equals the given value.
    Constant(F, usize),
    /// Dense representation.
    Regular(Vec<F>),
    /// A dense prefix right-padded with one value up to the full length.
    RightPadded {
        values: Vec<F>,
        pad: F,
        len: usize,
    },
}

impl<F: FieldExt> SmartVector<F> {
    pub fn constant(value: F, len: usize) -> Self {
        Self::Constant(value, len)
    }

    pub fn zeros(len: usize) -> Self {
        Self::Constant(F::ZERO, len)
    }

    pub fn right_padded(values: Vec<F>, pad: F, len: usize) -> Self {
        assert!(
            values.len() <= len,
            "padded prefix of length {} exceeds target length {len}",
            values.len()
        );
        Self::RightPadded { values, pad, len }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Constant(_, len) => *len,
            Self::Regular(values) => values.len(),
            Self::RightPadded { len, .. } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entry at `index`. Panics on out-of-bounds access (programmer error).
    pub fn get(&self, index: usize) -> F {
        assert!(
            index < self.len(),
            "index {index} out of bounds for vector of length {}",
            self.len()
        );
        match self {
            Self::Constant(value, _) => *value,
            Self::Regular(values) => values[index],
            Self::RightPadded { values, pad, .. } => {
                values.get(index).copied().unwrap_or(*pad)
            }
        }
    }

    /// Materializes into a dense vector.
    pub fn to_vec(&self) -> Vec<F> {
        match self {
            Self::Constant(value, len) => vec![*value; *len],
            Self::Regular(values) => values.clone(),
            Self::RightPadded { values, pad, len } => {
                let mut out = values.clone();
                out.resize(*len, *pad);
                out
            }
        }
    }

    /// Cyclic left rotation: entry `i` of the result is entry
    /// `(i + offset) mod len` of `self`. Shifted columns are rotations of
    /// their parent's assignment.
    pub fn rotate_left(&self, offset: isize) -> Self {
        let n = self.len();
        if n == 0 {
            return self.clone();
        }
        let shift = offset.rem_euclid(n as isize) as usize;
        if shift == 0 {
            return self.clone();
        }
        match self {
            Self::Constant(..) => self.clone(),
            _ => {
                let mut values = self.to_vec();
                values.rotate_left(shift);
                Self::Regular(values)
            }
        }
    }

    /// Evaluates the vector, read as polynomial coefficients in ascending
    /// degree order, at `x` (Horner).
    pub fn eval_coeff(&self, x: F) -> F {
        let values = self.to_vec();
        values
            .iter()
            .rev()
            .fold(F::ZERO, |acc, coeff| acc * x + coeff)
    }

    /// Inner product with another vector of the same length.
    pub fn inner_product(&self, other: &Self) -> F {
        assert_eq!(
            self.len(),
            other.len(),
            "inner product over mismatched lengths"
        );
        (0..self.len()).fold(F::ZERO, |acc, i| acc + self.get(i) * other.get(i))
    }
}

/// Evaluates the polynomial interpolating `values` over the size-`n`
/// power-of-two domain at an arbitrary point `x`, with the barycentric
/// formula. If `x` lies on the domain the matching value is returned
/// directly.
pub fn eval_lagrange<F: FieldExt>(values: &[F], x: F) -> F {
    let n = values.len();
    domain::assert_power_of_two(n, "interpolation domain size");
    let points: Vec<F> = domain::domain_points(n, None);

    if let Some(i) = points.iter().position(|p| *p == x) {
        return values[i];
    }

    // x^n - 1 over n, times sum of v_i * w^i / (x - w^i).
    let zh = x.pow_vartime([n as u64]) - F::ONE;
    let n_inv = F::from(n as u64).invert().expect("n is nonzero");
    let sum = values
        .iter()
        .zip(points.iter())
        .map(|(v, p)| *v * *p * (x - *p).invert().expect("x is off the domain"))
        .fold(F::ZERO, |acc, term| acc + term);
    zh * n_inv * sum
}

/// Batch interpolation: re-evaluates `values` (given over the natural
/// size-`n` domain) on every point of the `(ratio, id)` coset of the
/// covering domain. Used by the coset reparameterization of periodic-sample
/// and indeterminate columns.
pub fn eval_on_coset<F: FieldExt>(values: &[F], ratio: usize, id: usize) -> Vec<F> {
    let points: Vec<F> = domain::domain_points(values.len(), Some((ratio, id)));
    points
        .iter()
        .map(|x| eval_lagrange(values, *x))
        .collect_vec()
}
