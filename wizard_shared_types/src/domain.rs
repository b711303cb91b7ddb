//! Power-of-two multiplicative subgroup domains.
//!
//! Columns live over a domain of size `n = 2^k`; the indeterminate column
//! and the coset reparameterization of periodic samples both need the
//! generator of that subgroup.

use halo2curves::ff::PrimeField;

use crate::FieldExt;

/// Panics unless `n` is a positive power of two.
pub fn assert_power_of_two(n: usize, what: &str) {
    assert!(
        n > 0 && n.is_power_of_two(),
        "{what} must be a positive power of two, got {n}"
    );
}

/// Returns the generator of the multiplicative subgroup of order `order`.
///
/// Panics if `order` is not a power of two or exceeds the field's two-adic
/// subgroup (programmer error).
pub fn root_of_unity<F: FieldExt>(order: usize) -> F {
    assert_power_of_two(order, "subgroup order");
    let k = order.trailing_zeros();
    assert!(
        k <= F::S,
        "subgroup of order {order} exceeds the field's 2-adicity (S = {})",
        F::S
    );
    let mut root = F::ROOT_OF_UNITY;
    for _ in k..F::S {
        root = root.square();
    }
    root
}

/// The points of the size-`n` domain, optionally reparameterized onto coset
/// number `coset_id` of a `coset_ratio`-times finer covering.
///
/// Without a coset the points are `1, w, w^2, ...` for `w` the generator of
/// the order-`n` subgroup. On coset `(r, j)` every point is multiplied by
/// `g * w_{n*r}^j` with `g` the field's multiplicative generator, matching
/// the FFT-style evaluation contexts consuming these columns.
pub fn domain_points<F: FieldExt>(n: usize, coset: Option<(usize, usize)>) -> Vec<F> {
    let omega = root_of_unity::<F>(n);
    let shift = match coset {
        None => F::ONE,
        Some((ratio, id)) => {
            assert_power_of_two(ratio, "coset ratio");
            let fine = root_of_unity::<F>(n * ratio);
            F::MULTIPLICATIVE_GENERATOR * fine.pow_vartime([id as u64])
        }
    };
    let mut points = Vec::with_capacity(n);
    let mut acc = shift;
    for _ in 0..n {
        points.push(acc);
        acc *= omega;
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Fr;
    use halo2curves::ff::Field;

    #[test]
    fn root_of_unity_has_exact_order() {
        let w: Fr = root_of_unity(8);
        assert_ne!(w.pow_vartime([4u64]), Fr::ONE);
        assert_eq!(w.pow_vartime([8u64]), Fr::ONE);
    }

    #[test]
    fn domain_points_close_cyclically() {
        let pts: Vec<Fr> = domain_points(4, None);
        let w: Fr = root_of_unity(4);
        assert_eq!(pts[0], Fr::ONE);
        assert_eq!(pts[3] * w, pts[0]);
    }

    #[test]
    #[should_panic(expected = "power of two")]
    fn rejects_non_power_of_two_order() {
        let _: Fr = root_of_unity(6);
    }
}
