//! Sponges with rigged outputs. For testing purposes only!

use std::marker::PhantomData;

use halo2curves::ff::Field;

use super::TranscriptSponge;
use crate::FieldExt;

/// A sponge that always squeezes the same constant, letting tests pin the
/// exact challenge a protocol will see.
#[derive(Clone, Debug)]
pub struct ConstSponge<F: FieldExt> {
    value: u64,
    _marker: PhantomData<F>,
}

impl<F: FieldExt> ConstSponge<F> {
    pub fn with_value(value: u64) -> Self {
        Self {
            value,
            _marker: PhantomData,
        }
    }
}

impl<F: FieldExt> TranscriptSponge<F> for ConstSponge<F> {
    fn new() -> Self {
        Self::with_value(1)
    }

    fn absorb(&mut self, _elem: F) {}

    fn squeeze(&mut self) -> F {
        F::from(self.value)
    }
}

/// A sponge that squeezes 0, 1, 2, ... regardless of what was absorbed.
#[derive(Clone, Debug, Default)]
pub struct CountingSponge<F: FieldExt> {
    counter: u64,
    _marker: PhantomData<F>,
}

impl<F: FieldExt> TranscriptSponge<F> for CountingSponge<F> {
    fn new() -> Self {
        Self::default()
    }

    fn absorb(&mut self, _elem: F) {}

    fn squeeze(&mut self) -> F {
        let res = self.counter;
        self.counter += 1;
        F::from(res)
    }
}
