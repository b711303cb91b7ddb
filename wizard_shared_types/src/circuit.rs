//! A minimal witness-carrying arithmetic circuit.
//!
//! The circuit-mirrored verifier re-executes the protocol's transcript and
//! query checks over [Wire]s instead of field elements, so that checking one
//! proof becomes expressible inside another proof. Equality assertions are
//! collected, not short-circuited: [CircuitBuilder::finalize] reports every
//! unsatisfied constraint at once.
//!
//! Hash compressions requested through [CircuitBuilder::defer_compress] are
//! not constrained inline. They are recorded as (state, block, out) triples
//! and settled in one batched pass at finalization, standing in for the GKR
//! sum-check gadget that proves all transcript compressions in bulk. The
//! aggregator lives inside the builder and is threaded through explicitly;
//! there is no global registry keyed by circuit identity.

use halo2curves::ff::Field;
use thiserror::Error;
use tracing::debug;

use crate::{mimc, FieldExt};

/// Handle to one circuit value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Wire(usize);

#[derive(Clone, Debug)]
struct Assertion {
    left: usize,
    right: usize,
    label: String,
}

#[derive(Clone, Copy, Debug)]
struct DeferredCompression {
    state: usize,
    block: usize,
    out: usize,
}

/// Errors surfaced when settling a built circuit.
#[derive(Debug, Error)]
pub enum CircuitError {
    /// One or more constraints do not hold for the assigned witness.
    #[error("{} circuit constraint(s) unsatisfied: {}", .0.len(), join_failures(.0))]
    Unsatisfied(Vec<String>),
    /// The witness assignment itself is malformed.
    #[error("malformed circuit witness: {0}")]
    Malformed(String),
}

fn join_failures(failures: &[String]) -> String {
    failures.join("; ")
}

/// Summary of a settled circuit.
#[derive(Clone, Copy, Debug)]
pub struct CircuitStats {
    pub num_wires: usize,
    pub num_assertions: usize,
    pub num_deferred_compressions: usize,
}

/// Records gates eagerly over witness values.
///
/// Input wires are allocated unassigned; reading one before it is assigned
/// is a programmer error and panics.
#[derive(Clone, Debug)]
pub struct CircuitBuilder<F: FieldExt> {
    values: Vec<Option<F>>,
    assertions: Vec<Assertion>,
    deferred: Vec<DeferredCompression>,
    num_inputs: usize,
}

impl<F: FieldExt> CircuitBuilder<F> {
    pub fn new() -> Self {
        Self {
            values: Vec::new(),
            assertions: Vec::new(),
            deferred: Vec::new(),
            num_inputs: 0,
        }
    }

    /// Allocates an unassigned input wire.
    pub fn alloc_input(&mut self) -> Wire {
        self.num_inputs += 1;
        self.push(None)
    }

    /// Assigns a previously allocated input wire. Panics on double
    /// assignment (witness construction bug).
    pub fn assign_input(&mut self, wire: Wire, value: F) {
        assert!(
            self.values[wire.0].is_none(),
            "input wire {} assigned twice",
            wire.0
        );
        self.values[wire.0] = Some(value);
    }

    pub fn constant(&mut self, value: F) -> Wire {
        self.push(Some(value))
    }

    /// The witness value on `wire`. Panics if the wire was never assigned.
    pub fn value(&self, wire: Wire) -> F {
        self.values[wire.0]
            .unwrap_or_else(|| panic!("wire {} read before assignment", wire.0))
    }

    pub fn add(&mut self, a: Wire, b: Wire) -> Wire {
        let v = self.value(a) + self.value(b);
        self.push(Some(v))
    }

    pub fn sub(&mut self, a: Wire, b: Wire) -> Wire {
        let v = self.value(a) - self.value(b);
        self.push(Some(v))
    }

    pub fn mul(&mut self, a: Wire, b: Wire) -> Wire {
        let v = self.value(a) * self.value(b);
        self.push(Some(v))
    }

    pub fn neg(&mut self, a: Wire) -> Wire {
        let v = -self.value(a);
        self.push(Some(v))
    }

    pub fn scale(&mut self, a: Wire, scalar: F) -> Wire {
        let v = self.value(a) * scalar;
        self.push(Some(v))
    }

    pub fn linear_combination(&mut self, terms: &[(Wire, F)]) -> Wire {
        let v = terms
            .iter()
            .fold(F::ZERO, |acc, (w, c)| acc + self.value(*w) * c);
        self.push(Some(v))
    }

    /// Records the constraint `a == b` under a diagnostic label.
    pub fn assert_eq(&mut self, a: Wire, b: Wire, label: impl Into<String>) {
        self.assertions.push(Assertion {
            left: a.0,
            right: b.0,
            label: label.into(),
        });
    }

    /// Records the constraint `a == 0`.
    pub fn assert_zero(&mut self, a: Wire, label: impl Into<String>) {
        let zero = self.constant(F::ZERO);
        self.assert_eq(a, zero, label);
    }

    /// Little-endian binary decomposition of `wire` into `nbits` boolean
    /// wires, constrained to recompose to the original value.
    pub fn to_bits(&mut self, wire: Wire, nbits: usize) -> Vec<Wire> {
        let repr = self.value(wire).to_repr();
        let bytes = repr.as_ref();
        assert!(nbits <= bytes.len() * 8, "decomposition wider than repr");

        let mut bits = Vec::with_capacity(nbits);
        let mut terms = Vec::with_capacity(nbits);
        let mut coeff = F::ONE;
        for i in 0..nbits {
            let bit = (bytes[i / 8] >> (i % 8)) & 1;
            let bit_wire = self.constant(F::from(bit as u64));
            let square = self.mul(bit_wire, bit_wire);
            self.assert_eq(square, bit_wire, format!("bit {i} boolean"));
            terms.push((bit_wire, coeff));
            coeff = coeff.double();
            bits.push(bit_wire);
        }
        let recomposed = self.linear_combination(&terms);
        self.assert_eq(recomposed, wire, "bit recomposition");
        bits
    }

    /// MiMC compression constrained inline, gate by gate.
    pub fn mimc_compress(&mut self, state: Wire, block: Wire) -> Wire {
        let mut tmp = block;
        for c in mimc::round_constants::<F>() {
            let c_wire = self.constant(c);
            let sum = self.add(tmp, state);
            let keyed = self.add(sum, c_wire);
            let sq = self.mul(keyed, keyed);
            let quad = self.mul(sq, sq);
            tmp = self.mul(quad, keyed);
        }
        let fed = self.add(tmp, block);
        self.add(fed, state)
    }

    /// MiMC compression recorded for the deferred batch instead of being
    /// constrained inline.
    pub fn defer_compress(&mut self, state: Wire, block: Wire) -> Wire {
        let v = mimc::compress(self.value(state), self.value(block));
        let out = self.push(Some(v));
        self.deferred.push(DeferredCompression {
            state: state.0,
            block: block.0,
            out: out.0,
        });
        out
    }

    pub fn num_wires(&self) -> usize {
        self.values.len()
    }

    pub fn num_deferred_compressions(&self) -> usize {
        self.deferred.len()
    }

    /// Settles every recorded assertion and the deferred compression batch,
    /// reporting all failures together.
    pub fn finalize(self) -> Result<CircuitStats, CircuitError> {
        let stats = CircuitStats {
            num_wires: self.values.len(),
            num_assertions: self.assertions.len(),
            num_deferred_compressions: self.deferred.len(),
        };

        let mut failures = Vec::new();
        for assertion in &self.assertions {
            let left = self.values[assertion.left]
                .ok_or_else(|| CircuitError::Malformed(format!(
                    "assertion '{}' references an unassigned wire",
                    assertion.label
                )))?;
            let right = self.values[assertion.right].ok_or_else(|| {
                CircuitError::Malformed(format!(
                    "assertion '{}' references an unassigned wire",
                    assertion.label
                ))
            })?;
            if left != right {
                failures.push(assertion.label.clone());
            }
        }

        for (i, d) in self.deferred.iter().enumerate() {
            let state = self.values[d.state].expect("deferred state wire unassigned");
            let block = self.values[d.block].expect("deferred block wire unassigned");
            let out = self.values[d.out].expect("deferred out wire unassigned");
            if mimc::compress(state, block) != out {
                failures.push(format!("deferred hash batch entry {i}"));
            }
        }

        debug!(
            wires = stats.num_wires,
            assertions = stats.num_assertions,
            deferred = stats.num_deferred_compressions,
            "circuit settled"
        );

        if failures.is_empty() {
            Ok(stats)
        } else {
            Err(CircuitError::Unsatisfied(failures))
        }
    }

    fn push(&mut self, value: Option<F>) -> Wire {
        self.values.push(value);
        Wire(self.values.len() - 1)
    }
}
