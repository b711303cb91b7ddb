//! Wizard is a protocol engine for declaring, compiling, proving and
//! verifying round-based polynomial interactive oracle proofs.
//!
//! A definer callback populates a [compiled::CompiledIOP] through the
//! builder API with columns, coins and queries partitioned by round;
//! compiler passes may rewrite the description; the prover runtime then
//! executes the rounds against a Fiat-Shamir transcript and seals a
//! [runtime::Proof], which the verifier runtime (native, or mirrored inside
//! an arithmetic circuit for recursion) replays and checks.

pub mod accessor;
pub mod circuit_verifier;
pub mod coin;
pub mod column;
pub mod compiled;
pub mod compiler;
pub mod query;
pub mod runtime;
pub mod smartvec;
pub mod symbolic;

pub use wizard_shared_types::{FieldExt, Fr};

pub use accessor::Accessor;
pub use circuit_verifier::{verify_proof_in_circuit, WizardVerifierCircuit};
pub use coin::{Coin, CoinValue};
pub use column::{Column, Visibility};
pub use compiled::{compile, Builder, CompiledIOP};
pub use query::{Query, QueryId, QueryResult};
pub use runtime::{
    prove, prove_with_sponge, verify, verify_with_sponge, Proof, ProverAction, ProverError,
    ProverRuntime, VerifierAction, VerifierError, VerifierRuntime,
};
pub use smartvec::SmartVector;
pub use symbolic::Expression;
