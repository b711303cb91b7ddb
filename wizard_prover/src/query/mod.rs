//! Queries: predicates over columns that the verifier checks.
//!
//! Every query declares a round, can check itself natively against a
//! runtime, and (for the circuit-checkable variants) can mirror that check
//! inside a verifier circuit. Queries with a non-trivial result (openings,
//! inner products, univariate evaluations) also compute that result for the
//! proof.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use wizard_shared_types::circuit::CircuitBuilder;
use wizard_shared_types::FieldExt;

use crate::circuit_verifier::CircuitRuntime;
use crate::runtime::RuntimeAccess;

pub mod fixed_permutation;
pub mod global;
pub mod inner_product;
pub mod local;
pub mod mimc;
pub mod permutation;
pub mod range;
pub mod univariate;

pub use fixed_permutation::FixedPermutation;
pub use global::GlobalConstraint;
pub use inner_product::InnerProduct;
pub use local::{LocalConstraint, LocalOpening};
pub use mimc::MimcCompression;
pub use permutation::Permutation;
pub use range::Range;
pub use univariate::UnivariateEval;

/// Dense handle of a declared query.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct QueryId(pub usize);

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "query#{}", self.0)
    }
}

/// The value a query contributes to the proof and the transcript.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "F: FieldExt")]
pub enum QueryResult<F: FieldExt> {
    None,
    Scalar(F),
    Vector(Vec<F>),
}

impl<F: FieldExt> QueryResult<F> {
    /// Flattens the result into the transcript absorption order.
    pub fn to_elements(&self) -> Vec<F> {
        match self {
            QueryResult::None => Vec::new(),
            QueryResult::Scalar(value) => vec![*value],
            QueryResult::Vector(values) => values.clone(),
        }
    }
}

/// The shape a query's result is required to have.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResultArity {
    None,
    Scalar,
    Vector(usize),
}

/// A failed query check. Field values are rendered eagerly so the error
/// stays free of the field type parameter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("global constraint {query} does not vanish at rows {rows:?}")]
    GlobalConstraintFailed { query: QueryId, rows: Vec<usize> },
    #[error("local constraint {query} evaluates to {value} at row 0")]
    LocalConstraintFailed { query: QueryId, value: String },
    #[error("local opening {query}: proof claims {claimed}, column opens to {actual}")]
    LocalOpeningMismatch {
        query: QueryId,
        claimed: String,
        actual: String,
    },
    #[error("inner product {query}: proof claims {claimed}, columns give {actual}")]
    InnerProductMismatch {
        query: QueryId,
        claimed: String,
        actual: String,
    },
    #[error(
        "univariate evaluation {query}, column {index}: proof claims {claimed}, \
         evaluation gives {actual}"
    )]
    UnivariateMismatch {
        query: QueryId,
        index: usize,
        claimed: String,
        actual: String,
    },
    #[error("permutation {query}: grand products differ, tables are not row-permutations")]
    PermutationMismatch { query: QueryId },
    #[error("fixed permutation {query}: grand products differ under the declared mapping")]
    FixedPermutationMismatch { query: QueryId },
    #[error("range {query}: row {row} holds {value}, outside [0, {bound})")]
    RangeExceeded {
        query: QueryId,
        row: usize,
        value: String,
        bound: usize,
    },
    #[error("hash compression {query}: rows {rows:?} do not satisfy newState = compress(oldState, block)")]
    MimcMismatch { query: QueryId, rows: Vec<usize> },
}

/// A query of any variant.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "F: FieldExt")]
pub enum Query<F: FieldExt> {
    GlobalConstraint(GlobalConstraint<F>),
    LocalConstraint(LocalConstraint<F>),
    LocalOpening(LocalOpening<F>),
    InnerProduct(InnerProduct<F>),
    UnivariateEval(UnivariateEval<F>),
    Permutation(Permutation<F>),
    FixedPermutation(FixedPermutation<F>),
    Range(Range<F>),
    MimcCompression(MimcCompression<F>),
}

impl<F: FieldExt> Query<F> {
    pub fn id(&self) -> QueryId {
        match self {
            Query::GlobalConstraint(q) => q.id,
            Query::LocalConstraint(q) => q.id,
            Query::LocalOpening(q) => q.id,
            Query::InnerProduct(q) => q.id,
            Query::UnivariateEval(q) => q.id,
            Query::Permutation(q) => q.id,
            Query::FixedPermutation(q) => q.id,
            Query::Range(q) => q.id,
            Query::MimcCompression(q) => q.id,
        }
    }

    /// The round at which all of the query's inputs are available.
    pub fn round(&self) -> usize {
        match self {
            Query::GlobalConstraint(q) => q.round(),
            Query::LocalConstraint(q) => q.round(),
            Query::LocalOpening(q) => q.round(),
            Query::InnerProduct(q) => q.round(),
            Query::UnivariateEval(q) => q.round(),
            Query::Permutation(q) => q.round(),
            Query::FixedPermutation(q) => q.round(),
            Query::Range(q) => q.round(),
            Query::MimcCompression(q) => q.round(),
        }
    }

    /// The shape the query's result must have in a proof.
    pub fn result_arity(&self) -> ResultArity {
        match self {
            Query::GlobalConstraint(_)
            | Query::LocalConstraint(_)
            | Query::Permutation(_)
            | Query::FixedPermutation(_)
            | Query::Range(_)
            | Query::MimcCompression(_) => ResultArity::None,
            Query::LocalOpening(_) | Query::InnerProduct(_) => ResultArity::Scalar,
            Query::UnivariateEval(q) => ResultArity::Vector(q.columns.len()),
        }
    }

    /// Computes the query's contribution to the proof.
    pub fn compute_result(&self, runtime: &dyn RuntimeAccess<F>) -> QueryResult<F> {
        match self {
            Query::LocalOpening(q) => q.compute_result(runtime),
            Query::InnerProduct(q) => q.compute_result(runtime),
            Query::UnivariateEval(q) => q.compute_result(runtime),
            _ => QueryResult::None,
        }
    }

    /// Checks the query's predicate against a runtime.
    pub fn check(&self, runtime: &dyn RuntimeAccess<F>) -> Result<(), QueryError> {
        match self {
            Query::GlobalConstraint(q) => q.check(runtime),
            Query::LocalConstraint(q) => q.check(runtime),
            Query::LocalOpening(q) => q.check(runtime),
            Query::InnerProduct(q) => q.check(runtime),
            Query::UnivariateEval(q) => q.check(runtime),
            Query::Permutation(q) => q.check(runtime),
            Query::FixedPermutation(q) => q.check(runtime),
            Query::Range(q) => q.check(runtime),
            Query::MimcCompression(q) => q.check(runtime),
        }
    }

    /// Mirrors the check inside a verifier circuit. Panics for the variants
    /// that must be compiled away before circuit verification (permutation
    /// arguments and range checks).
    pub fn check_circuit(
        &self,
        builder: &mut CircuitBuilder<F>,
        runtime: &CircuitRuntime<'_, F>,
    ) {
        match self {
            Query::GlobalConstraint(q) => q.check_circuit(builder, runtime),
            Query::LocalConstraint(q) => q.check_circuit(builder, runtime),
            Query::LocalOpening(q) => q.check_circuit(builder, runtime),
            Query::InnerProduct(q) => q.check_circuit(builder, runtime),
            Query::UnivariateEval(q) => q.check_circuit(builder, runtime),
            Query::Permutation(q) => {
                panic!("{} cannot be checked in-circuit, compile it away first", q.id)
            }
            Query::FixedPermutation(q) => {
                panic!("{} cannot be checked in-circuit, compile it away first", q.id)
            }
            Query::Range(q) => {
                panic!("{} cannot be checked in-circuit, compile it away first", q.id)
            }
            Query::MimcCompression(q) => q.check_circuit(builder, runtime),
        }
    }
}
