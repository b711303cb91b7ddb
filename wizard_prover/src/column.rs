//! Columns: round-tagged, fixed-size vector objects.
//!
//! Only the natural variant carries prover-assigned content; every other
//! variant derives its assignment from parents, from an expression, or from
//! a closed-form pattern. All variants share one contract: a size, a round,
//! cyclic shifting, and native plus circuit-mirrored assignment retrieval.

use std::fmt;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use wizard_shared_types::circuit::{CircuitBuilder, Wire};
use wizard_shared_types::{domain, FieldExt};

use crate::accessor::Accessor;
use crate::circuit_verifier::CircuitRuntime;
use crate::runtime::RuntimeAccess;
use crate::smartvec::{self, SmartVector};
use crate::symbolic::Expression;

/// Dense handle of a declared column.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ColumnId(pub usize);

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "column#{}", self.0)
    }
}

/// Who gets to see a column's assignment, and through which channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visibility {
    /// Dropped from the transcript and the proof. Compiler-internal.
    Ignored,
    /// Committed through a polynomial commitment. Must be rewritten by a
    /// compiler pass before proving.
    Committed,
    /// Sent to the verifier in the clear inside the proof.
    ProofMsg,
    /// Known offline; must be rewritten by a compiler pass before proving.
    Precomputed,
    /// Known offline and baked into the verifying key.
    VerifyingKey,
}

impl Visibility {
    /// Public columns are absorbed into the transcript.
    pub fn is_public(&self) -> bool {
        matches!(self, Visibility::ProofMsg | Visibility::VerifyingKey)
    }

    /// Exported columns travel inside the proof.
    pub fn is_exported(&self) -> bool {
        matches!(self, Visibility::ProofMsg)
    }
}

/// The declaration of a prover-assigned column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NaturalColumn {
    pub id: ColumnId,
    pub round: usize,
    pub size: usize,
}

/// One slice of a [Column::Patchwork] concatenation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "F: FieldExt")]
pub enum PatchworkPart<F: FieldExt> {
    /// Contributes its full assignment, in order.
    Column(Column<F>),
    /// Contributes a single entry.
    Accessor(Accessor<F>),
}

impl<F: FieldExt> PatchworkPart<F> {
    fn len(&self) -> usize {
        match self {
            PatchworkPart::Column(column) => column.size(),
            PatchworkPart::Accessor(_) => 1,
        }
    }

    fn round(&self) -> usize {
        match self {
            PatchworkPart::Column(column) => column.round(),
            PatchworkPart::Accessor(accessor) => accessor.round(),
        }
    }
}

/// A verifier-visible concatenation of heterogeneous parts behaving like
/// one natural column.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "F: FieldExt")]
pub struct PatchworkColumn<F: FieldExt> {
    pub parts: Vec<PatchworkPart<F>>,
    pub size: usize,
}

impl<F: FieldExt> PatchworkColumn<F> {
    /// Panics if the parts do not add up to `size` (programmer error).
    pub fn new(parts: Vec<PatchworkPart<F>>, size: usize) -> Self {
        let total: usize = parts.iter().map(|part| part.len()).sum();
        assert_eq!(
            total, size,
            "patchwork parts add up to {total}, declared size is {size}"
        );
        Self { parts, size }
    }
}

/// A column of any variant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "F: FieldExt")]
pub enum Column<F: FieldExt> {
    /// Assigned by the prover at runtime.
    Natural(NaturalColumn),
    /// A cyclic rotation of its parent.
    Shifted {
        parent: Box<Column<F>>,
        offset: isize,
    },
    /// Derived pointwise from an expression over other columns.
    FromExpr(Box<Expression<F>>),
    /// 1 at every index congruent to `offset` modulo `period`, else 0,
    /// optionally re-evaluated over a coset of the covering domain.
    PeriodicSample {
        size: usize,
        period: usize,
        offset: usize,
        coset: Option<(usize, usize)>,
    },
    /// The successive powers of the domain's root of unity.
    Indeterminate {
        size: usize,
        coset: Option<(usize, usize)>,
    },
    /// Every entry equal to one fixed value.
    Constant { value: F, size: usize },
    /// Concatenation of heterogeneous parts.
    Patchwork(PatchworkColumn<F>),
}

impl<F: FieldExt> Column<F> {
    pub fn size(&self) -> usize {
        match self {
            Column::Natural(natural) => natural.size,
            Column::Shifted { parent, .. } => parent.size(),
            Column::FromExpr(expr) => expr
                .size()
                .unwrap_or_else(|err| panic!("ill-formed expression column: {err}")),
            Column::PeriodicSample { size, .. } => *size,
            Column::Indeterminate { size, .. } => *size,
            Column::Constant { size, .. } => *size,
            Column::Patchwork(patchwork) => patchwork.size,
        }
    }

    /// The round at which the column's assignment becomes available.
    pub fn round(&self) -> usize {
        match self {
            Column::Natural(natural) => natural.round,
            Column::Shifted { parent, .. } => parent.round(),
            Column::FromExpr(expr) => expr.round(),
            Column::PeriodicSample { .. } | Column::Indeterminate { .. } => 0,
            Column::Constant { .. } => 0,
            Column::Patchwork(patchwork) => patchwork
                .parts
                .iter()
                .map(|part| part.round())
                .max()
                .unwrap_or(0),
        }
    }

    /// Cyclic shift by `offset`, composable: `shift(n).shift(m)` is
    /// observationally `shift(n + m)`. Closed-form variants rewrite their
    /// parameters; expressions distribute the shift into their leaves.
    pub fn shift(&self, offset: isize) -> Column<F> {
        if offset.rem_euclid(self.size() as isize) == 0 {
            return self.clone();
        }
        match self {
            Column::Shifted { parent, offset: prev } => parent.shift(*prev + offset),
            Column::FromExpr(expr) => Column::FromExpr(Box::new(expr.shift_columns(offset))),
            Column::PeriodicSample {
                size,
                period,
                offset: sample_offset,
                coset: None,
            } => Column::PeriodicSample {
                size: *size,
                period: *period,
                offset: (*sample_offset as isize - offset).rem_euclid(*period as isize) as usize,
                coset: None,
            },
            Column::Constant { .. } => self.clone(),
            _ => Column::Shifted {
                parent: Box::new(self.clone()),
                offset,
            },
        }
    }

    /// The column's assignment for the given runtime.
    pub fn get_assignment(&self, runtime: &dyn RuntimeAccess<F>) -> SmartVector<F> {
        match self {
            Column::Natural(natural) => runtime.column_assignment(natural.id),
            Column::Shifted { parent, offset } => {
                parent.get_assignment(runtime).rotate_left(*offset)
            }
            Column::FromExpr(expr) => expr
                .eval_native(runtime)
                .unwrap_or_else(|err| panic!("ill-formed expression column: {err}")),
            Column::PeriodicSample {
                size,
                period,
                offset,
                coset,
            } => SmartVector::Regular(periodic_values(*size, *period, *offset, *coset)),
            Column::Indeterminate { size, coset } => {
                SmartVector::Regular(indeterminate_values(*size, *coset))
            }
            Column::Constant { value, size } => SmartVector::constant(*value, *size),
            Column::Patchwork(patchwork) => {
                let mut out = Vec::with_capacity(patchwork.size);
                for part in &patchwork.parts {
                    match part {
                        PatchworkPart::Column(column) => {
                            out.extend(column.get_assignment(runtime).to_vec())
                        }
                        PatchworkPart::Accessor(accessor) => out.push(accessor.get_val(runtime)),
                    }
                }
                SmartVector::Regular(out)
            }
        }
    }

    /// Circuit mirror of [Self::get_assignment], one wire per row.
    pub fn get_assignment_circuit(
        &self,
        builder: &mut CircuitBuilder<F>,
        runtime: &CircuitRuntime<'_, F>,
    ) -> Vec<Wire> {
        match self {
            Column::Natural(natural) => runtime.column_wires(natural.id).to_vec(),
            Column::Shifted { parent, offset } => {
                let mut wires = parent.get_assignment_circuit(builder, runtime);
                let n = wires.len();
                if n > 0 {
                    wires.rotate_left(offset.rem_euclid(n as isize) as usize);
                }
                wires
            }
            Column::FromExpr(expr) => expr
                .eval_circuit(builder, runtime)
                .unwrap_or_else(|err| panic!("ill-formed expression column: {err}")),
            Column::PeriodicSample {
                size,
                period,
                offset,
                coset,
            } => periodic_values(*size, *period, *offset, *coset)
                .into_iter()
                .map(|value| builder.constant(value))
                .collect_vec(),
            Column::Indeterminate { size, coset } => indeterminate_values::<F>(*size, *coset)
                .into_iter()
                .map(|value| builder.constant(value))
                .collect_vec(),
            Column::Constant { value, size } => {
                let wire = builder.constant(*value);
                vec![wire; *size]
            }
            Column::Patchwork(patchwork) => {
                let mut out = Vec::with_capacity(patchwork.size);
                for part in &patchwork.parts {
                    match part {
                        PatchworkPart::Column(column) => {
                            out.extend(column.get_assignment_circuit(builder, runtime))
                        }
                        PatchworkPart::Accessor(accessor) => {
                            out.push(accessor.get_val_circuit(builder, runtime))
                        }
                    }
                }
                out
            }
        }
    }

    /// Wraps the column into an expression leaf.
    pub fn expr(self) -> Expression<F> {
        Expression::Column(Box::new(self))
    }
}

/// The closed-form values of a periodic-sample column: 1 at every index
/// congruent to `offset` modulo `period`, else 0, optionally re-evaluated
/// over the `(ratio, id)` coset.
pub fn periodic_values<F: FieldExt>(
    size: usize,
    period: usize,
    offset: usize,
    coset: Option<(usize, usize)>,
) -> Vec<F> {
    domain::assert_power_of_two(period, "periodic-sample period");
    assert!(
        period <= size && offset < period,
        "periodic sample with period {period}, offset {offset} over size {size}"
    );
    let natural = (0..size)
        .map(|i| if i % period == offset { F::ONE } else { F::ZERO })
        .collect_vec();
    match coset {
        None => natural,
        Some((ratio, id)) => smartvec::eval_on_coset(&natural, ratio, id),
    }
}

/// The closed-form values of an indeterminate column: the points of the
/// size-`size` evaluation domain, or of its `(ratio, id)` coset.
pub fn indeterminate_values<F: FieldExt>(size: usize, coset: Option<(usize, usize)>) -> Vec<F> {
    domain::domain_points(size, coset)
}
