//! Symbolic arithmetic expressions over columns and accessors.
//!
//! Expressions are the payload of global and local constraint queries and
//! the definition of [crate::column::Column::FromExpr] columns. They are
//! built with the usual operator sugar and evaluated either natively (one
//! [SmartVector] per leaf column) or inside a verifier circuit (one wire
//! per row).

use std::cmp::max;
use std::ops::{Add, Mul, Neg, Sub};

use itertools::Itertools;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use wizard_shared_types::circuit::{CircuitBuilder, Wire};
use wizard_shared_types::FieldExt;

use crate::accessor::Accessor;
use crate::circuit_verifier::CircuitRuntime;
use crate::column::Column;
use crate::runtime::RuntimeAccess;
use crate::smartvec::SmartVector;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExpressionError {
    /// Scalar-only expressions have no row count of their own.
    #[error("expression has no column leaf to determine a size")]
    NoLeafColumn,
    #[error("mismatched column sizes within one expression: {0} vs {1}")]
    SizeMismatch(usize, usize),
}

/// A symbolic arithmetic circuit over column and accessor leaves.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(bound = "F: FieldExt")]
pub enum Expression<F: FieldExt> {
    /// constant
    Constant(F),
    /// column leaf, evaluated row by row
    Column(Box<Column<F>>),
    /// accessor leaf, a scalar broadcast over every row
    Accessor(Accessor<F>),
    /// negated expression
    Negated(Box<Expression<F>>),
    /// sum of two expressions
    Sum(Box<Expression<F>>, Box<Expression<F>>),
    /// product of two expressions
    Product(Box<Expression<F>>, Box<Expression<F>>),
    /// scaled expression
    Scaled(Box<Expression<F>>, F),
}

impl<F: FieldExt> Expression<F> {
    /// Evaluate the expression using the provided closures to perform the
    /// operations.
    pub fn evaluate<T>(
        &self,
        constant: &impl Fn(F) -> T,
        column_eval: &impl Fn(&Column<F>) -> T,
        accessor_eval: &impl Fn(&Accessor<F>) -> T,
        negated: &impl Fn(T) -> T,
        sum: &impl Fn(T, T) -> T,
        product: &impl Fn(T, T) -> T,
        scaled: &impl Fn(T, F) -> T,
    ) -> T {
        match self {
            Expression::Constant(scalar) => constant(*scalar),
            Expression::Column(column) => column_eval(column),
            Expression::Accessor(accessor) => accessor_eval(accessor),
            Expression::Negated(a) => {
                let a = a.evaluate(
                    constant,
                    column_eval,
                    accessor_eval,
                    negated,
                    sum,
                    product,
                    scaled,
                );
                negated(a)
            }
            Expression::Sum(a, b) => {
                let a = a.evaluate(
                    constant,
                    column_eval,
                    accessor_eval,
                    negated,
                    sum,
                    product,
                    scaled,
                );
                let b = b.evaluate(
                    constant,
                    column_eval,
                    accessor_eval,
                    negated,
                    sum,
                    product,
                    scaled,
                );
                sum(a, b)
            }
            Expression::Product(a, b) => {
                let a = a.evaluate(
                    constant,
                    column_eval,
                    accessor_eval,
                    negated,
                    sum,
                    product,
                    scaled,
                );
                let b = b.evaluate(
                    constant,
                    column_eval,
                    accessor_eval,
                    negated,
                    sum,
                    product,
                    scaled,
                );
                product(a, b)
            }
            Expression::Scaled(a, f) => {
                let a = a.evaluate(
                    constant,
                    column_eval,
                    accessor_eval,
                    negated,
                    sum,
                    product,
                    scaled,
                );
                scaled(a, *f)
            }
        }
    }

    /// Visits every node of the expression tree, pre-order.
    pub fn traverse<D>(
        &self,
        observer_fn: &mut impl FnMut(&Expression<F>) -> Result<(), D>,
    ) -> Result<(), D> {
        observer_fn(self)?;
        match self {
            Expression::Constant(_) | Expression::Column(_) | Expression::Accessor(_) => Ok(()),
            Expression::Negated(exp) => exp.traverse(observer_fn),
            Expression::Scaled(exp, _) => exp.traverse(observer_fn),
            Expression::Sum(lhs, rhs) | Expression::Product(lhs, rhs) => {
                lhs.traverse(observer_fn)?;
                rhs.traverse(observer_fn)
            }
        }
    }

    /// The earliest round at which every leaf of the expression is
    /// available: the maximum declaration round over column and accessor
    /// leaves.
    pub fn round(&self) -> usize {
        let mut round = 0;
        let _: Result<(), ()> = self.traverse(&mut |expr| {
            match expr {
                Expression::Column(column) => round = max(round, column.round()),
                Expression::Accessor(accessor) => round = max(round, accessor.round()),
                _ => {}
            }
            Ok(())
        });
        round
    }

    /// The common row count of the column leaves. Scalar leaves broadcast
    /// and do not contribute a size.
    pub fn size(&self) -> Result<usize, ExpressionError> {
        let mut size: Option<usize> = None;
        self.traverse(&mut |expr| {
            if let Expression::Column(column) = expr {
                let this = column.size();
                match size {
                    None => size = Some(this),
                    Some(prev) if prev != this => {
                        return Err(ExpressionError::SizeMismatch(prev, this))
                    }
                    Some(_) => {}
                }
            }
            Ok(())
        })?;
        size.ok_or(ExpressionError::NoLeafColumn)
    }

    /// Total degree in the column leaves.
    pub fn degree(&self) -> usize {
        match self {
            Expression::Constant(_) | Expression::Accessor(_) => 0,
            Expression::Column(_) => 1,
            Expression::Negated(a) | Expression::Scaled(a, _) => a.degree(),
            Expression::Sum(a, b) => max(a.degree(), b.degree()),
            Expression::Product(a, b) => a.degree() + b.degree(),
        }
    }

    /// Rebuilds the expression with every column leaf shifted by `offset`.
    /// Scalar leaves are untouched.
    pub fn shift_columns(&self, offset: isize) -> Expression<F> {
        self.evaluate(
            &Expression::Constant,
            &|column| Expression::Column(Box::new(column.shift(offset))),
            &|accessor| Expression::Accessor(accessor.clone()),
            &|a| Expression::Negated(Box::new(a)),
            &|a, b| Expression::Sum(Box::new(a), Box::new(b)),
            &|a, b| Expression::Product(Box::new(a), Box::new(b)),
            &|a, f| Expression::Scaled(Box::new(a), f),
        )
    }

    /// Evaluates the expression over its full row range, row by row.
    pub fn eval_native(
        &self,
        runtime: &dyn RuntimeAccess<F>,
    ) -> Result<SmartVector<F>, ExpressionError> {
        let size = self.size()?;
        Ok(self.evaluate(
            &|scalar| SmartVector::constant(scalar, size),
            &|column| column.get_assignment(runtime),
            &|accessor| SmartVector::constant(accessor.get_val(runtime), size),
            &|a: SmartVector<F>| map_entries(&a, |v| -v),
            &|a, b| zip_entries(&a, &b, |x, y| x + y),
            &|a, b| zip_entries(&a, &b, |x, y| x * y),
            &|a, f| map_entries(&a, |v| v * f),
        ))
    }

    /// Mirror of [Self::eval_native] over circuit wires, one wire per row.
    pub fn eval_circuit(
        &self,
        builder: &mut CircuitBuilder<F>,
        runtime: &CircuitRuntime<'_, F>,
    ) -> Result<Vec<Wire>, ExpressionError> {
        let size = self.size()?;
        Ok(self.eval_circuit_inner(builder, runtime, size))
    }

    fn eval_circuit_inner(
        &self,
        builder: &mut CircuitBuilder<F>,
        runtime: &CircuitRuntime<'_, F>,
        size: usize,
    ) -> Vec<Wire> {
        match self {
            Expression::Constant(scalar) => {
                let wire = builder.constant(*scalar);
                vec![wire; size]
            }
            Expression::Column(column) => column.get_assignment_circuit(builder, runtime),
            Expression::Accessor(accessor) => {
                let wire = accessor.get_val_circuit(builder, runtime);
                vec![wire; size]
            }
            Expression::Negated(a) => {
                let a = a.eval_circuit_inner(builder, runtime, size);
                a.iter().map(|w| builder.neg(*w)).collect_vec()
            }
            Expression::Sum(a, b) => {
                let a = a.eval_circuit_inner(builder, runtime, size);
                let b = b.eval_circuit_inner(builder, runtime, size);
                a.iter()
                    .zip(b.iter())
                    .map(|(x, y)| builder.add(*x, *y))
                    .collect_vec()
            }
            Expression::Product(a, b) => {
                let a = a.eval_circuit_inner(builder, runtime, size);
                let b = b.eval_circuit_inner(builder, runtime, size);
                a.iter()
                    .zip(b.iter())
                    .map(|(x, y)| builder.mul(*x, *y))
                    .collect_vec()
            }
            Expression::Scaled(a, f) => {
                let a = a.eval_circuit_inner(builder, runtime, size);
                a.iter().map(|w| builder.scale(*w, *f)).collect_vec()
            }
        }
    }
}

/// Row count above which pointwise evaluation switches to rayon.
const PAR_EVAL_THRESHOLD: usize = 1 << 10;

fn map_entries<F: FieldExt>(a: &SmartVector<F>, f: impl Fn(F) -> F + Sync) -> SmartVector<F> {
    match a {
        SmartVector::Constant(value, len) => SmartVector::Constant(f(*value), *len),
        _ if a.len() >= PAR_EVAL_THRESHOLD => {
            SmartVector::Regular((0..a.len()).into_par_iter().map(|i| f(a.get(i))).collect())
        }
        _ => SmartVector::Regular((0..a.len()).map(|i| f(a.get(i))).collect_vec()),
    }
}

fn zip_entries<F: FieldExt>(
    a: &SmartVector<F>,
    b: &SmartVector<F>,
    f: impl Fn(F, F) -> F + Sync,
) -> SmartVector<F> {
    debug_assert_eq!(a.len(), b.len());
    match (a, b) {
        (SmartVector::Constant(x, len), SmartVector::Constant(y, _)) => {
            SmartVector::Constant(f(*x, *y), *len)
        }
        _ if a.len() >= PAR_EVAL_THRESHOLD => SmartVector::Regular(
            (0..a.len())
                .into_par_iter()
                .map(|i| f(a.get(i), b.get(i)))
                .collect(),
        ),
        _ => SmartVector::Regular((0..a.len()).map(|i| f(a.get(i), b.get(i))).collect_vec()),
    }
}

impl<F: FieldExt> Neg for Expression<F> {
    type Output = Expression<F>;
    fn neg(self) -> Self::Output {
        Expression::Negated(Box::new(self))
    }
}

impl<F: FieldExt> Add for Expression<F> {
    type Output = Expression<F>;
    fn add(self, rhs: Expression<F>) -> Expression<F> {
        Expression::Sum(Box::new(self), Box::new(rhs))
    }
}

impl<F: FieldExt> Sub for Expression<F> {
    type Output = Expression<F>;
    fn sub(self, rhs: Expression<F>) -> Expression<F> {
        Expression::Sum(Box::new(self), Box::new(Expression::Negated(Box::new(rhs))))
    }
}

impl<F: FieldExt> Mul for Expression<F> {
    type Output = Expression<F>;
    fn mul(self, rhs: Expression<F>) -> Expression<F> {
        Expression::Product(Box::new(self), Box::new(rhs))
    }
}

impl<F: FieldExt> Mul<F> for Expression<F> {
    type Output = Expression<F>;
    fn mul(self, rhs: F) -> Expression<F> {
        Expression::Scaled(Box::new(self), rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{ColumnId, NaturalColumn};
    use halo2curves::ff::Field;
    use wizard_shared_types::Fr;

    fn natural(id: usize, round: usize, size: usize) -> Expression<Fr> {
        Column::Natural(NaturalColumn { id: ColumnId(id), round, size }).expr()
    }

    #[test]
    fn round_is_max_over_leaves() {
        let expr = natural(0, 2, 8) * natural(1, 0, 8) + Expression::Constant(Fr::from(3));
        assert_eq!(expr.round(), 2);
        assert_eq!(Expression::Constant(Fr::from(1)).round(), 0);
    }

    #[test]
    fn size_agrees_or_errors() {
        let ok = natural(0, 0, 8) + natural(1, 0, 8);
        assert_eq!(ok.size(), Ok(8));

        let mismatched = natural(0, 0, 8) + natural(1, 0, 4);
        assert_eq!(mismatched.size(), Err(ExpressionError::SizeMismatch(8, 4)));

        let scalar_only = Expression::<Fr>::Constant(Fr::ONE);
        assert_eq!(scalar_only.size(), Err(ExpressionError::NoLeafColumn));
    }

    #[test]
    fn degree_tracks_products() {
        let a = natural(0, 0, 8);
        let b = natural(1, 0, 8);
        let expr = a.clone() * b.clone() * a.clone() + b;
        assert_eq!(expr.degree(), 3);
    }

    #[test]
    fn shifting_rewrites_column_leaves_only() {
        let expr = natural(0, 0, 8) + Expression::Constant(Fr::from(9));
        let shifted = expr.shift_columns(3);
        let mut saw_shifted = false;
        let _: Result<(), ()> = shifted.traverse(&mut |e| {
            if let Expression::Column(column) = e {
                assert!(matches!(**column, Column::Shifted { .. }));
                saw_shifted = true;
            }
            Ok(())
        });
        assert!(saw_shifted);
        assert_eq!(shifted.size(), Ok(8));
    }
}
