// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Where-clause evaluation against instance properties.
//!
//! A comparison with a NULL operand is false, so `NOT x = 1` holds when `x`
//! is NULL. Integers of any width compare exactly; an integer against a
//! real compares as reals.

use super::parser::{Expression, Operand, Operator};
use super::FilterError;
use crate::cim::{CimInstance, CimValue, Scalar};
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::sync::Arc;

/// Comparable view of a property value or literal.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Integer(i128),
    Real(f64),
    String(String),
    Boolean(bool),
    Null,
}

impl FieldValue {
    /// View of a property value. Arrays and embedded objects have no
    /// comparable form.
    pub fn from_value(value: &CimValue) -> Result<FieldValue, FilterError> {
        if value.is_null() {
            return Ok(FieldValue::Null);
        }
        let scalar = value.as_scalar().ok_or_else(|| {
            FilterError::TypeMismatch(format!("{} array is not comparable", value.cim_type()))
        })?;
        Self::from_scalar(scalar)
    }

    pub fn from_scalar(scalar: &Scalar) -> Result<FieldValue, FilterError> {
        if let Some(n) = scalar.as_i128() {
            return Ok(FieldValue::Integer(n));
        }
        match scalar {
            Scalar::Boolean(b) => Ok(FieldValue::Boolean(*b)),
            Scalar::Real32(_) | Scalar::Real64(_) => {
                Ok(FieldValue::Real(scalar.as_f64().unwrap_or(f64::NAN)))
            }
            Scalar::Object(_) | Scalar::Instance(_) => Err(FilterError::TypeMismatch(
                "embedded object is not comparable".to_string(),
            )),
            other => other
                .to_text()
                .map(FieldValue::String)
                .ok_or_else(|| FilterError::TypeMismatch(format!("{:?}", other.cim_type()))),
        }
    }

    /// Interpret a `%n` parameter: integer, then real, then boolean, else
    /// text.
    fn from_parameter(text: &str) -> FieldValue {
        if let Ok(n) = text.parse::<i128>() {
            FieldValue::Integer(n)
        } else if let Ok(f) = text.parse::<f64>() {
            FieldValue::Real(f)
        } else if text.eq_ignore_ascii_case("true") {
            FieldValue::Boolean(true)
        } else if text.eq_ignore_ascii_case("false") {
            FieldValue::Boolean(false)
        } else {
            FieldValue::String(text.to_string())
        }
    }
}

/// Evaluates a parsed where-clause; parameters are shared with the owning
/// filter so rebinding them takes effect immediately.
#[derive(Debug, Clone)]
pub struct FilterEvaluator {
    expression: Arc<Expression>,
    parameters: Arc<RwLock<Vec<String>>>,
}

impl FilterEvaluator {
    pub fn new(expression: Arc<Expression>, parameters: Arc<RwLock<Vec<String>>>) -> Self {
        Self {
            expression,
            parameters,
        }
    }

    /// Whether `instance` satisfies the expression.
    ///
    /// # Errors
    ///
    /// `UnknownField` when the instance lacks a referenced property,
    /// `ParameterOutOfRange` for an unbound `%n`, `TypeMismatch` for
    /// incomparable operands.
    pub fn matches(&self, instance: &CimInstance) -> Result<bool, FilterError> {
        let params = self.parameters.read();
        self.evaluate(&self.expression, instance, &params)
    }

    /// Evaluate with explicit parameters instead of the shared ones.
    pub fn matches_with_params(
        &self,
        instance: &CimInstance,
        params: &[String],
    ) -> Result<bool, FilterError> {
        self.evaluate(&self.expression, instance, params)
    }

    fn evaluate(
        &self,
        expr: &Expression,
        instance: &CimInstance,
        params: &[String],
    ) -> Result<bool, FilterError> {
        match expr {
            Expression::Comparison { left, op, right } => {
                let left = resolve(left, instance, params)?;
                let right = resolve(right, instance, params)?;
                compare(&left, *op, &right)
            }
            Expression::And(l, r) => {
                Ok(self.evaluate(l, instance, params)? && self.evaluate(r, instance, params)?)
            }
            Expression::Or(l, r) => {
                Ok(self.evaluate(l, instance, params)? || self.evaluate(r, instance, params)?)
            }
            Expression::Not(inner) => Ok(!self.evaluate(inner, instance, params)?),
        }
    }
}

fn resolve(operand: &Operand, instance: &CimInstance, params: &[String]) -> Result<FieldValue, FilterError> {
    match operand {
        Operand::Integer(n) => Ok(FieldValue::Integer(i128::from(*n))),
        Operand::Real(f) => Ok(FieldValue::Real(*f)),
        Operand::String(s) => Ok(FieldValue::String(s.clone())),
        Operand::Boolean(b) => Ok(FieldValue::Boolean(*b)),
        Operand::Parameter(idx) => params
            .get(*idx)
            .map(|text| FieldValue::from_parameter(text))
            .ok_or(FilterError::ParameterOutOfRange(*idx)),
        Operand::Property(name) => instance
            .value(name)
            .ok_or_else(|| FilterError::UnknownField(name.clone()))
            .and_then(FieldValue::from_value),
    }
}

fn compare(left: &FieldValue, op: Operator, right: &FieldValue) -> Result<bool, FilterError> {
    use FieldValue::*;

    if matches!(left, Null) || matches!(right, Null) {
        return Ok(false);
    }
    if op == Operator::Like {
        return match (left, right) {
            (String(text), String(pattern)) => Ok(like_match(text, pattern)),
            _ => Err(FilterError::TypeMismatch("LIKE requires string operands".to_string())),
        };
    }

    let ordering = match (left, right) {
        (Integer(a), Integer(b)) => a.cmp(b),
        (Integer(a), Real(b)) => return Ok(compare_real(*a as f64, op, *b)),
        (Real(a), Integer(b)) => return Ok(compare_real(*a, op, *b as f64)),
        (Real(a), Real(b)) => return Ok(compare_real(*a, op, *b)),
        (String(a), String(b)) => a.cmp(b),
        (Boolean(a), Boolean(b)) => match op {
            Operator::Eq => return Ok(a == b),
            Operator::Ne => return Ok(a != b),
            _ => {
                return Err(FilterError::TypeMismatch(
                    "boolean only supports = and <>".to_string(),
                ))
            }
        },
        _ => {
            return Err(FilterError::TypeMismatch(format!(
                "cannot compare {:?} with {:?}",
                left, right
            )))
        }
    };
    Ok(holds(ordering, op))
}

fn holds(ordering: Ordering, op: Operator) -> bool {
    match op {
        Operator::Gt => ordering == Ordering::Greater,
        Operator::Lt => ordering == Ordering::Less,
        Operator::Ge => ordering != Ordering::Less,
        Operator::Le => ordering != Ordering::Greater,
        Operator::Eq => ordering == Ordering::Equal,
        Operator::Ne => ordering != Ordering::Equal,
        Operator::Like => false,
    }
}

fn compare_real(a: f64, op: Operator, b: f64) -> bool {
    const EPSILON: f64 = 1e-9;
    let close = (a - b).abs() < EPSILON;
    match op {
        Operator::Gt => a > b && !close,
        Operator::Lt => a < b && !close,
        Operator::Ge => a >= b || close,
        Operator::Le => a <= b || close,
        Operator::Eq => close,
        Operator::Ne => !close,
        Operator::Like => false,
    }
}

/// `%` matches any run (including empty), `_` exactly one character.
fn like_match(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();

    // Iterative wildcard match with single backtrack point.
    let (mut t, mut p) = (0, 0);
    let mut star: Option<(usize, usize)> = None;
    while t < text.len() {
        match pattern.get(p) {
            Some('%') => {
                star = Some((p, t));
                p += 1;
            }
            Some(&c) if c == '_' || c == text[t] => {
                t += 1;
                p += 1;
            }
            _ => match star {
                Some((sp, st)) => {
                    p = sp + 1;
                    t = st + 1;
                    star = Some((sp, st + 1));
                }
                None => return false,
            },
        }
    }
    pattern[p..].iter().all(|&c| c == '%')
}
