// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Where-clause filter for instances delivered by enumerate-only providers.
//!
//! # Supported Syntax
//!
//! ```text
//! expression ::= condition
//!              | expression AND expression
//!              | expression OR expression
//!              | NOT expression
//!              | '(' expression ')'
//!
//! condition  ::= operand operator operand | property
//! operator   ::= '>' | '<' | '>=' | '<=' | '=' | '<>' | '!=' | LIKE
//! operand    ::= property | parameter | literal
//! parameter  ::= '%' digit+
//! literal    ::= integer | real | string | TRUE | FALSE
//! ```
//!
//! This is the condition part of a query only; query-language front ends
//! translate their WHERE clause into it and their select list into the
//! projection.
//!
//! # Example
//!
//! ```ignore
//! let filter = ExpressionFilter::new("Status = 'OK' AND Capacity > %0")?
//!     .with_projection(PropertyList::of(["Name", "Capacity"]));
//! filter.set_parameters(vec!["1024".to_string()]);
//! ```

mod evaluator;
mod parser;

pub use evaluator::{FieldValue, FilterEvaluator};
pub use parser::{parse_expression, Expression, Operand, Operator};

use super::QueryFilter;
use crate::cim::{CimInstance, PropertyList};
use parking_lot::RwLock;
use std::sync::Arc;

/// Parsed where-clause plus an optional projection.
#[derive(Debug, Clone)]
pub struct ExpressionFilter {
    expression_str: String,
    expression: Arc<Expression>,
    /// Substituted for `%0`, `%1`, ...
    parameters: Arc<RwLock<Vec<String>>>,
    projection: PropertyList,
}

impl ExpressionFilter {
    pub fn new(expression: &str) -> Result<Self, FilterError> {
        let parsed = parse_expression(expression)?;
        Ok(Self {
            expression_str: expression.to_string(),
            expression: Arc::new(parsed),
            parameters: Arc::new(RwLock::new(Vec::new())),
            projection: PropertyList::all(),
        })
    }

    pub fn with_parameters(expression: &str, parameters: Vec<String>) -> Result<Self, FilterError> {
        let filter = Self::new(expression)?;
        filter.set_parameters(parameters);
        Ok(filter)
    }

    /// Keep only the listed properties (plus keys) in matching instances.
    pub fn with_projection(mut self, projection: PropertyList) -> Self {
        self.projection = projection;
        self
    }

    /// Rebind `%n` parameters; clones of this filter see the change.
    pub fn set_parameters(&self, params: Vec<String>) {
        *self.parameters.write() = params;
    }

    pub fn parameters(&self) -> Vec<String> {
        self.parameters.read().clone()
    }

    pub fn expression(&self) -> &str {
        &self.expression_str
    }

    pub fn projection(&self) -> &PropertyList {
        &self.projection
    }

    pub fn evaluator(&self) -> FilterEvaluator {
        FilterEvaluator::new(Arc::clone(&self.expression), Arc::clone(&self.parameters))
    }

    /// Like [`QueryFilter::evaluate`] but reports why an instance could not
    /// be evaluated.
    pub fn matches(&self, instance: &CimInstance) -> Result<bool, FilterError> {
        self.evaluator().matches(instance)
    }
}

impl QueryFilter for ExpressionFilter {
    /// Instances the expression cannot be evaluated against are rejected.
    fn evaluate(&self, instance: &CimInstance) -> bool {
        match self.matches(instance) {
            Ok(matched) => matched,
            Err(e) => {
                log::debug!(
                    "[aggregate] '{}' rejects {}: {}",
                    self.expression_str,
                    instance.class_name(),
                    e
                );
                false
            }
        }
    }

    fn project(&self, instance: &mut CimInstance) {
        if self.projection.is_all() {
            return;
        }
        instance.retain_properties(|p| p.is_key() || self.projection.contains(p.name().as_str()));
    }
}

/// Filter construction and evaluation failures.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterError {
    /// Invalid expression syntax.
    ParseError(String),
    /// The instance has no property of this name.
    UnknownField(String),
    /// `%n` with no bound parameter.
    ParameterOutOfRange(usize),
    /// Operands cannot be compared with the operator.
    TypeMismatch(String),
    EmptyExpression,
}

impl std::fmt::Display for FilterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterError::ParseError(msg) => write!(f, "Filter parse error: {}", msg),
            FilterError::UnknownField(name) => write!(f, "Unknown property: {}", name),
            FilterError::ParameterOutOfRange(idx) => write!(f, "Parameter %{} not provided", idx),
            FilterError::TypeMismatch(msg) => write!(f, "Type mismatch: {}", msg),
            FilterError::EmptyExpression => write!(f, "Empty filter expression"),
        }
    }
}

impl std::error::Error for FilterError {}
