// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Response aggregation.
//!
//! One client request fans out to several providers (or namespaces); each
//! answers with a partial [`ResponseData`](crate::response::ResponseData).
//! The [`Aggregator`] buffers the partials of one request and, once the last
//! one arrives, merges them in fan-out order:
//!
//! ```text
//!   begin(keys K1..Kn) ──► context { remaining = n }
//!
//!   deliver(K3) ─┐
//!   deliver(K1) ─┼──► slot[K] = partial, remaining -= 1
//!   deliver(K2) ─┘              │
//!                               ▼ remaining == 0 (last deliverer only)
//!          for K1..Kn: filter ─► complete host/namespace ─► append
//!                               │
//!                               ▼
//!                    completion(merged | exception)   (exactly once)
//! ```

mod aggregator;
pub mod filter;

pub use aggregator::{
    AggregationContext, AggregationRequest, Aggregator, Completion, ContextId, PartialKey,
    PartialResponse,
};
pub use filter::{ExpressionFilter, FilterError};

use crate::cim::CimInstance;
use crate::error::{CimException, CimStatusCode};
use crate::response::ContentKind;
use std::fmt;

/// Query processing applied to partials from providers that could only
/// enumerate.
pub trait QueryFilter: Send + Sync {
    /// Whether `instance` belongs in the result.
    fn evaluate(&self, instance: &CimInstance) -> bool;

    /// Reduce a matching instance to the selected properties.
    fn project(&self, _instance: &mut CimInstance) {}
}

/// How failed partials affect the merged result.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// The first failure to arrive is the result.
    #[default]
    FirstFailure,
    /// Failures carrying one of these codes are skipped; any other failure
    /// behaves as under `FirstFailure`.
    BestEffort { tolerated: Vec<CimStatusCode> },
}

impl FailurePolicy {
    /// Whether a partial failing with `exception` is skipped.
    pub fn tolerates(&self, exception: &CimException) -> bool {
        match self {
            FailurePolicy::FirstFailure => false,
            FailurePolicy::BestEffort { tolerated } => tolerated.contains(&exception.code()),
        }
    }
}

/// Aggregator protocol violations by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregateError {
    /// No open context with this id (never begun, completed or cancelled).
    UnknownContext(ContextId),
    /// The key is not part of the context's fan-out list.
    UnknownKey(String),
    /// A partial was already delivered for this key.
    DuplicatePartial(String),
    /// The partial's content kind differs from the request's.
    ContentKindMismatch {
        expected: ContentKind,
        found: ContentKind,
    },
    /// A context needs at least one key, and keys must be distinct.
    InvalidKeys(String),
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregateError::UnknownContext(id) => write!(f, "Unknown aggregation context {}", id),
            AggregateError::UnknownKey(key) => write!(f, "Key {} is not expected", key),
            AggregateError::DuplicatePartial(key) => {
                write!(f, "Partial for {} already delivered", key)
            }
            AggregateError::ContentKindMismatch { expected, found } => {
                write!(f, "Expected {} content, got {}", expected, found)
            }
            AggregateError::InvalidKeys(reason) => write!(f, "Invalid fan-out list: {}", reason),
        }
    }
}

impl std::error::Error for AggregateError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_policy() {
        let not_supported = CimException::new(CimStatusCode::NotSupported, "");
        let denied = CimException::new(CimStatusCode::AccessDenied, "");
        assert!(!FailurePolicy::default().tolerates(&not_supported));

        let policy = FailurePolicy::BestEffort {
            tolerated: vec![CimStatusCode::NotSupported],
        };
        assert!(policy.tolerates(&not_supported));
        assert!(!policy.tolerates(&denied));
    }

    #[test]
    fn test_error_display() {
        let e = AggregateError::ContentKindMismatch {
            expected: ContentKind::Instances,
            found: ContentKind::ObjectPaths,
        };
        assert!(e.to_string().starts_with("Expected "));
        assert_eq!(AggregateError::UnknownContext(7).to_string(), "Unknown aggregation context 7");
    }
}
