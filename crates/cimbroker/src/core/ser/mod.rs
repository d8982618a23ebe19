// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Binary serialization of CIM values and objects.
//!
//! Layout rules shared by every put/get pair:
//!
//! - fixed-width primitives occupy one zero-padded 8-byte slot in the
//!   writer's native byte order
//! - variable fields are a `u32` count slot followed by the payload rounded
//!   up to 8 bytes
//! - composite objects are an optional magic slot followed by their fields
//!   in a fixed order; every `put_x` has exactly one `get_x` reading the
//!   identical layout

pub mod cursor;
pub mod objects;

pub use cursor::{round_up, BinaryCursor};

use crate::cim::ModelError;
use std::fmt;

/// Serialization error used within core::ser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SerError {
    ReadFailed { offset: usize, reason: String },
    MagicMismatch { offset: usize, expected: u32, found: u32 },
    InvalidData { reason: String },
    OutOfMemory { requested: usize },
}

impl fmt::Display for SerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SerError::ReadFailed { offset, reason } => {
                write!(f, "read failed at offset {}: {}", offset, reason)
            }
            SerError::MagicMismatch {
                offset,
                expected,
                found,
            } => write!(
                f,
                "magic mismatch at offset {}: expected {:#010x}, found {:#010x}",
                offset, expected, found
            ),
            SerError::InvalidData { reason } => write!(f, "invalid data: {}", reason),
            SerError::OutOfMemory { requested } => {
                write!(f, "out of memory growing buffer by {} bytes", requested)
            }
        }
    }
}

impl std::error::Error for SerError {}

impl From<ModelError> for SerError {
    fn from(e: ModelError) -> Self {
        SerError::InvalidData {
            reason: e.to_string(),
        }
    }
}

pub type SerResult<T> = core::result::Result<T, SerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ser_error_display_variants() {
        let err = SerError::ReadFailed {
            offset: 16,
            reason: "unexpected end of buffer".into(),
        };
        assert_eq!(
            err.to_string(),
            "read failed at offset 16: unexpected end of buffer"
        );

        let err = SerError::MagicMismatch {
            offset: 8,
            expected: 0x9E3A_4B15,
            found: 0,
        };
        assert_eq!(
            err.to_string(),
            "magic mismatch at offset 8: expected 0x9e3a4b15, found 0x00000000"
        );

        let err = SerError::OutOfMemory { requested: 64 };
        assert_eq!(err.to_string(), "out of memory growing buffer by 64 bytes");
    }

    #[test]
    fn test_model_error_becomes_invalid_data() {
        let err: SerError = ModelError::DuplicateName("Id".into()).into();
        assert!(matches!(err, SerError::InvalidData { .. }));
    }
}
