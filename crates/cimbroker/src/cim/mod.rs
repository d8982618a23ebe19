// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Classic CIM object model.
//!
//! Tree-shaped values, paths, qualifiers, properties, classes and instances.
//! This is the representation providers most often produce and the one every
//! other representation converts to and from.

mod datetime;
pub(crate) mod name;
mod object;
mod path;
mod property;
mod qualifier;
mod types;
mod value;

pub use datetime::{CimDateTime, DateTimeSign, DATETIME_STRING_LEN};
pub use name::{names_equal, CimName};
pub use object::{CimClass, CimInstance, CimObject, PropertyList};
pub use path::{KeyBinding, KeyKind, ObjectPath};
pub use property::{Method, Parameter, Property};
pub use qualifier::{Flavor, Qualifier, QualifierList};
pub use types::CimType;
pub use value::{CimValue, Scalar};

use std::fmt;

/// Errors raised while building or parsing model objects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// A property, qualifier, method or parameter name is already present.
    DuplicateName(String),
    TypeMismatch { expected: CimType, found: CimType },
    /// Scalar assigned to an array property or the reverse.
    ArityMismatch(String),
    InvalidDateTime(String),
    InvalidObjectPath(String),
    InvalidValue { ty: CimType, text: String },
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::DuplicateName(name) => write!(f, "Duplicate name '{}'", name),
            ModelError::TypeMismatch { expected, found } => {
                write!(f, "Type mismatch: expected {}, found {}", expected, found)
            }
            ModelError::ArityMismatch(name) => {
                write!(f, "Array/scalar mismatch on '{}'", name)
            }
            ModelError::InvalidDateTime(reason) => write!(f, "Invalid datetime: {}", reason),
            ModelError::InvalidObjectPath(reason) => write!(f, "Invalid object path: {}", reason),
            ModelError::InvalidValue { ty, text } => {
                write!(f, "Invalid {} value '{}'", ty, text)
            }
        }
    }
}

impl std::error::Error for ModelError {}
