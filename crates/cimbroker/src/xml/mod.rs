// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! CIM-XML emission and fragment parsing.
//!
//! Two writers render the element grammar of DSP0201: [`writer`] for the
//! classic object model and [`compact_writer`] for compact objects. Both
//! share the property, value and path emitters, so the same logical object
//! produces the same bytes whichever representation it comes from.
//! [`reader`] parses fragments back into classic objects with `roxmltree`.

pub mod compact_writer;
pub mod escape;
pub mod reader;
pub mod writer;

pub use escape::{append_escaped, escape};
pub use reader::{parse_class, parse_instance, parse_object, parse_path};
pub use writer::XmlOptions;

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlError {
    /// Not well-formed XML.
    Parse(String),
    UnexpectedElement { expected: String, found: String },
    MissingAttribute { element: String, attribute: String },
    InvalidValue(String),
}

impl fmt::Display for XmlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XmlError::Parse(reason) => write!(f, "Malformed XML: {}", reason),
            XmlError::UnexpectedElement { expected, found } => {
                write!(f, "Expected <{}>, found <{}>", expected, found)
            }
            XmlError::MissingAttribute { element, attribute } => {
                write!(f, "<{}> lacks required attribute {}", element, attribute)
            }
            XmlError::InvalidValue(reason) => write!(f, "Invalid value: {}", reason),
        }
    }
}

impl std::error::Error for XmlError {}

impl From<roxmltree::Error> for XmlError {
    fn from(e: roxmltree::Error) -> Self {
        XmlError::Parse(e.to_string())
    }
}

impl From<crate::cim::ModelError> for XmlError {
    fn from(e: crate::cim::ModelError) -> Self {
        XmlError::InvalidValue(e.to_string())
    }
}
