// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Crate error type and the CIM exception surfaced to clients.
//!
//! Internal errors stay structured ([`Error`] and the per-module enums). Only
//! [`CimException`] crosses the client boundary: every internal error maps to
//! the closest DMTF status code with a short, fixed reason.

use crate::aggregate::AggregateError;
use crate::cim::ModelError;
use crate::core::ser::SerError;
use crate::response::ResponseError;
use crate::scmo::ScmoError;
use crate::xml::XmlError;
use std::fmt;

/// CIM status codes (DMTF DSP0200).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CimStatusCode {
    Failed = 1,
    AccessDenied = 2,
    InvalidNamespace = 3,
    InvalidParameter = 4,
    InvalidClass = 5,
    NotFound = 6,
    NotSupported = 7,
    ClassHasChildren = 8,
    ClassHasInstances = 9,
    InvalidSuperclass = 10,
    AlreadyExists = 11,
    NoSuchProperty = 12,
    TypeMismatch = 13,
    QueryLanguageNotSupported = 14,
    InvalidQuery = 15,
    MethodNotAvailable = 16,
    MethodNotFound = 17,
}

impl CimStatusCode {
    pub const fn code(self) -> u32 {
        self as u32
    }

    pub fn from_code(code: u32) -> Option<Self> {
        use CimStatusCode::*;
        const ALL: [CimStatusCode; 17] = [
            Failed,
            AccessDenied,
            InvalidNamespace,
            InvalidParameter,
            InvalidClass,
            NotFound,
            NotSupported,
            ClassHasChildren,
            ClassHasInstances,
            InvalidSuperclass,
            AlreadyExists,
            NoSuchProperty,
            TypeMismatch,
            QueryLanguageNotSupported,
            InvalidQuery,
            MethodNotAvailable,
            MethodNotFound,
        ];
        ALL.iter().copied().find(|c| c.code() == code)
    }

    /// DSP0200 symbolic name (`CIM_ERR_*`).
    pub const fn as_str(self) -> &'static str {
        match self {
            CimStatusCode::Failed => "CIM_ERR_FAILED",
            CimStatusCode::AccessDenied => "CIM_ERR_ACCESS_DENIED",
            CimStatusCode::InvalidNamespace => "CIM_ERR_INVALID_NAMESPACE",
            CimStatusCode::InvalidParameter => "CIM_ERR_INVALID_PARAMETER",
            CimStatusCode::InvalidClass => "CIM_ERR_INVALID_CLASS",
            CimStatusCode::NotFound => "CIM_ERR_NOT_FOUND",
            CimStatusCode::NotSupported => "CIM_ERR_NOT_SUPPORTED",
            CimStatusCode::ClassHasChildren => "CIM_ERR_CLASS_HAS_CHILDREN",
            CimStatusCode::ClassHasInstances => "CIM_ERR_CLASS_HAS_INSTANCES",
            CimStatusCode::InvalidSuperclass => "CIM_ERR_INVALID_SUPERCLASS",
            CimStatusCode::AlreadyExists => "CIM_ERR_ALREADY_EXISTS",
            CimStatusCode::NoSuchProperty => "CIM_ERR_NO_SUCH_PROPERTY",
            CimStatusCode::TypeMismatch => "CIM_ERR_TYPE_MISMATCH",
            CimStatusCode::QueryLanguageNotSupported => "CIM_ERR_QUERY_LANGUAGE_NOT_SUPPORTED",
            CimStatusCode::InvalidQuery => "CIM_ERR_INVALID_QUERY",
            CimStatusCode::MethodNotAvailable => "CIM_ERR_METHOD_NOT_AVAILABLE",
            CimStatusCode::MethodNotFound => "CIM_ERR_METHOD_NOT_FOUND",
        }
    }
}

impl fmt::Display for CimStatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A CIM error as seen by a client: status code plus a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CimException {
    code: CimStatusCode,
    message: String,
}

impl CimException {
    pub fn new(code: CimStatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(CimStatusCode::Failed, message)
    }

    pub fn code(&self) -> CimStatusCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CimException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.code)
        } else {
            write!(f, "{}: {}", self.code, self.message)
        }
    }
}

impl std::error::Error for CimException {}

/// Crate-wide error.
#[derive(Debug)]
pub enum Error {
    // ========================================================================
    // Representation Errors
    // ========================================================================
    /// Object model construction or parsing failed.
    Model(ModelError),
    /// Binary codec failure (truncated input, magic mismatch, allocation).
    Ser(SerError),
    /// Compact object access failure.
    Scmo(ScmoError),
    /// CIM-XML parsing failure.
    Xml(XmlError),
    /// Response container conversion failure.
    Response(ResponseError),

    // ========================================================================
    // Aggregation Errors
    // ========================================================================
    Aggregate(AggregateError),
    /// A failure reported by a provider or propagated to the client.
    Cim(CimException),

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration could not be read or parsed.
    Config(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Model(e) => write!(f, "Model error: {}", e),
            Error::Ser(e) => write!(f, "Binary codec error: {}", e),
            Error::Scmo(e) => write!(f, "Compact object error: {}", e),
            Error::Xml(e) => write!(f, "XML error: {}", e),
            Error::Response(e) => write!(f, "Response error: {}", e),
            Error::Aggregate(e) => write!(f, "Aggregation error: {}", e),
            Error::Cim(e) => write!(f, "{}", e),
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Model(e) => Some(e),
            Error::Ser(e) => Some(e),
            Error::Scmo(e) => Some(e),
            Error::Xml(e) => Some(e),
            Error::Response(e) => Some(e),
            Error::Aggregate(e) => Some(e),
            Error::Cim(e) => Some(e),
            Error::Config(_) => None,
        }
    }
}

macro_rules! impl_from_error {
    ($($source:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$source> for Error {
                fn from(e: $source) -> Self {
                    Error::$variant(e)
                }
            }
        )*
    };
}

impl_from_error!(
    ModelError => Model,
    SerError => Ser,
    ScmoError => Scmo,
    XmlError => Xml,
    ResponseError => Response,
    AggregateError => Aggregate,
    CimException => Cim,
);

/// Convenient alias for results using the crate `Error` type.
pub type Result<T> = core::result::Result<T, Error>;

impl From<SerError> for CimException {
    fn from(e: SerError) -> Self {
        match e {
            SerError::OutOfMemory { .. } => CimException::failed("out of memory"),
            _ => CimException::failed("undecodable binary payload"),
        }
    }
}

impl From<XmlError> for CimException {
    fn from(_: XmlError) -> Self {
        CimException::failed("malformed CIM-XML payload")
    }
}

impl From<ScmoError> for CimException {
    fn from(e: ScmoError) -> Self {
        match e {
            ScmoError::ClassNotFound => CimException::new(CimStatusCode::Failed, "class unavailable"),
            _ => CimException::failed("invalid compact object access"),
        }
    }
}

impl From<ModelError> for CimException {
    fn from(_: ModelError) -> Self {
        CimException::failed("invalid object")
    }
}

impl From<ResponseError> for CimException {
    fn from(e: ResponseError) -> Self {
        match e {
            ResponseError::Decode(inner) => inner.into(),
            ResponseError::Xml(inner) => inner.into(),
            ResponseError::Compact(inner) => inner.into(),
            ResponseError::Model(inner) => inner.into(),
            ResponseError::Unsupported(_) => {
                CimException::new(CimStatusCode::NotSupported, "unsupported content")
            }
        }
    }
}

impl From<AggregateError> for CimException {
    fn from(_: AggregateError) -> Self {
        CimException::failed("response aggregation failed")
    }
}

impl From<Error> for CimException {
    fn from(e: Error) -> Self {
        match e {
            Error::Model(inner) => inner.into(),
            Error::Ser(inner) => inner.into(),
            Error::Scmo(inner) => inner.into(),
            Error::Xml(inner) => inner.into(),
            Error::Response(inner) => inner.into(),
            Error::Aggregate(inner) => inner.into(),
            Error::Cim(inner) => inner,
            Error::Config(_) => CimException::failed("server configuration error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(CimStatusCode::Failed.code(), 1);
        assert_eq!(CimStatusCode::MethodNotFound.code(), 17);
        assert_eq!(CimStatusCode::from_code(7), Some(CimStatusCode::NotSupported));
        assert_eq!(CimStatusCode::from_code(0), None);
        assert_eq!(CimStatusCode::from_code(18), None);
        assert_eq!(CimStatusCode::NotFound.to_string(), "CIM_ERR_NOT_FOUND");
    }

    #[test]
    fn test_internal_errors_map_to_failed_without_detail() {
        let ser = SerError::ReadFailed {
            offset: 40,
            reason: "unexpected end of buffer".into(),
        };
        let ex = CimException::from(Error::from(ser));
        assert_eq!(ex.code(), CimStatusCode::Failed);
        assert!(!ex.message().contains("offset"));

        let ex = CimException::from(ResponseError::Unsupported("class".into()));
        assert_eq!(ex.code(), CimStatusCode::NotSupported);
    }

    #[test]
    fn test_provider_exception_passes_through() {
        let original = CimException::new(CimStatusCode::NotFound, "no such instance");
        let ex = CimException::from(Error::Cim(original.clone()));
        assert_eq!(ex, original);
        assert_eq!(ex.to_string(), "CIM_ERR_NOT_FOUND: no such instance");
    }
}
