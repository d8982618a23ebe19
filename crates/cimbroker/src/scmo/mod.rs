// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Compact object model.
//!
//! A [`CompactClass`] is the flattened, index-addressed form of a class
//! definition, shared by every [`CompactObject`] of that class. Objects hold
//! one value slot per declared property plus their key bindings; all strings
//! and array payloads live in a per-object arena.
//!
//! # Layout
//!
//! ```text
//! CompactObject
//!   class ──────────► Arc<CompactClass>  (properties, defaults, key index)
//!   host / namespace  StrRef into arena
//!   values[i]         Slot per class property (Unset | Null | Value | Array)
//!   keys[k]           Slot per declared key, sorted by folded name
//!   user_keys         undeclared keys, kept as (name, kind, text)
//!   filter            enumerated property indexes (keys always included)
//! ```
//!
//! Classes are obtained through a [`ClassCache`] backed by a
//! [`ClassLoader`]; [`convert`] maps between compact and classic objects;
//! [`stream`] serializes batches of compact objects with a deduplicated
//! class table.

mod arena;
pub mod cache;
mod class;
pub mod convert;
mod instance;
pub mod stream;

pub use arena::{Arena, Span, StrRef};
pub use cache::{CacheStats, ClassCache, ClassLoader};
pub use class::CompactClass;
pub use instance::CompactObject;

use std::fmt;

/// Result codes of compact object accessors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScmoError {
    /// Name not declared, out of range or filtered out.
    NotFound,
    /// An array value was supplied or requested for a scalar property.
    NotAnArray,
    /// A scalar value was supplied or requested for an array property.
    IsAnArray,
    WrongType,
    NullValue,
    /// The class cache could not produce a class definition.
    ClassNotFound,
    /// An arena offset or length does not fit the 32-bit element layout.
    TooLarge,
}

impl fmt::Display for ScmoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScmoError::NotFound => write!(f, "Property or key binding not found"),
            ScmoError::NotAnArray => write!(f, "Property is not an array"),
            ScmoError::IsAnArray => write!(f, "Property is an array"),
            ScmoError::WrongType => write!(f, "Value type does not match declaration"),
            ScmoError::NullValue => write!(f, "Value is null"),
            ScmoError::ClassNotFound => write!(f, "Class definition not available"),
            ScmoError::TooLarge => write!(f, "Value exceeds the compact layout limits"),
        }
    }
}

impl std::error::Error for ScmoError {}
