// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Multi-representation response container.
//!
//! A [`ResponseData`] holds the result set of one CIM operation. The same
//! result may be carried by up to four encodings at once:
//!
//! ```text
//!   Xml       raw CIM-XML fragments (provider agents)
//!   Binary    slot-aligned bytes, one or more CPPD / SCMO units
//!   Classic   ObjectPath / CimInstance / CimObject arrays
//!   Compact   CompactObject array
//! ```
//!
//! Each encoding holds its own slice of the elements, except when classic
//! and compact are a *mirrored pair* produced by a conversion between them,
//! in which case both hold the same elements. The logical element order is
//! always `Xml, Binary, Classic, Compact`: conversions, appends and both
//! encoders keep it.
//!
//! Conversions are atomic: the target is built in full before anything in
//! the container changes, so a failed conversion leaves the container as it
//! was and reports the error.

mod data;
mod encode;
mod resolve;

pub use data::ResponseData;

use crate::cim::{CimInstance, CimObject, ModelError, ObjectPath, PropertyList};
use crate::core::ser::SerError;
use crate::scmo::ScmoError;
use crate::xml::{XmlError, XmlOptions};
use std::fmt;

/// Result shape of the operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    /// EnumerateInstanceNames: instance paths.
    InstanceNames,
    /// EnumerateInstances, ExecQuery: named instances.
    Instances,
    /// GetInstance: a single instance.
    Instance,
    /// Associators, class enumerations: instances or classes with paths.
    Objects,
    /// AssociatorNames, ReferenceNames: instance or class paths.
    ObjectPaths,
}

impl ContentKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            ContentKind::InstanceNames => "instance-names",
            ContentKind::Instances => "instances",
            ContentKind::Instance => "instance",
            ContentKind::Objects => "objects",
            ContentKind::ObjectPaths => "object-paths",
        }
    }

    /// True for the kinds whose classic form is a path array.
    pub const fn holds_paths(self) -> bool {
        matches!(self, ContentKind::InstanceNames | ContentKind::ObjectPaths)
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One physical encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Encoding {
    Classic = 0x01,
    Binary = 0x02,
    Xml = 0x04,
    Compact = 0x08,
}

impl Encoding {
    pub const ALL: [Encoding; 4] = [
        Encoding::Classic,
        Encoding::Binary,
        Encoding::Xml,
        Encoding::Compact,
    ];

    const fn bit(self) -> u8 {
        self as u8
    }
}

/// Set of encodings present in a container.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Encodings(u8);

impl Encodings {
    pub const EMPTY: Encodings = Encodings(0);

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, encoding: Encoding) -> bool {
        self.0 & encoding.bit() != 0
    }

    pub fn insert(&mut self, encoding: Encoding) {
        self.0 |= encoding.bit();
    }

    pub fn remove(&mut self, encoding: Encoding) {
        self.0 &= !encoding.bit();
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn union(self, other: Encodings) -> Encodings {
        Encodings(self.0 | other.0)
    }

    pub fn iter(self) -> impl Iterator<Item = Encoding> {
        Encoding::ALL.into_iter().filter(move |e| self.contains(*e))
    }
}

impl From<Encoding> for Encodings {
    fn from(encoding: Encoding) -> Self {
        Encodings(encoding.bit())
    }
}

impl std::ops::BitOr for Encodings {
    type Output = Encodings;

    fn bitor(self, rhs: Encodings) -> Encodings {
        self.union(rhs)
    }
}

impl std::ops::BitOr<Encoding> for Encodings {
    type Output = Encodings;

    fn bitor(self, rhs: Encoding) -> Encodings {
        self.union(rhs.into())
    }
}

impl fmt::Debug for Encodings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// One element carried as CIM-XML.
///
/// `reference` is the `INSTANCENAME` or `CLASSNAME` element; `body` is the
/// `INSTANCE` or `CLASS` element and stays empty for path-only content. The
/// host and namespace travel beside the name so they can be completed
/// without reparsing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlFragment {
    pub body: String,
    pub reference: String,
    pub host: Option<String>,
    pub namespace: Option<String>,
    pub class_only: bool,
}

impl XmlFragment {
    pub fn new(body: impl Into<String>, reference: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            reference: reference.into(),
            ..Self::default()
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn class_only(mut self) -> Self {
        self.class_only = true;
        self
    }
}

/// Classic arrays, one shape per content kind.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassicData {
    Paths(Vec<ObjectPath>),
    Instances(Vec<CimInstance>),
    Objects(Vec<CimObject>),
}

impl ClassicData {
    pub fn empty(kind: ContentKind) -> Self {
        match kind {
            ContentKind::InstanceNames | ContentKind::ObjectPaths => ClassicData::Paths(Vec::new()),
            ContentKind::Instances | ContentKind::Instance => ClassicData::Instances(Vec::new()),
            ContentKind::Objects => ClassicData::Objects(Vec::new()),
        }
    }

    /// Whether this shape is the classic form of `kind`.
    pub fn fits(&self, kind: ContentKind) -> bool {
        matches!(
            (self, kind),
            (
                ClassicData::Paths(_),
                ContentKind::InstanceNames | ContentKind::ObjectPaths
            ) | (
                ClassicData::Instances(_),
                ContentKind::Instances | ContentKind::Instance
            ) | (ClassicData::Objects(_), ContentKind::Objects)
        )
    }

    pub fn len(&self) -> usize {
        match self {
            ClassicData::Paths(v) => v.len(),
            ClassicData::Instances(v) => v.len(),
            ClassicData::Objects(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append `other`, which must have the same shape.
    ///
    /// # Panics
    ///
    /// Panics when the shapes differ; containers only ever combine classic
    /// arrays of their own content kind.
    pub(crate) fn append(&mut self, other: ClassicData) {
        match (self, other) {
            (ClassicData::Paths(a), ClassicData::Paths(b)) => a.extend(b),
            (ClassicData::Instances(a), ClassicData::Instances(b)) => a.extend(b),
            (ClassicData::Objects(a), ClassicData::Objects(b)) => a.extend(b),
            (this, other) => panic!(
                "classic shape mismatch: {} vs {}",
                this.shape(),
                other.shape()
            ),
        }
    }

    /// Remove and return the first `count` elements.
    pub(crate) fn split_front(&mut self, count: usize) -> ClassicData {
        fn front<T>(v: &mut Vec<T>, count: usize) -> Vec<T> {
            let count = count.min(v.len());
            v.drain(..count).collect()
        }
        match self {
            ClassicData::Paths(v) => ClassicData::Paths(front(v, count)),
            ClassicData::Instances(v) => ClassicData::Instances(front(v, count)),
            ClassicData::Objects(v) => ClassicData::Objects(front(v, count)),
        }
    }

    fn shape(&self) -> &'static str {
        match self {
            ClassicData::Paths(_) => "paths",
            ClassicData::Instances(_) => "instances",
            ClassicData::Objects(_) => "objects",
        }
    }
}

/// Request properties that shape emission and conversion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    pub include_qualifiers: bool,
    pub include_class_origin: bool,
    pub property_list: PropertyList,
    /// Paths in an ObjectPaths result name classes, not instances.
    pub is_class_operation: bool,
    /// Namespace assumed for objects whose path carries none.
    pub namespace: Option<String>,
}

impl RequestOptions {
    pub fn xml_options(&self) -> XmlOptions {
        XmlOptions {
            include_qualifiers: self.include_qualifiers,
            include_class_origin: self.include_class_origin,
            property_list: self.property_list.clone(),
        }
    }

    pub(crate) fn default_namespace(&self) -> &str {
        self.namespace.as_deref().unwrap_or_default()
    }
}

/// Container conversion failure.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseError {
    /// The binary payload could not be decoded.
    Decode(SerError),
    /// An XML fragment could not be parsed.
    Xml(XmlError),
    /// Classic to compact conversion was rejected.
    Compact(ScmoError),
    Model(ModelError),
    /// The operation does not apply to this content kind.
    Unsupported(String),
}

impl fmt::Display for ResponseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseError::Decode(e) => write!(f, "Binary decode failed: {}", e),
            ResponseError::Xml(e) => write!(f, "XML fragment rejected: {}", e),
            ResponseError::Compact(e) => write!(f, "Compact conversion failed: {}", e),
            ResponseError::Model(e) => write!(f, "Invalid object: {}", e),
            ResponseError::Unsupported(what) => write!(f, "Unsupported: {}", what),
        }
    }
}

impl std::error::Error for ResponseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResponseError::Decode(e) => Some(e),
            ResponseError::Xml(e) => Some(e),
            ResponseError::Compact(e) => Some(e),
            ResponseError::Model(e) => Some(e),
            ResponseError::Unsupported(_) => None,
        }
    }
}

impl From<SerError> for ResponseError {
    fn from(e: SerError) -> Self {
        ResponseError::Decode(e)
    }
}

impl From<XmlError> for ResponseError {
    fn from(e: XmlError) -> Self {
        ResponseError::Xml(e)
    }
}

impl From<ScmoError> for ResponseError {
    fn from(e: ScmoError) -> Self {
        ResponseError::Compact(e)
    }
}

impl From<ModelError> for ResponseError {
    fn from(e: ModelError) -> Self {
        ResponseError::Model(e)
    }
}
