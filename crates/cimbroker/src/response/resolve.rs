// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Conversions between the encodings of a [`ResponseData`].
//!
//! Every resolve computes the whole target from borrowed storage first and
//! commits only when nothing can fail any more. Binary and XML sources are
//! consumed by a successful conversion; classic and compact stay behind as a
//! mirrored pair when one was converted into the other and nothing else
//! contributed.

use super::{ClassicData, ContentKind, Encoding, RequestOptions, ResponseData, ResponseError, XmlFragment};
use crate::cim::{CimInstance, CimName, ObjectPath};
use crate::config::{BINARY_TYPE_CPPD, BINARY_TYPE_SCMO};
use crate::core::ser::{BinaryCursor, SerError};
use crate::scmo::{convert, ClassCache, CompactObject, ScmoError};
use crate::xml::{compact_writer, reader, writer, XmlError};

/// Borrowed conversion context.
pub(super) struct Converter<'a> {
    pub(super) kind: ContentKind,
    pub(super) options: &'a RequestOptions,
    pub(super) cache: Option<&'a ClassCache>,
    pub(super) magic: bool,
}

/// Decoded units of a binary payload, split by marker. Every classic
/// element precedes every compact one in payload order; compact units
/// followed by a classic unit are converted to classic.
#[derive(Default)]
pub(super) struct DecodedBinary {
    pub(super) classic: Option<ClassicData>,
    pub(super) compact: Option<Vec<CompactObject>>,
}

impl Converter<'_> {
    // ========================================================================
    // Classic <-> compact
    // ========================================================================

    pub(super) fn classic_to_compact(&self, data: &ClassicData) -> Result<Vec<CompactObject>, ScmoError> {
        let ns = self.options.default_namespace();
        let mut objects = match data {
            ClassicData::Paths(paths) => paths
                .iter()
                .map(|p| {
                    let mut object = convert::from_path(p, ns, self.cache)?;
                    object.set_class_only(self.paths_are_classes());
                    Ok(object)
                })
                .collect::<Result<Vec<_>, ScmoError>>()?,
            ClassicData::Instances(instances) => instances
                .iter()
                .map(|i| convert::from_instance(i, ns, self.cache))
                .collect::<Result<Vec<_>, ScmoError>>()?,
            ClassicData::Objects(objects) => objects
                .iter()
                .map(|o| convert::from_object(o, ns, self.cache))
                .collect::<Result<Vec<_>, ScmoError>>()?,
        };
        if let Some(names) = self.options.property_list.names() {
            objects
                .iter_mut()
                .filter(|o| !o.is_class_only())
                .for_each(|o| o.set_property_filter(Some(names)));
        }
        Ok(objects)
    }

    pub(super) fn compact_to_classic(&self, objects: &[CompactObject]) -> ClassicData {
        match self.kind {
            ContentKind::InstanceNames | ContentKind::ObjectPaths => {
                ClassicData::Paths(objects.iter().map(convert::to_path).collect())
            }
            ContentKind::Instances | ContentKind::Instance => ClassicData::Instances(
                objects
                    .iter()
                    .map(|o| convert::to_instance(o, true, true))
                    .collect(),
            ),
            ContentKind::Objects => {
                ClassicData::Objects(objects.iter().map(convert::to_object).collect())
            }
        }
    }

    fn paths_are_classes(&self) -> bool {
        self.kind == ContentKind::ObjectPaths && self.options.is_class_operation
    }

    // ========================================================================
    // Classic / compact -> XML
    // ========================================================================

    pub(super) fn classic_to_xml(&self, data: &ClassicData) -> Vec<XmlFragment> {
        let opts = self.options.xml_options();
        match data {
            ClassicData::Paths(paths) => {
                let class_only = self.paths_are_classes();
                paths
                    .iter()
                    .map(|path| path_fragment(path, class_only, String::new()))
                    .collect()
            }
            ClassicData::Instances(instances) => instances
                .iter()
                .map(|instance| {
                    let mut body = String::new();
                    writer::append_instance(&mut body, instance, &opts);
                    match instance.path() {
                        Some(path) => path_fragment(path, false, body),
                        None => path_fragment(&instance.key_path(), false, body),
                    }
                })
                .collect(),
            ClassicData::Objects(objects) => objects
                .iter()
                .map(|object| {
                    let mut body = String::new();
                    writer::append_object(&mut body, object, &opts);
                    let class_only = object.is_class();
                    match object.path() {
                        Some(path) => path_fragment(path, class_only, body),
                        None => {
                            let path = object
                                .as_instance()
                                .map(CimInstance::key_path)
                                .unwrap_or_else(|| ObjectPath::new(object.class_name().clone()));
                            path_fragment(&path, class_only, body)
                        }
                    }
                })
                .collect(),
        }
    }

    pub(super) fn compact_to_xml(&self, objects: &[CompactObject]) -> Vec<XmlFragment> {
        let opts = self.options.xml_options();
        objects
            .iter()
            .map(|object| {
                let mut body = String::new();
                if !self.kind.holds_paths() {
                    compact_writer::append_object(&mut body, object, &opts);
                }
                let mut reference = String::new();
                if object.is_class_only() {
                    writer::append_class_name(&mut reference, object.class_name());
                } else {
                    compact_writer::append_instance_name(&mut reference, object);
                }
                XmlFragment {
                    body,
                    reference,
                    host: object.host().map(str::to_string),
                    namespace: object.namespace().map(str::to_string),
                    class_only: object.is_class_only(),
                }
            })
            .collect()
    }

    // ========================================================================
    // XML -> classic
    // ========================================================================

    fn fragment_path(fragment: &XmlFragment) -> Result<Option<ObjectPath>, XmlError> {
        if fragment.reference.trim().is_empty() {
            return Ok(None);
        }
        let mut path = reader::parse_path(&fragment.reference)?;
        path.complete(
            fragment.host.as_deref(),
            fragment.namespace.as_deref().map(CimName::from).as_ref(),
        );
        Ok(Some(path))
    }

    pub(super) fn xml_to_classic(&self, fragments: &[XmlFragment]) -> Result<ClassicData, XmlError> {
        let mut data = ClassicData::empty(self.kind);
        match &mut data {
            ClassicData::Paths(paths) => {
                for fragment in fragments {
                    let path = Self::fragment_path(fragment)?.ok_or_else(|| {
                        XmlError::InvalidValue("path fragment without a name".into())
                    })?;
                    paths.push(path);
                }
            }
            ClassicData::Instances(instances) => {
                for fragment in fragments {
                    let mut instance = reader::parse_instance(&fragment.body)?;
                    if let Some(path) = Self::fragment_path(fragment)? {
                        instance.set_path(Some(path));
                    }
                    instances.push(instance);
                }
            }
            ClassicData::Objects(objects) => {
                for fragment in fragments {
                    let mut object = reader::parse_object(&fragment.body)?;
                    if let Some(path) = Self::fragment_path(fragment)? {
                        object.set_path(Some(path));
                    }
                    objects.push(object);
                }
            }
        }
        Ok(data)
    }

    // ========================================================================
    // Binary units
    // ========================================================================

    /// Decode every unit of `bytes`, classic units into one classic array
    /// and compact units into one compact array.
    pub(super) fn decode_binary(&self, bytes: &[u8], swap: bool) -> Result<DecodedBinary, SerError> {
        let mut cursor = BinaryCursor::from_bytes(bytes.to_vec()).with_magic(self.magic);
        cursor.set_swap(swap);
        let mut decoded = DecodedBinary::default();
        while !cursor.is_exhausted() {
            let offset = cursor.position();
            match cursor.get_u32()? {
                BINARY_TYPE_CPPD => {
                    let mut unit = match self.kind {
                        ContentKind::InstanceNames | ContentKind::ObjectPaths => {
                            ClassicData::Paths(cursor.get_paths()?)
                        }
                        ContentKind::Instances | ContentKind::Instance => {
                            ClassicData::Instances(cursor.get_instances()?)
                        }
                        ContentKind::Objects => ClassicData::Objects(cursor.get_objects()?),
                    };
                    if let Some(objects) = decoded.compact.take() {
                        let mut ahead = self.compact_to_classic(&objects);
                        ahead.append(unit);
                        unit = ahead;
                    }
                    match &mut decoded.classic {
                        Some(existing) => existing.append(unit),
                        None => decoded.classic = Some(unit),
                    }
                }
                BINARY_TYPE_SCMO => {
                    let unit = cursor.get_compact_objects()?;
                    decoded.compact.get_or_insert_with(Vec::new).extend(unit);
                }
                other => {
                    log::warn!(
                        "[binary] unknown unit marker {:#010x} at offset {}",
                        other,
                        offset
                    );
                    return Err(SerError::InvalidData {
                        reason: format!("unknown unit marker {:#010x}", other),
                    });
                }
            }
        }
        Ok(decoded)
    }

    pub(super) fn put_classic_unit(&self, cursor: &mut BinaryCursor, data: &ClassicData) -> Result<(), SerError> {
        cursor.put_u32(BINARY_TYPE_CPPD)?;
        match data {
            ClassicData::Paths(paths) => cursor.put_paths(paths),
            ClassicData::Instances(instances) => cursor.put_instances(instances),
            ClassicData::Objects(objects) => cursor.put_objects(objects),
        }
    }

    pub(super) fn put_compact_unit(&self, cursor: &mut BinaryCursor, objects: &[CompactObject]) -> Result<(), SerError> {
        cursor.put_u32(BINARY_TYPE_SCMO)?;
        cursor.put_compact_objects(objects)
    }
}

/// Fragment for `path`: the name element plus the path's addressing.
fn path_fragment(path: &ObjectPath, class_only: bool, body: String) -> XmlFragment {
    let mut reference = String::new();
    if class_only {
        writer::append_class_name(&mut reference, path.class_name().as_str());
    } else {
        writer::append_instance_name(&mut reference, path);
    }
    XmlFragment {
        body,
        reference,
        host: path.host().map(str::to_string),
        namespace: path.namespace().map(|ns| ns.as_str().to_string()),
        class_only,
    }
}

impl ResponseData {
    pub(super) fn converter(&self) -> Converter<'_> {
        Converter {
            kind: self.kind,
            options: &self.options,
            cache: self.cache.as_deref(),
            magic: self.magic,
        }
    }

    /// Whether `target` already holds every element.
    fn holds_all(&self, target: Encoding) -> bool {
        let present = self.has(target) || self.element_count() == 0 && self.binary.is_none();
        let xml = self.xml.is_none() || target == Encoding::Xml;
        let binary = self.binary.is_none() || target == Encoding::Binary;
        let classic = self.classic.is_none()
            || target == Encoding::Classic
            || (self.mirrored && target == Encoding::Compact);
        let compact = self.compact.is_none()
            || target == Encoding::Compact
            || (self.mirrored && target == Encoding::Classic);
        present && xml && binary && classic && compact
    }

    /// Convert everything held elsewhere into `target`.
    ///
    /// A no-op when `target` already holds every element, so repeated calls
    /// never convert twice. On error the container is unchanged.
    pub fn resolve_to(&mut self, target: Encoding) -> Result<(), ResponseError> {
        if self.holds_all(target) {
            if !self.has(target) {
                self.init_empty(target);
            }
            return Ok(());
        }
        let result = match target {
            Encoding::Classic => self.resolve_to_classic(),
            Encoding::Compact => self.resolve_to_compact(),
            Encoding::Xml => self.resolve_to_xml(),
            Encoding::Binary => self.resolve_to_binary(),
        };
        match &result {
            Ok(()) => log::debug!(
                "[response] resolved {} content to {:?} ({} elements, encodings {:?})",
                self.kind,
                target,
                self.element_count(),
                self.encodings()
            ),
            Err(e) => log::warn!("[response] resolve to {:?} failed: {}", target, e),
        }
        result
    }

    fn init_empty(&mut self, target: Encoding) {
        match target {
            Encoding::Classic => self.classic = Some(ClassicData::empty(self.kind)),
            Encoding::Compact => self.compact = Some(Vec::new()),
            Encoding::Xml => self.xml = Some(Vec::new()),
            Encoding::Binary => self.binary = Some(Vec::new()),
        }
    }

    /// Decode stored binary into classic and compact storage.
    ///
    /// Decoded elements stay ahead of every existing classic and compact
    /// element. Classic units land before the existing classic elements and
    /// compact units before the existing compact ones; when classic elements
    /// already exist, compact units are converted and join the classic side
    /// instead. A mirrored pair collapses to its classic half first.
    pub fn resolve_binary(&mut self) -> Result<(), ResponseError> {
        let Some(bytes) = self.binary.as_deref() else {
            return Ok(());
        };
        let conv = self.converter();
        let mut decoded = match conv.decode_binary(bytes, self.swap) {
            Ok(decoded) => decoded,
            Err(e) => {
                log::warn!("[binary] discarding undecodable {} payload: {}", self.kind, e);
                return Err(e.into());
            }
        };
        let classic_ahead = self.classic.as_ref().is_some_and(|data| !data.is_empty());
        if classic_ahead {
            if let Some(objects) = decoded.compact.take() {
                let converted = conv.compact_to_classic(&objects);
                let mut data = decoded.classic.take().unwrap_or_else(|| ClassicData::empty(self.kind));
                data.append(converted);
                decoded.classic = Some(data);
            }
        }

        self.binary = None;
        self.swap = false;
        if self.mirrored {
            self.compact = None;
            self.mirrored = false;
        }
        if let Some(mut data) = decoded.classic {
            if let Some(existing) = self.classic.take() {
                data.append(existing);
            }
            self.classic = Some(data);
        }
        if let Some(mut objects) = decoded.compact {
            if let Some(existing) = self.compact.take() {
                objects.extend(existing);
            }
            self.compact = Some(objects);
        }
        log::debug!(
            "[response] decoded binary {} payload ({} elements)",
            self.kind,
            self.element_count()
        );
        Ok(())
    }

    fn resolve_to_classic(&mut self) -> Result<(), ResponseError> {
        let conv = self.converter();
        let mut before: Vec<ClassicData> = Vec::new();
        if let Some(fragments) = &self.xml {
            before.push(conv.xml_to_classic(fragments)?);
        }
        if let Some(bytes) = &self.binary {
            let decoded = conv.decode_binary(bytes, self.swap)?;
            before.extend(decoded.classic);
            if let Some(objects) = decoded.compact {
                before.push(conv.compact_to_classic(&objects));
            }
        }
        let after = match &self.compact {
            Some(objects) if !self.mirrored => Some(conv.compact_to_classic(objects)),
            _ => None,
        };

        let mirror = self.compact.is_some()
            && before.is_empty()
            && (self.classic.is_none() || self.mirrored);
        let mut merged = ClassicData::empty(self.kind);
        for part in before {
            merged.append(part);
        }
        if let Some(existing) = self.classic.take() {
            merged.append(existing);
        }
        if let Some(part) = after {
            merged.append(part);
        }
        self.classic = Some(merged);
        self.xml = None;
        self.binary = None;
        self.swap = false;
        if !mirror {
            self.compact = None;
        }
        self.mirrored = mirror;
        Ok(())
    }

    fn resolve_to_compact(&mut self) -> Result<(), ResponseError> {
        let conv = self.converter();
        let mut before: Vec<CompactObject> = Vec::new();
        if let Some(fragments) = &self.xml {
            before.extend(conv.classic_to_compact(&conv.xml_to_classic(fragments)?)?);
        }
        if let Some(bytes) = &self.binary {
            let decoded = conv.decode_binary(bytes, self.swap)?;
            if let Some(data) = decoded.classic {
                before.extend(conv.classic_to_compact(&data)?);
            }
            before.extend(decoded.compact.unwrap_or_default());
        }
        let middle = match &self.classic {
            Some(data) if !self.mirrored => Some(conv.classic_to_compact(data)?),
            _ => None,
        };

        let mirror = self.classic.is_some()
            && self.xml.is_none()
            && self.binary.is_none()
            && (self.compact.is_none() || self.mirrored);
        let mut merged = before;
        merged.extend(middle.unwrap_or_default());
        merged.extend(self.compact.take().unwrap_or_default());
        self.compact = Some(merged);
        self.xml = None;
        self.binary = None;
        self.swap = false;
        if !mirror {
            self.classic = None;
        }
        self.mirrored = mirror;
        Ok(())
    }

    fn resolve_to_xml(&mut self) -> Result<(), ResponseError> {
        let conv = self.converter();
        let mut merged: Vec<XmlFragment> = Vec::new();
        if let Some(bytes) = &self.binary {
            let decoded = conv.decode_binary(bytes, self.swap)?;
            if let Some(data) = &decoded.classic {
                merged.extend(conv.classic_to_xml(data));
            }
            if let Some(objects) = &decoded.compact {
                merged.extend(conv.compact_to_xml(objects));
            }
        }
        if let Some(data) = &self.classic {
            merged.extend(conv.classic_to_xml(data));
        }
        if let Some(objects) = &self.compact {
            if !self.mirrored {
                merged.extend(conv.compact_to_xml(objects));
            }
        }

        let mut fragments = self.xml.take().unwrap_or_default();
        fragments.extend(merged);
        self.xml = Some(fragments);
        self.binary = None;
        self.swap = false;
        self.classic = None;
        self.compact = None;
        self.mirrored = false;
        Ok(())
    }

    fn resolve_to_binary(&mut self) -> Result<(), ResponseError> {
        if self.swap {
            // foreign byte order cannot be concatenated with native units
            self.resolve_binary()?;
        }
        let conv = self.converter();
        let mut cursor = BinaryCursor::new().with_magic(self.magic);
        if let Some(fragments) = &self.xml {
            conv.put_classic_unit(&mut cursor, &conv.xml_to_classic(fragments)?)?;
        }
        if let Some(bytes) = &self.binary {
            cursor.put_encoded(bytes)?;
        }
        if let Some(data) = &self.classic {
            conv.put_classic_unit(&mut cursor, data)?;
        }
        if let Some(objects) = &self.compact {
            if !self.mirrored {
                conv.put_compact_unit(&mut cursor, objects)?;
            }
        }

        self.binary = Some(cursor.release());
        self.xml = None;
        self.classic = None;
        self.compact = None;
        self.mirrored = false;
        Ok(())
    }
}
