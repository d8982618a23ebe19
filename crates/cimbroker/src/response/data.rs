// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::{ClassicData, ContentKind, Encoding, Encodings, RequestOptions, ResponseError, XmlFragment};
use crate::aggregate::QueryFilter;
use crate::cim::{CimInstance, CimName, CimObject, ObjectPath};
use crate::config::BrokerConfig;
use crate::scmo::{ClassCache, CompactObject};
use std::sync::Arc;

/// Result set of one CIM operation, in any mix of encodings.
///
/// Populated by one thread, then handed off by value to the aggregator or
/// encoder; it is not meant for concurrent mutation.
#[derive(Debug, Clone)]
pub struct ResponseData {
    pub(super) kind: ContentKind,
    pub(super) options: RequestOptions,
    /// Magic markers in binary units written or read by this container.
    pub(super) magic: bool,
    /// Stored binary was written in the other byte order.
    pub(super) swap: bool,
    pub(super) cache: Option<Arc<ClassCache>>,
    pub(super) classic: Option<ClassicData>,
    pub(super) binary: Option<Vec<u8>>,
    pub(super) xml: Option<Vec<XmlFragment>>,
    pub(super) compact: Option<Vec<CompactObject>>,
    /// Classic and compact hold the same elements.
    pub(super) mirrored: bool,
}

impl ResponseData {
    pub fn new(kind: ContentKind) -> Self {
        Self {
            kind,
            options: RequestOptions::default(),
            magic: true,
            swap: false,
            cache: None,
            classic: None,
            binary: None,
            xml: None,
            compact: None,
            mirrored: false,
        }
    }

    /// Empty container shaped by broker defaults (magic markers, qualifier
    /// and class-origin emission).
    pub fn with_config(kind: ContentKind, config: &BrokerConfig) -> Self {
        let mut data = Self::new(kind);
        data.magic = config.binary_magic;
        data.options.include_qualifiers = config.include_qualifiers;
        data.options.include_class_origin = config.include_class_origin;
        data
    }

    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_binary_magic(mut self, enabled: bool) -> Self {
        self.magic = enabled;
        self
    }

    /// Class cache used when converting classic objects to compact form.
    pub fn with_class_cache(mut self, cache: Arc<ClassCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn content_kind(&self) -> ContentKind {
        self.kind
    }

    pub fn options(&self) -> &RequestOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: RequestOptions) {
        self.options = options;
    }

    pub fn binary_magic(&self) -> bool {
        self.magic
    }

    /// Encodings currently holding (possibly empty) storage.
    pub fn encodings(&self) -> Encodings {
        let mut set = Encodings::EMPTY;
        if self.classic.is_some() {
            set.insert(Encoding::Classic);
        }
        if self.binary.is_some() {
            set.insert(Encoding::Binary);
        }
        if self.xml.is_some() {
            set.insert(Encoding::Xml);
        }
        if self.compact.is_some() {
            set.insert(Encoding::Compact);
        }
        set
    }

    pub fn has(&self, encoding: Encoding) -> bool {
        self.encodings().contains(encoding)
    }

    /// True when classic and compact hold the same elements.
    pub fn is_mirrored(&self) -> bool {
        self.mirrored
    }

    // ========================================================================
    // Setters
    // ========================================================================

    fn set_classic(&mut self, data: ClassicData) {
        assert!(
            data.fits(self.kind),
            "classic data does not match content kind {}",
            self.kind
        );
        self.classic = Some(data);
        self.mirrored = false;
    }

    /// # Panics
    ///
    /// Panics unless the content kind is `InstanceNames`.
    pub fn set_instance_names(&mut self, paths: Vec<ObjectPath>) {
        assert_eq!(self.kind, ContentKind::InstanceNames);
        self.set_classic(ClassicData::Paths(paths));
    }

    /// # Panics
    ///
    /// Panics unless the content kind is `ObjectPaths`.
    pub fn set_object_paths(&mut self, paths: Vec<ObjectPath>) {
        assert_eq!(self.kind, ContentKind::ObjectPaths);
        self.set_classic(ClassicData::Paths(paths));
    }

    /// # Panics
    ///
    /// Panics unless the content kind is `Instances` or `Instance`.
    pub fn set_instances(&mut self, instances: Vec<CimInstance>) {
        self.set_classic(ClassicData::Instances(instances));
    }

    /// # Panics
    ///
    /// Panics unless the content kind is `Instance`.
    pub fn set_instance(&mut self, instance: CimInstance) {
        assert_eq!(self.kind, ContentKind::Instance);
        self.set_classic(ClassicData::Instances(vec![instance]));
    }

    /// # Panics
    ///
    /// Panics unless the content kind is `Objects`.
    pub fn set_objects(&mut self, objects: Vec<CimObject>) {
        self.set_classic(ClassicData::Objects(objects));
    }

    pub fn set_compact(&mut self, objects: Vec<CompactObject>) {
        self.compact = Some(objects);
        self.mirrored = false;
    }

    /// Binary payload written in this host's byte order.
    pub fn set_binary(&mut self, bytes: Vec<u8>) {
        self.set_binary_with_order(bytes, false);
    }

    /// Binary payload; `swap` when the writer's byte order differs from this
    /// host's, as negotiated by the transport.
    pub fn set_binary_with_order(&mut self, bytes: Vec<u8>, swap: bool) {
        self.binary = Some(bytes);
        self.swap = swap;
    }

    pub fn set_xml(&mut self, fragments: Vec<XmlFragment>) {
        self.xml = Some(fragments);
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    fn unsupported(&self, what: &str) -> ResponseError {
        ResponseError::Unsupported(format!("{} on {} content", what, self.kind))
    }

    fn classic_paths(&mut self, expected: ContentKind, what: &str) -> Result<&[ObjectPath], ResponseError> {
        if self.kind != expected {
            return Err(self.unsupported(what));
        }
        self.resolve_to(Encoding::Classic)?;
        match &self.classic {
            Some(ClassicData::Paths(paths)) => Ok(paths),
            _ => Ok(&[]),
        }
    }

    pub fn instance_names(&mut self) -> Result<&[ObjectPath], ResponseError> {
        self.classic_paths(ContentKind::InstanceNames, "instance names")
    }

    pub fn object_paths(&mut self) -> Result<&[ObjectPath], ResponseError> {
        self.classic_paths(ContentKind::ObjectPaths, "object paths")
    }

    pub fn instances(&mut self) -> Result<&[CimInstance], ResponseError> {
        if !matches!(self.kind, ContentKind::Instances | ContentKind::Instance) {
            return Err(self.unsupported("instances"));
        }
        self.resolve_to(Encoding::Classic)?;
        match &self.classic {
            Some(ClassicData::Instances(instances)) => Ok(instances),
            _ => Ok(&[]),
        }
    }

    /// The single instance of a GetInstance result, if any.
    pub fn instance(&mut self) -> Result<Option<&CimInstance>, ResponseError> {
        if self.kind != ContentKind::Instance {
            return Err(self.unsupported("instance"));
        }
        Ok(self.instances()?.first())
    }

    pub fn objects(&mut self) -> Result<&[CimObject], ResponseError> {
        if self.kind != ContentKind::Objects {
            return Err(self.unsupported("objects"));
        }
        self.resolve_to(Encoding::Classic)?;
        match &self.classic {
            Some(ClassicData::Objects(objects)) => Ok(objects),
            _ => Ok(&[]),
        }
    }

    pub fn compact_objects(&mut self) -> Result<&[CompactObject], ResponseError> {
        self.resolve_to(Encoding::Compact)?;
        Ok(self.compact.as_deref().unwrap_or_default())
    }

    pub fn xml_fragments(&mut self) -> Result<&[XmlFragment], ResponseError> {
        self.resolve_to(Encoding::Xml)?;
        Ok(self.xml.as_deref().unwrap_or_default())
    }

    pub fn binary(&mut self) -> Result<&[u8], ResponseError> {
        self.resolve_to(Encoding::Binary)?;
        Ok(self.binary.as_deref().unwrap_or_default())
    }

    // ========================================================================
    // Merging and addressing
    // ========================================================================

    /// Concatenate `other` onto this container, encoding by encoding.
    ///
    /// Relative order within each encoding is preserved. A mirrored pair on
    /// either side collapses to its classic half first when the other side
    /// contributes unmirrored classic or compact elements. Stored binary is
    /// concatenated as is, so both sides must share a byte order; call
    /// [`resolve_binary`](Self::resolve_binary) on foreign-order data first.
    ///
    /// # Panics
    ///
    /// Panics when the content kinds differ, and in debug builds when both
    /// sides hold binary in different byte orders.
    pub fn append_response_data(&mut self, other: ResponseData) {
        assert_eq!(
            self.kind, other.kind,
            "append_response_data across content kinds"
        );
        let ResponseData {
            classic,
            binary,
            xml,
            compact,
            mirrored,
            swap,
            ..
        } = other;

        if let Some(bytes) = binary {
            match &mut self.binary {
                Some(existing) => {
                    debug_assert_eq!(
                        self.swap, swap,
                        "append_response_data across binary byte orders"
                    );
                    existing.extend_from_slice(&bytes);
                }
                None => {
                    self.binary = Some(bytes);
                    self.swap = swap;
                }
            }
        }
        if let Some(fragments) = xml {
            self.xml.get_or_insert_with(Vec::new).extend(fragments);
        }

        if self.classic.is_none() && self.compact.is_none() {
            self.classic = classic;
            self.compact = compact;
            self.mirrored = mirrored;
            return;
        }
        if classic.is_none() && compact.is_none() {
            return;
        }
        let keep_mirror = self.mirrored && mirrored;
        let compact = if mirrored && !keep_mirror { None } else { compact };
        if self.mirrored && !keep_mirror {
            self.compact = None;
            self.mirrored = false;
        }
        if let Some(data) = classic {
            match &mut self.classic {
                Some(existing) => existing.append(data),
                None => self.classic = Some(data),
            }
        }
        if let Some(objects) = compact {
            self.compact.get_or_insert_with(Vec::new).extend(objects);
        }
    }

    /// Fill in a missing host and namespace on every element.
    ///
    /// Elements that already carry their own keep them. Stored binary is
    /// decoded first, since it cannot be amended in place.
    pub fn complete_host_and_namespace(
        &mut self,
        host: &str,
        namespace: &str,
    ) -> Result<(), ResponseError> {
        self.complete(Some(host).filter(|h| !h.is_empty()), namespace)
    }

    /// Fill in a missing namespace on every element.
    pub fn complete_namespace(&mut self, namespace: &str) -> Result<(), ResponseError> {
        self.complete(None, namespace)
    }

    fn complete(&mut self, host: Option<&str>, namespace: &str) -> Result<(), ResponseError> {
        self.resolve_binary()?;
        let ns = Some(namespace).filter(|ns| !ns.is_empty());
        let ns_name = ns.map(CimName::from);

        if let Some(fragments) = &mut self.xml {
            for fragment in fragments.iter_mut() {
                if fragment.host.is_none() {
                    fragment.host = host.map(str::to_string);
                }
                if fragment.namespace.is_none() {
                    fragment.namespace = ns.map(str::to_string);
                }
            }
        }
        match &mut self.classic {
            Some(ClassicData::Paths(paths)) => paths
                .iter_mut()
                .for_each(|p| p.complete(host, ns_name.as_ref())),
            Some(ClassicData::Instances(instances)) => {
                for instance in instances.iter_mut() {
                    let mut path = instance.path().cloned().unwrap_or_else(|| instance.key_path());
                    path.complete(host, ns_name.as_ref());
                    instance.set_path(Some(path));
                }
            }
            Some(ClassicData::Objects(objects)) => {
                for object in objects.iter_mut() {
                    let mut path = match (object.path(), object.as_instance()) {
                        (Some(path), _) => path.clone(),
                        (None, Some(instance)) => instance.key_path(),
                        (None, None) => ObjectPath::new(object.class_name().clone()),
                    };
                    path.complete(host, ns_name.as_ref());
                    object.set_path(Some(path));
                }
            }
            None => {}
        }
        if let Some(objects) = &mut self.compact {
            objects
                .iter_mut()
                .for_each(|o| o.complete_host_and_namespace(host, ns));
        }
        Ok(())
    }

    // ========================================================================
    // Size, paging and filtering
    // ========================================================================

    /// Number of elements, decoding stored binary first.
    pub fn size(&mut self) -> Result<usize, ResponseError> {
        self.resolve_binary()?;
        Ok(self.element_count())
    }

    /// Number of decoded elements; stored binary is not counted.
    pub fn element_count(&self) -> usize {
        let xml = self.xml.as_ref().map_or(0, Vec::len);
        let classic = self.classic.as_ref().map_or(0, ClassicData::len);
        let compact = match (&self.compact, self.mirrored) {
            (Some(objects), false) => objects.len(),
            _ => 0,
        };
        xml + classic + compact
    }

    pub fn is_empty(&self) -> bool {
        self.binary.as_ref().map_or(true, Vec::is_empty) && self.element_count() == 0
    }

    /// Move up to `count` leading elements into a new container of the same
    /// kind and options.
    pub fn move_objects(&mut self, count: usize) -> Result<ResponseData, ResponseError> {
        self.resolve_binary()?;
        let mut moved = self.clone_settings();
        let mut left = count;

        if let Some(fragments) = &mut self.xml {
            let n = left.min(fragments.len());
            if n > 0 {
                moved.xml = Some(fragments.drain(..n).collect());
                left -= n;
            }
        }
        if let Some(data) = &mut self.classic {
            let n = left.min(data.len());
            if n > 0 {
                moved.classic = Some(data.split_front(n));
                if self.mirrored {
                    if let Some(objects) = &mut self.compact {
                        moved.compact = Some(objects.drain(..n).collect());
                        moved.mirrored = true;
                    }
                }
                left -= n;
            }
        }
        if !self.mirrored {
            if let Some(objects) = &mut self.compact {
                let n = left.min(objects.len());
                if n > 0 {
                    moved.compact = Some(objects.drain(..n).collect());
                }
            }
        }
        log::debug!(
            "[response] moved {} of {} requested {} elements",
            moved.element_count(),
            count,
            self.kind
        );
        Ok(moved)
    }

    fn clone_settings(&self) -> ResponseData {
        ResponseData {
            options: self.options.clone(),
            magic: self.magic,
            cache: self.cache.clone(),
            ..ResponseData::new(self.kind)
        }
    }

    /// Keep only the instances accepted by `filter`, projected by it.
    ///
    /// Classes in an `Objects` result pass through untouched. The result is
    /// held in classic form afterwards.
    pub fn apply_query_filter(&mut self, filter: &dyn QueryFilter) -> Result<(), ResponseError> {
        if self.kind.holds_paths() {
            return Err(self.unsupported("query filtering"));
        }
        self.resolve_to(Encoding::Classic)?;
        let before = self.element_count();
        match &mut self.classic {
            Some(ClassicData::Instances(instances)) => {
                instances.retain(|i| filter.evaluate(i));
                instances.iter_mut().for_each(|i| filter.project(i));
            }
            Some(ClassicData::Objects(objects)) => {
                objects.retain(|o| o.as_instance().map_or(true, |i| filter.evaluate(i)));
                for object in objects.iter_mut() {
                    if let CimObject::Instance(instance) = object {
                        filter.project(instance);
                    }
                }
            }
            _ => {}
        }
        if self.mirrored {
            self.compact = None;
            self.mirrored = false;
        }
        log::debug!(
            "[response] query filter kept {} of {} elements",
            self.element_count(),
            before
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cim::{KeyBinding, Property, Qualifier};
    use crate::scmo::convert;

    fn instance(id: &str) -> CimInstance {
        CimInstance::new("CIM_Thing")
            .with_property(
                Property::new("Id", id)
                    .with_qualifier(Qualifier::new("Key", true))
                    .unwrap(),
            )
            .unwrap()
            .with_path(ObjectPath::new("CIM_Thing").with_key(KeyBinding::string("Id", id)))
    }

    fn ids(data: &mut ResponseData) -> Vec<String> {
        data.instances()
            .unwrap()
            .iter()
            .map(|i| i.value("Id").and_then(|v| v.as_str()).unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_set_keeps_other_encodings() {
        let mut data = ResponseData::new(ContentKind::Instances);
        data.set_xml(vec![XmlFragment::new("<INSTANCE CLASSNAME=\"X\"/>", "")]);
        data.set_instances(vec![instance("a")]);
        assert_eq!(
            data.encodings(),
            Encodings::from(Encoding::Xml) | Encoding::Classic
        );
        assert_eq!(data.size().unwrap(), 2);
    }

    #[test]
    #[should_panic]
    fn test_set_wrong_shape_panics() {
        let mut data = ResponseData::new(ContentKind::InstanceNames);
        data.set_instances(vec![instance("a")]);
    }

    #[test]
    fn test_accessor_on_wrong_kind() {
        let mut data = ResponseData::new(ContentKind::InstanceNames);
        assert!(matches!(
            data.instances(),
            Err(ResponseError::Unsupported(_))
        ));
    }

    #[test]
    fn test_append_classic() {
        let mut a = ResponseData::new(ContentKind::Instances);
        a.set_instances(vec![instance("a")]);
        let mut b = ResponseData::new(ContentKind::Instances);
        b.set_instances(vec![instance("b"), instance("c")]);
        a.append_response_data(b);
        assert_eq!(ids(&mut a), vec!["a", "b", "c"]);
    }

    #[test]
    #[should_panic(expected = "append_response_data")]
    fn test_append_kind_mismatch_panics() {
        let mut a = ResponseData::new(ContentKind::Instances);
        a.append_response_data(ResponseData::new(ContentKind::Objects));
    }

    fn binary_unit(instances: &[CimInstance]) -> Vec<u8> {
        let mut cursor = crate::core::ser::BinaryCursor::new();
        cursor.put_u32(crate::config::BINARY_TYPE_CPPD).unwrap();
        cursor.put_instances(instances).unwrap();
        cursor.release()
    }

    #[test]
    fn test_append_binary_same_order() {
        let mut a = ResponseData::new(ContentKind::Instances);
        a.set_binary(binary_unit(&[instance("a")]));
        let mut b = ResponseData::new(ContentKind::Instances);
        b.set_binary(binary_unit(&[instance("b")]));
        a.append_response_data(b);
        assert_eq!(ids(&mut a), vec!["a", "b"]);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "binary byte orders")]
    fn test_append_binary_mixed_order_panics() {
        let mut a = ResponseData::new(ContentKind::Instances);
        a.set_binary(binary_unit(&[instance("a")]));
        let mut b = ResponseData::new(ContentKind::Instances);
        b.set_binary_with_order(binary_unit(&[instance("b")]), true);
        a.append_response_data(b);
    }

    #[test]
    fn test_append_mirrored_onto_plain() {
        let mut a = ResponseData::new(ContentKind::Instances);
        a.set_instances(vec![instance("a")]);
        a.resolve_to(Encoding::Compact).unwrap();
        assert!(a.is_mirrored());

        let mut b = ResponseData::new(ContentKind::Instances);
        b.set_compact(vec![convert::from_instance(&instance("b"), "root", None).unwrap()]);
        a.append_response_data(b);
        assert!(!a.is_mirrored());
        assert_eq!(a.size().unwrap(), 2);
        assert_eq!(ids(&mut a), vec!["a", "b"]);
    }

    #[test]
    fn test_complete_host_and_namespace() {
        let mut data = ResponseData::new(ContentKind::Instances);
        let mut own = instance("a");
        if let Some(path) = own.path_mut() {
            path.set_namespace(Some("interop".into()));
        }
        data.set_instances(vec![own, CimInstance::new("CIM_Bare")]);
        data.complete_host_and_namespace("srv", "root/cimv2").unwrap();

        let instances = data.instances().unwrap();
        let first = instances[0].path().unwrap();
        assert_eq!(first.host(), Some("srv"));
        assert_eq!(first.namespace().unwrap().as_str(), "interop");
        let second = instances[1].path().unwrap();
        assert_eq!(second.namespace().unwrap().as_str(), "root/cimv2");
    }

    #[test]
    fn test_move_objects() {
        let mut data = ResponseData::new(ContentKind::Instances);
        data.set_instances(vec![instance("a"), instance("b"), instance("c")]);
        let mut page = data.move_objects(2).unwrap();
        assert_eq!(ids(&mut page), vec!["a", "b"]);
        assert_eq!(ids(&mut data), vec!["c"]);
        let mut rest = data.move_objects(10).unwrap();
        assert_eq!(rest.size().unwrap(), 1);
        assert_eq!(data.size().unwrap(), 0);
    }

    struct IdIs(&'static str);

    impl QueryFilter for IdIs {
        fn evaluate(&self, instance: &CimInstance) -> bool {
            instance.value("Id").and_then(|v| v.as_str()) == Some(self.0)
        }
    }

    #[test]
    fn test_apply_query_filter() {
        let mut data = ResponseData::new(ContentKind::Instances);
        data.set_instances(vec![instance("a"), instance("b")]);
        data.apply_query_filter(&IdIs("b")).unwrap();
        assert_eq!(ids(&mut data), vec!["b"]);

        let mut names = ResponseData::new(ContentKind::InstanceNames);
        assert!(names.apply_query_filter(&IdIs("b")).is_err());
    }
}
