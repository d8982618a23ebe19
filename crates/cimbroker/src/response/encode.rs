// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Outbound encoders.
//!
//! Both encoders walk the elements in the container's logical order. XML
//! output is the sequence of per-element response elements for the content
//! kind; the enclosing `IRETURNVALUE` belongs to the protocol layer.
//!
//! | Content kind | Element |
//! |--------------|---------|
//! | InstanceNames | `INSTANCENAME` |
//! | Instances | `VALUE.NAMEDINSTANCE` |
//! | Instance | `INSTANCE` |
//! | Objects | `VALUE.OBJECTWITHPATH` |
//! | ObjectPaths | `OBJECTPATH` |

use super::{ClassicData, ContentKind, Encoding, ResponseData, ResponseError, XmlFragment};
use crate::core::ser::BinaryCursor;
use crate::scmo::CompactObject;
use crate::xml::{compact_writer, writer, XmlOptions};

impl ResponseData {
    /// Append the binary response to `out`: XML-sourced elements as a CPPD
    /// unit, stored binary verbatim, classic elements as a CPPD unit, then
    /// compact elements as an SCMO unit.
    ///
    /// Consumes the other encodings: afterwards the container holds only
    /// the binary form.
    pub fn encode_binary_response(&mut self, out: &mut BinaryCursor) -> Result<(), ResponseError> {
        self.resolve_to(Encoding::Binary)?;
        let bytes = self.binary.as_deref().unwrap_or_default();
        out.put_encoded(bytes)?;
        log::debug!(
            "[response] encoded {} bytes of binary {} content",
            bytes.len(),
            self.kind
        );
        Ok(())
    }

    /// Append the XML response to `out`.
    ///
    /// Stored binary is decoded first. Fragments are copied verbatim, then
    /// classic elements are rendered, then compact elements unless they
    /// mirror the classic ones.
    pub fn encode_xml_response(&mut self, out: &mut String) -> Result<(), ResponseError> {
        self.resolve_binary()?;
        let start = out.len();
        let opts = self.options.xml_options();

        if let Some(fragments) = &self.xml {
            for fragment in fragments {
                append_fragment(out, self.kind, fragment);
            }
        }
        if let Some(data) = &self.classic {
            let class_paths = self.options.is_class_operation;
            append_classic(out, data, self.kind, class_paths, &opts);
        }
        if let Some(objects) = &self.compact {
            if !self.mirrored {
                objects
                    .iter()
                    .for_each(|o| append_compact(out, o, self.kind, &opts));
            }
        }
        log::debug!(
            "[response] encoded {} bytes of XML {} content ({} elements)",
            out.len() - start,
            self.kind,
            self.element_count()
        );
        Ok(())
    }
}

fn append_fragment(out: &mut String, kind: ContentKind, fragment: &XmlFragment) {
    let host = fragment.host.as_deref();
    let namespace = fragment.namespace.as_deref();
    let name = |out: &mut String| out.push_str(&fragment.reference);
    match kind {
        ContentKind::InstanceNames => out.push_str(&fragment.reference),
        ContentKind::ObjectPaths => {
            out.push_str("<OBJECTPATH>");
            writer::append_path_with(out, host, namespace, fragment.class_only, name);
            out.push_str("</OBJECTPATH>");
        }
        ContentKind::Instances => {
            out.push_str("<VALUE.NAMEDINSTANCE>");
            out.push_str(&fragment.reference);
            out.push_str(&fragment.body);
            out.push_str("</VALUE.NAMEDINSTANCE>");
        }
        ContentKind::Instance => out.push_str(&fragment.body),
        ContentKind::Objects => {
            out.push_str("<VALUE.OBJECTWITHPATH>");
            writer::append_path_with(out, host, namespace, fragment.class_only, name);
            out.push_str(&fragment.body);
            out.push_str("</VALUE.OBJECTWITHPATH>");
        }
    }
}

fn append_classic(
    out: &mut String,
    data: &ClassicData,
    kind: ContentKind,
    class_paths: bool,
    opts: &XmlOptions,
) {
    match data {
        ClassicData::Paths(paths) => {
            for path in paths {
                if kind == ContentKind::InstanceNames {
                    writer::append_instance_name(out, path);
                } else {
                    writer::append_object_path(out, path, class_paths);
                }
            }
        }
        ClassicData::Instances(instances) => {
            for instance in instances {
                if kind == ContentKind::Instance {
                    writer::append_instance(out, instance, opts);
                } else {
                    writer::append_named_instance(out, instance, opts);
                }
            }
        }
        ClassicData::Objects(objects) => objects
            .iter()
            .for_each(|o| writer::append_object_with_path(out, o, opts)),
    }
}

fn append_compact(out: &mut String, object: &CompactObject, kind: ContentKind, opts: &XmlOptions) {
    match kind {
        ContentKind::InstanceNames => compact_writer::append_instance_name(out, object),
        ContentKind::ObjectPaths => compact_writer::append_object_path(out, object),
        ContentKind::Instances => compact_writer::append_named_instance(out, object, opts),
        ContentKind::Instance => compact_writer::append_instance(out, object, opts),
        ContentKind::Objects => compact_writer::append_object_with_path(out, object, opts),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cim::{CimClass, CimInstance, CimObject, KeyBinding, ObjectPath, Property, Qualifier};
    use crate::response::RequestOptions;
    use crate::scmo::convert;

    fn instance(id: &str) -> CimInstance {
        CimInstance::new("CIM_Thing")
            .with_property(
                Property::new("Id", id)
                    .with_qualifier(Qualifier::new("Key", true))
                    .unwrap(),
            )
            .unwrap()
            .with_property(Property::new("Size", 42u64))
            .unwrap()
            .with_path(
                ObjectPath::new("CIM_Thing")
                    .with_host("srv")
                    .with_namespace("root/cimv2")
                    .with_key(KeyBinding::string("Id", id)),
            )
    }

    fn xml_of(data: &mut ResponseData) -> String {
        let mut out = String::new();
        data.encode_xml_response(&mut out).unwrap();
        out
    }

    #[test]
    fn test_every_encoding_emits_the_same_xml() {
        let mut classic = ResponseData::new(ContentKind::Instances);
        classic.set_instances(vec![instance("a"), instance("b")]);
        let expected = xml_of(&mut classic.clone());
        assert!(expected.starts_with("<VALUE.NAMEDINSTANCE><INSTANCENAME CLASSNAME=\"CIM_Thing\">"));

        for target in [Encoding::Xml, Encoding::Compact, Encoding::Binary] {
            let mut data = classic.clone();
            data.resolve_to(target).unwrap();
            assert_eq!(xml_of(&mut data), expected, "{:?}", target);
        }

        let mut compact = ResponseData::new(ContentKind::Instances);
        compact.set_compact(
            [instance("a"), instance("b")]
                .iter()
                .map(|i| convert::from_instance(i, "root/cimv2", None).unwrap())
                .collect(),
        );
        assert_eq!(xml_of(&mut compact), expected);
    }

    #[test]
    fn test_mirrored_pair_emitted_once() {
        let mut data = ResponseData::new(ContentKind::Instance);
        data.set_instance(instance("a"));
        data.resolve_to(Encoding::Compact).unwrap();
        let xml = xml_of(&mut data);
        assert_eq!(xml.matches("<INSTANCE ").count(), 1);
    }

    #[test]
    fn test_object_paths_respect_class_operation() {
        let options = RequestOptions {
            is_class_operation: true,
            ..RequestOptions::default()
        };
        let mut data = ResponseData::new(ContentKind::ObjectPaths).with_options(options);
        data.set_object_paths(vec![ObjectPath::new("CIM_Base").with_namespace("root")]);
        let direct = xml_of(&mut data.clone());
        assert_eq!(
            direct,
            "<OBJECTPATH><LOCALCLASSPATH><LOCALNAMESPACEPATH><NAMESPACE NAME=\"root\"/>\
             </LOCALNAMESPACEPATH><CLASSNAME NAME=\"CIM_Base\"/></LOCALCLASSPATH></OBJECTPATH>"
        );
        data.resolve_to(Encoding::Xml).unwrap();
        assert_eq!(xml_of(&mut data), direct);
    }

    #[test]
    fn test_objects_with_classes() {
        let mut class = CimClass::new("CIM_Base")
            .with_property(Property::new("Name", "x"))
            .unwrap();
        class.set_path(Some(
            ObjectPath::new("CIM_Base")
                .with_host("srv")
                .with_namespace("root/cimv2"),
        ));
        let mut data = ResponseData::new(ContentKind::Objects);
        data.set_objects(vec![CimObject::Class(class), CimObject::Instance(instance("a"))]);
        let direct = xml_of(&mut data.clone());
        assert!(direct.contains("<VALUE.OBJECTWITHPATH><CLASSPATH>"));
        assert!(direct.contains("<VALUE.OBJECTWITHPATH><INSTANCEPATH>"));

        let mut via_xml = data.clone();
        via_xml.resolve_to(Encoding::Xml).unwrap();
        assert_eq!(xml_of(&mut via_xml), direct);
    }

    #[test]
    fn test_binary_response_order() {
        let mut data = ResponseData::new(ContentKind::Instances);
        data.set_instances(vec![instance("a")]);
        let mut other = ResponseData::new(ContentKind::Instances);
        other.set_compact(vec![convert::from_instance(&instance("b"), "root/cimv2", None).unwrap()]);
        data.append_response_data(other);

        let mut out = BinaryCursor::new();
        data.encode_binary_response(&mut out).unwrap();
        let mut reader = BinaryCursor::from_bytes(out.release());
        assert_eq!(reader.get_u32().unwrap(), crate::config::BINARY_TYPE_CPPD);
        assert_eq!(reader.get_instances().unwrap().len(), 1);
        assert_eq!(reader.get_u32().unwrap(), crate::config::BINARY_TYPE_SCMO);
        assert_eq!(reader.get_compact_objects().unwrap().len(), 1);
        assert!(reader.is_exhausted());
    }
}
