// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! CIM-XML fragment reader.
//!
//! Parses single-element fragments (as produced by the writers or carried
//! verbatim in response containers) into classic objects. String values
//! flagged with `EmbeddedObject` are parsed again as nested fragments, up to
//! [`MAX_NESTING_DEPTH`](crate::config::MAX_NESTING_DEPTH) levels. Writers
//! flag only payloads holding an instance, so an embedded class travels as
//! a plain string and is read back as one.

use super::XmlError;
use crate::cim::{
    CimClass, CimInstance, CimName, CimObject, CimType, CimValue, Flavor, KeyBinding, KeyKind,
    Method, ObjectPath, Parameter, Property, Qualifier, QualifierList, Scalar,
};
use crate::config::MAX_NESTING_DEPTH;
use roxmltree::{Document, Node};

type XmlResult<T> = Result<T, XmlError>;

fn elements<'a, 'input>(node: Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(Node::is_element)
}

fn name_of<'a>(node: &Node<'a, '_>) -> &'a str {
    node.tag_name().name()
}

fn expect(node: &Node<'_, '_>, expected: &str) -> XmlResult<()> {
    if name_of(node) != expected {
        return Err(XmlError::UnexpectedElement {
            expected: expected.to_string(),
            found: name_of(node).to_string(),
        });
    }
    Ok(())
}

fn required<'a>(node: &Node<'a, '_>, attribute: &str) -> XmlResult<&'a str> {
    node.attribute(attribute)
        .ok_or_else(|| XmlError::MissingAttribute {
            element: name_of(node).to_string(),
            attribute: attribute.to_string(),
        })
}

fn flag(node: &Node<'_, '_>, attribute: &str) -> Option<bool> {
    node.attribute(attribute)
        .map(|v| v.trim().eq_ignore_ascii_case("true"))
}

fn child<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    elements(node).find(|n| name_of(n) == tag)
}

fn cim_type(node: &Node<'_, '_>, attribute: &str) -> XmlResult<CimType> {
    let name = required(node, attribute)?;
    CimType::from_name(name).ok_or_else(|| XmlError::InvalidValue(format!("unknown type {}", name)))
}

/// Declared type, promoted to an embedded type by `EmbeddedObject`.
fn declared_type(node: &Node<'_, '_>) -> XmlResult<CimType> {
    let ty = cim_type(node, "TYPE")?;
    let embedded = node
        .attribute("EmbeddedObject")
        .or_else(|| node.attribute("EMBEDDEDOBJECT"));
    Ok(match (ty, embedded) {
        (CimType::String, Some(kind)) if kind.eq_ignore_ascii_case("instance") => CimType::Instance,
        (CimType::String, Some(_)) => CimType::Object,
        (ty, _) => ty,
    })
}

// ============================================================================
// Entry points
// ============================================================================

fn parse_root<T>(xml: &str, f: impl FnOnce(Node<'_, '_>) -> XmlResult<T>) -> XmlResult<T> {
    let doc = Document::parse(xml)?;
    f(doc.root_element())
}

/// Parse an `INSTANCE` fragment.
pub fn parse_instance(xml: &str) -> XmlResult<CimInstance> {
    parse_root(xml, |node| Reader { depth: 0 }.instance(node))
}

/// Parse a `CLASS` fragment.
pub fn parse_class(xml: &str) -> XmlResult<CimClass> {
    parse_root(xml, |node| Reader { depth: 0 }.class(node))
}

/// Parse an `INSTANCE` or `CLASS` fragment.
pub fn parse_object(xml: &str) -> XmlResult<CimObject> {
    parse_root(xml, |node| Reader { depth: 0 }.object(node))
}

/// Parse any path element: `INSTANCENAME`, `CLASSNAME`, the local and full
/// instance/class paths, `OBJECTPATH` or `VALUE.REFERENCE`.
pub fn parse_path(xml: &str) -> XmlResult<ObjectPath> {
    parse_root(xml, path)
}

// ============================================================================
// Paths
// ============================================================================

fn local_namespace(node: Node<'_, '_>) -> XmlResult<String> {
    expect(&node, "LOCALNAMESPACEPATH")?;
    let segments = elements(node)
        .map(|n| {
            expect(&n, "NAMESPACE")?;
            required(&n, "NAME")
        })
        .collect::<XmlResult<Vec<_>>>()?;
    Ok(segments.join("/"))
}

fn namespace_path(node: Node<'_, '_>) -> XmlResult<(String, String)> {
    expect(&node, "NAMESPACEPATH")?;
    let host = child(node, "HOST")
        .and_then(|h| h.text())
        .unwrap_or_default()
        .trim()
        .to_string();
    let local = child(node, "LOCALNAMESPACEPATH").ok_or_else(|| XmlError::UnexpectedElement {
        expected: "LOCALNAMESPACEPATH".into(),
        found: "nothing".into(),
    })?;
    Ok((host, local_namespace(local)?))
}

fn key_binding(node: Node<'_, '_>) -> XmlResult<KeyBinding> {
    expect(&node, "KEYBINDING")?;
    let name = required(&node, "NAME")?;
    let value = elements(node).next().ok_or_else(|| XmlError::UnexpectedElement {
        expected: "KEYVALUE".into(),
        found: "nothing".into(),
    })?;
    match name_of(&value) {
        "KEYVALUE" => {
            let kind = match value.attribute("VALUETYPE").unwrap_or("string") {
                "boolean" => KeyKind::Boolean,
                "numeric" => KeyKind::Numeric,
                _ => KeyKind::String,
            };
            Ok(KeyBinding::new(name, value.text().unwrap_or_default(), kind))
        }
        "VALUE.REFERENCE" => Ok(KeyBinding::reference(name, &path(value)?)),
        other => Err(XmlError::UnexpectedElement {
            expected: "KEYVALUE".into(),
            found: other.to_string(),
        }),
    }
}

fn instance_name(node: Node<'_, '_>) -> XmlResult<ObjectPath> {
    expect(&node, "INSTANCENAME")?;
    let mut path = ObjectPath::new(required(&node, "CLASSNAME")?);
    let mut keys = Vec::new();
    for n in elements(node) {
        match name_of(&n) {
            "KEYBINDING" => keys.push(key_binding(n)?),
            // single unnamed key
            "KEYVALUE" | "VALUE.REFERENCE" => {
                return Err(XmlError::InvalidValue("unnamed key binding".into()))
            }
            other => {
                return Err(XmlError::UnexpectedElement {
                    expected: "KEYBINDING".into(),
                    found: other.to_string(),
                })
            }
        }
    }
    path.set_key_bindings(keys);
    Ok(path)
}

fn class_name(node: Node<'_, '_>) -> XmlResult<ObjectPath> {
    expect(&node, "CLASSNAME")?;
    Ok(ObjectPath::new(required(&node, "NAME")?))
}

fn path(node: Node<'_, '_>) -> XmlResult<ObjectPath> {
    let mut parts = elements(node);
    match name_of(&node) {
        "INSTANCENAME" => instance_name(node),
        "CLASSNAME" => class_name(node),
        "VALUE.REFERENCE" | "OBJECTPATH" => {
            let inner = parts.next().ok_or_else(|| XmlError::UnexpectedElement {
                expected: "INSTANCEPATH".into(),
                found: "nothing".into(),
            })?;
            path(inner)
        }
        "INSTANCEPATH" | "CLASSPATH" => {
            let (ns_node, name_node) = (parts.next(), parts.next());
            let (Some(ns_node), Some(name_node)) = (ns_node, name_node) else {
                return Err(XmlError::InvalidValue(format!("incomplete <{}>", name_of(&node))));
            };
            let (host, namespace) = namespace_path(ns_node)?;
            let mut path = path(name_node)?;
            path.set_host(Some(host));
            path.set_namespace(Some(CimName::new(namespace)));
            Ok(path)
        }
        "LOCALINSTANCEPATH" | "LOCALCLASSPATH" => {
            let (ns_node, name_node) = (parts.next(), parts.next());
            let (Some(ns_node), Some(name_node)) = (ns_node, name_node) else {
                return Err(XmlError::InvalidValue(format!("incomplete <{}>", name_of(&node))));
            };
            let namespace = local_namespace(ns_node)?;
            let mut path = path(name_node)?;
            path.set_namespace(Some(CimName::new(namespace)));
            Ok(path)
        }
        other => Err(XmlError::UnexpectedElement {
            expected: "INSTANCENAME".into(),
            found: other.to_string(),
        }),
    }
}

// ============================================================================
// Objects
// ============================================================================

struct Reader {
    depth: u16,
}

impl Reader {
    fn embedded(&self, ty: CimType, text: &str) -> XmlResult<Scalar> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(XmlError::InvalidValue("embedded objects nested too deeply".into()));
        }
        let doc = Document::parse(text)?;
        let nested = Reader {
            depth: self.depth + 1,
        };
        let object = nested.object(doc.root_element())?;
        match (ty, object) {
            (CimType::Instance, CimObject::Instance(instance)) => Ok(Scalar::Instance(Box::new(instance))),
            (CimType::Instance, CimObject::Class(_)) => {
                Err(XmlError::InvalidValue("embedded instance holds a class".into()))
            }
            (_, object) => Ok(Scalar::Object(Box::new(object))),
        }
    }

    fn scalar(&self, ty: CimType, node: Node<'_, '_>) -> XmlResult<Scalar> {
        match name_of(&node) {
            "VALUE.REFERENCE" => Ok(Scalar::Reference(path(node)?)),
            "VALUE" => {
                let text = node.text().unwrap_or_default();
                if ty.is_embedded() {
                    self.embedded(ty, text)
                } else {
                    Ok(Scalar::parse(ty, text)?)
                }
            }
            other => Err(XmlError::UnexpectedElement {
                expected: "VALUE".into(),
                found: other.to_string(),
            }),
        }
    }

    /// Value of a property or qualifier element; null when no value child.
    fn value(&self, ty: CimType, is_array: bool, node: Node<'_, '_>) -> XmlResult<CimValue> {
        let holder = elements(node).find(|n| name_of(n).starts_with("VALUE"));
        let Some(holder) = holder else {
            return Ok(CimValue::null(ty, is_array));
        };
        match name_of(&holder) {
            "VALUE.ARRAY" | "VALUE.REFARRAY" => {
                let items = elements(holder)
                    .map(|n| {
                        if name_of(&n) == "VALUE.NULL" {
                            return Err(XmlError::InvalidValue("null array element".into()));
                        }
                        self.scalar(ty, n)
                    })
                    .collect::<XmlResult<Vec<_>>>()?;
                Ok(CimValue::array(ty, items)?)
            }
            _ if is_array => Err(XmlError::InvalidValue(format!(
                "scalar value for array <{}>",
                name_of(&node)
            ))),
            _ => Ok(CimValue::scalar(self.scalar(ty, holder)?)),
        }
    }

    fn qualifier(&self, node: Node<'_, '_>) -> XmlResult<Qualifier> {
        expect(&node, "QUALIFIER")?;
        let ty = cim_type(&node, "TYPE")?;
        let is_array = child(node, "VALUE.ARRAY").is_some();
        let value = self.value(ty, is_array, node)?;
        let mut flavor = Flavor::NONE;
        flavor.set(Flavor::OVERRIDABLE, flag(&node, "OVERRIDABLE").unwrap_or(true));
        flavor.set(Flavor::TOSUBCLASS, flag(&node, "TOSUBCLASS").unwrap_or(true));
        flavor.set(Flavor::TOINSTANCE, flag(&node, "TOINSTANCE").unwrap_or(false));
        flavor.set(Flavor::TRANSLATABLE, flag(&node, "TRANSLATABLE").unwrap_or(false));
        Ok(Qualifier::new(required(&node, "NAME")?, value)
            .with_flavor(flavor)
            .with_propagated(flag(&node, "PROPAGATED").unwrap_or(false)))
    }

    fn qualifiers(&self, node: Node<'_, '_>) -> XmlResult<QualifierList> {
        let mut list = QualifierList::new();
        for n in elements(node).filter(|n| name_of(n) == "QUALIFIER") {
            list.add(self.qualifier(n)?)?;
        }
        Ok(list)
    }

    fn property(&self, node: Node<'_, '_>) -> XmlResult<Property> {
        let (ty, is_array) = match name_of(&node) {
            "PROPERTY" => (declared_type(&node)?, false),
            "PROPERTY.ARRAY" => (declared_type(&node)?, true),
            "PROPERTY.REFERENCE" => (CimType::Reference, false),
            other => {
                return Err(XmlError::UnexpectedElement {
                    expected: "PROPERTY".into(),
                    found: other.to_string(),
                })
            }
        };
        let value = self.value(ty, is_array, node)?;
        let mut property = Property::new(required(&node, "NAME")?, value)
            .with_propagated(flag(&node, "PROPAGATED").unwrap_or(false))
            .with_qualifiers(self.qualifiers(node)?);
        if let Some(size) = node.attribute("ARRAYSIZE") {
            let size = size
                .trim()
                .parse()
                .map_err(|_| XmlError::InvalidValue(format!("ARRAYSIZE {}", size)))?;
            property = property.with_array_size(size);
        }
        if let Some(rc) = node.attribute("REFERENCECLASS") {
            property = property.with_reference_class(rc);
        }
        if let Some(origin) = node.attribute("CLASSORIGIN") {
            property = property.with_class_origin(origin);
        }
        Ok(property)
    }

    fn parameter(&self, node: Node<'_, '_>) -> XmlResult<Parameter> {
        let (ty, is_array) = match name_of(&node) {
            "PARAMETER" => (cim_type(&node, "TYPE")?, false),
            "PARAMETER.ARRAY" => (cim_type(&node, "TYPE")?, true),
            "PARAMETER.REFERENCE" => (CimType::Reference, false),
            "PARAMETER.REFARRAY" => (CimType::Reference, true),
            other => {
                return Err(XmlError::UnexpectedElement {
                    expected: "PARAMETER".into(),
                    found: other.to_string(),
                })
            }
        };
        let mut parameter = Parameter::new(required(&node, "NAME")?, ty);
        if is_array {
            let size = match node.attribute("ARRAYSIZE") {
                Some(s) => s
                    .trim()
                    .parse()
                    .map_err(|_| XmlError::InvalidValue(format!("ARRAYSIZE {}", s)))?,
                None => 0,
            };
            parameter = parameter.array(size);
        }
        if let Some(rc) = node.attribute("REFERENCECLASS") {
            parameter = parameter.with_reference_class(rc);
        }
        Ok(parameter.with_qualifiers(self.qualifiers(node)?))
    }

    fn method(&self, node: Node<'_, '_>) -> XmlResult<Method> {
        let mut method = Method::new(required(&node, "NAME")?, cim_type(&node, "TYPE")?)
            .with_propagated(flag(&node, "PROPAGATED").unwrap_or(false))
            .with_qualifiers(self.qualifiers(node)?);
        if let Some(origin) = node.attribute("CLASSORIGIN") {
            method = method.with_class_origin(origin);
        }
        for n in elements(node).filter(|n| name_of(n).starts_with("PARAMETER")) {
            method.add_parameter(self.parameter(n)?)?;
        }
        Ok(method)
    }

    fn instance(&self, node: Node<'_, '_>) -> XmlResult<CimInstance> {
        expect(&node, "INSTANCE")?;
        let mut instance = CimInstance::new(required(&node, "CLASSNAME")?);
        instance.set_qualifiers(self.qualifiers(node)?);
        for n in elements(node).filter(|n| name_of(n).starts_with("PROPERTY")) {
            instance.add_property(self.property(n)?)?;
        }
        Ok(instance)
    }

    fn class(&self, node: Node<'_, '_>) -> XmlResult<CimClass> {
        expect(&node, "CLASS")?;
        let mut class = CimClass::new(required(&node, "NAME")?);
        class.set_super_class(node.attribute("SUPERCLASS").map(CimName::new));
        class.set_qualifiers(self.qualifiers(node)?);
        for n in elements(node) {
            match name_of(&n) {
                "QUALIFIER" => {}
                "METHOD" => class.add_method(self.method(n)?)?,
                _ => class.add_property(self.property(n)?)?,
            }
        }
        Ok(class)
    }

    fn object(&self, node: Node<'_, '_>) -> XmlResult<CimObject> {
        match name_of(&node) {
            "CLASS" => self.class(node).map(CimObject::Class),
            _ => self.instance(node).map(CimObject::Instance),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cim::CimDateTime;
    use crate::xml::writer::{self, XmlOptions};

    fn sample_instance() -> CimInstance {
        let inner = CimInstance::new("CIM_Inner")
            .with_property(Property::new("Note", "a & b"))
            .unwrap();
        CimInstance::new("CIM_Sample")
            .with_property(
                Property::new("Id", "Mike")
                    .with_qualifier(Qualifier::new("Key", true))
                    .unwrap(),
            )
            .unwrap()
            .with_property(Property::new("Count", 100u32))
            .unwrap()
            .with_property(Property::new("Ratio", -0.25f64))
            .unwrap()
            .with_property(Property::new(
                "When",
                "20240101000000.000000+000".parse::<CimDateTime>().unwrap(),
            ))
            .unwrap()
            .with_property(Property::new("Tags", CimValue::string_array(["x", "<y>"])))
            .unwrap()
            .with_property(
                Property::new(
                    "Owner",
                    ObjectPath::new("CIM_User")
                        .with_namespace("root/cimv2")
                        .with_key(KeyBinding::new("Uid", "42", KeyKind::Numeric)),
                )
                .with_reference_class("CIM_User"),
            )
            .unwrap()
            .with_property(Property::new("Nested", inner))
            .unwrap()
            .with_property(Property::new("Empty", CimValue::null(CimType::Sint8, true)))
            .unwrap()
    }

    #[test]
    fn test_instance_round_trip() {
        let original = sample_instance();
        let mut xml = String::new();
        writer::append_instance(&mut xml, &original, &XmlOptions::full());
        let parsed = parse_instance(&xml).unwrap();
        assert!(parsed.identical(&original), "{:?}\n{}", parsed, xml);
    }

    #[test]
    fn test_class_round_trip() {
        let mut method = Method::new("Reset", CimType::Uint32)
            .with_qualifier(Qualifier::new("Description", "reset it"))
            .unwrap();
        method.add_parameter(Parameter::new("Force", CimType::Boolean)).unwrap();
        method
            .add_parameter(Parameter::new("Target", CimType::Reference).with_reference_class("CIM_X"))
            .unwrap();
        method.add_parameter(Parameter::new("Codes", CimType::Uint8).array(4)).unwrap();
        let mut class = CimClass::new("CIM_Sample")
            .with_super_class("CIM_Base")
            .with_qualifier(Qualifier::new("Abstract", true).with_flavor(Flavor::TOSUBCLASS))
            .unwrap()
            .with_property(Property::new("Size", 512u64).with_class_origin("CIM_Base").with_propagated(true))
            .unwrap();
        class.add_method(method).unwrap();

        let mut xml = String::new();
        writer::append_class(&mut xml, &class, &XmlOptions::full());
        assert_eq!(parse_class(&xml).unwrap(), class);
    }

    #[test]
    fn test_paths() {
        let full: ObjectPath = "//srv/root/cimv2:CIM_Disk.DeviceID=\"sda\",Index=2,Ready=TRUE"
            .parse()
            .unwrap();
        for class_only in [false, true] {
            let mut xml = String::new();
            writer::append_object_path(&mut xml, &full, class_only);
            let parsed = parse_path(&xml).unwrap();
            assert_eq!(parsed.host(), Some("srv"));
            assert_eq!(parsed.namespace().unwrap().as_str(), "root/cimv2");
            if class_only {
                assert!(parsed.key_bindings().is_empty());
            } else {
                assert!(parsed.identical(&full));
            }
        }
    }

    #[test]
    fn test_reference_key_binding() {
        let target = ObjectPath::new("CIM_Disk")
            .with_namespace("root")
            .with_key(KeyBinding::string("Id", "d1"));
        let path = ObjectPath::new("CIM_Assoc").with_key(KeyBinding::reference("Part", &target));
        let mut xml = String::new();
        writer::append_instance_name(&mut xml, &path);
        assert!(xml.contains("<KEYBINDING NAME=\"Part\"><VALUE.REFERENCE><LOCALINSTANCEPATH>"));
        assert_eq!(parse_path(&xml).unwrap(), path);
    }

    #[test]
    fn test_malformed_input() {
        assert!(matches!(parse_instance("<INSTANCE"), Err(XmlError::Parse(_))));
        assert!(matches!(
            parse_instance("<CLASS NAME=\"X\"/>"),
            Err(XmlError::UnexpectedElement { .. })
        ));
        assert!(matches!(
            parse_instance("<INSTANCE/>"),
            Err(XmlError::MissingAttribute { .. })
        ));
        assert!(matches!(
            parse_instance(
                "<INSTANCE CLASSNAME=\"X\"><PROPERTY NAME=\"A\" TYPE=\"uint8\">\
                 <VALUE>300</VALUE></PROPERTY></INSTANCE>"
            ),
            Err(XmlError::InvalidValue(_))
        ));
        assert!(parse_path("<INSTANCEPATH/>").is_err());
    }

    #[test]
    fn test_mixed_embedded_array_round_trip() {
        let objects = CimValue::array(
            CimType::Object,
            vec![
                Scalar::Object(Box::new(CimObject::Class(CimClass::new("CIM_EmbClass")))),
                Scalar::Object(Box::new(CimObject::Instance(
                    CimInstance::new("CIM_EmbInst")
                        .with_property(Property::new("V", 3u16))
                        .unwrap(),
                ))),
            ],
        )
        .unwrap();
        let original = CimInstance::new("CIM_Holder")
            .with_property(Property::new("Objs", objects))
            .unwrap();
        let mut xml = String::new();
        writer::append_instance(&mut xml, &original, &XmlOptions::default());

        let parsed = parse_instance(&xml).unwrap();
        let items = parsed.value("Objs").and_then(CimValue::as_array).unwrap();
        assert!(matches!(&items[0], Scalar::Object(o) if matches!(**o, CimObject::Class(_))));
        assert!(matches!(&items[1], Scalar::Object(o) if matches!(**o, CimObject::Instance(_))));
        assert!(parsed.identical(&original));
    }

    #[test]
    fn test_class_payload_reads_as_string() {
        let original = CimInstance::new("CIM_Holder")
            .with_property(Property::new(
                "Obj",
                Scalar::Object(Box::new(CimObject::Class(CimClass::new("CIM_Emb")))),
            ))
            .unwrap();
        let mut xml = String::new();
        writer::append_instance(&mut xml, &original, &XmlOptions::default());

        let parsed = parse_instance(&xml).unwrap();
        let text = parsed.value("Obj").and_then(CimValue::as_str).unwrap();
        assert!(text.starts_with("<CLASS NAME=\"CIM_Emb\""));

        let mut again = String::new();
        writer::append_instance(&mut again, &parsed, &XmlOptions::default());
        assert_eq!(again, xml);
    }

    #[test]
    fn test_deep_embedding_rejected() {
        let mut instance = CimInstance::new("CIM_Leaf");
        for _ in 0..(MAX_NESTING_DEPTH + 2) {
            instance = CimInstance::new("CIM_Wrap")
                .with_property(Property::new("Inner", instance))
                .unwrap();
        }
        let mut xml = String::new();
        writer::append_instance(&mut xml, &instance, &XmlOptions::default());
        assert!(parse_instance(&xml).is_err());
    }
}
