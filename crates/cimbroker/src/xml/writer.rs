// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! CIM-XML writer for the classic object model.
//!
//! Element selection follows the stored type and arity:
//!
//! | Value | Property element | Value element |
//! |-------|------------------|---------------|
//! | scalar | `PROPERTY` | `VALUE` |
//! | array | `PROPERTY.ARRAY` | `VALUE.ARRAY` |
//! | reference | `PROPERTY.REFERENCE` | `VALUE.REFERENCE` |
//! | reference array | `PROPERTY.ARRAY` | `VALUE.REFARRAY` |
//!
//! Paths pick their element from the addressing they carry: host present
//! gives the full form (`INSTANCEPATH`/`CLASSPATH`), namespace only the
//! local form, neither the bare name. Class versus instance is an explicit
//! argument, never inferred from the key bindings.

use super::escape::append_escaped;
use crate::cim::{
    CimClass, CimInstance, CimObject, CimType, CimValue, KeyBinding, KeyKind, Method, ObjectPath,
    Parameter, Property, PropertyList, Qualifier, QualifierList, Scalar,
};

/// Request-driven emission options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlOptions {
    pub include_qualifiers: bool,
    pub include_class_origin: bool,
    pub property_list: PropertyList,
}

impl XmlOptions {
    /// Everything: qualifiers, class origins and all properties.
    pub fn full() -> Self {
        Self {
            include_qualifiers: true,
            include_class_origin: true,
            property_list: PropertyList::all(),
        }
    }
}

// ============================================================================
// Element helpers
// ============================================================================

fn open(out: &mut String, tag: &str) {
    out.push('<');
    out.push_str(tag);
}

fn attr(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    append_escaped(out, value);
    out.push('"');
}

fn close(out: &mut String, tag: &str) {
    out.push_str("</");
    out.push_str(tag);
    out.push('>');
}

fn text_element(out: &mut String, tag: &str, text: &str) {
    open(out, tag);
    out.push('>');
    append_escaped(out, text);
    close(out, tag);
}

// ============================================================================
// Values
// ============================================================================

fn scalar_text(scalar: &Scalar) -> String {
    match scalar {
        Scalar::Object(object) => {
            let mut nested = String::new();
            append_object(&mut nested, object, &XmlOptions::full());
            nested
        }
        Scalar::Instance(instance) => {
            let mut nested = String::new();
            append_instance(&mut nested, instance, &XmlOptions::full());
            nested
        }
        other => other.to_text().unwrap_or_default(),
    }
}

fn append_scalar(out: &mut String, scalar: &Scalar) {
    match scalar {
        Scalar::Reference(path) => append_value_reference(out, path),
        other => text_element(out, "VALUE", &scalar_text(other)),
    }
}

/// `VALUE`, `VALUE.ARRAY`, `VALUE.REFERENCE` or `VALUE.REFARRAY`; nothing
/// for null values.
pub fn append_value(out: &mut String, value: &CimValue) {
    if value.is_null() {
        return;
    }
    match value.as_array() {
        Some(items) => {
            let tag = if value.cim_type() == CimType::Reference {
                "VALUE.REFARRAY"
            } else {
                "VALUE.ARRAY"
            };
            open(out, tag);
            out.push('>');
            items.iter().for_each(|item| append_scalar(out, item));
            close(out, tag);
        }
        None => {
            if let Some(scalar) = value.as_scalar() {
                append_scalar(out, scalar);
            }
        }
    }
}

/// `TYPE` attribute value: embedded objects travel as strings.
fn type_name(ty: CimType) -> &'static str {
    if ty.is_embedded() {
        CimType::String.as_str()
    } else {
        ty.as_str()
    }
}

fn is_instance_payload(scalar: &Scalar) -> bool {
    match scalar {
        Scalar::Instance(_) => true,
        Scalar::Object(object) => matches!(**object, CimObject::Instance(_)),
        _ => false,
    }
}

/// `EmbeddedObject` attribute value, decided by the payload: present only
/// when the scalar, or at least one array element, is an instance. Null
/// and class-only payloads carry none.
fn embedded_attribute(ty: CimType, value: &CimValue) -> Option<&'static str> {
    if !ty.is_embedded() {
        return None;
    }
    let holds_instance = match value.as_array() {
        Some(items) => items.iter().any(is_instance_payload),
        None => value.as_scalar().is_some_and(is_instance_payload),
    };
    if !holds_instance {
        return None;
    }
    Some(if ty == CimType::Instance { "instance" } else { "object" })
}

// ============================================================================
// Qualifiers
// ============================================================================

pub fn append_qualifier(out: &mut String, qualifier: &Qualifier) {
    use crate::cim::Flavor;

    let flavor = qualifier.flavor();
    open(out, "QUALIFIER");
    attr(out, "NAME", qualifier.name().as_str());
    attr(out, "TYPE", type_name(qualifier.value().cim_type()));
    if qualifier.propagated() {
        attr(out, "PROPAGATED", "true");
    }
    if !flavor.contains(Flavor::OVERRIDABLE) {
        attr(out, "OVERRIDABLE", "false");
    }
    if !flavor.contains(Flavor::TOSUBCLASS) {
        attr(out, "TOSUBCLASS", "false");
    }
    if flavor.contains(Flavor::TOINSTANCE) {
        attr(out, "TOINSTANCE", "true");
    }
    if flavor.contains(Flavor::TRANSLATABLE) {
        attr(out, "TRANSLATABLE", "true");
    }
    out.push('>');
    append_value(out, qualifier.value());
    close(out, "QUALIFIER");
}

pub fn append_qualifiers(out: &mut String, qualifiers: &QualifierList) {
    qualifiers.iter().for_each(|q| append_qualifier(out, q));
}

// ============================================================================
// Properties
// ============================================================================

/// Borrowed view of one property, shared by the classic and compact writers.
pub(crate) struct PropertyParts<'a> {
    pub(crate) name: &'a str,
    pub(crate) ty: CimType,
    pub(crate) is_array: bool,
    pub(crate) array_size: u32,
    pub(crate) reference_class: Option<&'a str>,
    pub(crate) class_origin: Option<&'a str>,
    pub(crate) propagated: bool,
    pub(crate) qualifiers: &'a QualifierList,
    pub(crate) value: &'a CimValue,
}

pub(crate) fn append_property_parts(out: &mut String, parts: &PropertyParts<'_>, opts: &XmlOptions) {
    let tag = if parts.is_array {
        "PROPERTY.ARRAY"
    } else if parts.ty == CimType::Reference {
        "PROPERTY.REFERENCE"
    } else {
        "PROPERTY"
    };
    open(out, tag);
    attr(out, "NAME", parts.name);
    if tag == "PROPERTY.REFERENCE" {
        if let Some(rc) = parts.reference_class {
            attr(out, "REFERENCECLASS", rc);
        }
    } else {
        attr(out, "TYPE", type_name(parts.ty));
        if parts.is_array && parts.array_size > 0 {
            attr(out, "ARRAYSIZE", &parts.array_size.to_string());
        }
        if parts.ty == CimType::Reference {
            if let Some(rc) = parts.reference_class {
                attr(out, "REFERENCECLASS", rc);
            }
        }
    }
    if opts.include_class_origin {
        if let Some(origin) = parts.class_origin {
            attr(out, "CLASSORIGIN", origin);
        }
    }
    if parts.propagated {
        attr(out, "PROPAGATED", "true");
    }
    if let Some(kind) = embedded_attribute(parts.ty, parts.value) {
        attr(out, "EmbeddedObject", kind);
    }
    out.push('>');
    if opts.include_qualifiers {
        append_qualifiers(out, parts.qualifiers);
    }
    append_value(out, parts.value);
    close(out, tag);
}

pub fn append_property(out: &mut String, property: &Property, opts: &XmlOptions) {
    let parts = PropertyParts {
        name: property.name().as_str(),
        ty: property.cim_type(),
        is_array: property.is_array(),
        array_size: property.array_size(),
        reference_class: property.reference_class().map(|c| c.as_str()),
        class_origin: property.class_origin().map(|c| c.as_str()),
        propagated: property.propagated(),
        qualifiers: property.qualifiers(),
        value: property.value(),
    };
    append_property_parts(out, &parts, opts);
}

// ============================================================================
// Methods
// ============================================================================

pub fn append_parameter(out: &mut String, parameter: &Parameter, opts: &XmlOptions) {
    let is_ref = parameter.cim_type() == CimType::Reference;
    let tag = match (is_ref, parameter.is_array()) {
        (false, false) => "PARAMETER",
        (false, true) => "PARAMETER.ARRAY",
        (true, false) => "PARAMETER.REFERENCE",
        (true, true) => "PARAMETER.REFARRAY",
    };
    open(out, tag);
    attr(out, "NAME", parameter.name().as_str());
    if is_ref {
        if let Some(rc) = parameter.reference_class() {
            attr(out, "REFERENCECLASS", rc.as_str());
        }
    } else {
        attr(out, "TYPE", type_name(parameter.cim_type()));
    }
    if parameter.is_array() && parameter.array_size() > 0 {
        attr(out, "ARRAYSIZE", &parameter.array_size().to_string());
    }
    out.push('>');
    if opts.include_qualifiers {
        append_qualifiers(out, parameter.qualifiers());
    }
    close(out, tag);
}

pub fn append_method(out: &mut String, method: &Method, opts: &XmlOptions) {
    open(out, "METHOD");
    attr(out, "NAME", method.name().as_str());
    attr(out, "TYPE", type_name(method.return_type()));
    if opts.include_class_origin {
        if let Some(origin) = method.class_origin() {
            attr(out, "CLASSORIGIN", origin.as_str());
        }
    }
    if method.propagated() {
        attr(out, "PROPAGATED", "true");
    }
    out.push('>');
    if opts.include_qualifiers {
        append_qualifiers(out, method.qualifiers());
    }
    for parameter in method.parameters() {
        append_parameter(out, parameter, opts);
    }
    close(out, "METHOD");
}

// ============================================================================
// Instances and classes
// ============================================================================

pub fn append_instance(out: &mut String, instance: &CimInstance, opts: &XmlOptions) {
    open(out, "INSTANCE");
    attr(out, "CLASSNAME", instance.class_name().as_str());
    out.push('>');
    if opts.include_qualifiers {
        append_qualifiers(out, instance.qualifiers());
    }
    for property in instance.properties() {
        if opts.property_list.contains(property.name().as_str()) {
            append_property(out, property, opts);
        }
    }
    close(out, "INSTANCE");
}

pub fn append_class(out: &mut String, class: &CimClass, opts: &XmlOptions) {
    open(out, "CLASS");
    attr(out, "NAME", class.class_name().as_str());
    if let Some(super_class) = class.super_class() {
        attr(out, "SUPERCLASS", super_class.as_str());
    }
    out.push('>');
    if opts.include_qualifiers {
        append_qualifiers(out, class.qualifiers());
    }
    for property in class.properties() {
        if opts.property_list.contains(property.name().as_str()) {
            append_property(out, property, opts);
        }
    }
    for method in class.methods() {
        append_method(out, method, opts);
    }
    close(out, "CLASS");
}

pub fn append_object(out: &mut String, object: &CimObject, opts: &XmlOptions) {
    match object {
        CimObject::Instance(instance) => append_instance(out, instance, opts),
        CimObject::Class(class) => append_class(out, class, opts),
    }
}

// ============================================================================
// Paths
// ============================================================================

pub fn append_class_name(out: &mut String, class_name: &str) {
    open(out, "CLASSNAME");
    attr(out, "NAME", class_name);
    out.push_str("/>");
}

fn append_key_binding(out: &mut String, binding: &KeyBinding) {
    open(out, "KEYBINDING");
    attr(out, "NAME", binding.name().as_str());
    out.push('>');
    let reference = match binding.kind() {
        KeyKind::Reference => binding.value().parse::<ObjectPath>().ok(),
        _ => None,
    };
    match reference {
        Some(path) => append_value_reference(out, &path),
        None => {
            let value_type = match binding.kind() {
                KeyKind::Boolean => "boolean",
                KeyKind::Numeric => "numeric",
                KeyKind::String | KeyKind::Reference => "string",
            };
            open(out, "KEYVALUE");
            attr(out, "VALUETYPE", value_type);
            out.push('>');
            append_escaped(out, binding.value());
            close(out, "KEYVALUE");
        }
    }
    close(out, "KEYBINDING");
}

pub(crate) fn append_instance_name_parts(out: &mut String, class_name: &str, keys: &[KeyBinding]) {
    open(out, "INSTANCENAME");
    attr(out, "CLASSNAME", class_name);
    out.push('>');
    keys.iter().for_each(|kb| append_key_binding(out, kb));
    close(out, "INSTANCENAME");
}

pub fn append_instance_name(out: &mut String, path: &ObjectPath) {
    append_instance_name_parts(out, path.class_name().as_str(), path.key_bindings());
}

pub fn append_local_namespace_path(out: &mut String, namespace: &str) {
    out.push_str("<LOCALNAMESPACEPATH>");
    for segment in namespace.split('/').filter(|s| !s.is_empty()) {
        open(out, "NAMESPACE");
        attr(out, "NAME", segment);
        out.push_str("/>");
    }
    out.push_str("</LOCALNAMESPACEPATH>");
}

pub fn append_namespace_path(out: &mut String, host: &str, namespace: &str) {
    out.push_str("<NAMESPACEPATH>");
    text_element(out, "HOST", host);
    append_local_namespace_path(out, namespace);
    out.push_str("</NAMESPACEPATH>");
}

/// Wrap the name element written by `name` in the path form selected by
/// `host` and `namespace`.
pub(crate) fn append_path_with(
    out: &mut String,
    host: Option<&str>,
    namespace: Option<&str>,
    class_only: bool,
    name: impl FnOnce(&mut String),
) {
    let (full, local) = if class_only {
        ("CLASSPATH", "LOCALCLASSPATH")
    } else {
        ("INSTANCEPATH", "LOCALINSTANCEPATH")
    };
    match (host, namespace) {
        (Some(host), namespace) => {
            open(out, full);
            out.push('>');
            append_namespace_path(out, host, namespace.unwrap_or_default());
            name(out);
            close(out, full);
        }
        (None, Some(namespace)) => {
            open(out, local);
            out.push('>');
            append_local_namespace_path(out, namespace);
            name(out);
            close(out, local);
        }
        (None, None) => name(out),
    }
}

pub(crate) fn append_path_parts(
    out: &mut String,
    host: Option<&str>,
    namespace: Option<&str>,
    class_name: &str,
    keys: &[KeyBinding],
    class_only: bool,
) {
    append_path_with(out, host, namespace, class_only, |out| {
        if class_only {
            append_class_name(out, class_name);
        } else {
            append_instance_name_parts(out, class_name, keys);
        }
    });
}

/// Path element chosen from the addressing present on `path`.
pub fn append_path(out: &mut String, path: &ObjectPath, class_only: bool) {
    append_path_parts(
        out,
        path.host(),
        path.namespace().map(|ns| ns.as_str()),
        path.class_name().as_str(),
        path.key_bindings(),
        class_only,
    );
}

pub fn append_value_reference(out: &mut String, path: &ObjectPath) {
    out.push_str("<VALUE.REFERENCE>");
    append_path(out, path, false);
    out.push_str("</VALUE.REFERENCE>");
}

pub fn append_object_path(out: &mut String, path: &ObjectPath, class_only: bool) {
    out.push_str("<OBJECTPATH>");
    append_path(out, path, class_only);
    out.push_str("</OBJECTPATH>");
}

// ============================================================================
// Response elements
// ============================================================================

/// `VALUE.NAMEDINSTANCE`: instance name (from the instance path, or the
/// bare class name) followed by the instance.
pub fn append_named_instance(out: &mut String, instance: &CimInstance, opts: &XmlOptions) {
    out.push_str("<VALUE.NAMEDINSTANCE>");
    let keys = instance.path().map(ObjectPath::key_bindings).unwrap_or(&[]);
    append_instance_name_parts(out, instance.class_name().as_str(), keys);
    append_instance(out, instance, opts);
    out.push_str("</VALUE.NAMEDINSTANCE>");
}

/// `VALUE.OBJECTWITHPATH`: path followed by the class or instance.
pub fn append_object_with_path(out: &mut String, object: &CimObject, opts: &XmlOptions) {
    out.push_str("<VALUE.OBJECTWITHPATH>");
    let class_only = object.is_class();
    match object.path() {
        Some(path) => append_path(out, path, class_only),
        None => append_path_parts(out, None, None, object.class_name().as_str(), &[], class_only),
    }
    append_object(out, object, opts);
    out.push_str("</VALUE.OBJECTWITHPATH>");
}
