// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! CIM-XML writer for compact objects.
//!
//! Reads declarations from the shared class and values from the object
//! slots, without building a classic tree. Instances emit their assigned
//! properties in class order, restricted by the object's property filter
//! and the request property list.

use super::writer::{
    append_method, append_property_parts, append_qualifiers, PropertyParts, XmlOptions,
};
use crate::cim::CimValue;
use crate::scmo::{CompactClass, CompactObject};

fn append_declared(
    out: &mut String,
    class: &CompactClass,
    idx: usize,
    value: &CimValue,
    opts: &XmlOptions,
) {
    let Some(def) = class.def(idx) else {
        return;
    };
    let parts = PropertyParts {
        name: class.name_of(def.name),
        ty: def.ty,
        is_array: def.is_array,
        array_size: def.array_size,
        reference_class: def.reference_class.map(|r| class.name_of(r)),
        class_origin: def.class_origin.map(|r| class.name_of(r)),
        propagated: def.propagated,
        qualifiers: &def.qualifiers,
        value,
    };
    append_property_parts(out, &parts, opts);
}

pub fn append_instance(out: &mut String, object: &CompactObject, opts: &XmlOptions) {
    let class = object.class();
    out.push_str("<INSTANCE CLASSNAME=\"");
    super::append_escaped(out, object.class_name());
    out.push_str("\">");
    for idx in object.enumerated() {
        if !object.is_assigned(idx) {
            continue;
        }
        let wanted = class
            .property_name(idx)
            .is_some_and(|name| opts.property_list.contains(name));
        if !wanted {
            continue;
        }
        if let Some(value) = object.raw_value(idx) {
            append_declared(out, class, idx, &value, opts);
        }
    }
    out.push_str("</INSTANCE>");
}

/// Class definition of a class-only object, with class defaults as values.
pub fn append_class(out: &mut String, object: &CompactObject, opts: &XmlOptions) {
    let class = object.class();
    out.push_str("<CLASS NAME=\"");
    super::append_escaped(out, class.class_name());
    out.push('"');
    if let Some(super_class) = class.super_class() {
        out.push_str(" SUPERCLASS=\"");
        super::append_escaped(out, super_class);
        out.push('"');
    }
    out.push('>');
    if opts.include_qualifiers {
        append_qualifiers(out, class.qualifiers());
    }
    for idx in object.enumerated() {
        let Some((ty, is_array)) = class.property_type(idx) else {
            continue;
        };
        let wanted = class
            .property_name(idx)
            .is_some_and(|name| opts.property_list.contains(name));
        if wanted {
            let value = class
                .default_value(idx)
                .unwrap_or_else(|| CimValue::null(ty, is_array));
            append_declared(out, class, idx, &value, opts);
        }
    }
    for method in class.methods() {
        append_method(out, method, opts);
    }
    out.push_str("</CLASS>");
}

pub fn append_object(out: &mut String, object: &CompactObject, opts: &XmlOptions) {
    if object.is_class_only() {
        append_class(out, object, opts);
    } else {
        append_instance(out, object, opts);
    }
}

pub fn append_instance_name(out: &mut String, object: &CompactObject) {
    super::writer::append_instance_name_parts(out, object.class_name(), &object.key_bindings());
}

/// Path element chosen from the object's host, namespace and class-only
/// flag.
pub fn append_path(out: &mut String, object: &CompactObject) {
    let keys = if object.is_class_only() {
        Vec::new()
    } else {
        object.key_bindings()
    };
    super::writer::append_path_parts(
        out,
        object.host(),
        object.namespace(),
        object.class_name(),
        &keys,
        object.is_class_only(),
    );
}

pub fn append_object_path(out: &mut String, object: &CompactObject) {
    out.push_str("<OBJECTPATH>");
    append_path(out, object);
    out.push_str("</OBJECTPATH>");
}

pub fn append_named_instance(out: &mut String, object: &CompactObject, opts: &XmlOptions) {
    out.push_str("<VALUE.NAMEDINSTANCE>");
    append_instance_name(out, object);
    append_instance(out, object, opts);
    out.push_str("</VALUE.NAMEDINSTANCE>");
}

pub fn append_object_with_path(out: &mut String, object: &CompactObject, opts: &XmlOptions) {
    out.push_str("<VALUE.OBJECTWITHPATH>");
    append_path(out, object);
    append_object(out, object, opts);
    out.push_str("</VALUE.OBJECTWITHPATH>");
}
