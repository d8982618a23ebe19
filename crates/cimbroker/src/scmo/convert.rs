// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Conversions between classic objects and compact objects.
//!
//! Classic → compact resolves the class through an optional [`ClassCache`];
//! when no definition is available, or the instance carries properties the
//! class does not declare, a class is synthesized from the instance itself.
//! Compact → classic emits only assigned properties, in class order.

use super::{ClassCache, CompactClass, CompactObject, ScmoError};
use crate::cim::{CimClass, CimInstance, CimObject, ObjectPath};
use std::sync::Arc;

fn effective_namespace<'a>(path: Option<&'a ObjectPath>, namespace: &'a str) -> &'a str {
    path.and_then(ObjectPath::namespace)
        .map(|ns| ns.as_str())
        .unwrap_or(namespace)
}

fn cached_class(
    cache: Option<&ClassCache>,
    namespace: &str,
    class_name: &str,
) -> Option<Arc<CompactClass>> {
    cache.and_then(|c| c.get(namespace, class_name).ok())
}

fn stamp_addressing(object: &mut CompactObject, path: Option<&ObjectPath>, namespace: &str) {
    object.set_host(path.and_then(ObjectPath::host));
    object.set_namespace(Some(namespace));
}

/// Compact form of a classic instance.
///
/// Key bindings come from the instance path when it carries any, otherwise
/// they are derived from the key properties.
pub fn from_instance(
    instance: &CimInstance,
    namespace: &str,
    cache: Option<&ClassCache>,
) -> Result<CompactObject, ScmoError> {
    let namespace = effective_namespace(instance.path(), namespace);
    let class = cached_class(cache, namespace, instance.class_name().as_str())
        .filter(|class| {
            instance
                .properties()
                .iter()
                .all(|p| class.property_index(p.name().as_str()).is_some())
        })
        .unwrap_or_else(|| {
            log::debug!(
                "[scmo] synthesizing class {} from instance shape",
                instance.class_name()
            );
            Arc::new(CompactClass::synthesize_from_instance(instance, namespace))
        });

    let mut object = CompactObject::new(class);
    stamp_addressing(&mut object, instance.path(), namespace);
    for property in instance.properties() {
        object.set_property(property.name().as_str(), property.value())?;
    }
    match instance.path().filter(|p| !p.key_bindings().is_empty()) {
        Some(path) => {
            for binding in path.key_bindings() {
                object.set_key_binding_text(binding)?;
            }
        }
        None => object.build_key_bindings_from_properties()?,
    }
    Ok(object)
}

/// Compact form of an instance path (no property values).
pub fn from_path(
    path: &ObjectPath,
    namespace: &str,
    cache: Option<&ClassCache>,
) -> Result<CompactObject, ScmoError> {
    let namespace = effective_namespace(Some(path), namespace);
    let class = cached_class(cache, namespace, path.class_name().as_str())
        .unwrap_or_else(|| Arc::new(CompactClass::synthesize_from_path(path, namespace)));
    let mut object = CompactObject::new(class);
    stamp_addressing(&mut object, Some(path), namespace);
    for binding in path.key_bindings() {
        object.set_key_binding_text(binding)?;
    }
    Ok(object)
}

/// Class-only compact object for a class definition.
pub fn from_class(class: &CimClass, namespace: &str) -> CompactObject {
    let namespace = effective_namespace(class.path(), namespace);
    let mut object = CompactObject::new(Arc::new(CompactClass::from_class(class, namespace)));
    stamp_addressing(&mut object, class.path(), namespace);
    object.set_class_only(true);
    object
}

pub fn from_object(
    object: &CimObject,
    namespace: &str,
    cache: Option<&ClassCache>,
) -> Result<CompactObject, ScmoError> {
    match object {
        CimObject::Instance(instance) => from_instance(instance, namespace, cache),
        CimObject::Class(class) => Ok(from_class(class, namespace)),
    }
}

/// Classic instance holding the object's assigned properties.
///
/// The property filter applies; qualifiers and class origins are copied from
/// the class declaration when requested.
pub fn to_instance(
    object: &CompactObject,
    include_qualifiers: bool,
    include_class_origin: bool,
) -> CimInstance {
    let class = object.class();
    let mut instance = CimInstance::new(object.class_name());
    for idx in object.enumerated() {
        if !object.is_assigned(idx) {
            continue;
        }
        let (Some(declared), Some(value)) = (class.property(idx), object.raw_value(idx)) else {
            continue;
        };
        let mut property = declared.stripped(include_qualifiers, include_class_origin);
        if property.set_value(value).is_ok() {
            // names come from the class, unique by construction
            let _ = instance.add_property(property);
        }
    }
    instance.set_path(Some(object.to_path()));
    instance
}

pub fn to_path(object: &CompactObject) -> ObjectPath {
    object.to_path()
}

/// Classic class for a class-only object, carrying its addressing.
pub fn to_class(object: &CompactObject) -> CimClass {
    let mut class = object.class().to_class();
    if object.host().is_some() || object.namespace().is_some() {
        class.set_path(Some(object.to_path()));
    }
    class
}

pub fn to_object(object: &CompactObject) -> CimObject {
    if object.is_class_only() {
        CimObject::Class(to_class(object))
    } else {
        CimObject::Instance(to_instance(object, true, true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cim::{CimType, CimValue, KeyBinding, Property, Qualifier};

    fn mike() -> CimInstance {
        CimInstance::new("CIM_Person")
            .with_property(
                Property::new("Id", "Mike")
                    .with_qualifier(Qualifier::new("Key", true))
                    .unwrap(),
            )
            .unwrap()
            .with_property(Property::new("Count", 100u32))
            .unwrap()
            .with_property(Property::new("Flag", true))
            .unwrap()
    }

    fn person_class() -> CimClass {
        CimClass::new("CIM_Person")
            .with_property(
                Property::new("Id", CimValue::null(CimType::String, false))
                    .with_qualifier(Qualifier::new("Key", true))
                    .unwrap(),
            )
            .unwrap()
            .with_property(Property::new("Count", CimValue::null(CimType::Uint32, false)))
            .unwrap()
            .with_property(Property::new("Flag", false))
            .unwrap()
            .with_property(Property::new("Extra", CimValue::null(CimType::Uint8, false)))
            .unwrap()
    }

    #[test]
    fn test_synthesized_round_trip() {
        let original = mike().with_path(
            ObjectPath::new("CIM_Person")
                .with_namespace("root/cimv2")
                .with_key(KeyBinding::string("Id", "Mike")),
        );
        let compact = from_instance(&original, "root/other", None).unwrap();
        assert!(compact.class().is_synthesized());
        assert_eq!(compact.namespace(), Some("root/cimv2"));
        assert_eq!(compact.get_property("Count").unwrap(), CimValue::from(100u32));

        let back = to_instance(&compact, true, true);
        assert!(back.identical(&original), "{:?}", back);
    }

    #[test]
    fn test_cached_class_keys_from_properties() {
        let cache = ClassCache::new(|_: &str, name: &str| {
            (name == "CIM_Person").then(person_class)
        });
        let compact = from_instance(&mike(), "root/cimv2", Some(&cache)).unwrap();
        assert!(!compact.class().is_synthesized());
        assert_eq!(compact.get_key_binding("Id").unwrap(), CimValue::from("Mike"));
        assert_eq!(compact.get_property("Extra"), Err(ScmoError::NullValue));

        let back = to_instance(&compact, false, false);
        assert_eq!(back.property_count(), 3);
        let names: Vec<_> = back.properties().iter().map(|p| p.name().as_str()).collect();
        assert_eq!(names, ["Id", "Count", "Flag"]);
        assert!(back.properties()[0].qualifiers().is_empty());
        assert_eq!(
            back.path().unwrap().to_string(),
            "root/cimv2:CIM_Person.Id=\"Mike\""
        );
    }

    #[test]
    fn test_type_mismatch_is_reported() {
        let cache = ClassCache::new(|_: &str, _: &str| Some(person_class()));
        let bad = CimInstance::new("CIM_Person")
            .with_property(Property::new("Count", "many"))
            .unwrap();
        assert_eq!(
            from_instance(&bad, "root", Some(&cache)).unwrap_err(),
            ScmoError::WrongType
        );
    }

    #[test]
    fn test_path_and_class_conversions() {
        let path: ObjectPath = "//srv/root/cimv2:CIM_Disk.DeviceID=\"sda\",Index=2"
            .parse()
            .unwrap();
        let compact = from_path(&path, "root", None).unwrap();
        assert_eq!(compact.host(), Some("srv"));
        assert_eq!(to_path(&compact), path);

        let class = person_class();
        let compact = from_class(&class, "root/cimv2");
        assert!(compact.is_class_only());
        match to_object(&compact) {
            CimObject::Class(back) => {
                assert_eq!(back.properties(), class.properties());
                assert_eq!(back.path().unwrap().to_string(), "root/cimv2:CIM_Person");
            }
            other => panic!("expected class, got {:?}", other),
        }
    }
}
