// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Binary streaming of compact objects.
//!
//! A batch is written as a de-duplicated class table followed by the
//! objects, each referencing its class by table index, so a reader rebuilds
//! shared class definitions without consulting a class cache.
//!
//! ```text
//! class count
//!   [magic] namespace, synthesized, key count, key index*, class
//! object count
//!   [magic] class index, host?, namespace?, class-only,
//!   filtered, filter names*,
//!   value count, (assigned, value?)*,
//!   key count, (is-null, value?)*,
//!   user key count, (name, value, kind)*
//! ```

use super::{CompactClass, CompactObject};
use crate::core::ser::{BinaryCursor, SerError, SerResult};
use crate::config::{MAGIC_COMPACT_CLASS, MAGIC_COMPACT_OBJECT, SLOT_SIZE};
use std::sync::Arc;

fn invalid(reason: impl Into<String>) -> SerError {
    SerError::InvalidData {
        reason: reason.into(),
    }
}

impl BinaryCursor {
    pub fn put_compact_objects(&mut self, objects: &[CompactObject]) -> SerResult<()> {
        let mut classes: Vec<&Arc<CompactClass>> = Vec::new();
        let mut class_of = Vec::with_capacity(objects.len());
        for object in objects {
            let idx = match classes.iter().position(|c| Arc::ptr_eq(c, object.class())) {
                Some(idx) => idx,
                None => {
                    classes.push(object.class());
                    classes.len() - 1
                }
            };
            class_of.push(idx);
        }

        self.put_count(classes.len())?;
        for class in &classes {
            self.put_compact_class(class)?;
        }
        self.put_count(objects.len())?;
        for (object, class_idx) in objects.iter().zip(class_of) {
            self.put_compact_object(object, class_idx)?;
        }
        Ok(())
    }

    pub fn get_compact_objects(&mut self) -> SerResult<Vec<CompactObject>> {
        let count = self.get_count(4 * SLOT_SIZE)?;
        let mut classes = Vec::with_capacity(count);
        for _ in 0..count {
            classes.push(Arc::new(self.get_compact_class()?));
        }
        let count = self.get_count(8 * SLOT_SIZE)?;
        let mut objects = Vec::with_capacity(count);
        for _ in 0..count {
            objects.push(self.get_compact_object(&classes)?);
        }
        Ok(objects)
    }

    fn put_compact_class(&mut self, class: &CompactClass) -> SerResult<()> {
        self.put_magic(MAGIC_COMPACT_CLASS)?;
        self.put_str(class.namespace())?;
        self.put_bool(class.is_synthesized())?;
        self.put_count(class.key_count())?;
        for n in 0..class.key_count() {
            let idx = class.key_property(n).unwrap_or_default();
            self.put_count(idx)?;
        }
        self.put_class(&class.to_class())
    }

    fn get_compact_class(&mut self) -> SerResult<CompactClass> {
        self.get_magic(MAGIC_COMPACT_CLASS)?;
        let namespace = self.get_string()?;
        let synthesized = self.get_bool()?;
        let count = self.get_count(SLOT_SIZE)?;
        let mut keys = Vec::with_capacity(count);
        for _ in 0..count {
            keys.push(self.get_u32()? as usize);
        }
        let class = self.get_class()?;
        if let Some(bad) = keys.iter().find(|k| **k >= class.properties().len()) {
            return Err(invalid(format!("key index {} out of range", bad)));
        }
        Ok(CompactClass::restore(&class, &namespace, synthesized, &keys))
    }

    fn put_compact_object(&mut self, object: &CompactObject, class_idx: usize) -> SerResult<()> {
        self.put_magic(MAGIC_COMPACT_OBJECT)?;
        self.put_count(class_idx)?;
        self.put_opt_str(object.host())?;
        self.put_opt_str(object.namespace())?;
        self.put_bool(object.is_class_only())?;

        self.put_bool(object.has_filter())?;
        let names = if object.has_filter() {
            object.property_names()
        } else {
            Vec::new()
        };
        self.put_count(names.len())?;
        names.iter().try_for_each(|n| self.put_str(n))?;

        let class = object.class();
        self.put_count(class.property_count())?;
        for idx in 0..class.property_count() {
            match object.raw_value(idx).filter(|_| object.is_assigned(idx)) {
                Some(value) => {
                    self.put_bool(true)?;
                    self.put_value(&value)?;
                }
                None => self.put_bool(false)?,
            }
        }

        self.put_count(class.key_count())?;
        for n in 0..class.key_count() {
            match object.get_key_binding_at(n) {
                Ok((_, value)) if !value.is_null() => {
                    self.put_bool(false)?;
                    self.put_value(&value)?;
                }
                _ => self.put_bool(true)?,
            }
        }

        let user_keys: Vec<_> = object.user_key_bindings().collect();
        self.put_count(user_keys.len())?;
        user_keys.iter().try_for_each(|kb| self.put_key_binding(kb))
    }

    fn get_compact_object(&mut self, classes: &[Arc<CompactClass>]) -> SerResult<CompactObject> {
        self.get_magic(MAGIC_COMPACT_OBJECT)?;
        let class_idx = self.get_u32()? as usize;
        let class = classes
            .get(class_idx)
            .ok_or_else(|| invalid(format!("class index {} out of range", class_idx)))?;
        let mut object = CompactObject::new(Arc::clone(class));
        object.set_host(self.get_opt_string()?.as_deref());
        object.set_namespace(self.get_opt_string()?.as_deref());
        object.set_class_only(self.get_bool()?);

        let filtered = self.get_bool()?;
        let count = self.get_count(SLOT_SIZE)?;
        let mut names = Vec::with_capacity(count);
        for _ in 0..count {
            names.push(self.get_string()?);
        }
        if filtered {
            object.set_property_filter(Some(&names[..]));
        }

        let count = self.get_count(SLOT_SIZE)?;
        if count != class.property_count() {
            return Err(invalid(format!(
                "{} values for {} properties",
                count,
                class.property_count()
            )));
        }
        for idx in 0..count {
            if !self.get_bool()? {
                continue;
            }
            let value = self.get_value()?;
            let name = class.property_name(idx).unwrap_or_default().to_string();
            object
                .set_property(&name, &value)
                .map_err(|e| invalid(format!("property {}: {}", name, e)))?;
        }

        let count = self.get_count(SLOT_SIZE)?;
        if count != class.key_count() {
            return Err(invalid(format!(
                "{} key slots for {} keys",
                count,
                class.key_count()
            )));
        }
        for n in 0..count {
            if self.get_bool()? {
                continue;
            }
            let value = self.get_value()?;
            let name = class
                .key_property(n)
                .and_then(|idx| class.property_name(idx))
                .unwrap_or_default()
                .to_string();
            object
                .set_key_binding(&name, &value)
                .map_err(|e| invalid(format!("key {}: {}", name, e)))?;
        }

        let count = self.get_count(3 * SLOT_SIZE)?;
        for _ in 0..count {
            let binding = self.get_key_binding()?;
            object
                .set_key_binding_text(&binding)
                .map_err(|e| invalid(format!("key {}: {}", binding.name(), e)))?;
        }
        Ok(object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cim::{CimClass, CimType, CimValue, KeyBinding, KeyKind, Property, Qualifier};
    use crate::scmo::ScmoError;

    fn sensor_class() -> Arc<CompactClass> {
        let class = CimClass::new("CIM_Sensor")
            .with_property(
                Property::new("Id", CimValue::null(CimType::String, false))
                    .with_qualifier(Qualifier::new("Key", true))
                    .unwrap(),
            )
            .unwrap()
            .with_property(Property::new("Reading", CimValue::null(CimType::Real32, false)))
            .unwrap()
            .with_property(Property::new("Unit", "C"))
            .unwrap();
        Arc::new(CompactClass::from_class(&class, "root/cimv2"))
    }

    #[test]
    fn test_stream_shares_class_table() {
        let class = sensor_class();
        let mut a = CompactObject::new(Arc::clone(&class));
        a.set_property("Id", &CimValue::from("s1")).unwrap();
        a.set_property("Reading", &CimValue::from(2.4271e-4f32)).unwrap();
        a.build_key_bindings_from_properties().unwrap();
        a.set_host(Some("srv"));
        let mut b = CompactObject::new(Arc::clone(&class));
        b.set_key_binding("Id", &CimValue::from("s2")).unwrap();
        b.set_key_binding_text(&KeyBinding::new("Slot", "7", KeyKind::Numeric))
            .unwrap();
        b.set_property_filter(Some(&["Reading"][..]));

        let mut cursor = BinaryCursor::new();
        cursor.put_compact_objects(&[a.clone(), b.clone()]).unwrap();
        assert_eq!(cursor.size() % SLOT_SIZE, 0);

        let mut reader = BinaryCursor::from_bytes(cursor.release());
        let objects = reader.get_compact_objects().unwrap();
        assert!(reader.is_exhausted());
        assert_eq!(objects.len(), 2);
        assert!(objects[0].same_class(&objects[1]));

        assert_eq!(objects[0].host(), Some("srv"));
        assert_eq!(
            objects[0].get_property("Reading").unwrap(),
            CimValue::from(2.4271e-4f32)
        );
        assert_eq!(objects[0].get_property("Unit").unwrap(), CimValue::from("C"));
        assert_eq!(objects[0].to_path(), a.to_path());

        assert_eq!(objects[1].property_names(), vec!["Id", "Reading"]);
        assert_eq!(objects[1].get_property("Unit"), Err(ScmoError::NotFound));
        assert_eq!(objects[1].key_bindings(), b.key_bindings());
        assert_eq!(objects[1].key_binding_count(), 2);
    }

    #[test]
    fn test_bad_class_index_rejected() {
        let mut cursor = BinaryCursor::new();
        cursor.put_count(0).unwrap();
        cursor.put_count(1).unwrap();
        cursor.put_magic(MAGIC_COMPACT_OBJECT).unwrap();
        cursor.put_count(3).unwrap();
        for _ in 0..8 {
            cursor.put_u32(0).unwrap();
        }
        let mut reader = BinaryCursor::from_bytes(cursor.release());
        assert!(reader.get_compact_objects().is_err());
    }
}
