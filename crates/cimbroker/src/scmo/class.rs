// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Compact class definitions.
//!
//! A [`CompactClass`] is built once per (namespace, class) and shared by
//! every [`CompactObject`](super::CompactObject) of that class through an
//! `Arc`. Property names, string defaults and array defaults live in the
//! class arena.

use super::arena::{Slot, StrRef, ValueStore};
use crate::cim::name::fold_name;
use crate::cim::{
    CimClass, CimInstance, CimName, CimType, CimValue, KeyKind, Method, ObjectPath, Property,
    QualifierList,
};
use std::collections::HashMap;

/// Declaration of one class property.
#[derive(Debug, Clone)]
pub(crate) struct PropertyDef {
    pub(crate) name: StrRef,
    pub(crate) ty: CimType,
    pub(crate) is_array: bool,
    pub(crate) array_size: u32,
    pub(crate) is_key: bool,
    pub(crate) default: Slot,
    pub(crate) reference_class: Option<StrRef>,
    pub(crate) class_origin: Option<StrRef>,
    pub(crate) propagated: bool,
    pub(crate) qualifiers: QualifierList,
}

#[derive(Debug, Clone)]
pub struct CompactClass {
    store: ValueStore,
    namespace: StrRef,
    class_name: StrRef,
    super_class: Option<StrRef>,
    qualifiers: QualifierList,
    properties: Vec<PropertyDef>,
    /// Property indexes of the key properties, ordered by name.
    keys: Vec<usize>,
    methods: Vec<Method>,
    lookup: HashMap<String, usize>,
    synthesized: bool,
}

impl CompactClass {
    fn empty(namespace: &str, class_name: &str) -> Self {
        let mut store = ValueStore::default();
        let namespace = store.alloc_str(namespace);
        let class_name = store.alloc_str(class_name);
        Self {
            store,
            namespace,
            class_name,
            super_class: None,
            qualifiers: QualifierList::new(),
            properties: Vec::new(),
            keys: Vec::new(),
            methods: Vec::new(),
            lookup: HashMap::new(),
            synthesized: false,
        }
    }

    fn push_property(&mut self, property: &Property, is_key: bool) {
        if self.lookup.contains_key(&fold_name(property.name().as_str())) {
            return;
        }
        let name = self.store.alloc_str(property.name().as_str());
        let reference_class = property
            .reference_class()
            .map(|c| self.store.alloc_str(c.as_str()));
        let class_origin = property
            .class_origin()
            .map(|c| self.store.alloc_str(c.as_str()));
        let default = if self.synthesized || property.value().is_null() {
            Slot::Unset
        } else {
            self.store.store(property.value()).unwrap_or_else(|e| {
                log::warn!(
                    "[scmo] dropping default of {}.{}: {}",
                    self.store.str(self.class_name),
                    property.name(),
                    e
                );
                Slot::Unset
            })
        };
        self.lookup
            .insert(fold_name(property.name().as_str()), self.properties.len());
        self.properties.push(PropertyDef {
            name,
            ty: property.cim_type(),
            is_array: property.is_array(),
            array_size: property.array_size(),
            is_key,
            default,
            reference_class,
            class_origin,
            propagated: property.propagated(),
            qualifiers: property.qualifiers().clone(),
        });
    }

    fn index_keys(&mut self) {
        let mut keys: Vec<usize> = (0..self.properties.len())
            .filter(|idx| self.properties[*idx].is_key)
            .collect();
        keys.sort_by_key(|idx| fold_name(self.store.str(self.properties[*idx].name)));
        self.keys = keys;
    }

    /// Compact form of a classic class definition.
    pub fn from_class(class: &CimClass, namespace: &str) -> Self {
        let mut compact = Self::empty(namespace, class.class_name().as_str());
        compact.super_class = class
            .super_class()
            .map(|s| compact.store.alloc_str(s.as_str()));
        compact.qualifiers = class.qualifiers().clone();
        for property in class.properties() {
            compact.push_property(property, property.is_key());
        }
        compact.methods = class.methods().to_vec();
        compact.index_keys();
        compact
    }

    /// Class synthesised from an instance when no definition is available.
    ///
    /// Properties follow the instance; keys are the properties qualified
    /// `Key` plus those named by the instance path. No defaults are recorded.
    pub fn synthesize_from_instance(instance: &CimInstance, namespace: &str) -> Self {
        let mut compact = Self::empty(namespace, instance.class_name().as_str());
        compact.synthesized = true;
        for property in instance.properties() {
            let keyed_by_path = instance
                .path()
                .and_then(|p| p.key_binding(property.name().as_str()))
                .is_some();
            compact.push_property(property, property.is_key() || keyed_by_path);
        }
        compact.index_keys();
        compact
    }

    /// Class synthesised from a bare path: keys become declared key
    /// properties typed from their key kind.
    pub fn synthesize_from_path(path: &ObjectPath, namespace: &str) -> Self {
        let mut compact = Self::empty(namespace, path.class_name().as_str());
        compact.synthesized = true;
        for binding in path.key_bindings() {
            let ty = match binding.kind() {
                KeyKind::String => CimType::String,
                KeyKind::Boolean => CimType::Boolean,
                KeyKind::Reference => CimType::Reference,
                KeyKind::Numeric => numeric_key_type(binding.value()),
            };
            let decl = Property::new(binding.name().clone(), CimValue::null(ty, false));
            compact.push_property(&decl, true);
        }
        compact.index_keys();
        compact
    }

    /// Rebuild a streamed class: `keys` lists the key property indexes,
    /// overriding the `Key` qualifiers of the definition.
    pub(crate) fn restore(
        class: &CimClass,
        namespace: &str,
        synthesized: bool,
        keys: &[usize],
    ) -> Self {
        let mut compact = Self::from_class(class, namespace);
        compact.synthesized = synthesized;
        for (idx, def) in compact.properties.iter_mut().enumerate() {
            def.is_key = keys.contains(&idx);
        }
        compact.index_keys();
        compact
    }

    pub fn namespace(&self) -> &str {
        self.store.str(self.namespace)
    }

    pub fn class_name(&self) -> &str {
        self.store.str(self.class_name)
    }

    pub fn super_class(&self) -> Option<&str> {
        self.super_class.map(|s| self.store.str(s))
    }

    /// True when built from an instance or path rather than a definition.
    pub fn is_synthesized(&self) -> bool {
        self.synthesized
    }

    pub fn qualifiers(&self) -> &QualifierList {
        &self.qualifiers
    }

    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    pub fn property_count(&self) -> usize {
        self.properties.len()
    }

    pub fn property_index(&self, name: &str) -> Option<usize> {
        self.lookup.get(&fold_name(name)).copied()
    }

    pub fn property_name(&self, index: usize) -> Option<&str> {
        self.properties.get(index).map(|p| self.store.str(p.name))
    }

    pub fn property_type(&self, index: usize) -> Option<(CimType, bool)> {
        self.properties.get(index).map(|p| (p.ty, p.is_array))
    }

    pub fn is_key(&self, index: usize) -> bool {
        self.properties.get(index).is_some_and(|p| p.is_key)
    }

    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    /// Property index of the `n`-th key (keys are ordered by name).
    pub fn key_property(&self, n: usize) -> Option<usize> {
        self.keys.get(n).copied()
    }

    pub fn key_position(&self, name: &str) -> Option<usize> {
        let idx = self.property_index(name)?;
        self.keys.iter().position(|k| *k == idx)
    }

    pub(crate) fn def(&self, index: usize) -> Option<&PropertyDef> {
        self.properties.get(index)
    }

    pub(crate) fn default_value(&self, index: usize) -> Option<CimValue> {
        let def = self.properties.get(index)?;
        self.store.load(def.default, def.ty, def.is_array)
    }

    pub(crate) fn name_of(&self, r: StrRef) -> &str {
        self.store.str(r)
    }

    /// Classic property declaration for `index`, with its default value.
    pub fn property(&self, index: usize) -> Option<Property> {
        let def = self.properties.get(index)?;
        let value = self
            .default_value(index)
            .unwrap_or_else(|| CimValue::null(def.ty, def.is_array));
        let mut property = Property::new(self.store.str(def.name), value)
            .with_array_size(def.array_size)
            .with_propagated(def.propagated)
            .with_qualifiers(def.qualifiers.clone());
        if let Some(rc) = def.reference_class {
            property = property.with_reference_class(self.store.str(rc));
        }
        if let Some(origin) = def.class_origin {
            property = property.with_class_origin(self.store.str(origin));
        }
        Some(property)
    }

    /// Rebuild the classic class definition.
    pub fn to_class(&self) -> CimClass {
        let mut class = CimClass::new(self.class_name());
        class.set_super_class(self.super_class().map(CimName::new));
        class.set_qualifiers(self.qualifiers.clone());
        for idx in 0..self.properties.len() {
            if let Some(property) = self.property(idx) {
                // names are unique by construction
                let _ = class.add_property(property);
            }
        }
        for method in &self.methods {
            let _ = class.add_method(method.clone());
        }
        class
    }
}

fn numeric_key_type(text: &str) -> CimType {
    let text = text.trim();
    if text.parse::<i64>().is_ok() {
        CimType::Sint64
    } else if text.parse::<u64>().is_ok() {
        CimType::Uint64
    } else {
        CimType::Real64
    }
}
