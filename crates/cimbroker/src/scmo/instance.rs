// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Compact objects: instances, instance paths and class-only objects stored
//! as value slots over a shared [`CompactClass`].

use super::arena::{Slot, StrRef, ValueStore};
use super::{CompactClass, ScmoError};
use crate::cim::{CimType, CimValue, KeyBinding, KeyKind, ObjectPath, Scalar};
use std::sync::Arc;

/// Key binding not declared by the class, kept in its textual form.
#[derive(Debug, Clone, Copy)]
struct UserKey {
    name: StrRef,
    kind: KeyKind,
    value: StrRef,
}

#[derive(Debug, Clone)]
pub struct CompactObject {
    class: Arc<CompactClass>,
    store: ValueStore,
    host: Option<StrRef>,
    namespace: Option<StrRef>,
    class_only: bool,
    /// One slot per class property.
    values: Vec<Slot>,
    /// One slot per class key, in key order.
    keys: Vec<Slot>,
    user_keys: Vec<UserKey>,
    /// Enumerated property indexes when a filter is set; always holds keys.
    filter: Option<Vec<usize>>,
}

fn check_shape(
    declared: CimType,
    declared_array: bool,
    value: &CimValue,
) -> Result<(), ScmoError> {
    if value.cim_type() != declared {
        return Err(ScmoError::WrongType);
    }
    match (declared_array, value.is_array()) {
        (false, true) => Err(ScmoError::NotAnArray),
        (true, false) => Err(ScmoError::IsAnArray),
        _ => Ok(()),
    }
}

fn user_key_value(kind: KeyKind, text: &str) -> Option<CimValue> {
    let scalar = match kind {
        KeyKind::String => Scalar::String(text.to_string()),
        KeyKind::Boolean => Scalar::parse(CimType::Boolean, text).ok()?,
        KeyKind::Reference => Scalar::parse(CimType::Reference, text).ok()?,
        KeyKind::Numeric => Scalar::parse(CimType::Sint64, text)
            .or_else(|_| Scalar::parse(CimType::Uint64, text))
            .or_else(|_| Scalar::parse(CimType::Real64, text))
            .ok()?,
    };
    Some(CimValue::scalar(scalar))
}

impl CompactObject {
    /// Empty object of `class`, in the class namespace.
    pub fn new(class: Arc<CompactClass>) -> Self {
        let mut store = ValueStore::default();
        let namespace = if class.namespace().is_empty() {
            None
        } else {
            Some(store.alloc_str(class.namespace()))
        };
        Self {
            values: vec![Slot::Unset; class.property_count()],
            keys: vec![Slot::Unset; class.key_count()],
            class,
            store,
            host: None,
            namespace,
            class_only: false,
            user_keys: Vec::new(),
            filter: None,
        }
    }

    pub fn class(&self) -> &Arc<CompactClass> {
        &self.class
    }

    pub fn class_name(&self) -> &str {
        self.class.class_name()
    }

    pub fn host(&self) -> Option<&str> {
        self.host.map(|h| self.store.str(h))
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.map(|ns| self.store.str(ns))
    }

    /// Empty strings clear the host.
    pub fn set_host(&mut self, host: Option<&str>) {
        self.host = host
            .filter(|h| !h.is_empty())
            .map(|h| self.store.alloc_str(h));
    }

    pub fn set_namespace(&mut self, namespace: Option<&str>) {
        self.namespace = namespace
            .filter(|ns| !ns.is_empty())
            .map(|ns| self.store.alloc_str(ns));
    }

    /// Fill in host and namespace only where absent.
    pub fn complete_host_and_namespace(&mut self, host: Option<&str>, namespace: Option<&str>) {
        if self.host.is_none() {
            self.set_host(host);
        }
        if self.namespace.is_none() {
            self.set_namespace(namespace);
        }
    }

    /// True for objects standing for a class rather than an instance.
    pub fn is_class_only(&self) -> bool {
        self.class_only
    }

    pub fn set_class_only(&mut self, class_only: bool) {
        self.class_only = class_only;
    }

    // ========================================================================
    // Properties
    // ========================================================================

    fn visible(&self, index: usize) -> bool {
        match &self.filter {
            None => index < self.values.len(),
            Some(indexes) => indexes.binary_search(&index).is_ok(),
        }
    }

    /// Property indexes in enumeration order.
    pub(crate) fn enumerated(&self) -> Vec<usize> {
        match &self.filter {
            None => (0..self.values.len()).collect(),
            Some(indexes) => indexes.clone(),
        }
    }

    /// Number of enumerable properties: the filtered set (always including
    /// keys) or every declared property.
    pub fn property_count(&self) -> usize {
        match &self.filter {
            None => self.values.len(),
            Some(indexes) => indexes.len(),
        }
    }

    pub fn property_names(&self) -> Vec<&str> {
        self.enumerated()
            .into_iter()
            .filter_map(|idx| self.class.property_name(idx))
            .collect()
    }

    /// Stored value, falling back to the class default; `None` when neither
    /// is set.
    pub(crate) fn raw_value(&self, index: usize) -> Option<CimValue> {
        let (ty, is_array) = self.class.property_type(index)?;
        let slot = *self.values.get(index)?;
        if slot.is_set() {
            self.store.load(slot, ty, is_array)
        } else {
            self.class.default_value(index)
        }
    }

    /// True when the property holds its own value (not the class default).
    pub(crate) fn is_assigned(&self, index: usize) -> bool {
        self.values.get(index).is_some_and(Slot::is_set)
    }

    fn lookup(&self, name: &str) -> Result<usize, ScmoError> {
        self.class
            .property_index(name)
            .filter(|idx| self.visible(*idx))
            .ok_or(ScmoError::NotFound)
    }

    /// Value of a property.
    ///
    /// The returned value is owned by the caller. Fails with `NotFound` for
    /// undeclared or filtered-out properties and `NullValue` when the
    /// property is null or has neither a value nor a class default.
    pub fn get_property(&self, name: &str) -> Result<CimValue, ScmoError> {
        let idx = self.lookup(name)?;
        match self.raw_value(idx) {
            Some(value) if !value.is_null() => Ok(value),
            _ => Err(ScmoError::NullValue),
        }
    }

    /// Like [`get_property`](Self::get_property), checking the caller's
    /// expected type and arity first.
    pub fn get_property_typed(
        &self,
        name: &str,
        ty: CimType,
        is_array: bool,
    ) -> Result<CimValue, ScmoError> {
        let idx = self.lookup(name)?;
        let (declared, declared_array) = self.class.property_type(idx).ok_or(ScmoError::NotFound)?;
        if declared != ty {
            return Err(ScmoError::WrongType);
        }
        match (declared_array, is_array) {
            (true, false) => return Err(ScmoError::IsAnArray),
            (false, true) => return Err(ScmoError::NotAnArray),
            _ => {}
        }
        self.get_property(name)
    }

    /// Name and value of the `n`-th enumerated property; null values are
    /// returned as such.
    pub fn get_property_at(&self, n: usize) -> Result<(&str, CimValue), ScmoError> {
        let idx = *self.enumerated().get(n).ok_or(ScmoError::NotFound)?;
        let name = self.class.property_name(idx).ok_or(ScmoError::NotFound)?;
        let value = match self.raw_value(idx) {
            Some(value) => value,
            None => {
                let (ty, is_array) = self.class.property_type(idx).ok_or(ScmoError::NotFound)?;
                CimValue::null(ty, is_array)
            }
        };
        Ok((name, value))
    }

    /// Set a property; type and arity must match the declaration.
    pub fn set_property(&mut self, name: &str, value: &CimValue) -> Result<(), ScmoError> {
        let idx = self.class.property_index(name).ok_or(ScmoError::NotFound)?;
        let (ty, is_array) = self.class.property_type(idx).ok_or(ScmoError::NotFound)?;
        check_shape(ty, is_array, value)?;
        self.values[idx] = self.store.store(value)?;
        Ok(())
    }

    /// Restrict enumeration to `names` plus every key property; `None`
    /// enumerates all properties again. Unknown names are ignored.
    pub fn set_property_filter<S: AsRef<str>>(&mut self, names: Option<&[S]>) {
        let Some(names) = names else {
            self.filter = None;
            return;
        };
        let mut indexes: Vec<usize> = names
            .iter()
            .filter_map(|n| self.class.property_index(n.as_ref()))
            .chain((0..self.class.key_count()).filter_map(|k| self.class.key_property(k)))
            .collect();
        indexes.sort_unstable();
        indexes.dedup();
        self.filter = Some(indexes);
    }

    pub fn has_filter(&self) -> bool {
        self.filter.is_some()
    }

    // ========================================================================
    // Key bindings
    // ========================================================================

    /// Declared keys plus user keys; not affected by the property filter.
    pub fn key_binding_count(&self) -> usize {
        self.keys.len() + self.user_keys.len()
    }

    fn declared_key(&self, position: usize) -> Option<(&str, CimValue)> {
        let idx = self.class.key_property(position)?;
        let name = self.class.property_name(idx)?;
        let (ty, _) = self.class.property_type(idx)?;
        let value = self
            .store
            .load(self.keys[position], ty, false)
            .unwrap_or_else(|| CimValue::null(ty, false));
        Some((name, value))
    }

    /// Name and value of the `n`-th key binding (declared keys first, by
    /// name, then user keys in insertion order).
    pub fn get_key_binding_at(&self, n: usize) -> Result<(&str, CimValue), ScmoError> {
        if n < self.keys.len() {
            return self.declared_key(n).ok_or(ScmoError::NotFound);
        }
        let user = self.user_keys.get(n - self.keys.len()).ok_or(ScmoError::NotFound)?;
        let value = user_key_value(user.kind, self.store.str(user.value))
            .ok_or(ScmoError::WrongType)?;
        Ok((self.store.str(user.name), value))
    }

    pub fn get_key_binding(&self, name: &str) -> Result<CimValue, ScmoError> {
        let position = match self.class.key_position(name) {
            Some(position) => position,
            None => {
                let offset = self
                    .user_keys
                    .iter()
                    .position(|u| crate::cim::names_equal(self.store.str(u.name), name))
                    .ok_or(ScmoError::NotFound)?;
                self.keys.len() + offset
            }
        };
        let (_, value) = self.get_key_binding_at(position)?;
        if value.is_null() {
            return Err(ScmoError::NullValue);
        }
        Ok(value)
    }

    /// Set a key binding. Declared keys are type-checked; undeclared names
    /// become user key bindings.
    pub fn set_key_binding(&mut self, name: &str, value: &CimValue) -> Result<(), ScmoError> {
        if let Some(position) = self.class.key_position(name) {
            let idx = self.class.key_property(position).ok_or(ScmoError::NotFound)?;
            let (ty, _) = self.class.property_type(idx).ok_or(ScmoError::NotFound)?;
            check_shape(ty, false, value)?;
            self.keys[position] = self.store.store(value)?;
            return Ok(());
        }
        let binding = KeyBinding::from_value(name, value).ok_or(ScmoError::WrongType)?;
        self.push_user_key(&binding);
        Ok(())
    }

    /// Set a key binding from its textual form (as carried by paths).
    pub fn set_key_binding_text(&mut self, binding: &KeyBinding) -> Result<(), ScmoError> {
        let name = binding.name().as_str();
        if let Some(position) = self.class.key_position(name) {
            let idx = self.class.key_property(position).ok_or(ScmoError::NotFound)?;
            let (ty, _) = self.class.property_type(idx).ok_or(ScmoError::NotFound)?;
            let value = binding.to_value(ty).map_err(|_| ScmoError::WrongType)?;
            self.keys[position] = self.store.store(&value)?;
            return Ok(());
        }
        self.push_user_key(binding);
        Ok(())
    }

    fn push_user_key(&mut self, binding: &KeyBinding) {
        let name = binding.name().as_str();
        let value = self.store.alloc_str(binding.value());
        let existing = self
            .user_keys
            .iter()
            .position(|u| crate::cim::names_equal(self.store.str(u.name), name));
        match existing {
            Some(pos) => {
                self.user_keys[pos].kind = binding.kind();
                self.user_keys[pos].value = value;
            }
            None => {
                let name = self.store.alloc_str(name);
                self.user_keys.push(UserKey {
                    name,
                    kind: binding.kind(),
                    value,
                });
            }
        }
    }

    /// Copy each key property's current value into its key binding. Unset or
    /// null properties produce a null key binding.
    pub fn build_key_bindings_from_properties(&mut self) -> Result<(), ScmoError> {
        for position in 0..self.keys.len() {
            let Some(idx) = self.class.key_property(position) else {
                continue;
            };
            self.keys[position] = match self.raw_value(idx) {
                Some(value) if !value.is_null() => self.store.store(&value)?,
                _ => Slot::Null,
            };
        }
        Ok(())
    }

    /// Key bindings in path form; null keys are left out.
    pub fn key_bindings(&self) -> Vec<KeyBinding> {
        let mut bindings = Vec::with_capacity(self.key_binding_count());
        for position in 0..self.keys.len() {
            if let Some((name, value)) = self.declared_key(position) {
                if let Some(kb) = KeyBinding::from_value(name, &value) {
                    bindings.push(kb);
                }
            }
        }
        bindings.extend(self.user_key_bindings());
        bindings
    }

    /// Undeclared key bindings in insertion order.
    pub(crate) fn user_key_bindings(&self) -> impl Iterator<Item = KeyBinding> + '_ {
        self.user_keys.iter().map(|user| {
            KeyBinding::new(
                self.store.str(user.name),
                self.store.str(user.value),
                user.kind,
            )
        })
    }

    /// Object path of this object (host, namespace, class, key bindings).
    pub fn to_path(&self) -> ObjectPath {
        let mut path = ObjectPath::new(self.class_name());
        path.set_host(self.host().map(str::to_string));
        path.set_namespace(self.namespace().map(Into::into));
        if !self.class_only {
            path.set_key_bindings(self.key_bindings());
        }
        path
    }

    /// Duplicate the object. A path-only clone keeps the key bindings and
    /// key property values and drops every other property value.
    pub fn clone_object(&self, path_only: bool) -> CompactObject {
        let mut copy = self.clone();
        if path_only {
            for (idx, slot) in copy.values.iter_mut().enumerate() {
                if !self.class.is_key(idx) {
                    *slot = Slot::Unset;
                }
            }
        }
        copy
    }

    /// True when both objects share the same class definition.
    pub fn same_class(&self, other: &CompactObject) -> bool {
        Arc::ptr_eq(&self.class, &other.class)
    }
}
