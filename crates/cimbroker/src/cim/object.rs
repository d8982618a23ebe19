// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Classic tree-shaped classes, instances and objects.

use super::{
    CimName, CimValue, KeyBinding, Method, ModelError, ObjectPath, Property, Qualifier,
    QualifierList,
};

/// The property filter of a request: `None` selects every property.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyList {
    names: Option<Vec<CimName>>,
}

impl PropertyList {
    /// Selects every property.
    pub fn all() -> Self {
        Self { names: None }
    }

    pub fn of<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<CimName>,
    {
        Self {
            names: Some(names.into_iter().map(Into::into).collect()),
        }
    }

    pub fn is_all(&self) -> bool {
        self.names.is_none()
    }

    pub fn names(&self) -> Option<&[CimName]> {
        self.names.as_deref()
    }

    pub fn contains(&self, name: &str) -> bool {
        match &self.names {
            None => true,
            Some(names) => names.iter().any(|n| n.matches(name)),
        }
    }
}

fn find_property(properties: &[Property], name: &str) -> Option<usize> {
    properties.iter().position(|p| p.name().matches(name))
}

fn push_unique(properties: &mut Vec<Property>, property: Property) -> Result<(), ModelError> {
    if find_property(properties, property.name().as_str()).is_some() {
        return Err(ModelError::DuplicateName(property.name().to_string()));
    }
    properties.push(property);
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct CimInstance {
    class_name: CimName,
    path: Option<ObjectPath>,
    qualifiers: QualifierList,
    properties: Vec<Property>,
}

impl CimInstance {
    pub fn new(class_name: impl Into<CimName>) -> Self {
        Self {
            class_name: class_name.into(),
            path: None,
            qualifiers: QualifierList::new(),
            properties: Vec::new(),
        }
    }

    pub fn with_property(mut self, property: Property) -> Result<Self, ModelError> {
        self.add_property(property)?;
        Ok(self)
    }

    pub fn with_path(mut self, path: ObjectPath) -> Self {
        self.path = Some(path);
        self
    }

    pub fn class_name(&self) -> &CimName {
        &self.class_name
    }

    pub fn path(&self) -> Option<&ObjectPath> {
        self.path.as_ref()
    }

    pub fn path_mut(&mut self) -> Option<&mut ObjectPath> {
        self.path.as_mut()
    }

    pub fn set_path(&mut self, path: Option<ObjectPath>) {
        self.path = path;
    }

    pub fn qualifiers(&self) -> &QualifierList {
        &self.qualifiers
    }

    pub fn add_qualifier(&mut self, qualifier: Qualifier) -> Result<(), ModelError> {
        self.qualifiers.add(qualifier)
    }

    pub fn set_qualifiers(&mut self, qualifiers: QualifierList) {
        self.qualifiers = qualifiers;
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn property_count(&self) -> usize {
        self.properties.len()
    }

    pub fn find_property(&self, name: &str) -> Option<usize> {
        find_property(&self.properties, name)
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.find_property(name).map(|idx| &self.properties[idx])
    }

    pub fn property_mut(&mut self, name: &str) -> Option<&mut Property> {
        self.find_property(name).map(move |idx| &mut self.properties[idx])
    }

    pub fn value(&self, name: &str) -> Option<&CimValue> {
        self.property(name).map(Property::value)
    }

    pub fn add_property(&mut self, property: Property) -> Result<(), ModelError> {
        push_unique(&mut self.properties, property)
    }

    pub fn remove_property(&mut self, name: &str) -> Option<Property> {
        self.find_property(name)
            .map(|idx| self.properties.remove(idx))
    }

    /// Keep only the properties accepted by `keep`, preserving order.
    pub fn retain_properties(&mut self, mut keep: impl FnMut(&Property) -> bool) {
        self.properties.retain(|p| keep(p));
    }

    /// Copy shaped by request options: qualifiers and class origins are
    /// dropped unless requested, and properties outside `list` are removed.
    pub fn filtered(
        &self,
        include_qualifiers: bool,
        include_class_origin: bool,
        list: &PropertyList,
    ) -> CimInstance {
        CimInstance {
            class_name: self.class_name.clone(),
            path: self.path.clone(),
            qualifiers: if include_qualifiers {
                self.qualifiers.clone()
            } else {
                QualifierList::new()
            },
            properties: self
                .properties
                .iter()
                .filter(|p| list.contains(p.name().as_str()))
                .map(|p| p.stripped(include_qualifiers, include_class_origin))
                .collect(),
        }
    }

    /// Object path built from the key properties declared by `class`.
    ///
    /// Keys missing on the instance, or null, are left out.
    pub fn build_path(&self, class: &CimClass) -> ObjectPath {
        let mut path = ObjectPath::new(self.class_name.clone());
        for key in class.properties().iter().filter(|p| p.is_key()) {
            if let Some(kb) = self
                .value(key.name().as_str())
                .and_then(|v| KeyBinding::from_value(key.name().clone(), v))
            {
                path.add_key_binding(kb);
            }
        }
        path
    }

    /// Object path built from the instance's own key-qualified properties,
    /// for instances produced without a class at hand.
    pub fn key_path(&self) -> ObjectPath {
        let mut path = ObjectPath::new(self.class_name.clone());
        for key in self.properties.iter().filter(|p| p.is_key()) {
            if let Some(kb) = KeyBinding::from_value(key.name().clone(), key.value()) {
                path.add_key_binding(kb);
            }
        }
        path
    }

    /// Structural equality with exact (case-sensitive) path comparison.
    pub fn identical(&self, other: &CimInstance) -> bool {
        let paths = match (&self.path, &other.path) {
            (Some(a), Some(b)) => a.identical(b),
            (None, None) => true,
            _ => false,
        };
        paths
            && self.class_name.as_str() == other.class_name.as_str()
            && self.qualifiers == other.qualifiers
            && self.properties.len() == other.properties.len()
            && self
                .properties
                .iter()
                .zip(&other.properties)
                .all(|(a, b)| a.name().as_str() == b.name().as_str() && a == b)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CimClass {
    class_name: CimName,
    super_class: Option<CimName>,
    qualifiers: QualifierList,
    properties: Vec<Property>,
    methods: Vec<Method>,
    path: Option<ObjectPath>,
}

impl CimClass {
    pub fn new(class_name: impl Into<CimName>) -> Self {
        Self {
            class_name: class_name.into(),
            super_class: None,
            qualifiers: QualifierList::new(),
            properties: Vec::new(),
            methods: Vec::new(),
            path: None,
        }
    }

    pub fn with_super_class(mut self, super_class: impl Into<CimName>) -> Self {
        self.super_class = Some(super_class.into());
        self
    }

    pub fn with_property(mut self, property: Property) -> Result<Self, ModelError> {
        self.add_property(property)?;
        Ok(self)
    }

    pub fn with_qualifier(mut self, qualifier: Qualifier) -> Result<Self, ModelError> {
        self.qualifiers.add(qualifier)?;
        Ok(self)
    }

    pub fn class_name(&self) -> &CimName {
        &self.class_name
    }

    pub fn super_class(&self) -> Option<&CimName> {
        self.super_class.as_ref()
    }

    pub fn set_super_class(&mut self, super_class: Option<CimName>) {
        self.super_class = super_class;
    }

    pub fn qualifiers(&self) -> &QualifierList {
        &self.qualifiers
    }

    pub fn add_qualifier(&mut self, qualifier: Qualifier) -> Result<(), ModelError> {
        self.qualifiers.add(qualifier)
    }

    pub fn set_qualifiers(&mut self, qualifiers: QualifierList) {
        self.qualifiers = qualifiers;
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        find_property(&self.properties, name).map(|idx| &self.properties[idx])
    }

    pub fn find_property(&self, name: &str) -> Option<usize> {
        find_property(&self.properties, name)
    }

    pub fn add_property(&mut self, property: Property) -> Result<(), ModelError> {
        push_unique(&mut self.properties, property)
    }

    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    pub fn method(&self, name: &str) -> Option<&Method> {
        self.methods.iter().find(|m| m.name().matches(name))
    }

    pub fn add_method(&mut self, method: Method) -> Result<(), ModelError> {
        if self.method(method.name().as_str()).is_some() {
            return Err(ModelError::DuplicateName(method.name().to_string()));
        }
        self.methods.push(method);
        Ok(())
    }

    pub fn path(&self) -> Option<&ObjectPath> {
        self.path.as_ref()
    }

    pub fn path_mut(&mut self) -> Option<&mut ObjectPath> {
        self.path.as_mut()
    }

    pub fn set_path(&mut self, path: Option<ObjectPath>) {
        self.path = path;
    }

    pub fn key_properties(&self) -> impl Iterator<Item = &Property> {
        self.properties.iter().filter(|p| p.is_key())
    }

    pub fn is_association(&self) -> bool {
        self.qualifiers.is_true("Association")
    }
}

/// Result element of object-returning operations: a class or an instance.
#[derive(Debug, Clone, PartialEq)]
pub enum CimObject {
    Class(CimClass),
    Instance(CimInstance),
}

impl CimObject {
    pub fn is_class(&self) -> bool {
        matches!(self, CimObject::Class(_))
    }

    pub fn class_name(&self) -> &CimName {
        match self {
            CimObject::Class(c) => c.class_name(),
            CimObject::Instance(i) => i.class_name(),
        }
    }

    pub fn path(&self) -> Option<&ObjectPath> {
        match self {
            CimObject::Class(c) => c.path(),
            CimObject::Instance(i) => i.path(),
        }
    }

    pub fn path_mut(&mut self) -> Option<&mut ObjectPath> {
        match self {
            CimObject::Class(c) => c.path_mut(),
            CimObject::Instance(i) => i.path_mut(),
        }
    }

    pub fn set_path(&mut self, path: Option<ObjectPath>) {
        match self {
            CimObject::Class(c) => c.set_path(path),
            CimObject::Instance(i) => i.set_path(path),
        }
    }

    pub fn as_instance(&self) -> Option<&CimInstance> {
        match self {
            CimObject::Instance(i) => Some(i),
            CimObject::Class(_) => None,
        }
    }

    pub fn as_class(&self) -> Option<&CimClass> {
        match self {
            CimObject::Class(c) => Some(c),
            CimObject::Instance(_) => None,
        }
    }
}

impl From<CimInstance> for CimObject {
    fn from(instance: CimInstance) -> Self {
        CimObject::Instance(instance)
    }
}

impl From<CimClass> for CimObject {
    fn from(class: CimClass) -> Self {
        CimObject::Class(class)
    }
}
