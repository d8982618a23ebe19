// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Properties, methods and method parameters.

use super::{CimName, CimType, CimValue, ModelError, Qualifier, QualifierList};

/// A named, typed value with its qualifiers.
///
/// The property type and arity are those of its value; a property declared
/// without a default carries a null value of the declared type.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    name: CimName,
    value: CimValue,
    array_size: u32,
    reference_class: Option<CimName>,
    class_origin: Option<CimName>,
    propagated: bool,
    qualifiers: QualifierList,
}

impl Property {
    pub fn new(name: impl Into<CimName>, value: impl Into<CimValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            array_size: 0,
            reference_class: None,
            class_origin: None,
            propagated: false,
            qualifiers: QualifierList::new(),
        }
    }

    pub fn with_array_size(mut self, size: u32) -> Self {
        self.array_size = size;
        self
    }

    pub fn with_reference_class(mut self, class: impl Into<CimName>) -> Self {
        self.reference_class = Some(class.into());
        self
    }

    pub fn with_class_origin(mut self, origin: impl Into<CimName>) -> Self {
        self.class_origin = Some(origin.into());
        self
    }

    pub fn with_propagated(mut self, propagated: bool) -> Self {
        self.propagated = propagated;
        self
    }

    pub fn with_qualifier(mut self, qualifier: Qualifier) -> Result<Self, ModelError> {
        self.qualifiers.add(qualifier)?;
        Ok(self)
    }

    pub fn with_qualifiers(mut self, qualifiers: QualifierList) -> Self {
        self.qualifiers = qualifiers;
        self
    }

    pub fn name(&self) -> &CimName {
        &self.name
    }

    pub fn value(&self) -> &CimValue {
        &self.value
    }

    pub fn cim_type(&self) -> CimType {
        self.value.cim_type()
    }

    pub fn is_array(&self) -> bool {
        self.value.is_array()
    }

    /// Declared fixed array size, 0 when unbounded.
    pub fn array_size(&self) -> u32 {
        self.array_size
    }

    pub fn reference_class(&self) -> Option<&CimName> {
        self.reference_class.as_ref()
    }

    pub fn class_origin(&self) -> Option<&CimName> {
        self.class_origin.as_ref()
    }

    pub fn propagated(&self) -> bool {
        self.propagated
    }

    pub fn qualifiers(&self) -> &QualifierList {
        &self.qualifiers
    }

    pub fn qualifiers_mut(&mut self) -> &mut QualifierList {
        &mut self.qualifiers
    }

    /// Replace the value; type and arity must match the current value.
    pub fn set_value(&mut self, value: CimValue) -> Result<(), ModelError> {
        if value.cim_type() != self.value.cim_type() {
            return Err(ModelError::TypeMismatch {
                expected: self.value.cim_type(),
                found: value.cim_type(),
            });
        }
        if value.is_array() != self.value.is_array() {
            return Err(ModelError::ArityMismatch(self.name.to_string()));
        }
        self.value = value;
        Ok(())
    }

    pub fn set_class_origin(&mut self, origin: Option<CimName>) {
        self.class_origin = origin;
    }

    pub fn set_propagated(&mut self, propagated: bool) {
        self.propagated = propagated;
    }

    /// True when the property carries a `Key` qualifier set to true.
    pub fn is_key(&self) -> bool {
        self.qualifiers.is_true("Key")
    }

    /// Copy without qualifiers and origin information.
    pub fn stripped(&self, include_qualifiers: bool, include_class_origin: bool) -> Property {
        let mut prop = self.clone();
        if !include_qualifiers {
            prop.qualifiers = QualifierList::new();
        }
        if !include_class_origin {
            prop.class_origin = None;
        }
        prop
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    name: CimName,
    cim_type: CimType,
    is_array: bool,
    array_size: u32,
    reference_class: Option<CimName>,
    qualifiers: QualifierList,
}

impl Parameter {
    pub fn new(name: impl Into<CimName>, cim_type: CimType) -> Self {
        Self {
            name: name.into(),
            cim_type,
            is_array: false,
            array_size: 0,
            reference_class: None,
            qualifiers: QualifierList::new(),
        }
    }

    pub fn array(mut self, array_size: u32) -> Self {
        self.is_array = true;
        self.array_size = array_size;
        self
    }

    pub fn with_reference_class(mut self, class: impl Into<CimName>) -> Self {
        self.reference_class = Some(class.into());
        self
    }

    pub fn with_qualifier(mut self, qualifier: Qualifier) -> Result<Self, ModelError> {
        self.qualifiers.add(qualifier)?;
        Ok(self)
    }

    pub fn with_qualifiers(mut self, qualifiers: QualifierList) -> Self {
        self.qualifiers = qualifiers;
        self
    }

    pub fn name(&self) -> &CimName {
        &self.name
    }

    pub fn cim_type(&self) -> CimType {
        self.cim_type
    }

    pub fn is_array(&self) -> bool {
        self.is_array
    }

    pub fn array_size(&self) -> u32 {
        self.array_size
    }

    pub fn reference_class(&self) -> Option<&CimName> {
        self.reference_class.as_ref()
    }

    pub fn qualifiers(&self) -> &QualifierList {
        &self.qualifiers
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Method {
    name: CimName,
    return_type: CimType,
    class_origin: Option<CimName>,
    propagated: bool,
    qualifiers: QualifierList,
    parameters: Vec<Parameter>,
}

impl Method {
    pub fn new(name: impl Into<CimName>, return_type: CimType) -> Self {
        Self {
            name: name.into(),
            return_type,
            class_origin: None,
            propagated: false,
            qualifiers: QualifierList::new(),
            parameters: Vec::new(),
        }
    }

    pub fn with_class_origin(mut self, origin: impl Into<CimName>) -> Self {
        self.class_origin = Some(origin.into());
        self
    }

    pub fn with_propagated(mut self, propagated: bool) -> Self {
        self.propagated = propagated;
        self
    }

    pub fn with_qualifier(mut self, qualifier: Qualifier) -> Result<Self, ModelError> {
        self.qualifiers.add(qualifier)?;
        Ok(self)
    }

    pub fn with_qualifiers(mut self, qualifiers: QualifierList) -> Self {
        self.qualifiers = qualifiers;
        self
    }

    pub fn add_parameter(&mut self, parameter: Parameter) -> Result<(), ModelError> {
        if self.parameter(parameter.name.as_str()).is_some() {
            return Err(ModelError::DuplicateName(parameter.name.into_string()));
        }
        self.parameters.push(parameter);
        Ok(())
    }

    pub fn name(&self) -> &CimName {
        &self.name
    }

    pub fn return_type(&self) -> CimType {
        self.return_type
    }

    pub fn class_origin(&self) -> Option<&CimName> {
        self.class_origin.as_ref()
    }

    pub fn propagated(&self) -> bool {
        self.propagated
    }

    pub fn qualifiers(&self) -> &QualifierList {
        &self.qualifiers
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name.matches(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_value_checks_type_and_arity() {
        let mut prop = Property::new("Count", CimValue::null(CimType::Uint32, false));
        prop.set_value(CimValue::from(7u32)).unwrap();
        assert_eq!(prop.value().as_u32(), Some(7));

        let err = prop.set_value(CimValue::from(7u64)).unwrap_err();
        assert!(matches!(err, ModelError::TypeMismatch { .. }));

        let arr = CimValue::array(CimType::Uint32, Vec::new()).unwrap();
        assert!(matches!(prop.set_value(arr), Err(ModelError::ArityMismatch(_))));
    }

    #[test]
    fn test_key_qualifier() {
        let prop = Property::new("Id", "x")
            .with_qualifier(Qualifier::new("key", true))
            .unwrap();
        assert!(prop.is_key());
        assert!(!Property::new("Id", "x").is_key());
    }

    #[test]
    fn test_method_parameters_unique() {
        let mut m = Method::new("Reset", CimType::Uint32);
        m.add_parameter(Parameter::new("Force", CimType::Boolean)).unwrap();
        assert!(m.add_parameter(Parameter::new("force", CimType::Boolean)).is_err());
        assert_eq!(m.parameters().len(), 1);
        assert_eq!(m.parameter("FORCE").unwrap().cim_type(), CimType::Boolean);
    }
}
