// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Composite put/get pairs for the classic object model.
//!
//! Field orders (after the optional magic slot):
//!
//! | Structure | Fields |
//! |-----------|--------|
//! | value | type code, is-array, is-null, payload |
//! | path | host?, namespace?, class, key count, (name, value, kind)* |
//! | qualifier | name, value, flavor, propagated |
//! | property | name, value, array size, reference class?, class origin?, propagated, qualifiers |
//! | parameter | name, type code, is-array, array size, reference class?, qualifiers |
//! | method | name, return type, class origin?, propagated, qualifiers, parameters |
//! | instance | class, path?, qualifiers, properties |
//! | class | class, superclass?, qualifiers, properties, methods, path? |
//! | object | is-instance, class or instance |
//! | property list | is-all, count, names |

use super::{BinaryCursor, SerError, SerResult};
use crate::cim::{
    CimClass, CimDateTime, CimInstance, CimName, CimObject, CimType, CimValue, DateTimeSign,
    Flavor, KeyBinding, KeyKind, Method, ObjectPath, Parameter, Property, PropertyList, Qualifier,
    QualifierList, Scalar,
};
use crate::config::{
    MAGIC_CLASS, MAGIC_INSTANCE, MAGIC_METHOD, MAGIC_PARAMETER, MAGIC_PATH, MAGIC_PROPERTY,
    MAGIC_QUALIFIER, SLOT_SIZE,
};

fn invalid(reason: impl Into<String>) -> SerError {
    SerError::InvalidData {
        reason: reason.into(),
    }
}

fn get_type(cursor: &mut BinaryCursor) -> SerResult<CimType> {
    let code = cursor.get_u32()?;
    CimType::from_code(code).ok_or_else(|| invalid(format!("unknown CIM type code {}", code)))
}

impl BinaryCursor {
    // ========================================================================
    // Values
    // ========================================================================

    pub fn put_datetime(&mut self, value: &CimDateTime) -> SerResult<()> {
        self.put_u64(value.microseconds())?;
        self.put_u32(value.utc_offset())?;
        self.put_u16(value.sign().code())?;
        self.put_u16(value.wildcards())
    }

    pub fn get_datetime(&mut self) -> SerResult<CimDateTime> {
        let microseconds = self.get_u64()?;
        let utc_offset = self.get_u32()?;
        let sign_code = self.get_u16()?;
        let wildcards = self.get_u16()?;
        let sign = DateTimeSign::from_code(sign_code)
            .ok_or_else(|| invalid(format!("bad datetime sign {:#x}", sign_code)))?;
        Ok(CimDateTime::from_parts(
            microseconds,
            utc_offset,
            sign,
            wildcards,
        )?)
    }

    fn put_scalar(&mut self, scalar: &Scalar) -> SerResult<()> {
        match scalar {
            Scalar::Boolean(v) => self.put_bool(*v),
            Scalar::Uint8(v) => self.put_u8(*v),
            Scalar::Sint8(v) => self.put_i8(*v),
            Scalar::Uint16(v) => self.put_u16(*v),
            Scalar::Sint16(v) => self.put_i16(*v),
            Scalar::Uint32(v) => self.put_u32(*v),
            Scalar::Sint32(v) => self.put_i32(*v),
            Scalar::Uint64(v) => self.put_u64(*v),
            Scalar::Sint64(v) => self.put_i64(*v),
            Scalar::Real32(v) => self.put_f32(*v),
            Scalar::Real64(v) => self.put_f64(*v),
            Scalar::Char16(v) => self.put_char16(*v),
            Scalar::String(v) => self.put_str(v),
            Scalar::DateTime(v) => self.put_datetime(v),
            Scalar::Reference(v) => self.put_path(v),
            Scalar::Object(v) => self.put_object(v),
            Scalar::Instance(v) => self.put_instance(v),
        }
    }

    fn get_scalar(&mut self, ty: CimType) -> SerResult<Scalar> {
        let scalar = match ty {
            CimType::Boolean => Scalar::Boolean(self.get_bool()?),
            CimType::Uint8 => Scalar::Uint8(self.get_u8()?),
            CimType::Sint8 => Scalar::Sint8(self.get_i8()?),
            CimType::Uint16 => Scalar::Uint16(self.get_u16()?),
            CimType::Sint16 => Scalar::Sint16(self.get_i16()?),
            CimType::Uint32 => Scalar::Uint32(self.get_u32()?),
            CimType::Sint32 => Scalar::Sint32(self.get_i32()?),
            CimType::Uint64 => Scalar::Uint64(self.get_u64()?),
            CimType::Sint64 => Scalar::Sint64(self.get_i64()?),
            CimType::Real32 => Scalar::Real32(self.get_f32()?),
            CimType::Real64 => Scalar::Real64(self.get_f64()?),
            CimType::Char16 => Scalar::Char16(self.get_char16()?),
            CimType::String => Scalar::String(self.get_string()?),
            CimType::DateTime => Scalar::DateTime(self.get_datetime()?),
            CimType::Reference => Scalar::Reference(self.get_path()?),
            CimType::Object => Scalar::Object(Box::new(self.get_object()?)),
            CimType::Instance => Scalar::Instance(Box::new(self.get_instance()?)),
        };
        Ok(scalar)
    }

    pub fn put_value(&mut self, value: &CimValue) -> SerResult<()> {
        self.put_u32(value.cim_type().code())?;
        self.put_bool(value.is_array())?;
        self.put_bool(value.is_null())?;
        if value.is_null() {
            return Ok(());
        }
        if let Some(items) = value.as_array() {
            self.put_count(items.len())?;
            for item in items {
                self.put_scalar(item)?;
            }
            Ok(())
        } else {
            match value.as_scalar() {
                Some(scalar) => self.put_scalar(scalar),
                None => Err(invalid("value without payload")),
            }
        }
    }

    pub fn get_value(&mut self) -> SerResult<CimValue> {
        let ty = get_type(self)?;
        let is_array = self.get_bool()?;
        let is_null = self.get_bool()?;
        if is_null {
            return Ok(CimValue::null(ty, is_array));
        }
        if is_array {
            let count = self.get_count(SLOT_SIZE)?;
            let mut items = Vec::with_capacity(count);
            for _ in 0..count {
                items.push(self.get_scalar(ty)?);
            }
            Ok(CimValue::array(ty, items)?)
        } else {
            Ok(CimValue::scalar(self.get_scalar(ty)?))
        }
    }

    // ========================================================================
    // Paths
    // ========================================================================

    pub fn put_key_binding(&mut self, binding: &KeyBinding) -> SerResult<()> {
        self.put_str(binding.name().as_str())?;
        self.put_str(binding.value())?;
        self.put_u32(binding.kind().code())
    }

    pub fn get_key_binding(&mut self) -> SerResult<KeyBinding> {
        let name = self.get_string()?;
        let value = self.get_string()?;
        let code = self.get_u32()?;
        let kind =
            KeyKind::from_code(code).ok_or_else(|| invalid(format!("unknown key kind {}", code)))?;
        Ok(KeyBinding::new(name, value, kind))
    }

    pub fn put_path(&mut self, path: &ObjectPath) -> SerResult<()> {
        self.put_magic(MAGIC_PATH)?;
        self.put_opt_str(path.host())?;
        self.put_opt_str(path.namespace().map(CimName::as_str))?;
        self.put_str(path.class_name().as_str())?;
        self.put_count(path.key_bindings().len())?;
        for binding in path.key_bindings() {
            self.put_key_binding(binding)?;
        }
        Ok(())
    }

    pub fn get_path(&mut self) -> SerResult<ObjectPath> {
        self.get_magic(MAGIC_PATH)?;
        let host = self.get_opt_string()?;
        let namespace = self.get_opt_string()?;
        let class_name = self.get_string()?;
        let count = self.get_count(3 * SLOT_SIZE)?;
        let mut bindings = Vec::with_capacity(count);
        for _ in 0..count {
            bindings.push(self.get_key_binding()?);
        }
        let mut path = ObjectPath::new(class_name);
        path.set_host(host);
        path.set_namespace(namespace.map(CimName::new));
        path.set_key_bindings(bindings);
        Ok(path)
    }

    pub fn put_paths(&mut self, paths: &[ObjectPath]) -> SerResult<()> {
        self.put_count(paths.len())?;
        paths.iter().try_for_each(|p| self.put_path(p))
    }

    pub fn get_paths(&mut self) -> SerResult<Vec<ObjectPath>> {
        let count = self.get_count(4 * SLOT_SIZE)?;
        (0..count).map(|_| self.get_path()).collect()
    }

    fn put_opt_path(&mut self, path: Option<&ObjectPath>) -> SerResult<()> {
        self.put_bool(path.is_some())?;
        match path {
            Some(p) => self.put_path(p),
            None => Ok(()),
        }
    }

    fn get_opt_path(&mut self) -> SerResult<Option<ObjectPath>> {
        if self.get_bool()? {
            self.get_path().map(Some)
        } else {
            Ok(None)
        }
    }

    // ========================================================================
    // Qualifiers
    // ========================================================================

    pub fn put_qualifier(&mut self, qualifier: &Qualifier) -> SerResult<()> {
        self.put_magic(MAGIC_QUALIFIER)?;
        self.put_str(qualifier.name().as_str())?;
        self.put_value(qualifier.value())?;
        self.put_u32(qualifier.flavor().bits())?;
        self.put_bool(qualifier.propagated())
    }

    pub fn get_qualifier(&mut self) -> SerResult<Qualifier> {
        self.get_magic(MAGIC_QUALIFIER)?;
        let name = self.get_string()?;
        let value = self.get_value()?;
        let flavor = Flavor::from_bits(self.get_u32()?);
        let propagated = self.get_bool()?;
        Ok(Qualifier::new(name, value)
            .with_flavor(flavor)
            .with_propagated(propagated))
    }

    pub fn put_qualifier_list(&mut self, list: &QualifierList) -> SerResult<()> {
        self.put_count(list.len())?;
        list.iter().try_for_each(|q| self.put_qualifier(q))
    }

    pub fn get_qualifier_list(&mut self) -> SerResult<QualifierList> {
        let count = self.get_count(4 * SLOT_SIZE)?;
        let mut list = QualifierList::new();
        for _ in 0..count {
            list.add(self.get_qualifier()?)?;
        }
        Ok(list)
    }

    // ========================================================================
    // Properties, parameters, methods
    // ========================================================================

    pub fn put_property(&mut self, property: &Property) -> SerResult<()> {
        self.put_magic(MAGIC_PROPERTY)?;
        self.put_str(property.name().as_str())?;
        self.put_value(property.value())?;
        self.put_u32(property.array_size())?;
        self.put_opt_str(property.reference_class().map(CimName::as_str))?;
        self.put_opt_str(property.class_origin().map(CimName::as_str))?;
        self.put_bool(property.propagated())?;
        self.put_qualifier_list(property.qualifiers())
    }

    pub fn get_property(&mut self) -> SerResult<Property> {
        self.get_magic(MAGIC_PROPERTY)?;
        let name = self.get_string()?;
        let value = self.get_value()?;
        let array_size = self.get_u32()?;
        let reference_class = self.get_opt_string()?;
        let class_origin = self.get_opt_string()?;
        let propagated = self.get_bool()?;
        let qualifiers = self.get_qualifier_list()?;
        let mut property = Property::new(name, value)
            .with_array_size(array_size)
            .with_propagated(propagated)
            .with_qualifiers(qualifiers);
        if let Some(class) = reference_class {
            property = property.with_reference_class(class);
        }
        if let Some(origin) = class_origin {
            property = property.with_class_origin(origin);
        }
        Ok(property)
    }

    pub fn put_parameter(&mut self, parameter: &Parameter) -> SerResult<()> {
        self.put_magic(MAGIC_PARAMETER)?;
        self.put_str(parameter.name().as_str())?;
        self.put_u32(parameter.cim_type().code())?;
        self.put_bool(parameter.is_array())?;
        self.put_u32(parameter.array_size())?;
        self.put_opt_str(parameter.reference_class().map(CimName::as_str))?;
        self.put_qualifier_list(parameter.qualifiers())
    }

    pub fn get_parameter(&mut self) -> SerResult<Parameter> {
        self.get_magic(MAGIC_PARAMETER)?;
        let name = self.get_string()?;
        let ty = get_type(self)?;
        let is_array = self.get_bool()?;
        let array_size = self.get_u32()?;
        let reference_class = self.get_opt_string()?;
        let qualifiers = self.get_qualifier_list()?;
        let mut parameter = Parameter::new(name, ty).with_qualifiers(qualifiers);
        if is_array {
            parameter = parameter.array(array_size);
        }
        if let Some(class) = reference_class {
            parameter = parameter.with_reference_class(class);
        }
        Ok(parameter)
    }

    pub fn put_method(&mut self, method: &Method) -> SerResult<()> {
        self.put_magic(MAGIC_METHOD)?;
        self.put_str(method.name().as_str())?;
        self.put_u32(method.return_type().code())?;
        self.put_opt_str(method.class_origin().map(CimName::as_str))?;
        self.put_bool(method.propagated())?;
        self.put_qualifier_list(method.qualifiers())?;
        self.put_count(method.parameters().len())?;
        method
            .parameters()
            .iter()
            .try_for_each(|p| self.put_parameter(p))
    }

    pub fn get_method(&mut self) -> SerResult<Method> {
        self.get_magic(MAGIC_METHOD)?;
        let name = self.get_string()?;
        let return_type = get_type(self)?;
        let class_origin = self.get_opt_string()?;
        let propagated = self.get_bool()?;
        let qualifiers = self.get_qualifier_list()?;
        let mut method = Method::new(name, return_type)
            .with_propagated(propagated)
            .with_qualifiers(qualifiers);
        if let Some(origin) = class_origin {
            method = method.with_class_origin(origin);
        }
        let count = self.get_count(6 * SLOT_SIZE)?;
        for _ in 0..count {
            method.add_parameter(self.get_parameter()?)?;
        }
        Ok(method)
    }

    // ========================================================================
    // Instances, classes, objects
    // ========================================================================

    pub fn put_instance(&mut self, instance: &CimInstance) -> SerResult<()> {
        self.put_magic(MAGIC_INSTANCE)?;
        self.put_str(instance.class_name().as_str())?;
        self.put_opt_path(instance.path())?;
        self.put_qualifier_list(instance.qualifiers())?;
        self.put_count(instance.properties().len())?;
        instance
            .properties()
            .iter()
            .try_for_each(|p| self.put_property(p))
    }

    pub fn get_instance(&mut self) -> SerResult<CimInstance> {
        self.enter()?;
        let result = self.get_instance_body();
        self.leave();
        result
    }

    fn get_instance_body(&mut self) -> SerResult<CimInstance> {
        self.get_magic(MAGIC_INSTANCE)?;
        let class_name = self.get_string()?;
        let path = self.get_opt_path()?;
        let qualifiers = self.get_qualifier_list()?;
        let mut instance = CimInstance::new(class_name);
        instance.set_path(path);
        instance.set_qualifiers(qualifiers);
        let count = self.get_count(8 * SLOT_SIZE)?;
        for _ in 0..count {
            instance.add_property(self.get_property()?)?;
        }
        Ok(instance)
    }

    pub fn put_instances(&mut self, instances: &[CimInstance]) -> SerResult<()> {
        self.put_count(instances.len())?;
        instances.iter().try_for_each(|i| self.put_instance(i))
    }

    pub fn get_instances(&mut self) -> SerResult<Vec<CimInstance>> {
        let count = self.get_count(4 * SLOT_SIZE)?;
        (0..count).map(|_| self.get_instance()).collect()
    }

    pub fn put_class(&mut self, class: &CimClass) -> SerResult<()> {
        self.put_magic(MAGIC_CLASS)?;
        self.put_str(class.class_name().as_str())?;
        self.put_opt_str(class.super_class().map(CimName::as_str))?;
        self.put_qualifier_list(class.qualifiers())?;
        self.put_count(class.properties().len())?;
        for property in class.properties() {
            self.put_property(property)?;
        }
        self.put_count(class.methods().len())?;
        for method in class.methods() {
            self.put_method(method)?;
        }
        self.put_opt_path(class.path())
    }

    pub fn get_class(&mut self) -> SerResult<CimClass> {
        self.enter()?;
        let result = self.get_class_body();
        self.leave();
        result
    }

    fn get_class_body(&mut self) -> SerResult<CimClass> {
        self.get_magic(MAGIC_CLASS)?;
        let mut class = CimClass::new(self.get_string()?);
        class.set_super_class(self.get_opt_string()?.map(CimName::new));
        class.set_qualifiers(self.get_qualifier_list()?);
        let count = self.get_count(8 * SLOT_SIZE)?;
        for _ in 0..count {
            class.add_property(self.get_property()?)?;
        }
        let count = self.get_count(6 * SLOT_SIZE)?;
        for _ in 0..count {
            class.add_method(self.get_method()?)?;
        }
        class.set_path(self.get_opt_path()?);
        Ok(class)
    }

    pub fn put_object(&mut self, object: &CimObject) -> SerResult<()> {
        match object {
            CimObject::Instance(instance) => {
                self.put_bool(true)?;
                self.put_instance(instance)
            }
            CimObject::Class(class) => {
                self.put_bool(false)?;
                self.put_class(class)
            }
        }
    }

    pub fn get_object(&mut self) -> SerResult<CimObject> {
        if self.get_bool()? {
            self.get_instance().map(CimObject::Instance)
        } else {
            self.get_class().map(CimObject::Class)
        }
    }

    pub fn put_objects(&mut self, objects: &[CimObject]) -> SerResult<()> {
        self.put_count(objects.len())?;
        objects.iter().try_for_each(|o| self.put_object(o))
    }

    pub fn get_objects(&mut self) -> SerResult<Vec<CimObject>> {
        let count = self.get_count(5 * SLOT_SIZE)?;
        (0..count).map(|_| self.get_object()).collect()
    }

    pub fn put_property_list(&mut self, list: &PropertyList) -> SerResult<()> {
        self.put_bool(list.is_all())?;
        let names = list.names().unwrap_or(&[]);
        self.put_count(names.len())?;
        names.iter().try_for_each(|n| self.put_str(n.as_str()))
    }

    pub fn get_property_list(&mut self) -> SerResult<PropertyList> {
        let is_all = self.get_bool()?;
        let count = self.get_count(SLOT_SIZE)?;
        let mut names = Vec::with_capacity(count);
        for _ in 0..count {
            names.push(self.get_string()?);
        }
        if is_all {
            if !names.is_empty() {
                return Err(invalid("null property list with names"));
            }
            Ok(PropertyList::all())
        } else {
            Ok(PropertyList::of(names))
        }
    }
}
