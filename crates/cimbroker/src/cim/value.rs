// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Typed CIM values.

use super::{CimDateTime, CimInstance, CimObject, CimType, ModelError, ObjectPath};

/// One non-null element of a CIM value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Boolean(bool),
    Uint8(u8),
    Sint8(i8),
    Uint16(u16),
    Sint16(i16),
    Uint32(u32),
    Sint32(i32),
    Uint64(u64),
    Sint64(i64),
    Real32(f32),
    Real64(f64),
    /// A UTF-16 code unit.
    Char16(u16),
    String(String),
    DateTime(CimDateTime),
    Reference(ObjectPath),
    Object(Box<CimObject>),
    Instance(Box<CimInstance>),
}

impl Scalar {
    pub fn cim_type(&self) -> CimType {
        match self {
            Scalar::Boolean(_) => CimType::Boolean,
            Scalar::Uint8(_) => CimType::Uint8,
            Scalar::Sint8(_) => CimType::Sint8,
            Scalar::Uint16(_) => CimType::Uint16,
            Scalar::Sint16(_) => CimType::Sint16,
            Scalar::Uint32(_) => CimType::Uint32,
            Scalar::Sint32(_) => CimType::Sint32,
            Scalar::Uint64(_) => CimType::Uint64,
            Scalar::Sint64(_) => CimType::Sint64,
            Scalar::Real32(_) => CimType::Real32,
            Scalar::Real64(_) => CimType::Real64,
            Scalar::Char16(_) => CimType::Char16,
            Scalar::String(_) => CimType::String,
            Scalar::DateTime(_) => CimType::DateTime,
            Scalar::Reference(_) => CimType::Reference,
            Scalar::Object(_) => CimType::Object,
            Scalar::Instance(_) => CimType::Instance,
        }
    }

    /// Integer view used by filters and key derivation.
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            Scalar::Uint8(v) => Some(i128::from(*v)),
            Scalar::Sint8(v) => Some(i128::from(*v)),
            Scalar::Uint16(v) => Some(i128::from(*v)),
            Scalar::Sint16(v) => Some(i128::from(*v)),
            Scalar::Uint32(v) => Some(i128::from(*v)),
            Scalar::Sint32(v) => Some(i128::from(*v)),
            Scalar::Uint64(v) => Some(i128::from(*v)),
            Scalar::Sint64(v) => Some(i128::from(*v)),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Real32(v) => Some(f64::from(*v)),
            Scalar::Real64(v) => Some(*v),
            other => other.as_i128().map(|v| v as f64),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::String(s) => Some(s),
            _ => None,
        }
    }

    /// Textual form used by key bindings and CIM-XML `VALUE` bodies.
    ///
    /// Reals print the shortest round-trippable form; NaN and infinities
    /// print as `NaN`, `INF` and `-INF`. Embedded objects have no plain text
    /// form and return `None`.
    pub fn to_text(&self) -> Option<String> {
        let text = match self {
            Scalar::Boolean(true) => "TRUE".to_string(),
            Scalar::Boolean(false) => "FALSE".to_string(),
            Scalar::Uint8(v) => v.to_string(),
            Scalar::Sint8(v) => v.to_string(),
            Scalar::Uint16(v) => v.to_string(),
            Scalar::Sint16(v) => v.to_string(),
            Scalar::Uint32(v) => v.to_string(),
            Scalar::Sint32(v) => v.to_string(),
            Scalar::Uint64(v) => v.to_string(),
            Scalar::Sint64(v) => v.to_string(),
            Scalar::Real32(v) => format_real(f64::from(*v), v.to_string()),
            Scalar::Real64(v) => format_real(*v, v.to_string()),
            Scalar::Char16(unit) => char::decode_utf16(std::iter::once(*unit))
                .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
                .collect(),
            Scalar::String(s) => s.clone(),
            Scalar::DateTime(dt) => dt.to_string(),
            Scalar::Reference(path) => path.to_string(),
            Scalar::Object(_) | Scalar::Instance(_) => return None,
        };
        Some(text)
    }

    /// Parse the textual form of a value of type `ty`.
    ///
    /// Embedded objects are not parsed here; the XML reader handles them.
    pub fn parse(ty: CimType, text: &str) -> Result<Scalar, ModelError> {
        let invalid = || ModelError::InvalidValue {
            ty,
            text: text.to_string(),
        };
        let trimmed = text.trim();
        let scalar = match ty {
            CimType::Boolean => {
                if trimmed.eq_ignore_ascii_case("true") {
                    Scalar::Boolean(true)
                } else if trimmed.eq_ignore_ascii_case("false") {
                    Scalar::Boolean(false)
                } else {
                    return Err(invalid());
                }
            }
            CimType::Uint8 => Scalar::Uint8(parse_int(trimmed).ok_or_else(invalid)?),
            CimType::Sint8 => Scalar::Sint8(parse_int(trimmed).ok_or_else(invalid)?),
            CimType::Uint16 => Scalar::Uint16(parse_int(trimmed).ok_or_else(invalid)?),
            CimType::Sint16 => Scalar::Sint16(parse_int(trimmed).ok_or_else(invalid)?),
            CimType::Uint32 => Scalar::Uint32(parse_int(trimmed).ok_or_else(invalid)?),
            CimType::Sint32 => Scalar::Sint32(parse_int(trimmed).ok_or_else(invalid)?),
            CimType::Uint64 => Scalar::Uint64(parse_int(trimmed).ok_or_else(invalid)?),
            CimType::Sint64 => Scalar::Sint64(parse_int(trimmed).ok_or_else(invalid)?),
            CimType::Real32 => Scalar::Real32(parse_real(trimmed).ok_or_else(invalid)? as f32),
            CimType::Real64 => Scalar::Real64(parse_real(trimmed).ok_or_else(invalid)?),
            CimType::Char16 => {
                let mut units = text.encode_utf16();
                match (units.next(), units.next()) {
                    (Some(unit), None) => Scalar::Char16(unit),
                    _ => return Err(invalid()),
                }
            }
            CimType::String => Scalar::String(text.to_string()),
            CimType::DateTime => Scalar::DateTime(trimmed.parse()?),
            CimType::Reference => Scalar::Reference(trimmed.parse()?),
            CimType::Object | CimType::Instance => return Err(invalid()),
        };
        Ok(scalar)
    }
}

fn format_real(value: f64, shortest: String) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "INF".to_string()
    } else if value == f64::NEG_INFINITY {
        "-INF".to_string()
    } else {
        shortest
    }
}

fn parse_real(text: &str) -> Option<f64> {
    match text {
        "NaN" => Some(f64::NAN),
        "INF" => Some(f64::INFINITY),
        "-INF" => Some(f64::NEG_INFINITY),
        _ => text.parse().ok(),
    }
}

/// Decimal, or hexadecimal with a `0x` prefix.
fn parse_int<T: TryFrom<i128>>(text: &str) -> Option<T> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let magnitude = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) => i128::from_str_radix(hex, 16).ok()?,
        None => digits.parse::<i128>().ok()?,
    };
    T::try_from(if negative { -magnitude } else { magnitude }).ok()
}

#[derive(Debug, Clone, PartialEq)]
enum Repr {
    Null { is_array: bool },
    Scalar(Scalar),
    Array(Vec<Scalar>),
}

/// A CIM value: type, arity and payload kept consistent by construction.
///
/// A null value carries its declared type and arity but no payload. Array
/// elements all share the declared type.
#[derive(Debug, Clone, PartialEq)]
pub struct CimValue {
    ty: CimType,
    repr: Repr,
}

impl CimValue {
    pub fn null(ty: CimType, is_array: bool) -> Self {
        Self {
            ty,
            repr: Repr::Null { is_array },
        }
    }

    pub fn scalar(value: Scalar) -> Self {
        Self {
            ty: value.cim_type(),
            repr: Repr::Scalar(value),
        }
    }

    /// Array value; every element must be of type `ty`.
    pub fn array(ty: CimType, items: Vec<Scalar>) -> Result<Self, ModelError> {
        if let Some(bad) = items.iter().find(|item| item.cim_type() != ty) {
            return Err(ModelError::TypeMismatch {
                expected: ty,
                found: bad.cim_type(),
            });
        }
        Ok(Self {
            ty,
            repr: Repr::Array(items),
        })
    }

    pub fn string_array<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ty: CimType::String,
            repr: Repr::Array(items.into_iter().map(|s| Scalar::String(s.into())).collect()),
        }
    }

    pub fn cim_type(&self) -> CimType {
        self.ty
    }

    pub fn is_null(&self) -> bool {
        matches!(self.repr, Repr::Null { .. })
    }

    pub fn is_array(&self) -> bool {
        match &self.repr {
            Repr::Null { is_array } => *is_array,
            Repr::Scalar(_) => false,
            Repr::Array(_) => true,
        }
    }

    /// Element count for arrays, 0 otherwise.
    pub fn array_size(&self) -> usize {
        match &self.repr {
            Repr::Array(items) => items.len(),
            _ => 0,
        }
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match &self.repr {
            Repr::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Scalar]> {
        match &self.repr {
            Repr::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Vec<Scalar>> {
        match &mut self.repr {
            Repr::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_scalar_mut(&mut self) -> Option<&mut Scalar> {
        match &mut self.repr {
            Repr::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn into_scalar(self) -> Option<Scalar> {
        match self.repr {
            Repr::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn into_array(self) -> Option<Vec<Scalar>> {
        match self.repr {
            Repr::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Scalar elements in order: one for a scalar, all for an array, none for null.
    pub fn elements(&self) -> &[Scalar] {
        match &self.repr {
            Repr::Null { .. } => &[],
            Repr::Scalar(s) => std::slice::from_ref(s),
            Repr::Array(items) => items,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_scalar().and_then(Scalar::as_str)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.as_scalar() {
            Some(Scalar::Boolean(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self.as_scalar() {
            Some(Scalar::Uint32(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<&ObjectPath> {
        match self.as_scalar() {
            Some(Scalar::Reference(path)) => Some(path),
            _ => None,
        }
    }
}

impl From<Scalar> for CimValue {
    fn from(value: Scalar) -> Self {
        Self::scalar(value)
    }
}

macro_rules! impl_from_primitive {
    ($($rust:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$rust> for CimValue {
                fn from(value: $rust) -> Self {
                    Self::scalar(Scalar::$variant(value))
                }
            }
        )*
    };
}

impl_from_primitive!(
    bool => Boolean,
    u8 => Uint8,
    i8 => Sint8,
    u16 => Uint16,
    i16 => Sint16,
    u32 => Uint32,
    i32 => Sint32,
    u64 => Uint64,
    i64 => Sint64,
    f32 => Real32,
    f64 => Real64,
    String => String,
    CimDateTime => DateTime,
    ObjectPath => Reference,
);

impl From<&str> for CimValue {
    fn from(value: &str) -> Self {
        Self::scalar(Scalar::String(value.to_string()))
    }
}

impl From<CimInstance> for CimValue {
    fn from(value: CimInstance) -> Self {
        Self::scalar(Scalar::Instance(Box::new(value)))
    }
}
