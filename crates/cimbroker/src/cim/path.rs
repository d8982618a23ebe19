// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Object paths and key bindings.
//!
//! Textual form:
//!
//! ```text
//! //host/root/cimv2:CIM_Person.Id="Mike",Count=100
//! ```
//!
//! Host, namespace, class name and key names compare case-insensitively.
//! Key values compare according to their kind: numeric keys numerically,
//! boolean keys case-insensitively, reference keys as paths and string keys
//! exactly.

use super::name::{fold_name, names_equal};
use super::{CimName, CimType, CimValue, ModelError, Scalar};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Type tag of a key binding value (the `VALUETYPE` of CIM-XML `KEYVALUE`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum KeyKind {
    #[default]
    String,
    Boolean,
    Numeric,
    Reference,
}

impl KeyKind {
    pub const fn code(self) -> u32 {
        match self {
            KeyKind::String => 0,
            KeyKind::Boolean => 1,
            KeyKind::Numeric => 2,
            KeyKind::Reference => 3,
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(KeyKind::String),
            1 => Some(KeyKind::Boolean),
            2 => Some(KeyKind::Numeric),
            3 => Some(KeyKind::Reference),
            _ => None,
        }
    }

    /// Kind used for a key property of type `ty`.
    pub fn for_type(ty: CimType) -> Self {
        match ty {
            CimType::Boolean => KeyKind::Boolean,
            CimType::Reference => KeyKind::Reference,
            t if t.is_numeric() => KeyKind::Numeric,
            _ => KeyKind::String,
        }
    }

    /// `VALUETYPE` attribute; references are emitted as `VALUE.REFERENCE`.
    pub const fn value_type(self) -> &'static str {
        match self {
            KeyKind::String | KeyKind::Reference => "string",
            KeyKind::Boolean => "boolean",
            KeyKind::Numeric => "numeric",
        }
    }

    pub fn from_value_type(s: &str) -> Option<Self> {
        match s {
            "string" => Some(KeyKind::String),
            "boolean" => Some(KeyKind::Boolean),
            "numeric" => Some(KeyKind::Numeric),
            _ => None,
        }
    }
}

/// One `name = value` pair of an object path.
///
/// The value is held in its textual form; reference values hold the textual
/// form of the referenced path.
#[derive(Debug, Clone)]
pub struct KeyBinding {
    name: CimName,
    value: String,
    kind: KeyKind,
}

impl KeyBinding {
    pub fn new(name: impl Into<CimName>, value: impl Into<String>, kind: KeyKind) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            kind,
        }
    }

    pub fn string(name: impl Into<CimName>, value: impl Into<String>) -> Self {
        Self::new(name, value, KeyKind::String)
    }

    pub fn reference(name: impl Into<CimName>, path: &ObjectPath) -> Self {
        Self::new(name, path.to_string(), KeyKind::Reference)
    }

    /// Key binding for a typed value. Null, array and embedded values cannot
    /// be keys and yield `None`.
    pub fn from_value(name: impl Into<CimName>, value: &CimValue) -> Option<Self> {
        let scalar = value.as_scalar()?;
        let text = scalar.to_text()?;
        Some(Self::new(name, text, KeyKind::for_type(scalar.cim_type())))
    }

    pub fn name(&self) -> &CimName {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn kind(&self) -> KeyKind {
        self.kind
    }

    /// Typed value for a key property declared as `ty`.
    pub fn to_value(&self, ty: CimType) -> Result<CimValue, ModelError> {
        Scalar::parse(ty, &self.value).map(CimValue::scalar)
    }

    /// Exact comparison: names, kinds and value text must match byte for byte.
    pub fn identical(&self, other: &KeyBinding) -> bool {
        self.name.as_str() == other.name.as_str()
            && self.kind == other.kind
            && self.value == other.value
    }

    fn value_eq(&self, other: &KeyBinding) -> bool {
        if self.kind != other.kind {
            return false;
        }
        match self.kind {
            KeyKind::String => self.value == other.value,
            KeyKind::Boolean => self.value.eq_ignore_ascii_case(&other.value),
            KeyKind::Numeric => match (numeric_key(&self.value), numeric_key(&other.value)) {
                (Some(a), Some(b)) => a == b,
                _ => self.value == other.value,
            },
            KeyKind::Reference => {
                match (
                    self.value.parse::<ObjectPath>(),
                    other.value.parse::<ObjectPath>(),
                ) {
                    (Ok(a), Ok(b)) => a == b,
                    _ => self.value == other.value,
                }
            }
        }
    }

    fn hash_value<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        match self.kind {
            KeyKind::String => self.value.hash(state),
            KeyKind::Boolean => self.value.to_ascii_lowercase().hash(state),
            KeyKind::Numeric => match numeric_key(&self.value) {
                Some(n) => n.hash(state),
                None => self.value.hash(state),
            },
            KeyKind::Reference => match self.value.parse::<ObjectPath>() {
                Ok(path) => path.hash(state),
                Err(_) => self.value.hash(state),
            },
        }
    }
}

impl PartialEq for KeyBinding {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.value_eq(other)
    }
}

impl Eq for KeyBinding {}

impl Hash for KeyBinding {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.hash_value(state);
    }
}

/// Normalised numeric key for comparison and hashing.
#[derive(PartialEq, Eq, Hash)]
enum NumericKey {
    Int(i128),
    Real(u64),
}

fn numeric_key(text: &str) -> Option<NumericKey> {
    let text = text.trim();
    let digits = text.strip_prefix('+').unwrap_or(text);
    if let Ok(n) = digits.parse::<i128>() {
        return Some(NumericKey::Int(n));
    }
    let real: f64 = digits.parse().ok()?;
    if real.fract() == 0.0 && real.abs() < 1e30 {
        return Some(NumericKey::Int(real as i128));
    }
    // -0.0 and 0.0 are caught above
    Some(NumericKey::Real(real.to_bits()))
}

/// Identity of a CIM class or instance.
#[derive(Debug, Clone, Default)]
pub struct ObjectPath {
    host: Option<String>,
    namespace: Option<CimName>,
    class_name: CimName,
    key_bindings: Vec<KeyBinding>,
}

impl ObjectPath {
    pub fn new(class_name: impl Into<CimName>) -> Self {
        Self {
            class_name: class_name.into(),
            ..Self::default()
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<CimName>) -> Self {
        self.set_namespace(Some(namespace.into()));
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.set_host(Some(host.into()));
        self
    }

    pub fn with_key(mut self, binding: KeyBinding) -> Self {
        self.add_key_binding(binding);
        self
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn namespace(&self) -> Option<&CimName> {
        self.namespace.as_ref()
    }

    pub fn class_name(&self) -> &CimName {
        &self.class_name
    }

    pub fn key_bindings(&self) -> &[KeyBinding] {
        &self.key_bindings
    }

    /// Empty strings are stored as absent.
    pub fn set_host(&mut self, host: Option<String>) {
        self.host = host.filter(|h| !h.is_empty());
    }

    pub fn set_namespace(&mut self, namespace: Option<CimName>) {
        self.namespace = namespace.filter(|ns| !ns.is_empty());
    }

    pub fn set_class_name(&mut self, class_name: impl Into<CimName>) {
        self.class_name = class_name.into();
    }

    /// Replace all key bindings; they are kept sorted by name.
    pub fn set_key_bindings(&mut self, mut bindings: Vec<KeyBinding>) {
        bindings.sort_by(|a, b| a.name.cmp(&b.name));
        bindings.dedup_by(|a, b| a.name == b.name);
        self.key_bindings = bindings;
    }

    /// Insert or replace the binding with the same name.
    pub fn add_key_binding(&mut self, binding: KeyBinding) {
        match self
            .key_bindings
            .binary_search_by(|kb| kb.name.cmp(&binding.name))
        {
            Ok(idx) => self.key_bindings[idx] = binding,
            Err(idx) => self.key_bindings.insert(idx, binding),
        }
    }

    pub fn key_binding(&self, name: &str) -> Option<&KeyBinding> {
        self.key_bindings.iter().find(|kb| kb.name.matches(name))
    }

    pub fn clear_key_bindings(&mut self) {
        self.key_bindings.clear();
    }

    /// Fill in host and namespace only where absent.
    pub fn complete(&mut self, host: Option<&str>, namespace: Option<&CimName>) {
        if self.host.is_none() {
            self.set_host(host.map(str::to_string));
        }
        if self.namespace.is_none() {
            self.set_namespace(namespace.cloned());
        }
    }

    /// Byte-for-byte comparison, including case.
    pub fn identical(&self, other: &ObjectPath) -> bool {
        self.host == other.host
            && self.namespace.as_ref().map(CimName::as_str)
                == other.namespace.as_ref().map(CimName::as_str)
            && self.class_name.as_str() == other.class_name.as_str()
            && self.key_bindings.len() == other.key_bindings.len()
            && self
                .key_bindings
                .iter()
                .zip(&other.key_bindings)
                .all(|(a, b)| a.identical(b))
    }
}

impl PartialEq for ObjectPath {
    fn eq(&self, other: &Self) -> bool {
        let host_eq = match (&self.host, &other.host) {
            (Some(a), Some(b)) => names_equal(a, b),
            (None, None) => true,
            _ => false,
        };
        host_eq
            && self.namespace == other.namespace
            && self.class_name == other.class_name
            && self.key_bindings == other.key_bindings
    }
}

impl Eq for ObjectPath {}

impl Hash for ObjectPath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.host.as_deref().map(fold_name).hash(state);
        self.namespace.hash(state);
        self.class_name.hash(state);
        self.key_bindings.hash(state);
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, value: &str) -> fmt::Result {
    f.write_str("\"")?;
    for c in value.chars() {
        if c == '"' || c == '\\' {
            f.write_str("\\")?;
        }
        write!(f, "{}", c)?;
    }
    f.write_str("\"")
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(host) = &self.host {
            write!(f, "//{}/", host)?;
        }
        if let Some(ns) = &self.namespace {
            write!(f, "{}:", ns)?;
        }
        write!(f, "{}", self.class_name)?;
        for (i, kb) in self.key_bindings.iter().enumerate() {
            f.write_str(if i == 0 { "." } else { "," })?;
            write!(f, "{}=", kb.name)?;
            match kb.kind {
                KeyKind::String | KeyKind::Reference => write_quoted(f, &kb.value)?,
                KeyKind::Boolean | KeyKind::Numeric => f.write_str(&kb.value)?,
            }
        }
        Ok(())
    }
}

impl FromStr for ObjectPath {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ModelError::InvalidObjectPath(format!("{}: {}", reason, s));

        let mut rest = s.trim();
        let mut host = None;
        if let Some(after) = rest.strip_prefix("//") {
            let slash = after.find('/').ok_or_else(|| invalid("host without namespace"))?;
            host = Some(after[..slash].to_string());
            rest = &after[slash + 1..];
        }

        let head_end = rest.find('.').unwrap_or(rest.len());
        let (namespace, class_start) = match rest[..head_end].find(':') {
            Some(colon) => (Some(CimName::new(&rest[..colon])), colon + 1),
            None => (None, 0),
        };
        let class_name = &rest[class_start..head_end];
        if class_name.is_empty() || class_name.contains(['=', '"', ',']) {
            return Err(invalid("missing class name"));
        }

        let mut path = ObjectPath::new(class_name);
        path.set_host(host);
        path.set_namespace(namespace);

        let mut keys = rest.get(head_end + 1..).unwrap_or("");
        if head_end < rest.len() && keys.is_empty() {
            return Err(invalid("empty key list"));
        }
        while !keys.is_empty() {
            let eq = keys.find('=').ok_or_else(|| invalid("key without value"))?;
            let name = keys[..eq].trim();
            if name.is_empty() {
                return Err(invalid("empty key name"));
            }
            let value_text = &keys[eq + 1..];
            let (binding, consumed) = if let Some(quoted) = value_text.strip_prefix('"') {
                let (value, len) = unquote(quoted).ok_or_else(|| invalid("unterminated string"))?;
                let kind = if looks_like_reference(&value) {
                    KeyKind::Reference
                } else {
                    KeyKind::String
                };
                (KeyBinding::new(name, value, kind), len + 1)
            } else {
                let end = value_text.find(',').unwrap_or(value_text.len());
                let raw = value_text[..end].trim();
                let kind = if raw.eq_ignore_ascii_case("true") || raw.eq_ignore_ascii_case("false") {
                    KeyKind::Boolean
                } else if numeric_key(raw).is_some() {
                    KeyKind::Numeric
                } else {
                    return Err(invalid("unquoted non-numeric key value"));
                };
                (KeyBinding::new(name, raw, kind), end)
            };
            path.add_key_binding(binding);
            keys = &value_text[consumed..];
            if let Some(next) = keys.strip_prefix(',') {
                if next.is_empty() {
                    return Err(invalid("trailing comma"));
                }
                keys = next;
            } else if !keys.is_empty() {
                return Err(invalid("junk after key value"));
            }
        }
        Ok(path)
    }
}

/// Unescape a quoted value; returns the value and the bytes consumed
/// including the closing quote.
fn unquote(s: &str) -> Option<(String, usize)> {
    let mut out = String::new();
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        if escaped {
            out.push(c);
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == '"' {
            return Some((out, i + 1));
        } else {
            out.push(c);
        }
    }
    None
}

fn looks_like_reference(value: &str) -> bool {
    value.contains('=')
        && value
            .parse::<ObjectPath>()
            .map(|p| !p.key_bindings.is_empty())
            .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn person() -> ObjectPath {
        ObjectPath::new("CIM_Person")
            .with_namespace("root/cimv2")
            .with_key(KeyBinding::string("Id", "Mike"))
            .with_key(KeyBinding::new("Count", "100", KeyKind::Numeric))
    }

    #[test]
    fn test_display_sorted_keys() {
        assert_eq!(
            person().to_string(),
            "root/cimv2:CIM_Person.Count=100,Id=\"Mike\""
        );
        let hosted = person().with_host("srv");
        assert_eq!(
            hosted.to_string(),
            "//srv/root/cimv2:CIM_Person.Count=100,Id=\"Mike\""
        );
    }

    #[test]
    fn test_parse_round_trip() {
        let text = "//srv/root/cimv2:CIM_Person.Count=100,Id=\"Mi\\\"ke\",On=TRUE";
        let path: ObjectPath = text.parse().unwrap();
        assert_eq!(path.host(), Some("srv"));
        assert_eq!(path.namespace().map(CimName::as_str), Some("root/cimv2"));
        assert_eq!(path.key_binding("id").unwrap().value(), "Mi\"ke");
        assert_eq!(path.key_binding("ON").unwrap().kind(), KeyKind::Boolean);
        assert_eq!(path.to_string(), text);
    }

    #[test]
    fn test_parse_class_path() {
        let path: ObjectPath = "CIM_Person".parse().unwrap();
        assert!(path.key_bindings().is_empty());
        assert!(path.namespace().is_none());
        assert!("".parse::<ObjectPath>().is_err());
        assert!("A.k=".parse::<ObjectPath>().is_err());
        assert!("A.k=abc".parse::<ObjectPath>().is_err());
        assert!("A.k=\"x".parse::<ObjectPath>().is_err());
        assert!("A.k=1,".parse::<ObjectPath>().is_err());
    }

    #[test]
    fn test_reference_key() {
        let target = person();
        let assoc = ObjectPath::new("CIM_Assoc").with_key(KeyBinding::reference("Left", &target));
        let parsed: ObjectPath = assoc.to_string().parse().unwrap();
        let left = parsed.key_binding("Left").unwrap();
        assert_eq!(left.kind(), KeyKind::Reference);
        assert_eq!(left.value().parse::<ObjectPath>().unwrap(), target);
        assert_eq!(parsed, assoc);
    }

    #[test]
    fn test_equality_rules() {
        let a = person();
        let b: ObjectPath = "ROOT/CIMV2:cim_person.id=\"Mike\",count=+100".parse().unwrap();
        assert_eq!(a, b);
        assert!(!a.identical(&b));

        let c: ObjectPath = "root/cimv2:CIM_Person.Id=\"mike\",Count=100".parse().unwrap();
        assert_ne!(a, c);

        let mut set = HashSet::new();
        set.insert(a.clone());
        assert!(set.contains(&b));
        assert!(!set.contains(&c));
    }

    #[test]
    fn test_boolean_and_real_keys() {
        let a: ObjectPath = "X.f=TRUE,r=1.5".parse().unwrap();
        let b: ObjectPath = "x.F=true,R=1.50".parse().unwrap();
        assert_eq!(a, b);
        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn test_complete_keeps_existing() {
        let mut path = person().with_host("mine");
        path.complete(Some("other"), Some(&CimName::new("root/other")));
        assert_eq!(path.host(), Some("mine"));
        assert_eq!(path.namespace().unwrap().as_str(), "root/cimv2");

        let mut bare = ObjectPath::new("A");
        bare.complete(Some("srv"), Some(&CimName::new("root")));
        assert_eq!(bare.to_string(), "//srv/root:A");
    }

    #[test]
    fn test_add_key_binding_replaces() {
        let mut path = person();
        path.add_key_binding(KeyBinding::string("ID", "Bob"));
        assert_eq!(path.key_bindings().len(), 2);
        assert_eq!(path.key_binding("Id").unwrap().value(), "Bob");
    }

    #[test]
    fn test_key_binding_from_value() {
        let kb = KeyBinding::from_value("n", &CimValue::from(42u16)).unwrap();
        assert_eq!(kb.kind(), KeyKind::Numeric);
        assert_eq!(kb.to_value(CimType::Uint16).unwrap(), CimValue::from(42u16));
        assert!(KeyBinding::from_value("n", &CimValue::null(CimType::Uint16, false)).is_none());
    }
}
