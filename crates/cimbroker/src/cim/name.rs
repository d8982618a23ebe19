// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Case-insensitive CIM element names.

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A class, property, qualifier, method or key name.
///
/// CIM names compare and hash without regard to case; the original spelling
/// is preserved for output.
#[derive(Clone, Default)]
pub struct CimName(String);

impl CimName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Case-insensitive comparison against a plain string.
    pub fn matches(&self, other: &str) -> bool {
        names_equal(&self.0, other)
    }
}

/// Case-insensitive equality used everywhere a CIM name is looked up.
pub fn names_equal(a: &str, b: &str) -> bool {
    if a.len() == b.len() && a.eq_ignore_ascii_case(b) {
        return true;
    }
    if a.is_ascii() && b.is_ascii() {
        return false;
    }
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

/// Folded form of a name, usable as a hash map key.
pub fn fold_name(name: &str) -> String {
    if name.is_ascii() {
        name.to_ascii_lowercase()
    } else {
        name.to_lowercase()
    }
}

fn compare_folded(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}

impl PartialEq for CimName {
    fn eq(&self, other: &Self) -> bool {
        names_equal(&self.0, &other.0)
    }
}

impl Eq for CimName {}

impl PartialEq<str> for CimName {
    fn eq(&self, other: &str) -> bool {
        names_equal(&self.0, other)
    }
}

impl PartialEq<&str> for CimName {
    fn eq(&self, other: &&str) -> bool {
        names_equal(&self.0, other)
    }
}

impl Hash for CimName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for c in self.0.chars().flat_map(char::to_lowercase) {
            c.hash(state);
        }
    }
}

impl PartialOrd for CimName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CimName {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_folded(&self.0, &other.0)
    }
}

impl fmt::Debug for CimName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl fmt::Display for CimName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CimName {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for CimName {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&String> for CimName {
    fn from(value: &String) -> Self {
        Self(value.clone())
    }
}

impl AsRef<str> for CimName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for CimName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(name: &CimName) -> u64 {
        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_names_compare_without_case() {
        let a = CimName::new("CIM_ComputerSystem");
        let b = CimName::new("cim_computersystem");
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
        assert!(a.matches("CIM_COMPUTERSYSTEM"));
        assert_eq!(a.as_str(), "CIM_ComputerSystem");
    }

    #[test]
    fn test_names_order_folded() {
        let mut names = vec![CimName::new("b"), CimName::new("A"), CimName::new("c")];
        names.sort();
        let ordered: Vec<&str> = names.iter().map(CimName::as_str).collect();
        assert_eq!(ordered, vec!["A", "b", "c"]);
    }

    #[test]
    fn test_non_ascii_names() {
        assert!(names_equal("Élan", "élan"));
        assert_eq!(fold_name("Élan"), "élan");
    }
}
