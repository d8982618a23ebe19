// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Qualifiers and qualifier lists.

use super::{CimName, CimValue, ModelError};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Qualifier flavor bits.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Flavor(u32);

impl Flavor {
    pub const NONE: Flavor = Flavor(0);
    pub const OVERRIDABLE: Flavor = Flavor(1 << 0);
    pub const TOSUBCLASS: Flavor = Flavor(1 << 1);
    pub const TOINSTANCE: Flavor = Flavor(1 << 2);
    pub const TRANSLATABLE: Flavor = Flavor(1 << 3);
    pub const DISABLEOVERRIDE: Flavor = Flavor(1 << 4);
    pub const RESTRICTED: Flavor = Flavor(1 << 5);

    /// Flavor implied when CIM-XML omits every flavor attribute.
    pub const DEFAULT: Flavor = Flavor(Self::OVERRIDABLE.0 | Self::TOSUBCLASS.0);

    pub const fn from_bits(bits: u32) -> Self {
        Flavor(bits & 0x3F)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Flavor) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn set(&mut self, other: Flavor, on: bool) {
        if on {
            self.0 |= other.0;
        } else {
            self.0 &= !other.0;
        }
    }
}

impl Default for Flavor {
    fn default() -> Self {
        Flavor::DEFAULT
    }
}

impl BitOr for Flavor {
    type Output = Flavor;

    fn bitor(self, rhs: Flavor) -> Flavor {
        Flavor(self.0 | rhs.0)
    }
}

impl BitOrAssign for Flavor {
    fn bitor_assign(&mut self, rhs: Flavor) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(Flavor, &str); 6] = [
            (Flavor::OVERRIDABLE, "OVERRIDABLE"),
            (Flavor::TOSUBCLASS, "TOSUBCLASS"),
            (Flavor::TOINSTANCE, "TOINSTANCE"),
            (Flavor::TRANSLATABLE, "TRANSLATABLE"),
            (Flavor::DISABLEOVERRIDE, "DISABLEOVERRIDE"),
            (Flavor::RESTRICTED, "RESTRICTED"),
        ];
        let set: Vec<&str> = NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "Flavor({})", set.join("|"))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Qualifier {
    name: CimName,
    value: CimValue,
    flavor: Flavor,
    propagated: bool,
}

impl Qualifier {
    pub fn new(name: impl Into<CimName>, value: impl Into<CimValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            flavor: Flavor::DEFAULT,
            propagated: false,
        }
    }

    pub fn with_flavor(mut self, flavor: Flavor) -> Self {
        self.flavor = flavor;
        self
    }

    pub fn with_propagated(mut self, propagated: bool) -> Self {
        self.propagated = propagated;
        self
    }

    pub fn name(&self) -> &CimName {
        &self.name
    }

    pub fn value(&self) -> &CimValue {
        &self.value
    }

    pub fn flavor(&self) -> Flavor {
        self.flavor
    }

    pub fn propagated(&self) -> bool {
        self.propagated
    }
}

/// Ordered qualifiers with unique (case-insensitive) names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QualifierList {
    items: Vec<Qualifier>,
}

impl QualifierList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, qualifier: Qualifier) -> Result<(), ModelError> {
        if self.find(qualifier.name.as_str()).is_some() {
            return Err(ModelError::DuplicateName(qualifier.name.into_string()));
        }
        self.items.push(qualifier);
        Ok(())
    }

    pub fn find(&self, name: &str) -> Option<usize> {
        self.items.iter().position(|q| q.name.matches(name))
    }

    pub fn get(&self, name: &str) -> Option<&Qualifier> {
        self.find(name).map(|idx| &self.items[idx])
    }

    pub fn remove(&mut self, name: &str) -> Option<Qualifier> {
        self.find(name).map(|idx| self.items.remove(idx))
    }

    /// True when a boolean qualifier is present and set (e.g. `Key`).
    pub fn is_true(&self, name: &str) -> bool {
        self.get(name)
            .and_then(|q| q.value.as_bool())
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Qualifier> {
        self.items.iter()
    }
}

impl<'a> IntoIterator for &'a QualifierList {
    type Item = &'a Qualifier;
    type IntoIter = std::slice::Iter<'a, Qualifier>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_rejected_case_insensitive() {
        let mut list = QualifierList::new();
        list.add(Qualifier::new("Key", true)).unwrap();
        let err = list.add(Qualifier::new("KEY", false)).unwrap_err();
        assert_eq!(err, ModelError::DuplicateName("KEY".into()));
        assert_eq!(list.len(), 1);
        assert!(list.is_true("key"));
    }

    #[test]
    fn test_flavor_bits() {
        let mut flavor = Flavor::DEFAULT | Flavor::TRANSLATABLE;
        assert!(flavor.contains(Flavor::OVERRIDABLE));
        assert!(flavor.contains(Flavor::TRANSLATABLE));
        flavor.set(Flavor::OVERRIDABLE, false);
        assert!(!flavor.contains(Flavor::OVERRIDABLE));
        assert_eq!(Flavor::from_bits(0xFF).bits(), 0x3F);
        assert_eq!(format!("{:?}", Flavor::DEFAULT), "Flavor(OVERRIDABLE|TOSUBCLASS)");
    }

    #[test]
    fn test_remove_keeps_order() {
        let mut list = QualifierList::new();
        for name in ["A", "B", "C"] {
            list.add(Qualifier::new(name, name)).unwrap();
        }
        assert!(list.remove("b").is_some());
        let names: Vec<&str> = list.iter().map(|q| q.name().as_str()).collect();
        assert_eq!(names, ["A", "C"]);
    }
}
