// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! CIM intrinsic data types.

use std::fmt;

/// The CIM primitive type set.
///
/// Wire codes follow the declaration order (boolean = 0 .. instance = 16)
/// and are shared by the binary codec and the compact object store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CimType {
    Boolean,
    Uint8,
    Sint8,
    Uint16,
    Sint16,
    Uint32,
    Sint32,
    Uint64,
    Sint64,
    Real32,
    Real64,
    Char16,
    String,
    DateTime,
    Reference,
    Object,
    Instance,
}

const ALL_TYPES: [CimType; 17] = [
    CimType::Boolean,
    CimType::Uint8,
    CimType::Sint8,
    CimType::Uint16,
    CimType::Sint16,
    CimType::Uint32,
    CimType::Sint32,
    CimType::Uint64,
    CimType::Sint64,
    CimType::Real32,
    CimType::Real64,
    CimType::Char16,
    CimType::String,
    CimType::DateTime,
    CimType::Reference,
    CimType::Object,
    CimType::Instance,
];

impl CimType {
    pub const fn code(self) -> u32 {
        match self {
            CimType::Boolean => 0,
            CimType::Uint8 => 1,
            CimType::Sint8 => 2,
            CimType::Uint16 => 3,
            CimType::Sint16 => 4,
            CimType::Uint32 => 5,
            CimType::Sint32 => 6,
            CimType::Uint64 => 7,
            CimType::Sint64 => 8,
            CimType::Real32 => 9,
            CimType::Real64 => 10,
            CimType::Char16 => 11,
            CimType::String => 12,
            CimType::DateTime => 13,
            CimType::Reference => 14,
            CimType::Object => 15,
            CimType::Instance => 16,
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        ALL_TYPES.get(code as usize).copied()
    }

    /// Name used by the CIM-XML `TYPE` attribute.
    pub const fn as_str(self) -> &'static str {
        match self {
            CimType::Boolean => "boolean",
            CimType::Uint8 => "uint8",
            CimType::Sint8 => "sint8",
            CimType::Uint16 => "uint16",
            CimType::Sint16 => "sint16",
            CimType::Uint32 => "uint32",
            CimType::Sint32 => "sint32",
            CimType::Uint64 => "uint64",
            CimType::Sint64 => "sint64",
            CimType::Real32 => "real32",
            CimType::Real64 => "real64",
            CimType::Char16 => "char16",
            CimType::String => "string",
            CimType::DateTime => "datetime",
            CimType::Reference => "reference",
            CimType::Object => "object",
            CimType::Instance => "instance",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        ALL_TYPES
            .iter()
            .copied()
            .find(|ty| ty.as_str().eq_ignore_ascii_case(name))
    }

    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            CimType::Uint8
                | CimType::Sint8
                | CimType::Uint16
                | CimType::Sint16
                | CimType::Uint32
                | CimType::Sint32
                | CimType::Uint64
                | CimType::Sint64
        )
    }

    pub const fn is_real(self) -> bool {
        matches!(self, CimType::Real32 | CimType::Real64)
    }

    pub const fn is_numeric(self) -> bool {
        self.is_integer() || self.is_real()
    }

    /// Embedded objects and instances travel as escaped XML strings.
    pub const fn is_embedded(self) -> bool {
        matches!(self, CimType::Object | CimType::Instance)
    }
}

impl fmt::Display for CimType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_dense() {
        for (idx, ty) in ALL_TYPES.iter().enumerate() {
            assert_eq!(ty.code() as usize, idx);
            assert_eq!(CimType::from_code(ty.code()), Some(*ty));
        }
        assert_eq!(CimType::from_code(17), None);
    }

    #[test]
    fn test_names_roundtrip() {
        for ty in ALL_TYPES {
            assert_eq!(CimType::from_name(ty.as_str()), Some(ty));
        }
        assert_eq!(CimType::from_name("UINT32"), Some(CimType::Uint32));
        assert_eq!(CimType::from_name("float"), None);
    }

    #[test]
    fn test_classification() {
        assert!(CimType::Sint64.is_integer());
        assert!(CimType::Real32.is_numeric());
        assert!(!CimType::Char16.is_numeric());
        assert!(CimType::Instance.is_embedded());
        assert!(!CimType::Reference.is_embedded());
    }
}
