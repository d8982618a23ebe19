// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Append-only byte arena with typed handles, and the value slots stored
//! in it.
//!
//! Scalars live inline in a [`Slot`]; strings and array payloads live in the
//! arena and are addressed by [`StrRef`] and [`Span`] handles. References and
//! embedded objects go to a side table indexed from the slot.

use super::ScmoError;
use crate::cim::{CimDateTime, CimType, CimValue, DateTimeSign, Scalar};

/// Byte range inside an [`Arena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    start: usize,
    len: usize,
}

impl Span {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// UTF-8 string inside an [`Arena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StrRef(Span);

#[derive(Debug, Clone, Default)]
pub struct Arena {
    bytes: Vec<u8>,
}

impl Arena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
        }
    }

    /// Bytes used so far.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Append `data` at the next 8-byte boundary.
    pub fn alloc_bytes(&mut self, data: &[u8]) -> Span {
        let start = (self.bytes.len() + 7) & !7;
        self.bytes.resize(start, 0);
        self.bytes.extend_from_slice(data);
        Span {
            start,
            len: data.len(),
        }
    }

    pub fn alloc_str(&mut self, s: &str) -> StrRef {
        if s.is_empty() {
            return StrRef::default();
        }
        let start = self.bytes.len();
        self.bytes.extend_from_slice(s.as_bytes());
        StrRef(Span {
            start,
            len: s.len(),
        })
    }

    pub fn bytes(&self, span: Span) -> &[u8] {
        self.bytes
            .get(span.start..span.start + span.len)
            .unwrap_or(&[])
    }

    pub fn str(&self, r: StrRef) -> &str {
        std::str::from_utf8(self.bytes(r.0)).unwrap_or_default()
    }
}

/// An inline scalar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Cell {
    /// Booleans, integers, reals (bit pattern) and char16.
    Bits(u64),
    Str(StrRef),
    DateTime(CimDateTime),
    /// Index into the side table.
    Embedded(usize),
}

/// Storage state of one property or key binding.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub(crate) enum Slot {
    #[default]
    Unset,
    Null,
    Value(Cell),
    Array { span: Span, len: usize },
}

impl Slot {
    pub(crate) fn is_set(&self) -> bool {
        !matches!(self, Slot::Unset)
    }
}

const DATETIME_STRIDE: usize = 16;
const STRIDE: usize = 8;

fn scalar_bits(scalar: &Scalar) -> Option<u64> {
    let bits = match scalar {
        Scalar::Boolean(v) => u64::from(*v),
        Scalar::Uint8(v) => u64::from(*v),
        Scalar::Sint8(v) => i64::from(*v) as u64,
        Scalar::Uint16(v) => u64::from(*v),
        Scalar::Sint16(v) => i64::from(*v) as u64,
        Scalar::Uint32(v) => u64::from(*v),
        Scalar::Sint32(v) => i64::from(*v) as u64,
        Scalar::Uint64(v) => *v,
        Scalar::Sint64(v) => *v as u64,
        Scalar::Real32(v) => u64::from(v.to_bits()),
        Scalar::Real64(v) => v.to_bits(),
        Scalar::Char16(v) => u64::from(*v),
        _ => return None,
    };
    Some(bits)
}

fn bits_scalar(ty: CimType, bits: u64) -> Option<Scalar> {
    let scalar = match ty {
        CimType::Boolean => Scalar::Boolean(bits != 0),
        CimType::Uint8 => Scalar::Uint8(bits as u8),
        CimType::Sint8 => Scalar::Sint8(bits as i8),
        CimType::Uint16 => Scalar::Uint16(bits as u16),
        CimType::Sint16 => Scalar::Sint16(bits as i16),
        CimType::Uint32 => Scalar::Uint32(bits as u32),
        CimType::Sint32 => Scalar::Sint32(bits as i32),
        CimType::Uint64 => Scalar::Uint64(bits),
        CimType::Sint64 => Scalar::Sint64(bits as i64),
        CimType::Real32 => Scalar::Real32(f32::from_bits(bits as u32)),
        CimType::Real64 => Scalar::Real64(f64::from_bits(bits)),
        CimType::Char16 => Scalar::Char16(bits as u16),
        _ => return None,
    };
    Some(scalar)
}

/// String array element: start and length as two 32-bit words.
fn string_word(span: Span) -> Result<[u8; 8], ScmoError> {
    let start = u32::try_from(span.start).map_err(|_| ScmoError::TooLarge)?;
    let len = u32::try_from(span.len).map_err(|_| ScmoError::TooLarge)?;
    let mut word = [0u8; 8];
    word[..4].copy_from_slice(&start.to_ne_bytes());
    word[4..].copy_from_slice(&len.to_ne_bytes());
    Ok(word)
}

fn read_u64(bytes: &[u8], at: usize) -> u64 {
    let mut raw = [0u8; 8];
    if let Some(src) = bytes.get(at..at + 8) {
        raw.copy_from_slice(src);
    }
    u64::from_ne_bytes(raw)
}

/// Arena plus side table: the value storage of a compact class or object.
#[derive(Debug, Clone, Default)]
pub(crate) struct ValueStore {
    pub(crate) arena: Arena,
    embedded: Vec<Scalar>,
}

impl ValueStore {
    pub(crate) fn alloc_str(&mut self, s: &str) -> StrRef {
        self.arena.alloc_str(s)
    }

    pub(crate) fn str(&self, r: StrRef) -> &str {
        self.arena.str(r)
    }

    fn cell(&mut self, scalar: &Scalar) -> Cell {
        if let Some(bits) = scalar_bits(scalar) {
            return Cell::Bits(bits);
        }
        match scalar {
            Scalar::String(s) => Cell::Str(self.arena.alloc_str(s)),
            Scalar::DateTime(dt) => Cell::DateTime(*dt),
            other => {
                self.embedded.push(other.clone());
                Cell::Embedded(self.embedded.len() - 1)
            }
        }
    }

    /// Store a value; the caller has already checked its type.
    pub(crate) fn store(&mut self, value: &CimValue) -> Result<Slot, ScmoError> {
        if value.is_null() {
            return Ok(Slot::Null);
        }
        let Some(items) = value.as_array() else {
            return Ok(match value.as_scalar() {
                Some(scalar) => Slot::Value(self.cell(scalar)),
                None => Slot::Null,
            });
        };
        let stride = if value.cim_type() == CimType::DateTime {
            DATETIME_STRIDE
        } else {
            STRIDE
        };
        let mut payload = Vec::with_capacity(items.len() * stride);
        for item in items {
            match self.cell(item) {
                Cell::Bits(bits) => payload.extend_from_slice(&bits.to_ne_bytes()),
                Cell::Str(StrRef(span)) => payload.extend_from_slice(&string_word(span)?),
                Cell::DateTime(dt) => {
                    payload.extend_from_slice(&dt.microseconds().to_ne_bytes());
                    payload.extend_from_slice(&dt.utc_offset().to_ne_bytes());
                    payload.extend_from_slice(&dt.sign().code().to_ne_bytes());
                    payload.extend_from_slice(&dt.wildcards().to_ne_bytes());
                }
                Cell::Embedded(idx) => payload.extend_from_slice(&(idx as u64).to_ne_bytes()),
            }
        }
        Ok(Slot::Array {
            span: self.arena.alloc_bytes(&payload),
            len: items.len(),
        })
    }

    fn load_cell(&self, ty: CimType, cell: Cell) -> Option<Scalar> {
        match cell {
            Cell::Bits(bits) => bits_scalar(ty, bits),
            Cell::Str(r) => Some(Scalar::String(self.arena.str(r).to_string())),
            Cell::DateTime(dt) => Some(Scalar::DateTime(dt)),
            Cell::Embedded(idx) => self.embedded.get(idx).cloned(),
        }
    }

    fn load_element(&self, ty: CimType, bytes: &[u8], index: usize) -> Option<Scalar> {
        if ty == CimType::DateTime {
            let at = index * DATETIME_STRIDE;
            let micros = read_u64(bytes, at);
            let tail = read_u64(bytes, at + 8).to_ne_bytes();
            let offset = u32::from_ne_bytes([tail[0], tail[1], tail[2], tail[3]]);
            let sign = DateTimeSign::from_code(u16::from_ne_bytes([tail[4], tail[5]]))?;
            let wildcards = u16::from_ne_bytes([tail[6], tail[7]]);
            let dt = CimDateTime::from_parts(micros, offset, sign, wildcards).ok()?;
            return Some(Scalar::DateTime(dt));
        }
        let raw = read_u64(bytes, index * STRIDE);
        let cell = match ty {
            CimType::String => {
                let word = raw.to_ne_bytes();
                let start = u32::from_ne_bytes([word[0], word[1], word[2], word[3]]) as usize;
                let len = u32::from_ne_bytes([word[4], word[5], word[6], word[7]]) as usize;
                Cell::Str(StrRef(Span { start, len }))
            }
            CimType::Reference | CimType::Object | CimType::Instance => Cell::Embedded(raw as usize),
            _ => Cell::Bits(raw),
        };
        self.load_cell(ty, cell)
    }

    /// Read a slot back as a typed value; `None` when unset.
    pub(crate) fn load(&self, slot: Slot, ty: CimType, is_array: bool) -> Option<CimValue> {
        match slot {
            Slot::Unset => None,
            Slot::Null => Some(CimValue::null(ty, is_array)),
            Slot::Value(cell) => self.load_cell(ty, cell).map(CimValue::scalar),
            Slot::Array { span, len } => {
                let bytes = self.arena.bytes(span);
                let items: Option<Vec<Scalar>> =
                    (0..len).map(|i| self.load_element(ty, bytes, i)).collect();
                CimValue::array(ty, items?).ok()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arena_alignment_and_strings() {
        let mut arena = Arena::new();
        let name = arena.alloc_str("abc");
        let span = arena.alloc_bytes(&[1, 2, 3]);
        assert_eq!(arena.str(name), "abc");
        assert_eq!(arena.bytes(span), &[1, 2, 3]);
        assert_eq!(arena.len(), 8 + 3);
        assert_eq!(arena.str(StrRef::default()), "");
    }

    #[test]
    fn test_store_load_scalars() {
        let mut store = ValueStore::default();
        let values = [
            CimValue::from(-5i8),
            CimValue::from(u64::MAX),
            CimValue::from(2.4271e-4f32),
            CimValue::from("text"),
            CimValue::from(CimDateTime::interval(3, 0, 0, 0, 7).unwrap()),
            CimValue::from("root:A.k=1".parse::<crate::cim::ObjectPath>().unwrap()),
            CimValue::null(CimType::Sint16, false),
        ];
        let slots: Vec<Slot> = values.iter().map(|v| store.store(v).unwrap()).collect();
        for (value, slot) in values.iter().zip(slots) {
            let loaded = store.load(slot, value.cim_type(), value.is_array()).unwrap();
            assert_eq!(&loaded, value);
        }
    }

    #[test]
    fn test_store_load_arrays() {
        let mut store = ValueStore::default();
        let values = [
            CimValue::string_array(["a", "", "ccc"]),
            CimValue::array(CimType::Sint32, vec![Scalar::Sint32(-1), Scalar::Sint32(i32::MAX)])
                .unwrap(),
            CimValue::array(
                CimType::DateTime,
                vec![
                    Scalar::DateTime(CimDateTime::interval(0, 1, 2, 3, 4).unwrap()),
                    Scalar::DateTime(CimDateTime::timestamp(2024, 2, 29, 0, 0, 0, 0, -300).unwrap()),
                ],
            )
            .unwrap(),
            CimValue::array(CimType::Real64, Vec::new()).unwrap(),
        ];
        for value in &values {
            let slot = store.store(value).unwrap();
            assert_eq!(store.load(slot, value.cim_type(), true).as_ref(), Some(value));
        }
        assert_eq!(store.load(Slot::Unset, CimType::String, false), None);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_string_word_rejects_wide_offsets() {
        let word = string_word(Span { start: 16, len: 3 }).unwrap();
        assert_eq!(&word[..4], &16u32.to_ne_bytes());
        assert_eq!(&word[4..], &3u32.to_ne_bytes());

        let past = u32::MAX as usize + 1;
        assert_eq!(string_word(Span { start: past, len: 1 }), Err(ScmoError::TooLarge));
        assert_eq!(string_word(Span { start: 0, len: past }), Err(ScmoError::TooLarge));
    }
}
