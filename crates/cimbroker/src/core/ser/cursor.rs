// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Growable binary cursor with 8-byte slot alignment.

use super::{SerError, SerResult};
use crate::config::{MAX_DECODE_COUNT, SLOT_SIZE};

/// Round `n` up to the next multiple of the slot size.
#[inline]
pub const fn round_up(n: usize) -> usize {
    (n + (SLOT_SIZE - 1)) & !(SLOT_SIZE - 1)
}

const PADDING: [u8; SLOT_SIZE] = [0u8; SLOT_SIZE];

/// Generate slot put methods for primitive types.
///
/// Each generated method writes the value's native-order bytes at the start
/// of a zero-filled 8-byte slot.
macro_rules! impl_put_slot {
    ($name:ident, $type:ty) => {
        pub fn $name(&mut self, value: $type) -> SerResult<()> {
            let bytes = value.to_ne_bytes();
            let mut slot = PADDING;
            slot[..bytes.len()].copy_from_slice(&bytes);
            self.put_raw(&slot)
        }
    };
}

/// Generate slot get methods for primitive types.
///
/// Each generated method consumes one 8-byte slot, reads the value from its
/// leading bytes and byte-swaps it when the swap flag is set.
macro_rules! impl_get_slot {
    ($name:ident, $type:ty) => {
        pub fn $name(&mut self) -> SerResult<$type> {
            const WIDTH: usize = std::mem::size_of::<$type>();
            let slot = self.take(SLOT_SIZE)?;
            let mut bytes = [0u8; WIDTH];
            bytes.copy_from_slice(&slot[..WIDTH]);
            let value = <$type>::from_ne_bytes(bytes);
            Ok(if self.swap { value.swap_bytes() } else { value })
        }
    };
}

/// Byte buffer with a read position.
///
/// Writers append to the end and always emit native byte order. Readers
/// consume from the position; when the writer's byte order differs (learned
/// out of band), the reader sets [`set_swap`](Self::set_swap) and every
/// multi-byte get is swapped before it is returned.
///
/// Magic validation must be configured identically on both sides.
#[derive(Debug, Default)]
pub struct BinaryCursor {
    buffer: Vec<u8>,
    pos: usize,
    swap: bool,
    magic: bool,
    depth: u16,
}

impl BinaryCursor {
    /// Empty cursor for writing, with magic validation enabled.
    pub fn new() -> Self {
        Self {
            magic: true,
            ..Self::default()
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(round_up(capacity)),
            ..Self::new()
        }
    }

    /// Reopen a cursor over bytes produced by another cursor.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            buffer: bytes,
            ..Self::new()
        }
    }

    pub fn with_magic(mut self, enabled: bool) -> Self {
        self.magic = enabled;
        self
    }

    pub fn set_magic(&mut self, enabled: bool) {
        self.magic = enabled;
    }

    pub fn magic_enabled(&self) -> bool {
        self.magic
    }

    /// Byte-swap every get; set by readers only.
    pub fn set_swap(&mut self, swap: bool) {
        self.swap = swap;
    }

    pub fn swap(&self) -> bool {
        self.swap
    }

    /// Total bytes held.
    pub fn size(&self) -> usize {
        self.buffer.len()
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.pos)
    }

    pub fn is_exhausted(&self) -> bool {
        self.pos >= self.buffer.len()
    }

    pub fn rewind(&mut self) {
        self.pos = 0;
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Hand the buffer to the caller, consuming the cursor.
    pub fn release(self) -> Vec<u8> {
        self.buffer
    }

    // ========================================================================
    // Raw access
    // ========================================================================

    fn grow(&mut self, additional: usize) -> SerResult<()> {
        self.buffer
            .try_reserve(additional)
            .map_err(|_| SerError::OutOfMemory {
                requested: additional,
            })
    }

    fn put_raw(&mut self, bytes: &[u8]) -> SerResult<()> {
        self.grow(bytes.len())?;
        self.buffer.extend_from_slice(bytes);
        Ok(())
    }

    /// Append bytes, then zero padding up to the next slot boundary.
    fn put_padded(&mut self, bytes: &[u8]) -> SerResult<()> {
        let padded = round_up(bytes.len());
        self.grow(padded)?;
        self.buffer.extend_from_slice(bytes);
        self.buffer
            .extend_from_slice(&PADDING[..padded - bytes.len()]);
        Ok(())
    }

    fn take(&mut self, len: usize) -> SerResult<&[u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.buffer.len())
            .ok_or_else(|| SerError::ReadFailed {
                offset: self.pos,
                reason: "unexpected end of buffer".into(),
            })?;
        let slice = &self.buffer[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    /// Append bytes that are already slot-aligned (a previously encoded
    /// response), verbatim.
    pub fn put_encoded(&mut self, bytes: &[u8]) -> SerResult<()> {
        if bytes.len() % SLOT_SIZE != 0 {
            return Err(SerError::InvalidData {
                reason: format!("encoded block of {} bytes is not slot aligned", bytes.len()),
            });
        }
        self.put_raw(bytes)
    }

    // ========================================================================
    // Primitives
    // ========================================================================

    impl_put_slot!(put_u8, u8);
    impl_put_slot!(put_i8, i8);
    impl_put_slot!(put_u16, u16);
    impl_put_slot!(put_i16, i16);
    impl_put_slot!(put_u32, u32);
    impl_put_slot!(put_i32, i32);
    impl_put_slot!(put_u64, u64);
    impl_put_slot!(put_i64, i64);

    impl_get_slot!(get_u8, u8);
    impl_get_slot!(get_i8, i8);
    impl_get_slot!(get_u16, u16);
    impl_get_slot!(get_i16, i16);
    impl_get_slot!(get_u32, u32);
    impl_get_slot!(get_i32, i32);
    impl_get_slot!(get_u64, u64);
    impl_get_slot!(get_i64, i64);

    pub fn put_bool(&mut self, value: bool) -> SerResult<()> {
        self.put_u8(u8::from(value))
    }

    pub fn get_bool(&mut self) -> SerResult<bool> {
        Ok(self.get_u8()? != 0)
    }

    pub fn put_f32(&mut self, value: f32) -> SerResult<()> {
        self.put_u32(value.to_bits())
    }

    pub fn get_f32(&mut self) -> SerResult<f32> {
        Ok(f32::from_bits(self.get_u32()?))
    }

    pub fn put_f64(&mut self, value: f64) -> SerResult<()> {
        self.put_u64(value.to_bits())
    }

    pub fn get_f64(&mut self) -> SerResult<f64> {
        Ok(f64::from_bits(self.get_u64()?))
    }

    /// A UTF-16 code unit.
    pub fn put_char16(&mut self, unit: u16) -> SerResult<()> {
        self.put_u16(unit)
    }

    pub fn get_char16(&mut self) -> SerResult<u16> {
        self.get_u16()
    }

    // ========================================================================
    // Variable-length fields
    // ========================================================================

    pub fn put_count(&mut self, count: usize) -> SerResult<()> {
        let count = u32::try_from(count).map_err(|_| SerError::InvalidData {
            reason: format!("count {} exceeds u32", count),
        })?;
        self.put_u32(count)
    }

    /// Read a count of elements that each occupy at least `min_size` bytes.
    ///
    /// Counts that cannot fit in the remaining input are rejected before
    /// anything is allocated.
    pub fn get_count(&mut self, min_size: usize) -> SerResult<usize> {
        let offset = self.pos;
        let count = self.get_u32()? as usize;
        let needed = count.saturating_mul(min_size.max(1));
        if count > MAX_DECODE_COUNT || needed > self.remaining() {
            return Err(SerError::ReadFailed {
                offset,
                reason: format!("count {} exceeds remaining input", count),
            });
        }
        Ok(count)
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) -> SerResult<()> {
        self.put_count(bytes.len())?;
        self.put_padded(bytes)
    }

    pub fn get_bytes(&mut self) -> SerResult<Vec<u8>> {
        let len = self.get_count(1)?;
        let data = self.take(round_up(len))?;
        Ok(data[..len].to_vec())
    }

    /// Strings travel as UTF-16 code units.
    pub fn put_str(&mut self, value: &str) -> SerResult<()> {
        let units: Vec<u16> = value.encode_utf16().collect();
        self.put_count(units.len())?;
        let mut bytes = Vec::new();
        bytes
            .try_reserve(units.len() * 2)
            .map_err(|_| SerError::OutOfMemory {
                requested: units.len() * 2,
            })?;
        for unit in &units {
            bytes.extend_from_slice(&unit.to_ne_bytes());
        }
        self.put_padded(&bytes)
    }

    pub fn get_string(&mut self) -> SerResult<String> {
        let offset = self.pos;
        let len = self.get_count(2)?;
        let swap = self.swap;
        let data = self.take(round_up(len * 2))?;
        let units: Vec<u16> = data[..len * 2]
            .chunks_exact(2)
            .map(|pair| {
                let unit = u16::from_ne_bytes([pair[0], pair[1]]);
                if swap {
                    unit.swap_bytes()
                } else {
                    unit
                }
            })
            .collect();
        String::from_utf16(&units).map_err(|_| SerError::ReadFailed {
            offset,
            reason: "invalid UTF-16 string".into(),
        })
    }

    pub fn put_opt_str(&mut self, value: Option<&str>) -> SerResult<()> {
        self.put_bool(value.is_some())?;
        match value {
            Some(s) => self.put_str(s),
            None => Ok(()),
        }
    }

    pub fn get_opt_string(&mut self) -> SerResult<Option<String>> {
        if self.get_bool()? {
            self.get_string().map(Some)
        } else {
            Ok(None)
        }
    }

    // ========================================================================
    // Magic markers
    // ========================================================================

    /// Write a structure magic value when validation is enabled.
    pub fn put_magic(&mut self, magic: u32) -> SerResult<()> {
        if self.magic {
            self.put_u32(magic)?;
        }
        Ok(())
    }

    /// Check a structure magic value when validation is enabled.
    pub fn get_magic(&mut self, expected: u32) -> SerResult<()> {
        if !self.magic {
            return Ok(());
        }
        let offset = self.pos;
        let found = self.get_u32()?;
        if found != expected {
            return Err(SerError::MagicMismatch {
                offset,
                expected,
                found,
            });
        }
        Ok(())
    }

    /// Read a `u32` slot without consuming it.
    pub fn peek_u32(&self) -> SerResult<u32> {
        let end = self.pos + 4;
        if self.pos + SLOT_SIZE > self.buffer.len() {
            return Err(SerError::ReadFailed {
                offset: self.pos,
                reason: "unexpected end of buffer".into(),
            });
        }
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.buffer[self.pos..end]);
        let value = u32::from_ne_bytes(bytes);
        Ok(if self.swap { value.swap_bytes() } else { value })
    }

    // ========================================================================
    // Nesting guard
    // ========================================================================

    /// Enter a nested structure during decode; bounded by
    /// [`MAX_NESTING_DEPTH`](crate::config::MAX_NESTING_DEPTH).
    pub(crate) fn enter(&mut self) -> SerResult<()> {
        if self.depth >= crate::config::MAX_NESTING_DEPTH {
            return Err(SerError::ReadFailed {
                offset: self.pos,
                reason: "embedded objects nested too deeply".into(),
            });
        }
        self.depth += 1;
        Ok(())
    }

    pub(crate) fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_up() {
        assert_eq!(round_up(0), 0);
        assert_eq!(round_up(1), 8);
        assert_eq!(round_up(8), 8);
        assert_eq!(round_up(9), 16);
    }

    #[test]
    fn test_every_primitive_uses_one_slot() {
        let mut cursor = BinaryCursor::new();
        cursor.put_bool(true).unwrap();
        assert_eq!(cursor.size(), 8);
        cursor.put_i8(-1).unwrap();
        cursor.put_u16(0xBEEF).unwrap();
        cursor.put_i32(i32::MIN).unwrap();
        cursor.put_f32(-0.0).unwrap();
        cursor.put_u64(u64::MAX).unwrap();
        cursor.put_char16(0x263A).unwrap();
        assert_eq!(cursor.size(), 7 * 8);

        let mut reader = BinaryCursor::from_bytes(cursor.release());
        assert!(reader.get_bool().unwrap());
        assert_eq!(reader.get_i8().unwrap(), -1);
        assert_eq!(reader.get_u16().unwrap(), 0xBEEF);
        assert_eq!(reader.get_i32().unwrap(), i32::MIN);
        assert_eq!(reader.get_f32().unwrap().to_bits(), (-0.0f32).to_bits());
        assert_eq!(reader.get_u64().unwrap(), u64::MAX);
        assert_eq!(reader.get_char16().unwrap(), 0x263A);
        assert!(reader.is_exhausted());
    }

    #[test]
    fn test_string_padding_and_unicode() {
        let mut cursor = BinaryCursor::new();
        cursor.put_str("abc").unwrap();
        // count slot + 6 payload bytes rounded to 8
        assert_eq!(cursor.size(), 16);
        cursor.put_str("").unwrap();
        assert_eq!(cursor.size(), 24);
        cursor.put_str("Größe \u{1F600}").unwrap();
        assert_eq!(cursor.size() % 8, 0);

        let mut reader = BinaryCursor::from_bytes(cursor.release());
        assert_eq!(reader.get_string().unwrap(), "abc");
        assert_eq!(reader.get_string().unwrap(), "");
        assert_eq!(reader.get_string().unwrap(), "Größe \u{1F600}");
    }

    #[test]
    fn test_bytes_and_optional_strings() {
        let mut cursor = BinaryCursor::new();
        cursor.put_bytes(&[1, 2, 3, 4, 5, 6, 7, 8, 9]).unwrap();
        cursor.put_opt_str(None).unwrap();
        cursor.put_opt_str(Some("ns")).unwrap();
        let mut reader = BinaryCursor::from_bytes(cursor.release());
        assert_eq!(reader.get_bytes().unwrap(), vec![1, 2, 3, 4, 5, 6, 7, 8, 9]);
        assert_eq!(reader.get_opt_string().unwrap(), None);
        assert_eq!(reader.get_opt_string().unwrap().as_deref(), Some("ns"));
    }

    #[test]
    fn test_swap_reads_foreign_order() {
        let mut cursor = BinaryCursor::new();
        cursor.put_u32(0x1122_3344u32.swap_bytes()).unwrap();
        cursor.put_u16(0x0102u16.swap_bytes()).unwrap();
        cursor.put_f64(f64::from_bits(1.5f64.to_bits().swap_bytes())).unwrap();
        let mut reader = BinaryCursor::from_bytes(cursor.release());
        reader.set_swap(true);
        assert_eq!(reader.get_u32().unwrap(), 0x1122_3344);
        assert_eq!(reader.get_u16().unwrap(), 0x0102);
        assert_eq!(reader.get_f64().unwrap(), 1.5);
    }

    #[test]
    fn test_truncated_input_reports_offset() {
        let mut reader = BinaryCursor::from_bytes(vec![0u8; 12]);
        reader.get_u64().unwrap();
        match reader.get_u8().unwrap_err() {
            SerError::ReadFailed { offset, reason } => {
                assert_eq!(offset, 8);
                assert_eq!(reason, "unexpected end of buffer");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_oversized_count_rejected_before_allocation() {
        let mut cursor = BinaryCursor::new();
        cursor.put_u32(1_000_000).unwrap();
        let mut reader = BinaryCursor::from_bytes(cursor.release());
        assert!(matches!(
            reader.get_string(),
            Err(SerError::ReadFailed { offset: 0, .. })
        ));
    }

    #[test]
    fn test_magic_mismatch_and_disabled() {
        let mut cursor = BinaryCursor::new();
        cursor.put_magic(0xAAAA_0001).unwrap();
        let bytes = cursor.release();

        let mut reader = BinaryCursor::from_bytes(bytes.clone());
        assert_eq!(
            reader.get_magic(0xAAAA_0002),
            Err(SerError::MagicMismatch {
                offset: 0,
                expected: 0xAAAA_0002,
                found: 0xAAAA_0001
            })
        );

        let mut plain = BinaryCursor::new().with_magic(false);
        plain.put_magic(0xAAAA_0001).unwrap();
        assert_eq!(plain.size(), 0);
        let mut reader = BinaryCursor::from_bytes(bytes).with_magic(false);
        reader.get_magic(0xAAAA_0002).unwrap();
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn test_peek_does_not_advance() {
        let mut cursor = BinaryCursor::new();
        cursor.put_u32(7).unwrap();
        let reader = BinaryCursor::from_bytes(cursor.release());
        assert_eq!(reader.peek_u32().unwrap(), 7);
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn test_put_encoded_requires_alignment() {
        let mut cursor = BinaryCursor::new();
        assert!(cursor.put_encoded(&[0u8; 5]).is_err());
        cursor.put_encoded(&[0u8; 16]).unwrap();
        assert_eq!(cursor.size(), 16);
    }
}
