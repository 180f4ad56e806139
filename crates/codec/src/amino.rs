//! Amino binary primitives.
//!
//! Fields are `key || value` with `key = (field << 3) | wire_type`. Default
//! values are omitted on encode. Signed 64-bit integers are written as the
//! uvarint of their two's-complement bit pattern.

use crate::CodecError;

/// Wire types used by amino.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireType {
    Varint = 0,
    Fixed64 = 1,
    Bytes = 2,
    Fixed32 = 5,
}

impl WireType {
    fn from_u8(v: u8) -> Result<Self, CodecError> {
        match v {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::Fixed64),
            2 => Ok(WireType::Bytes),
            5 => Ok(WireType::Fixed32),
            other => Err(CodecError::UnsupportedWireType(other)),
        }
    }
}

/// Append-only amino writer.
#[derive(Debug, Default)]
pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a registered concrete type with its 4-byte prefix.
    pub fn with_prefix(prefix: [u8; 4]) -> Self {
        Self {
            buf: prefix.to_vec(),
        }
    }

    pub fn uvarint(&mut self, mut v: u64) {
        while v >= 0x80 {
            self.buf.push((v as u8) | 0x80);
            v >>= 7;
        }
        self.buf.push(v as u8);
    }

    fn key(&mut self, field: u32, wire: WireType) {
        self.uvarint(((field as u64) << 3) | wire as u64);
    }

    /// Unsigned varint field, omitted when zero.
    pub fn uvarint_field(&mut self, field: u32, v: u64) {
        if v != 0 {
            self.key(field, WireType::Varint);
            self.uvarint(v);
        }
    }

    /// int64 field, omitted when zero.
    pub fn int64_field(&mut self, field: u32, v: i64) {
        self.uvarint_field(field, v as u64);
    }

    /// Byte slice field, omitted when empty.
    pub fn bytes_field(&mut self, field: u32, bytes: &[u8]) {
        if !bytes.is_empty() {
            self.message_field(field, bytes);
        }
    }

    /// String field, omitted when empty.
    pub fn string_field(&mut self, field: u32, s: &str) {
        self.bytes_field(field, s.as_bytes());
    }

    /// Length-delimited field written even when empty (repeated elements).
    pub fn message_field(&mut self, field: u32, bytes: &[u8]) {
        self.key(field, WireType::Bytes);
        self.uvarint(bytes.len() as u64);
        self.buf.extend_from_slice(bytes);
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// Prefix `bytes` with its uvarint length.
pub(crate) fn length_prefixed(bytes: &[u8]) -> Vec<u8> {
    let mut enc = Encoder::new();
    enc.uvarint(bytes.len() as u64);
    let mut out = enc.finish();
    out.extend_from_slice(bytes);
    out
}

/// Cursor over amino bytes.
#[derive(Debug, Clone)]
pub struct Decoder<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }

    pub fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    pub fn uvarint(&mut self) -> Result<u64, CodecError> {
        let mut result = 0u64;
        for shift in (0..64).step_by(7) {
            let byte = *self.buf.get(self.pos).ok_or(CodecError::Truncated)?;
            self.pos += 1;
            // The tenth byte may only contribute the top bit.
            if shift == 63 && byte > 1 {
                return Err(CodecError::VarintOverflow);
            }
            result |= ((byte & 0x7F) as u64) << shift;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
        }
        Err(CodecError::VarintOverflow)
    }

    /// Read the next field key, or `None` at end of input.
    pub fn next_field(&mut self) -> Result<Option<(u32, WireType)>, CodecError> {
        if self.is_empty() {
            return Ok(None);
        }
        let key = self.uvarint()?;
        let wire = WireType::from_u8((key & 0x7) as u8)?;
        Ok(Some(((key >> 3) as u32, wire)))
    }

    pub fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        let end = self.pos.checked_add(n).ok_or(CodecError::Truncated)?;
        let slice = self.buf.get(self.pos..end).ok_or(CodecError::Truncated)?;
        self.pos = end;
        Ok(slice)
    }

    /// Read a 4-byte type prefix.
    pub fn prefix(&mut self) -> Result<[u8; 4], CodecError> {
        let bytes = self.take(4)?;
        let mut out = [0u8; 4];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    /// Read a length-delimited value.
    pub fn bytes(&mut self) -> Result<&'a [u8], CodecError> {
        let len = self.uvarint()? as usize;
        self.take(len)
    }

    pub fn string(&mut self) -> Result<String, CodecError> {
        let bytes = self.bytes()?;
        String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::InvalidUtf8)
    }

    pub fn int64(&mut self) -> Result<i64, CodecError> {
        Ok(self.uvarint()? as i64)
    }

    /// Skip a value of an unrecognized field.
    pub fn skip(&mut self, wire: WireType) -> Result<(), CodecError> {
        match wire {
            WireType::Varint => self.uvarint().map(|_| ()),
            WireType::Fixed64 => self.take(8).map(|_| ()),
            WireType::Fixed32 => self.take(4).map(|_| ()),
            WireType::Bytes => self.bytes().map(|_| ()),
        }
    }
}

/// Fail unless `wire` is what the field requires.
pub(crate) fn expect_wire(field: u32, wire: WireType, expected: WireType) -> Result<(), CodecError> {
    if wire == expected {
        Ok(())
    } else {
        Err(CodecError::UnexpectedWireType {
            field,
            wire: wire as u8,
        })
    }
}
