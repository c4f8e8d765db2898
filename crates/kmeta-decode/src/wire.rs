//! Wire format reading and writing
//!
//! The unpacked declaration tree uses a tag/value wire format: every field is
//! a varint key `(field_number << 3) | wire_type` followed by a payload whose
//! layout depends on the wire type. Nested declarations are length-delimited.

use thiserror::Error;

/// Errors that can occur while reading the wire format
#[derive(Debug, Clone, Error, PartialEq)]
pub enum WireError {
    /// Unexpected end of data
    #[error("Unexpected end of data at offset {0}")]
    UnexpectedEnd(usize),

    /// Varint longer than 64 bits
    #[error("Varint overflow at offset {0}")]
    VarintOverflow(usize),

    /// Unknown or unsupported wire type
    #[error("Invalid wire type {wire_type} at offset {offset}")]
    InvalidWireType {
        /// Raw wire type bits
        wire_type: u8,
        /// Offset of the field key
        offset: usize,
    },

    /// Length prefix runs past the end of the enclosing message
    #[error("Length {len} at offset {offset} exceeds the enclosing message")]
    LengthOverflow {
        /// Declared length
        len: u64,
        /// Offset of the length prefix
        offset: usize,
    },

    /// Field number zero is reserved
    #[error("Invalid field number 0 at offset {0}")]
    InvalidFieldNumber(usize),
}

/// Payload layout of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireType {
    /// Base-128 varint
    Varint,
    /// 8 little-endian bytes
    Fixed64,
    /// Varint length followed by that many bytes
    LengthDelimited,
    /// 4 little-endian bytes
    Fixed32,
}

impl WireType {
    /// Convert from the low three key bits
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(WireType::Varint),
            1 => Some(WireType::Fixed64),
            2 => Some(WireType::LengthDelimited),
            5 => Some(WireType::Fixed32),
            _ => None,
        }
    }

    /// Convert to the low three key bits
    pub fn to_u8(self) -> u8 {
        match self {
            WireType::Varint => 0,
            WireType::Fixed64 => 1,
            WireType::LengthDelimited => 2,
            WireType::Fixed32 => 5,
        }
    }
}

/// Wire writer
///
/// Provides methods for emitting keys and payloads into a binary buffer.
#[derive(Debug, Default)]
pub struct WireWriter {
    buffer: Vec<u8>,
}

impl WireWriter {
    /// Create a new writer
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Get the current buffer
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// Consume the writer and return the buffer
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Get the current offset (length of the buffer)
    pub fn offset(&self) -> usize {
        self.buffer.len()
    }

    /// Emit a raw varint
    pub fn emit_varint(&mut self, mut value: u64) {
        loop {
            let byte = (value & 0x7F) as u8;
            value >>= 7;
            if value == 0 {
                self.buffer.push(byte);
                return;
            }
            self.buffer.push(byte | 0x80);
        }
    }

    /// Emit a field key
    pub fn emit_key(&mut self, field: u32, wire_type: WireType) {
        self.emit_varint(((field as u64) << 3) | wire_type.to_u8() as u64);
    }

    /// Emit a varint field
    pub fn emit_uint(&mut self, field: u32, value: u64) {
        self.emit_key(field, WireType::Varint);
        self.emit_varint(value);
    }

    /// Emit a length-delimited field
    pub fn emit_bytes(&mut self, field: u32, bytes: &[u8]) {
        self.emit_key(field, WireType::LengthDelimited);
        self.emit_varint(bytes.len() as u64);
        self.buffer.extend_from_slice(bytes);
    }

    /// Emit a nested message built by `build`
    pub fn emit_message(&mut self, field: u32, build: impl FnOnce(&mut WireWriter)) {
        let mut nested = WireWriter::new();
        build(&mut nested);
        self.emit_bytes(field, nested.buffer());
    }

    /// Emit a fixed 32-bit field
    pub fn emit_fixed32(&mut self, field: u32, value: u32) {
        self.emit_key(field, WireType::Fixed32);
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Emit a fixed 64-bit field
    pub fn emit_fixed64(&mut self, field: u32, value: u64) {
        self.emit_key(field, WireType::Fixed64);
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }
}

/// Wire reader
///
/// Reads keys and payloads from a binary buffer, tracking the position.
#[derive(Debug, Clone)]
pub struct WireReader<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> WireReader<'a> {
    /// Create a new reader
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            position: 0,
        }
    }

    /// Get the current position in the buffer
    pub fn position(&self) -> usize {
        self.position
    }

    /// Get the remaining bytes in the buffer
    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.position)
    }

    /// Check if there are more bytes to read
    pub fn has_more(&self) -> bool {
        self.position < self.buffer.len()
    }

    /// Read a base-128 varint
    pub fn read_varint(&mut self) -> Result<u64, WireError> {
        let start = self.position;
        let mut result: u64 = 0;
        let mut shift = 0;
        loop {
            let byte = *self
                .buffer
                .get(self.position)
                .ok_or(WireError::UnexpectedEnd(self.position))?;
            self.position += 1;

            let value = u64::from(byte & 0x7F);
            if shift > 63 || (shift == 63 && value > 1) {
                return Err(WireError::VarintOverflow(start));
            }
            result |= value << shift;

            if byte & 0x80 == 0 {
                return Ok(result);
            }
            shift += 7;
        }
    }

    /// Read a varint that must fit into 32 bits
    pub fn read_u32(&mut self) -> Result<u32, WireError> {
        let start = self.position;
        let value = self.read_varint()?;
        u32::try_from(value).map_err(|_| WireError::VarintOverflow(start))
    }

    /// Read a field key
    pub fn read_key(&mut self) -> Result<(u32, WireType), WireError> {
        let start = self.position;
        let key = self.read_varint()?;
        let wire_type = WireType::from_u8((key & 0x7) as u8).ok_or(WireError::InvalidWireType {
            wire_type: (key & 0x7) as u8,
            offset: start,
        })?;
        let field = u32::try_from(key >> 3).map_err(|_| WireError::VarintOverflow(start))?;
        if field == 0 {
            return Err(WireError::InvalidFieldNumber(start));
        }
        Ok((field, wire_type))
    }

    /// Read a length-delimited payload
    pub fn read_bytes(&mut self) -> Result<&'a [u8], WireError> {
        let start = self.position;
        let len = self.read_varint()?;
        let len = usize::try_from(len)
            .ok()
            .filter(|&len| len <= self.remaining())
            .ok_or(WireError::LengthOverflow { len, offset: start })?;
        let bytes = &self.buffer[self.position..self.position + len];
        self.position += len;
        Ok(bytes)
    }

    /// Skip over the payload of a field with the given wire type
    pub fn skip(&mut self, wire_type: WireType) -> Result<(), WireError> {
        match wire_type {
            WireType::Varint => {
                self.read_varint()?;
            }
            WireType::Fixed64 => self.advance(8)?,
            WireType::Fixed32 => self.advance(4)?,
            WireType::LengthDelimited => {
                self.read_bytes()?;
            }
        }
        Ok(())
    }

    fn advance(&mut self, count: usize) -> Result<(), WireError> {
        if count > self.remaining() {
            return Err(WireError::UnexpectedEnd(self.position));
        }
        self.position += count;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_varint_encoding() {
        let mut writer = WireWriter::new();
        writer.emit_varint(0);
        writer.emit_varint(127);
        writer.emit_varint(128);
        writer.emit_varint(300);
        assert_eq!(writer.buffer(), &[0x00, 0x7F, 0x80, 0x01, 0xAC, 0x02]);

        let mut reader = WireReader::new(writer.buffer());
        assert_eq!(reader.read_varint().unwrap(), 0);
        assert_eq!(reader.read_varint().unwrap(), 127);
        assert_eq!(reader.read_varint().unwrap(), 128);
        assert_eq!(reader.read_varint().unwrap(), 300);
        assert!(!reader.has_more());
    }

    #[test]
    fn test_varint_max_and_overflow() {
        let mut writer = WireWriter::new();
        writer.emit_varint(u64::MAX);
        let mut reader = WireReader::new(writer.buffer());
        assert_eq!(reader.read_varint().unwrap(), u64::MAX);

        let bytes = [0xFF; 11];
        let mut reader = WireReader::new(&bytes);
        assert_eq!(reader.read_varint(), Err(WireError::VarintOverflow(0)));
    }

    #[test]
    fn test_truncated_varint() {
        let bytes = [0x80, 0x80];
        let mut reader = WireReader::new(&bytes);
        assert_eq!(reader.read_varint(), Err(WireError::UnexpectedEnd(2)));
    }

    #[test]
    fn test_key_roundtrip() {
        let mut writer = WireWriter::new();
        writer.emit_key(10, WireType::LengthDelimited);
        writer.emit_key(100, WireType::Varint);

        let mut reader = WireReader::new(writer.buffer());
        assert_eq!(reader.read_key().unwrap(), (10, WireType::LengthDelimited));
        assert_eq!(reader.read_key().unwrap(), (100, WireType::Varint));
    }

    #[test]
    fn test_invalid_wire_type() {
        // field 1, wire type 3 (group start, unsupported)
        let bytes = [0x0B];
        let mut reader = WireReader::new(&bytes);
        assert!(matches!(
            reader.read_key(),
            Err(WireError::InvalidWireType { wire_type: 3, offset: 0 })
        ));
    }

    #[test]
    fn test_field_zero_rejected() {
        let bytes = [0x00];
        let mut reader = WireReader::new(&bytes);
        assert_eq!(reader.read_key(), Err(WireError::InvalidFieldNumber(0)));
    }

    #[test]
    fn test_length_overflow() {
        let bytes = [0x05, 0x01, 0x02];
        let mut reader = WireReader::new(&bytes);
        assert!(matches!(
            reader.read_bytes(),
            Err(WireError::LengthOverflow { len: 5, offset: 0 })
        ));
    }

    #[test]
    fn test_skip_all_wire_types() {
        let mut writer = WireWriter::new();
        writer.emit_uint(1, 300);
        writer.emit_fixed64(2, 7);
        writer.emit_bytes(3, b"abc");
        writer.emit_fixed32(4, 9);
        writer.emit_uint(5, 42);

        let mut reader = WireReader::new(writer.buffer());
        for _ in 0..4 {
            let (_, wire_type) = reader.read_key().unwrap();
            reader.skip(wire_type).unwrap();
        }
        assert_eq!(reader.read_key().unwrap(), (5, WireType::Varint));
        assert_eq!(reader.read_varint().unwrap(), 42);
    }

    #[test]
    fn test_nested_message() {
        let mut writer = WireWriter::new();
        writer.emit_message(8, |inner| inner.emit_uint(1, 6));

        let mut reader = WireReader::new(writer.buffer());
        assert_eq!(reader.read_key().unwrap(), (8, WireType::LengthDelimited));
        let payload = reader.read_bytes().unwrap();
        assert_eq!(payload, &[0x08, 0x06]);
    }

    #[test]
    fn test_reader_position_tracking() {
        let bytes = [0x08, 0xAC, 0x02, 0x10, 0x01];
        let mut reader = WireReader::new(&bytes);
        assert_eq!(reader.position(), 0);
        reader.read_key().unwrap();
        assert_eq!(reader.position(), 1);
        reader.read_varint().unwrap();
        assert_eq!(reader.position(), 3);
        assert_eq!(reader.remaining(), 2);
    }
}
