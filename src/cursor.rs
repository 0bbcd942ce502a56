//! Sequential big-endian reader over a borrowed byte buffer.
//!
//! Every read checks `offset + n <= len` first and reports
//! [`MidiError::TruncatedInput`] with the offset where the read started.

use crate::error::{MidiError, Result};

pub struct ByteCursor<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    fn check(&self, n: usize) -> Result<()> {
        match self.offset.checked_add(n) {
            Some(end) if end <= self.data.len() => Ok(()),
            _ => Err(MidiError::TruncatedInput { offset: self.offset }),
        }
    }

    /// Look at the next byte without consuming it.
    pub fn peek(&self) -> Result<u8> {
        self.check(1)?;
        Ok(self.data[self.offset])
    }

    pub fn read_byte(&mut self) -> Result<u8> {
        self.check(1)?;
        let b = self.data[self.offset];
        self.offset += 1;
        Ok(b)
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.check(n)?;
        let bytes = &self.data[self.offset..self.offset + n];
        self.offset += n;
        Ok(bytes)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let b = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let b = self.read_bytes(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Read `n` bytes as ASCII. Non-ASCII bytes are replaced rather than rejected,
    /// the caller compares against a fixed magic anyway.
    pub fn read_ascii(&mut self, n: usize) -> Result<String> {
        let b = self.read_bytes(n)?;
        Ok(String::from_utf8_lossy(b).into_owned())
    }

    /// Read a MIDI variable-length quantity: up to 4 bytes, 7 bits each,
    /// ending at the first byte with the high bit clear.
    pub fn read_varint(&mut self) -> Result<u32> {
        let mut b = self.read_byte()?;
        let mut result = u32::from(b & 0x7F);
        for _ in 0..3 {
            if b & 0x80 == 0 {
                break;
            }
            b = self.read_byte()?;
            result = (result << 7) + u32::from(b & 0x7F);
        }
        Ok(result)
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.check(n)?;
        self.offset += n;
        Ok(())
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
