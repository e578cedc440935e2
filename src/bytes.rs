//! The byte stream component (§4.A): a forward-only reader over a borrowed
//! slice and an append-only writer with a reserve/patch operation for size
//! fields that can only be known after their value region has been written.

use declio::ctx::Endian;
use declio::{Decode, Encode};

use crate::result::{Error, Result};

pub(crate) const ENDIANESS: Endian = Endian::Little;

/// The length-prefixed string form described in the format's invariant on
/// string width selection: the sign of the length prefix picks 8-bit ASCII
/// vs. 16-bit little-endian units, and zero/one are the absent/empty cases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FString {
    Absent,
    Empty,
    Ascii(String),
    Wide(String),
}

impl FString {
    /// Picks the narrowest representation that can hold `text`: `Empty` for
    /// the empty string, `Ascii` when every character fits in 7 bits, `Wide`
    /// otherwise.
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.is_empty() {
            FString::Empty
        } else if text.is_ascii() {
            FString::Ascii(text)
        } else {
            FString::Wide(text)
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FString::Absent => None,
            FString::Empty => Some(""),
            FString::Ascii(s) | FString::Wide(s) => Some(s.as_str()),
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, FString::Absent)
    }
}

impl Default for FString {
    fn default() -> Self {
        FString::Absent
    }
}

/// A forward-only cursor over a borrowed byte slice (§4.A reader).
#[derive(Debug)]
pub struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_at_end(&self) -> bool {
        self.pos == self.buf.len()
    }

    pub fn read_slice(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.remaining() < len {
            return Err(Error::UnexpectedEnd {
                offset: self.pos,
                needed: len,
                available: self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.read_slice(len).map(|_| ())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_slice(1)?[0])
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let offset = self.pos;
        let mut slice = self.read_slice(4)?;
        u32::decode(ENDIANESS, &mut slice).map_err(|_| truncated(offset, 4))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        let offset = self.pos;
        let mut slice = self.read_slice(4)?;
        i32::decode(ENDIANESS, &mut slice).map_err(|_| truncated(offset, 4))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        let offset = self.pos;
        let mut slice = self.read_slice(8)?;
        i64::decode(ENDIANESS, &mut slice).map_err(|_| truncated(offset, 8))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        let offset = self.pos;
        let mut slice = self.read_slice(4)?;
        f32::decode(ENDIANESS, &mut slice).map_err(|_| truncated(offset, 4))
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        let offset = self.pos;
        let mut slice = self.read_slice(8)?;
        f64::decode(ENDIANESS, &mut slice).map_err(|_| truncated(offset, 8))
    }

    pub fn read_guid(&mut self) -> Result<[u8; 16]> {
        let mut out = [0u8; 16];
        out.copy_from_slice(self.read_slice(16)?);
        Ok(out)
    }

    /// Reads the sign-selected length-prefixed string.
    pub fn read_fstring(&mut self) -> Result<FString> {
        let offset = self.pos;
        let len = self.read_i32()?;
        match len.cmp(&0) {
            std::cmp::Ordering::Equal => Ok(FString::Absent),
            std::cmp::Ordering::Greater => {
                let bytes = self.read_slice(len as usize)?;
                let (body, nul) = bytes.split_at(bytes.len() - 1);
                if nul != [0] {
                    return Err(Error::MalformedString {
                        offset,
                        reason: "ascii string missing NUL terminator",
                    });
                }
                if body.is_empty() {
                    Ok(FString::Empty)
                } else {
                    let text = std::str::from_utf8(body)
                        .map_err(|_| Error::MalformedString {
                            offset,
                            reason: "ascii string is not valid UTF-8",
                        })?
                        .to_owned();
                    Ok(FString::Ascii(text))
                }
            }
            std::cmp::Ordering::Less => {
                let units = (-len) as usize;
                let raw = self.read_slice(units * 2)?;
                let mut wide: Vec<u16> = Vec::with_capacity(units);
                for chunk in raw.chunks_exact(2) {
                    wide.push(u16::from_le_bytes([chunk[0], chunk[1]]));
                }
                if wide.last() != Some(&0) {
                    return Err(Error::MalformedString {
                        offset,
                        reason: "wide string missing NUL terminator",
                    });
                }
                wide.pop();
                let text = String::from_utf16(&wide).map_err(|_| Error::MalformedString {
                    offset,
                    reason: "wide string is not valid UTF-16",
                })?;
                Ok(FString::Wide(text))
            }
        }
    }

    /// Reads a string that must be present (names other than the list
    /// terminator, type tags, struct tags, enum tags).
    pub fn read_required_string(&mut self) -> Result<String> {
        let offset = self.pos;
        let value = self.read_fstring()?;
        value.as_str().map(str::to_owned).ok_or(Error::MalformedString {
            offset,
            reason: "expected a present string, found an absent one",
        })
    }
}

fn truncated(offset: usize, needed: usize) -> Error {
    Error::UnexpectedEnd {
        offset,
        needed,
        available: 0,
    }
}

/// An append-only byte buffer (§4.A writer) with the single seek-and-patch
/// operation the property encoder needs for its size fields.
#[derive(Debug, Default)]
pub struct Sink {
    buf: Vec<u8>,
}

impl Sink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> usize {
        self.buf.len()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        value.encode(ENDIANESS, &mut self.buf)?;
        Ok(())
    }

    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        value.encode(ENDIANESS, &mut self.buf)?;
        Ok(())
    }

    pub fn write_i64(&mut self, value: i64) -> Result<()> {
        value.encode(ENDIANESS, &mut self.buf)?;
        Ok(())
    }

    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        value.encode(ENDIANESS, &mut self.buf)?;
        Ok(())
    }

    pub fn write_f64(&mut self, value: f64) -> Result<()> {
        value.encode(ENDIANESS, &mut self.buf)?;
        Ok(())
    }

    pub fn write_guid(&mut self, guid: &[u8; 16]) {
        self.buf.extend_from_slice(guid);
    }

    pub fn write_fstring(&mut self, value: &FString) -> Result<()> {
        match value {
            FString::Absent => self.write_i32(0),
            FString::Empty => {
                self.write_i32(1)?;
                self.write_u8(0);
                Ok(())
            }
            FString::Ascii(text) => {
                self.write_i32(text.len() as i32 + 1)?;
                self.write_bytes(text.as_bytes());
                self.write_u8(0);
                Ok(())
            }
            FString::Wide(text) => {
                let units: Vec<u16> = text.encode_utf16().collect();
                self.write_i32(-((units.len() as i32) + 1))?;
                for unit in &units {
                    self.write_bytes(&unit.to_le_bytes());
                }
                self.write_bytes(&0u16.to_le_bytes());
                Ok(())
            }
        }
    }

    /// Reserves four bytes for a size field that can only be patched once
    /// its value region has been written; returns the reserved offset.
    pub fn reserve_size(&mut self) -> usize {
        let offset = self.buf.len();
        self.buf.extend_from_slice(&[0, 0, 0, 0]);
        offset
    }

    /// Overwrites the four bytes reserved at `offset` with the byte count
    /// from `value_start` to the current end of the buffer.
    pub fn patch_size(&mut self, offset: usize, value_start: usize) {
        let size = (self.buf.len() - value_start) as i32;
        self.buf[offset..offset + 4].copy_from_slice(&size.to_le_bytes());
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn ascii_string_round_trips_with_positive_length() {
        let mut sink = Sink::new();
        sink.write_fstring(&FString::from_text("Shadow")).unwrap();
        let bytes = sink.into_bytes();
        assert_eq!(&bytes[0..4], &7i32.to_le_bytes());

        let mut cursor = Cursor::new(&bytes);
        assert_eq!(cursor.read_fstring().unwrap(), FString::Ascii("Shadow".to_owned()));
    }

    #[test]
    fn non_ascii_text_flips_to_wide_and_negative_length() {
        let text = "Shädow";
        let mut sink = Sink::new();
        sink.write_fstring(&FString::from_text(text)).unwrap();
        let bytes = sink.into_bytes();
        let len = i32::from_le_bytes(bytes[0..4].try_into().unwrap());
        assert!(len < 0);

        let mut cursor = Cursor::new(&bytes);
        assert_eq!(cursor.read_fstring().unwrap(), FString::Wide(text.to_owned()));
    }

    #[test]
    fn zero_length_is_absent_and_one_is_empty() {
        let mut sink = Sink::new();
        sink.write_fstring(&FString::Absent).unwrap();
        sink.write_fstring(&FString::Empty).unwrap();
        let bytes = sink.into_bytes();

        let mut cursor = Cursor::new(&bytes);
        assert_eq!(cursor.read_fstring().unwrap(), FString::Absent);
        assert_eq!(cursor.read_fstring().unwrap(), FString::Empty);
    }

    #[test]
    fn reserve_and_patch_size_measures_value_region() {
        let mut sink = Sink::new();
        let size_offset = sink.reserve_size();
        let value_start = sink.position();
        sink.write_bytes(&[1, 2, 3]);
        sink.patch_size(size_offset, value_start);
        let bytes = sink.into_bytes();
        assert_eq!(&bytes[size_offset..size_offset + 4], &3i32.to_le_bytes());
    }

    #[test]
    fn truncated_read_reports_offset() {
        let bytes = [0u8, 1];
        let mut cursor = Cursor::new(&bytes);
        let err = cursor.read_u32().unwrap_err();
        assert_matches!(err, Error::UnexpectedEnd { offset: 0, .. });
    }
}
