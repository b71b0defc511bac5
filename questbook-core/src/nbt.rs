//! Tag-tree binary decoder for BetterQuesting `.dat` exports (NBT layout).
//!
//! The stream is self-describing: every value is preceded by a one-byte tag
//! id, all multi-byte numerics are big-endian, and the whole buffer may be
//! gzip-compressed (detected by the `0x1f 0x8b` magic).

use std::io::Read;

use flate2::read::GzDecoder;
use serde_json::{Map, Value};
use thiserror::Error;

/// First two bytes of a gzip stream.
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

const TAG_END: u8 = 0;
const TAG_BYTE: u8 = 1;
const TAG_SHORT: u8 = 2;
const TAG_INT: u8 = 3;
const TAG_LONG: u8 = 4;
const TAG_FLOAT: u8 = 5;
const TAG_DOUBLE: u8 = 6;
const TAG_BYTE_ARRAY: u8 = 7;
const TAG_STRING: u8 = 8;
const TAG_LIST: u8 = 9;
const TAG_COMPOUND: u8 = 10;
const TAG_INT_ARRAY: u8 = 11;
const TAG_LONG_ARRAY: u8 = 12;

/// Errors produced while decoding a tag-tree buffer.
///
/// Fatal to the single parse that raised them; callers surface the message
/// and keep running.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("corrupt compressed stream: {0}")]
    Gzip(String),
    #[error("invalid root tag {0}, file must start with a compound tag")]
    InvalidRoot(u8),
    #[error("unknown tag type {tag} at offset {offset}")]
    UnknownTag { tag: u8, offset: usize },
    #[error("truncated input: needed {needed} more bytes at offset {offset}")]
    Truncated { offset: usize, needed: usize },
    #[error("invalid utf-8 in string at offset {0}")]
    InvalidString(usize),
}

/// A decoded tag-tree value.
///
/// Constructed once by [`decode`] and immutable afterwards. Compounds keep
/// their on-disk field order; a compound never stores an `End` value.
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    End,
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    ByteArray(Vec<i8>),
    String(String),
    List(u8, Vec<TagValue>),
    Compound(Vec<(String, TagValue)>),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
}

impl TagValue {
    /// Convert into a `serde_json::Value` so tag-tree and JSON player files
    /// share one traversal representation downstream.
    ///
    /// Numeric precision is preserved (`Long` maps to a 64-bit JSON integer);
    /// compound field order is not, which matches what `serde_json` does to
    /// plain JSON input anyway.
    #[must_use]
    pub fn into_json(self) -> Value {
        match self {
            TagValue::End => Value::Null,
            TagValue::Byte(v) => Value::from(v),
            TagValue::Short(v) => Value::from(v),
            TagValue::Int(v) => Value::from(v),
            TagValue::Long(v) => Value::from(v),
            TagValue::Float(v) => Value::from(f64::from(v)),
            TagValue::Double(v) => Value::from(v),
            TagValue::ByteArray(v) => Value::Array(v.into_iter().map(Value::from).collect()),
            TagValue::String(v) => Value::String(v),
            TagValue::List(_, items) => {
                Value::Array(items.into_iter().map(TagValue::into_json).collect())
            }
            TagValue::Compound(fields) => {
                let mut map = Map::new();
                for (name, value) in fields {
                    map.insert(name, value.into_json());
                }
                Value::Object(map)
            }
            TagValue::IntArray(v) => Value::Array(v.into_iter().map(Value::from).collect()),
            TagValue::LongArray(v) => Value::Array(v.into_iter().map(Value::from).collect()),
        }
    }
}

/// Decode a (possibly gzip-compressed) tag-tree buffer into its root compound.
///
/// # Errors
///
/// Returns [`DecodeError`] when decompression fails, the root tag is not a
/// compound, an unknown tag id appears, or a read runs past the buffer end.
pub fn decode(buffer: &[u8]) -> Result<TagValue, DecodeError> {
    decode_named(buffer).map(|(_, value)| value)
}

/// Like [`decode`], but also returns the root compound's name.
///
/// # Errors
///
/// Same failure cases as [`decode`].
pub fn decode_named(buffer: &[u8]) -> Result<(String, TagValue), DecodeError> {
    let decompressed;
    let data: &[u8] = if buffer.len() >= 2 && buffer[..2] == GZIP_MAGIC {
        let mut out = Vec::new();
        GzDecoder::new(buffer)
            .read_to_end(&mut out)
            .map_err(|e| DecodeError::Gzip(e.to_string()))?;
        decompressed = out;
        &decompressed
    } else {
        buffer
    };

    let mut reader = Reader { data, pos: 0 };
    let root_tag = reader.read_u8()?;
    if root_tag != TAG_COMPOUND {
        return Err(DecodeError::InvalidRoot(root_tag));
    }
    let root_name = reader.read_string()?;
    log::debug!("tag tree root name: {root_name:?}");
    let value = reader.read_value(TAG_COMPOUND)?;
    Ok((root_name, value))
}

/// Single monotonically advancing cursor over the decoded byte buffer.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl Reader<'_> {
    fn take(&mut self, n: usize) -> Result<&[u8], DecodeError> {
        if self.data.len() - self.pos < n {
            return Err(DecodeError::Truncated {
                offset: self.pos,
                needed: n - (self.data.len() - self.pos),
            });
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    fn read_i8(&mut self) -> Result<i8, DecodeError> {
        Ok(self.read_u8()? as i8)
    }

    fn read_i16(&mut self) -> Result<i16, DecodeError> {
        let b = self.take(2)?;
        Ok(i16::from_be_bytes([b[0], b[1]]))
    }

    fn read_u16(&mut self) -> Result<u16, DecodeError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn read_i32(&mut self) -> Result<i32, DecodeError> {
        let b = self.take(4)?;
        Ok(i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_i64(&mut self) -> Result<i64, DecodeError> {
        let b = self.take(8)?;
        Ok(i64::from_be_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    fn read_f32(&mut self) -> Result<f32, DecodeError> {
        let b = self.take(4)?;
        Ok(f32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_f64(&mut self) -> Result<f64, DecodeError> {
        let b = self.take(8)?;
        Ok(f64::from_be_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    /// Length-prefixed string: u16 byte count followed by UTF-8 bytes.
    fn read_string(&mut self) -> Result<String, DecodeError> {
        let len = usize::from(self.read_u16()?);
        let start = self.pos;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| DecodeError::InvalidString(start))
    }

    /// Array element count. Negative counts decode as empty, matching the
    /// reference parser's loop behavior.
    fn read_count(&mut self) -> Result<usize, DecodeError> {
        let raw = self.read_i32()?;
        Ok(usize::try_from(raw).unwrap_or(0))
    }

    fn read_value(&mut self, tag: u8) -> Result<TagValue, DecodeError> {
        match tag {
            TAG_END => Ok(TagValue::End),
            TAG_BYTE => Ok(TagValue::Byte(self.read_i8()?)),
            TAG_SHORT => Ok(TagValue::Short(self.read_i16()?)),
            TAG_INT => Ok(TagValue::Int(self.read_i32()?)),
            TAG_LONG => Ok(TagValue::Long(self.read_i64()?)),
            TAG_FLOAT => Ok(TagValue::Float(self.read_f32()?)),
            TAG_DOUBLE => Ok(TagValue::Double(self.read_f64()?)),
            TAG_BYTE_ARRAY => {
                let count = self.read_count()?;
                let bytes = self.take(count)?;
                Ok(TagValue::ByteArray(bytes.iter().map(|&b| b as i8).collect()))
            }
            TAG_STRING => Ok(TagValue::String(self.read_string()?)),
            TAG_LIST => {
                let elem_tag = self.read_u8()?;
                let count = self.read_count()?;
                let mut items = Vec::with_capacity(count.min(4096));
                for _ in 0..count {
                    items.push(self.read_value(elem_tag)?);
                }
                Ok(TagValue::List(elem_tag, items))
            }
            TAG_COMPOUND => {
                let mut fields = Vec::new();
                loop {
                    let field_tag = self.read_u8()?;
                    if field_tag == TAG_END {
                        break;
                    }
                    let name = self.read_string()?;
                    fields.push((name, self.read_value(field_tag)?));
                }
                Ok(TagValue::Compound(fields))
            }
            TAG_INT_ARRAY => {
                let count = self.read_count()?;
                let mut items = Vec::with_capacity(count.min(4096));
                for _ in 0..count {
                    items.push(self.read_i32()?);
                }
                Ok(TagValue::IntArray(items))
            }
            TAG_LONG_ARRAY => {
                let count = self.read_count()?;
                let mut items = Vec::with_capacity(count.min(4096));
                for _ in 0..count {
                    items.push(self.read_i64()?);
                }
                Ok(TagValue::LongArray(items))
            }
            other => Err(DecodeError::UnknownTag {
                tag: other,
                offset: self.pos.saturating_sub(1),
            }),
        }
    }
}
