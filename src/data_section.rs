//! Data section decoding
//!
//! Decodes the MaxMind DB data types over an untrusted,
//! immutable byte buffer. Every value starts with a control byte:
//!
//! ```text
//!   7 6 5 4 3 2 1 0
//!  [ type  |  size   ]   type 0 = extended: real type = next byte + 7
//!                        size 29/30/31 = 1/2/3 continuation bytes follow
//! ```
//!
//! Pointers (type 1) reuse the size bits as `SS VVV`: `SS` selects one of
//! four width classes and `VVV` supplies the high bits of the target offset.
//!
//! Two decoding styles are offered on [`DataDecoder`]:
//! - typed readers (`read_string`, `read_uint32`, `read_map`, ...) used by
//!   the record assemblers, which check the type of every value
//! - [`DataDecoder::decode_value`] which materialises any value as a
//!   [`DataValue`] tree, used for metadata inspection and raw output
//!
//! All readers take a `cursor`. When a value is stored inline the cursor ends
//! up after the payload; when it is a pointer the cursor ends up right after
//! the pointer itself, never after the pointed-to payload.
//!
//! See: https://maxmind.github.io/MaxMind-DB/

use crate::codec::{bytes_to_f32, bytes_to_f64, bytes_to_uint, bytes_to_uint_with_prefix, TextMode};
use crate::error::{DecodeError, Result};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Size values at or above this need continuation bytes
const SIZE_CONTINUATION: usize = 29;

/// Bias added to each size continuation width (1, 2, 3 bytes)
const SIZE_BIAS: [usize; 3] = [29, 285, 65_821];

/// Bias added to each pointer width class (1, 2, 3, 4 bytes)
const POINTER_BIAS: [usize; 4] = [0, 2_048, 526_336, 0];

/// Nesting limit for [`DataDecoder::decode_value`]
pub const MAX_DEPTH: usize = 128;

/// MMDB data types, numbered as on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum DataType {
    /// Type-extension marker (never a real value type)
    Extended = 0,
    /// Back-reference to another offset in the data section
    Pointer = 1,
    /// UTF-8 string
    String = 2,
    /// IEEE 754 double precision float
    Double = 3,
    /// Raw bytes
    Bytes = 4,
    /// Unsigned 16-bit integer
    Uint16 = 5,
    /// Unsigned 32-bit integer
    Uint32 = 6,
    /// Key-value map with string keys
    Map = 7,
    /// Signed 32-bit integer
    Int32 = 8,
    /// Unsigned 64-bit integer
    Uint64 = 9,
    /// Unsigned 128-bit integer
    Uint128 = 10,
    /// Ordered list of values
    Array = 11,
    /// Data cache container (reserved)
    Container = 12,
    /// End marker (reserved)
    EndMarker = 13,
    /// Boolean, value carried in the size bits
    Bool = 14,
    /// IEEE 754 single precision float
    Float = 15,
}

impl DataType {
    /// Map a numeric type tag to a data type
    pub fn from_tag(tag: u16) -> Result<Self> {
        Ok(match tag {
            0 => DataType::Extended,
            1 => DataType::Pointer,
            2 => DataType::String,
            3 => DataType::Double,
            4 => DataType::Bytes,
            5 => DataType::Uint16,
            6 => DataType::Uint32,
            7 => DataType::Map,
            8 => DataType::Int32,
            9 => DataType::Uint64,
            10 => DataType::Uint128,
            11 => DataType::Array,
            12 => DataType::Container,
            13 => DataType::EndMarker,
            14 => DataType::Bool,
            15 => DataType::Float,
            other => return Err(DecodeError::InvalidType(other)),
        })
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Extended => "extended",
            DataType::Pointer => "pointer",
            DataType::String => "string",
            DataType::Double => "double",
            DataType::Bytes => "bytes",
            DataType::Uint16 => "uint16",
            DataType::Uint32 => "uint32",
            DataType::Map => "map",
            DataType::Int32 => "int32",
            DataType::Uint64 => "uint64",
            DataType::Uint128 => "uint128",
            DataType::Array => "array",
            DataType::Container => "container",
            DataType::EndMarker => "end marker",
            DataType::Bool => "bool",
            DataType::Float => "float",
        };
        write!(f, "{} ({})", name, *self as u8)
    }
}

/// A decoded control byte
///
/// For pointers `size` holds the raw five size bits; the target is resolved
/// separately by [`DataDecoder::read_pointer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlByte {
    /// Numeric type tag (after applying the extension byte)
    pub tag: u16,
    /// Payload size: bytes for scalars, entries for maps and arrays
    pub size: usize,
    /// Offset of the first byte after the control byte(s)
    pub next_offset: usize,
}

impl ControlByte {
    /// The data type named by the tag
    pub fn data_type(&self) -> Result<DataType> {
        DataType::from_tag(self.tag)
    }
}

/// Location of a value's payload after any pointer has been followed
#[derive(Debug, Clone, Copy)]
struct Payload {
    offset: usize,
    size: usize,
    inline: bool,
}

/// Data value decoded from the data section
///
/// This enum represents every MMDB value type except pointers, which are
/// followed transparently.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DataValue {
    /// UTF-8 string
    String(String),
    /// IEEE 754 double precision float
    Double(f64),
    /// Raw byte array
    Bytes(Vec<u8>),
    /// Unsigned 16-bit integer
    Uint16(u16),
    /// Unsigned 32-bit integer
    Uint32(u32),
    /// Key-value map (string keys only)
    Map(HashMap<String, DataValue>),
    /// Signed 32-bit integer
    Int32(i32),
    /// Unsigned 64-bit integer
    Uint64(u64),
    /// Unsigned 128-bit integer
    Uint128(u128),
    /// Array of values
    Array(Vec<DataValue>),
    /// Boolean value
    Bool(bool),
    /// IEEE 754 single precision float
    Float(f32),
}

impl DataValue {
    /// Unsigned integer view of the value, if it is one
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            DataValue::Uint16(n) => Some(*n as u64),
            DataValue::Uint32(n) => Some(*n as u64),
            DataValue::Uint64(n) => Some(*n),
            _ => None,
        }
    }

    /// String view of the value, if it is one
    pub fn as_str(&self) -> Option<&str> {
        match self {
            DataValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Look up a key if the value is a map
    pub fn get(&self, key: &str) -> Option<&DataValue> {
        match self {
            DataValue::Map(map) => map.get(key),
            _ => None,
        }
    }
}

/// Data section decoder
///
/// Borrows the data section; offsets (including pointer targets) are
/// relative to the start of `buffer`.
#[derive(Debug, Clone, Copy)]
pub struct DataDecoder<'a> {
    buffer: &'a [u8],
    text_mode: TextMode,
}

impl<'a> DataDecoder<'a> {
    /// Create a decoder over a data section
    pub fn new(buffer: &'a [u8], text_mode: TextMode) -> Self {
        Self { buffer, text_mode }
    }

    /// The buffer being decoded
    pub fn buffer(&self) -> &'a [u8] {
        self.buffer
    }

    /// Text mode applied to string values
    pub fn text_mode(&self) -> TextMode {
        self.text_mode
    }

    /// Bounds-checked slice of the buffer
    fn slice(&self, offset: usize, len: usize) -> Result<&'a [u8]> {
        offset
            .checked_add(len)
            .and_then(|end| self.buffer.get(offset..end))
            .ok_or(DecodeError::Offset {
                offset,
                len,
                buffer_len: self.buffer.len(),
            })
    }

    fn byte(&self, offset: usize) -> Result<u8> {
        Ok(self.slice(offset, 1)?[0])
    }

    /// Decode the control byte(s) at `offset`
    ///
    /// Handles the type-extension byte and the 1-3 size continuation bytes.
    /// Pointer size bits are returned raw.
    pub fn read_control(&self, offset: usize) -> Result<ControlByte> {
        let ctrl = self.byte(offset)?;
        let mut next = offset + 1;

        let mut tag = (ctrl >> 5) as u16;
        if tag == DataType::Extended as u16 {
            tag = self.byte(next)? as u16 + 7;
            next += 1;
        }

        let size = (ctrl & 0x1F) as usize;
        if tag == DataType::Pointer as u16 || size < SIZE_CONTINUATION {
            return Ok(ControlByte {
                tag,
                size,
                next_offset: next,
            });
        }

        let extra = size - SIZE_CONTINUATION + 1;
        let bytes = self.slice(next, extra)?;
        let size = bytes_to_uint(bytes) as usize + SIZE_BIAS[extra - 1];
        Ok(ControlByte {
            tag,
            size,
            next_offset: next + extra,
        })
    }

    /// Resolve a pointer whose raw size bits are `size` and whose trailing
    /// bytes start at `offset`
    ///
    /// Returns `(target, offset_after_pointer)`.
    pub fn read_pointer(&self, size: usize, offset: usize) -> Result<(usize, usize)> {
        let class = (size >> 3) & 0x3;
        let width = class + 1;
        let bytes = self.slice(offset, width)?;
        let prefix = if width == 4 { 0 } else { (size & 0x7) as u64 };
        let target = bytes_to_uint_with_prefix(prefix, bytes) as usize + POINTER_BIAS[class];
        Ok((target, offset + width))
    }

    /// Find the payload of a value of the `expected` type at `cursor`,
    /// following a pointer if one is stored there
    ///
    /// For pointers the cursor is moved past the pointer; for inline values it
    /// is left at the payload start and the caller advances it.
    fn locate(&self, cursor: &mut usize, expected: DataType) -> Result<Payload> {
        let ctrl = self.read_control(*cursor)?;
        let actual = ctrl.data_type()?;
        if actual == expected {
            *cursor = ctrl.next_offset;
            return Ok(Payload {
                offset: ctrl.next_offset,
                size: ctrl.size,
                inline: true,
            });
        }
        if actual != DataType::Pointer {
            return Err(DecodeError::UnexpectedType { expected, actual });
        }

        let (target, after) = self.read_pointer(ctrl.size, ctrl.next_offset)?;
        let target_ctrl = self.read_control(target)?;
        let actual = target_ctrl.data_type()?;
        if actual != expected {
            return Err(DecodeError::UnexpectedType { expected, actual });
        }
        *cursor = after;
        Ok(Payload {
            offset: target_ctrl.next_offset,
            size: target_ctrl.size,
            inline: false,
        })
    }

    /// Read a fixed-width scalar payload, advancing past inline data
    fn scalar(&self, cursor: &mut usize, expected: DataType, max: usize) -> Result<&'a [u8]> {
        let payload = self.locate(cursor, expected)?;
        if payload.size > max {
            return Err(DecodeError::InvalidSize {
                data_type: expected,
                size: payload.size,
            });
        }
        let bytes = self.slice(payload.offset, payload.size)?;
        if payload.inline {
            *cursor = payload.offset + payload.size;
        }
        Ok(bytes)
    }

    /// Read a string value
    pub fn read_string(&self, cursor: &mut usize) -> Result<String> {
        let payload = self.locate(cursor, DataType::String)?;
        let bytes = self.slice(payload.offset, payload.size)?;
        let text = self.text_mode.decode(bytes, payload.offset)?;
        if payload.inline {
            *cursor = payload.offset + payload.size;
        }
        Ok(text)
    }

    /// Read a map key as raw bytes
    ///
    /// Keys are never transliterated so assemblers can match them exactly.
    pub fn read_map_key(&self, cursor: &mut usize) -> Result<&'a [u8]> {
        let payload = self.locate(cursor, DataType::String).map_err(|e| match e {
            DecodeError::UnexpectedType { actual, .. } => DecodeError::MapKeyType { actual },
            other => other,
        })?;
        let bytes = self.slice(payload.offset, payload.size)?;
        if payload.inline {
            *cursor = payload.offset + payload.size;
        }
        Ok(bytes)
    }

    /// Read an unsigned 16-bit integer
    pub fn read_uint16(&self, cursor: &mut usize) -> Result<u16> {
        Ok(bytes_to_uint(self.scalar(cursor, DataType::Uint16, 2)?) as u16)
    }

    /// Read an unsigned 32-bit integer
    pub fn read_uint32(&self, cursor: &mut usize) -> Result<u32> {
        Ok(bytes_to_uint(self.scalar(cursor, DataType::Uint32, 4)?) as u32)
    }

    /// Read an unsigned 64-bit integer
    pub fn read_uint64(&self, cursor: &mut usize) -> Result<u64> {
        Ok(bytes_to_uint(self.scalar(cursor, DataType::Uint64, 8)?))
    }

    /// Read a double
    pub fn read_float64(&self, cursor: &mut usize) -> Result<f64> {
        let bytes = self.scalar(cursor, DataType::Double, 8)?;
        let buf: [u8; 8] = bytes.try_into().map_err(|_| DecodeError::InvalidSize {
            data_type: DataType::Double,
            size: bytes.len(),
        })?;
        Ok(bytes_to_f64(buf))
    }

    /// Read a boolean (the value lives in the size bits)
    pub fn read_bool(&self, cursor: &mut usize) -> Result<bool> {
        let payload = self.locate(cursor, DataType::Bool)?;
        match payload.size {
            0 => Ok(false),
            1 => Ok(true),
            size => Err(DecodeError::InvalidSize {
                data_type: DataType::Bool,
                size,
            }),
        }
    }

    /// Iterate the entries of a map, handing each key to `entry`
    ///
    /// `entry` must consume exactly one value from the cursor it is given.
    pub fn read_map<F>(&self, cursor: &mut usize, mut entry: F) -> Result<()>
    where
        F: FnMut(&'a [u8], &mut usize) -> Result<()>,
    {
        let payload = self.locate(cursor, DataType::Map)?;
        let mut inner = payload.offset;
        for _ in 0..payload.size {
            let key = self.read_map_key(&mut inner)?;
            entry(key, &mut inner)?;
        }
        if payload.inline {
            *cursor = inner;
        }
        Ok(())
    }

    /// Iterate the elements of an array
    ///
    /// `element` must consume exactly one value from the cursor it is given.
    pub fn read_array<F>(&self, cursor: &mut usize, mut element: F) -> Result<()>
    where
        F: FnMut(&mut usize) -> Result<()>,
    {
        let payload = self.locate(cursor, DataType::Array)?;
        let mut inner = payload.offset;
        for _ in 0..payload.size {
            element(&mut inner)?;
        }
        if payload.inline {
            *cursor = inner;
        }
        Ok(())
    }

    /// Read a map whose values are all strings
    pub fn read_string_map(&self, cursor: &mut usize) -> Result<BTreeMap<String, String>> {
        let mut map = BTreeMap::new();
        self.read_map(cursor, |key, cursor| {
            let value = self.read_string(cursor)?;
            map.insert(String::from_utf8_lossy(key).into_owned(), value);
            Ok(())
        })?;
        Ok(map)
    }

    /// Read an array whose elements are all strings
    pub fn read_string_slice(&self, cursor: &mut usize) -> Result<Vec<String>> {
        let mut items = Vec::new();
        self.read_array(cursor, |cursor| {
            items.push(self.read_string(cursor)?);
            Ok(())
        })?;
        Ok(items)
    }

    /// Skip over one value of any type
    pub fn skip_value(&self, cursor: &mut usize) -> Result<()> {
        self.decode_value(cursor).map(|_| ())
    }

    /// Decode the value at `offset` without keeping a cursor
    pub fn decode(&self, offset: usize) -> Result<DataValue> {
        let mut cursor = offset;
        self.decode_value(&mut cursor)
    }

    /// Decode one value of any type, following pointers
    pub fn decode_value(&self, cursor: &mut usize) -> Result<DataValue> {
        self.decode_at(cursor, 0)
    }

    fn decode_at(&self, cursor: &mut usize, depth: usize) -> Result<DataValue> {
        if depth > MAX_DEPTH {
            return Err(DecodeError::DepthLimit(MAX_DEPTH));
        }

        let ctrl = self.read_control(*cursor)?;
        let data_type = ctrl.data_type()?;

        if data_type == DataType::Pointer {
            let (target, after) = self.read_pointer(ctrl.size, ctrl.next_offset)?;
            let target_ctrl = self.read_control(target)?;
            let target_type = target_ctrl.data_type()?;
            // Pointers to pointers are invalid
            if target_type == DataType::Pointer {
                return Err(DecodeError::UnexpectedType {
                    expected: DataType::Map,
                    actual: target_type,
                });
            }
            let mut target_cursor = target;
            let value = self.decode_at(&mut target_cursor, depth)?;
            *cursor = after;
            return Ok(value);
        }

        let mut pos = ctrl.next_offset;
        let value = self.decode_payload(data_type, ctrl.size, &mut pos, depth)?;
        *cursor = pos;
        Ok(value)
    }

    fn decode_payload(
        &self,
        data_type: DataType,
        size: usize,
        pos: &mut usize,
        depth: usize,
    ) -> Result<DataValue> {
        let fixed = |width: usize| -> Result<&'a [u8]> {
            if size > width {
                return Err(DecodeError::InvalidSize { data_type, size });
            }
            self.slice(*pos, size)
        };

        let value = match data_type {
            DataType::String => {
                let bytes = self.slice(*pos, size)?;
                DataValue::String(self.text_mode.decode(bytes, *pos)?)
            }
            DataType::Bytes => DataValue::Bytes(self.slice(*pos, size)?.to_vec()),
            DataType::Double => {
                let bytes = self.slice(*pos, size)?;
                let buf: [u8; 8] = bytes
                    .try_into()
                    .map_err(|_| DecodeError::InvalidSize { data_type, size })?;
                DataValue::Double(bytes_to_f64(buf))
            }
            DataType::Float => {
                let bytes = self.slice(*pos, size)?;
                let buf: [u8; 4] = bytes
                    .try_into()
                    .map_err(|_| DecodeError::InvalidSize { data_type, size })?;
                DataValue::Float(bytes_to_f32(buf))
            }
            DataType::Uint16 => DataValue::Uint16(bytes_to_uint(fixed(2)?) as u16),
            DataType::Uint32 => DataValue::Uint32(bytes_to_uint(fixed(4)?) as u32),
            DataType::Int32 => DataValue::Int32(bytes_to_uint(fixed(4)?) as u32 as i32),
            DataType::Uint64 => DataValue::Uint64(bytes_to_uint(fixed(8)?)),
            DataType::Uint128 => {
                let bytes = fixed(16)?;
                DataValue::Uint128(bytes.iter().fold(0u128, |acc, &b| (acc << 8) | b as u128))
            }
            DataType::Bool => match size {
                0 | 1 => return Ok(DataValue::Bool(size == 1)),
                _ => return Err(DecodeError::InvalidSize { data_type, size }),
            },
            DataType::Map => {
                let mut map = HashMap::with_capacity(size.min(self.remaining(*pos)));
                for _ in 0..size {
                    let key = self.read_map_key(pos)?;
                    let key = String::from_utf8_lossy(key).into_owned();
                    let value = self.decode_at(pos, depth + 1)?;
                    map.insert(key, value);
                }
                return Ok(DataValue::Map(map));
            }
            DataType::Array => {
                let mut items = Vec::with_capacity(size.min(self.remaining(*pos)));
                for _ in 0..size {
                    items.push(self.decode_at(pos, depth + 1)?);
                }
                return Ok(DataValue::Array(items));
            }
            DataType::Pointer | DataType::Extended | DataType::Container | DataType::EndMarker => {
                return Err(DecodeError::InvalidType(data_type as u16));
            }
        };
        *pos += size;
        Ok(value)
    }

    fn remaining(&self, offset: usize) -> usize {
        self.buffer.len().saturating_sub(offset)
    }
}
