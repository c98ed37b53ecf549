//! Order-preserving field encoding
//!
//! For two values of the same type, comparing their encodings byte by byte
//! gives the same result as comparing the values.
//!
//! ## Field Layout
//! ```text
//! ┌────────────┬─────────────────────────────────────────────┐
//! │ Marker (1) │ Payload                                     │
//! └────────────┴─────────────────────────────────────────────┘
//!   Null       no payload
//!   Uint64     8 bytes big-endian
//!   Int64      8 bytes big-endian, sign bit flipped
//!   Float64    8 bytes big-endian, total-order bits
//!   String     escaped bytes (0x00 → 0x00 0xFF), then 0x00 0x01
//!   Bytes      same as String
//! ```

use bytes::{BufMut, BytesMut};

use crate::error::{Result, StrataError};

use super::{DecodedItem, FieldValue, ValueType};

const ESCAPE: u8 = 0x00;
const ESCAPED_ZERO: u8 = 0xFF;
const TERMINATOR: u8 = 0x01;

// =============================================================================
// Encoder
// =============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct OrderedEncoder;

impl OrderedEncoder {
    pub fn encode_null(&self, buf: &mut BytesMut) {
        buf.put_u8(ValueType::Null.marker());
    }

    pub fn encode_uint64(&self, buf: &mut BytesMut, v: u64) {
        buf.reserve(9);
        buf.put_u8(ValueType::Uint64.marker());
        buf.put_u64(v);
    }

    pub fn encode_int64(&self, buf: &mut BytesMut, v: i64) {
        buf.reserve(9);
        buf.put_u8(ValueType::Int64.marker());
        buf.put_u64((v as u64) ^ (1 << 63));
    }

    pub fn encode_float64(&self, buf: &mut BytesMut, v: f64) {
        let bits = v.to_bits();
        let ordered = if bits >> 63 == 1 { !bits } else { bits | (1 << 63) };
        buf.reserve(9);
        buf.put_u8(ValueType::Float64.marker());
        buf.put_u64(ordered);
    }

    pub fn encode_string(&self, buf: &mut BytesMut, v: &str) {
        buf.put_u8(ValueType::String.marker());
        put_escaped(buf, v.as_bytes());
    }

    pub fn encode_bytes(&self, buf: &mut BytesMut, v: &[u8]) {
        buf.put_u8(ValueType::Bytes.marker());
        put_escaped(buf, v);
    }

    pub fn encode_field(&self, buf: &mut BytesMut, value: &FieldValue) {
        match value {
            FieldValue::Null => self.encode_null(buf),
            FieldValue::Int64(v) => self.encode_int64(buf, *v),
            FieldValue::Uint64(v) => self.encode_uint64(buf, *v),
            FieldValue::Float64(v) => self.encode_float64(buf, *v),
            FieldValue::String(s) => self.encode_string(buf, s),
            FieldValue::Bytes(b) => self.encode_bytes(buf, b),
        }
    }
}

fn put_escaped(buf: &mut BytesMut, data: &[u8]) {
    buf.reserve(data.len() + 2);
    for &b in data {
        if b == ESCAPE {
            buf.put_u8(ESCAPE);
            buf.put_u8(ESCAPED_ZERO);
        } else {
            buf.put_u8(b);
        }
    }
    buf.put_u8(ESCAPE);
    buf.put_u8(TERMINATOR);
}

// =============================================================================
// Decoder
// =============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct OrderedDecoder;

impl OrderedDecoder {
    /// Decode one field of any type, returning the undecoded rest
    pub fn decode_field<'a>(&self, data: &'a [u8]) -> Result<(&'a [u8], DecodedItem)> {
        let marker = *data
            .first()
            .ok_or_else(|| StrataError::Codec("empty input, expected a field".to_string()))?;
        let vt = ValueType::from_marker(marker)
            .ok_or_else(|| StrataError::Codec(format!("unknown field marker 0x{:02x}", marker)))?;
        let body = &data[1..];
        let (rest, value) = match vt {
            ValueType::Null => (body, FieldValue::Null),
            ValueType::Uint64 => {
                let (rest, v) = take_u64(body)?;
                (rest, FieldValue::Uint64(v))
            }
            ValueType::Int64 => {
                let (rest, v) = take_u64(body)?;
                (rest, FieldValue::Int64((v ^ (1 << 63)) as i64))
            }
            ValueType::Float64 => {
                let (rest, v) = take_u64(body)?;
                let bits = if v >> 63 == 1 { v & !(1 << 63) } else { !v };
                (rest, FieldValue::Float64(f64::from_bits(bits)))
            }
            ValueType::String => {
                let (rest, raw) = take_escaped(body)?;
                let s = String::from_utf8(raw)
                    .map_err(|e| StrataError::Codec(format!("invalid utf-8 string: {}", e)))?;
                (rest, FieldValue::String(s))
            }
            ValueType::Bytes => {
                let (rest, raw) = take_escaped(body)?;
                (rest, FieldValue::Bytes(raw))
            }
        };
        let read = data.len() - rest.len();
        Ok((rest, DecodedItem::new(value, read)))
    }

    /// Decode one field that must be of type `vt`
    pub fn decode_expected<'a>(
        &self,
        data: &'a [u8],
        vt: ValueType,
    ) -> Result<(&'a [u8], DecodedItem)> {
        let (rest, item) = self.decode_field(data)?;
        if !item.is_value_type(vt) {
            return Err(StrataError::TypeMismatch {
                expected: vt,
                actual: item.value_type(),
            });
        }
        Ok((rest, item))
    }

    pub fn decode_uint64<'a>(&self, data: &'a [u8]) -> Result<(&'a [u8], u64)> {
        let (rest, item) = self.decode_field(data)?;
        match item.value {
            FieldValue::Uint64(v) => Ok((rest, v)),
            other => Err(StrataError::TypeMismatch {
                expected: ValueType::Uint64,
                actual: other.value_type(),
            }),
        }
    }

    pub fn decode_string<'a>(&self, data: &'a [u8]) -> Result<(&'a [u8], String)> {
        let (rest, item) = self.decode_field(data)?;
        match item.value {
            FieldValue::String(s) => Ok((rest, s)),
            other => Err(StrataError::TypeMismatch {
                expected: ValueType::String,
                actual: other.value_type(),
            }),
        }
    }

    pub fn decode_bytes<'a>(&self, data: &'a [u8]) -> Result<(&'a [u8], Vec<u8>)> {
        let (rest, item) = self.decode_field(data)?;
        match item.value {
            FieldValue::Bytes(b) => Ok((rest, b)),
            other => Err(StrataError::TypeMismatch {
                expected: ValueType::Bytes,
                actual: other.value_type(),
            }),
        }
    }
}

fn take_u64(data: &[u8]) -> Result<(&[u8], u64)> {
    if data.len() < 8 {
        return Err(StrataError::Codec(format!(
            "truncated fixed-width field: expected 8 bytes, got {}",
            data.len()
        )));
    }
    let (head, rest) = data.split_at(8);
    let mut raw = [0u8; 8];
    raw.copy_from_slice(head);
    Ok((rest, u64::from_be_bytes(raw)))
}

fn take_escaped(data: &[u8]) -> Result<(&[u8], Vec<u8>)> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < data.len() {
        let b = data[i];
        if b != ESCAPE {
            out.push(b);
            i += 1;
            continue;
        }
        match data.get(i + 1) {
            Some(&ESCAPED_ZERO) => {
                out.push(ESCAPE);
                i += 2;
            }
            Some(&TERMINATOR) => return Ok((&data[i + 2..], out)),
            Some(other) => {
                return Err(StrataError::Codec(format!(
                    "invalid escape sequence 0x00 0x{:02x}",
                    other
                )))
            }
            None => break,
        }
    }
    Err(StrataError::Codec("unterminated byte field".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_embedded_zero() {
        let enc = OrderedEncoder;
        let mut buf = BytesMut::new();
        enc.encode_bytes(&mut buf, &[1, 0, 2]);
        assert_eq!(&buf[..], &[0x12, 1, 0, 0xFF, 2, 0, 1]);

        let (rest, item) = OrderedDecoder.decode_field(&buf).unwrap();
        assert!(rest.is_empty());
        assert_eq!(item.value, FieldValue::Bytes(vec![1, 0, 2]));
        assert_eq!(item.bytes_read, 7);
    }

    #[test]
    fn test_negative_ints_sort_first() {
        let enc = OrderedEncoder;
        let mut a = BytesMut::new();
        let mut b = BytesMut::new();
        enc.encode_int64(&mut a, -5);
        enc.encode_int64(&mut b, 3);
        assert!(a[..] < b[..]);
    }

    #[test]
    fn test_truncated_input() {
        let err = OrderedDecoder.decode_field(&[0x20, 1, 2]).unwrap_err();
        assert!(matches!(err, StrataError::Codec(_)));
    }
}
