//! Value serialization
//!
//! A tuple value is a run of self-describing fields. Serializers append one
//! field at a time to a running buffer; deserializers consume one field and
//! hand back the rest, so callers decode exactly as many fields as they
//! encoded.

use bytes::BytesMut;

use crate::error::Result;

use super::{DecodedItem, FieldValue, OrderedDecoder, OrderedEncoder};

pub trait ValueSerializer: Send + Sync {
    /// Append `value` to `out`
    fn serialize_value(&self, out: &mut BytesMut, value: &FieldValue) -> Result<()>;

    /// Decode the first field of `data`, returning the undecoded rest
    fn deserialize_value<'a>(&self, data: &'a [u8]) -> Result<(&'a [u8], DecodedItem)>;
}

/// Fields written with the order-preserving encoding: a type marker and
/// then the field payload
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultValueSerializer {
    oe: OrderedEncoder,
    od: OrderedDecoder,
}

impl DefaultValueSerializer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ValueSerializer for DefaultValueSerializer {
    fn serialize_value(&self, out: &mut BytesMut, value: &FieldValue) -> Result<()> {
        self.oe.encode_field(out, value);
        Ok(())
    }

    fn deserialize_value<'a>(&self, data: &'a [u8]) -> Result<(&'a [u8], DecodedItem)> {
        self.od.decode_field(data)
    }
}

/// Serialize `fields` in order into a fresh value
pub fn encode_fields(
    serializer: &dyn ValueSerializer,
    fields: &[FieldValue],
) -> Result<Vec<u8>> {
    let mut out = BytesMut::new();
    for field in fields {
        serializer.serialize_value(&mut out, field)?;
    }
    Ok(out.to_vec())
}

/// Deserialize exactly `count` fields from `data`
pub fn decode_fields(
    serializer: &dyn ValueSerializer,
    mut data: &[u8],
    count: usize,
) -> Result<Vec<DecodedItem>> {
    let mut items = Vec::with_capacity(count);
    for _ in 0..count {
        let (rest, item) = serializer.deserialize_value(data)?;
        items.push(item);
        data = rest;
    }
    Ok(items)
}
