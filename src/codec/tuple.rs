//! Tuple keys
//!
//! Every key of the catalog starts with the index prefix:
//!
//! ```text
//! ┌────────────┬────────────┬────────────┬────────────┬──────────────────┐
//! │ tenant_id  │ db_id      │ table_id   │ index_id   │ extra fields ... │
//! └────────────┴────────────┴────────────┴────────────┴──────────────────┘
//! ```
//!
//! Each component is an ordered `u64` field, so keys sort by
//! (tenant, db, table, index, ...) and a prefix scan on any leading
//! components returns exactly the keys below it.

use bytes::BytesMut;

use crate::error::Result;

use super::{DecodedItem, FieldValue, OrderedDecoder, OrderedEncoder};

pub type TupleKey = Vec<u8>;
pub type TupleValue = Vec<u8>;

/// Decoded leading components of a tuple key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexPrefix {
    pub tenant_id: u64,
    pub db_id: u64,
    pub table_id: u64,
    pub index_id: u64,
}

// =============================================================================
// Encoder
// =============================================================================

#[derive(Debug, Clone)]
pub struct TupleKeyEncoder {
    tenant_id: u64,
    oe: OrderedEncoder,
}

impl TupleKeyEncoder {
    pub fn new(tenant_id: u64) -> Self {
        Self {
            tenant_id,
            oe: OrderedEncoder,
        }
    }

    pub fn tenant_id(&self) -> u64 {
        self.tenant_id
    }

    pub fn ordered_encoder(&self) -> &OrderedEncoder {
        &self.oe
    }

    pub fn encode_tenant_prefix(&self, buf: &mut BytesMut) {
        self.oe.encode_uint64(buf, self.tenant_id);
    }

    pub fn encode_database_prefix(&self, buf: &mut BytesMut, db_id: u64) {
        self.encode_tenant_prefix(buf);
        self.oe.encode_uint64(buf, db_id);
    }

    pub fn encode_table_prefix(&self, buf: &mut BytesMut, db_id: u64, table_id: u64) {
        self.encode_database_prefix(buf, db_id);
        self.oe.encode_uint64(buf, table_id);
    }

    /// Append (tenant, db, table, index)
    pub fn encode_index_prefix(
        &self,
        buf: &mut BytesMut,
        db_id: u64,
        table_id: u64,
        index_id: u64,
    ) {
        self.encode_table_prefix(buf, db_id, table_id);
        self.oe.encode_uint64(buf, index_id);
    }

    /// Full key: index prefix followed by `fields`
    pub fn encode_primary_index_key(
        &self,
        db_id: u64,
        table_id: u64,
        index_id: u64,
        fields: &[FieldValue],
    ) -> TupleKey {
        let mut buf = BytesMut::with_capacity(36 + fields.len() * 9);
        self.encode_index_prefix(&mut buf, db_id, table_id, index_id);
        for field in fields {
            self.oe.encode_field(&mut buf, field);
        }
        buf.to_vec()
    }
}

// =============================================================================
// Decoder
// =============================================================================

#[derive(Debug, Clone)]
pub struct TupleKeyDecoder {
    tenant_id: u64,
    od: OrderedDecoder,
}

impl TupleKeyDecoder {
    pub fn new(tenant_id: u64) -> Self {
        Self {
            tenant_id,
            od: OrderedDecoder,
        }
    }

    pub fn tenant_id(&self) -> u64 {
        self.tenant_id
    }

    pub fn ordered_decoder(&self) -> &OrderedDecoder {
        &self.od
    }

    pub fn decode_index_prefix<'a>(&self, key: &'a [u8]) -> Result<(&'a [u8], IndexPrefix)> {
        let (rest, tenant_id) = self.od.decode_uint64(key)?;
        let (rest, db_id) = self.od.decode_uint64(rest)?;
        let (rest, table_id) = self.od.decode_uint64(rest)?;
        let (rest, index_id) = self.od.decode_uint64(rest)?;
        Ok((
            rest,
            IndexPrefix {
                tenant_id,
                db_id,
                table_id,
                index_id,
            },
        ))
    }

    /// Decode the index prefix and then every remaining field of `key`
    pub fn decode_primary_index_key(&self, key: &[u8]) -> Result<(IndexPrefix, Vec<DecodedItem>)> {
        let (mut rest, prefix) = self.decode_index_prefix(key)?;
        let mut items = Vec::new();
        while !rest.is_empty() {
            let (next, item) = self.od.decode_field(rest)?;
            items.push(item);
            rest = next;
        }
        Ok((prefix, items))
    }
}

// =============================================================================
// Handler
// =============================================================================

/// Encoder and decoder pair for one tenant
#[derive(Debug, Clone)]
pub struct TupleCodecHandler {
    encoder: TupleKeyEncoder,
    decoder: TupleKeyDecoder,
}

impl TupleCodecHandler {
    pub fn new(tenant_id: u64) -> Self {
        Self {
            encoder: TupleKeyEncoder::new(tenant_id),
            decoder: TupleKeyDecoder::new(tenant_id),
        }
    }

    pub fn get_encoder(&self) -> &TupleKeyEncoder {
        &self.encoder
    }

    pub fn get_decoder(&self) -> &TupleKeyDecoder {
        &self.decoder
    }
}
