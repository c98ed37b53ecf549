//! Tuple Codec Module
//!
//! Maps typed tuples onto ordered byte strings.
//!
//! ## Responsibilities
//! - Order-preserving encoding of single fields (`OrderedEncoder`)
//! - Tuple keys led by (tenant, db, table, index) (`TupleKeyEncoder`)
//! - Self-describing tuple values (`ValueSerializer`)
//! - Key successors used to page through prefix scans
//!
//! ## Round Trip
//! ```text
//!   [FieldValue, ...] ──serialize_value──▶ bytes ──deserialize_value──▶ [DecodedItem, ...]
//! ```

mod key;
mod ordered;
mod row_id;
mod serializer;
mod tuple;
mod value;

pub use key::{successor_of_key, successor_of_prefix};
pub use ordered::{OrderedDecoder, OrderedEncoder};
pub use row_id::RowIdGenerator;
pub use serializer::{decode_fields, encode_fields, DefaultValueSerializer, ValueSerializer};
pub use tuple::{
    IndexPrefix, TupleCodecHandler, TupleKey, TupleKeyDecoder, TupleKeyEncoder, TupleValue,
};
pub use value::{DecodedItem, FieldValue, ValueType};
