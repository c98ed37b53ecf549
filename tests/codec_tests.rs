//! Tuple Codec Tests
//!
//! Tests verify:
//! - Byte order of encoded fields matches value order, per type
//! - Tuple keys sort by (tenant, db, table, index, fields...)
//! - Index prefix and primary key decoding
//! - Value serializer consumes exactly one field at a time
//! - Malformed input is rejected
//! - Key successors bound paged scans
//! - Row IDs increase monotonically

use std::cmp::Ordering;

use bytes::BytesMut;
use proptest::prelude::*;
use strata::codec::{
    decode_fields, encode_fields, successor_of_key, successor_of_prefix, DefaultValueSerializer,
    FieldValue, IndexPrefix, OrderedDecoder, OrderedEncoder, RowIdGenerator, TupleCodecHandler,
    ValueSerializer, ValueType,
};
use strata::StrataError;

// =============================================================================
// Helper Functions
// =============================================================================

fn encode(value: &FieldValue) -> Vec<u8> {
    let mut buf = BytesMut::new();
    OrderedEncoder.encode_field(&mut buf, value);
    buf.to_vec()
}

fn decode(data: &[u8]) -> FieldValue {
    let (rest, item) = OrderedDecoder.decode_field(data).unwrap();
    assert!(rest.is_empty());
    assert_eq!(item.bytes_read, data.len());
    item.value
}

// =============================================================================
// Order Preservation Properties
// =============================================================================

proptest! {
    #[test]
    fn prop_uint64_order(a in any::<u64>(), b in any::<u64>()) {
        let (ea, eb) = (encode(&a.into()), encode(&b.into()));
        prop_assert_eq!(ea.cmp(&eb), a.cmp(&b));
        prop_assert_eq!(decode(&ea), FieldValue::Uint64(a));
    }

    #[test]
    fn prop_int64_order(a in any::<i64>(), b in any::<i64>()) {
        let (ea, eb) = (encode(&a.into()), encode(&b.into()));
        prop_assert_eq!(ea.cmp(&eb), a.cmp(&b));
        prop_assert_eq!(decode(&ea), FieldValue::Int64(a));
    }

    #[test]
    fn prop_float64_order(
        a in any::<f64>().prop_filter("nan", |v| !v.is_nan()),
        b in any::<f64>().prop_filter("nan", |v| !v.is_nan()),
    ) {
        let (ea, eb) = (encode(&a.into()), encode(&b.into()));
        prop_assert_eq!(ea.cmp(&eb), a.total_cmp(&b));
        prop_assert_eq!(decode(&ea), FieldValue::Float64(a));
    }

    #[test]
    fn prop_bytes_order(
        a in prop::collection::vec(any::<u8>(), 0..24),
        b in prop::collection::vec(any::<u8>(), 0..24),
    ) {
        let (ea, eb) = (encode(&a.clone().into()), encode(&b.clone().into()));
        prop_assert_eq!(ea.cmp(&eb), a.cmp(&b));
        prop_assert_eq!(decode(&ea), FieldValue::Bytes(a));
    }

    #[test]
    fn prop_string_order(a in "\\PC{0,16}", b in "\\PC{0,16}") {
        let (ea, eb) = (encode(&a.as_str().into()), encode(&b.as_str().into()));
        prop_assert_eq!(ea.cmp(&eb), a.as_bytes().cmp(b.as_bytes()));
    }

    #[test]
    fn prop_tuple_key_order(a in any::<(u64, u64)>(), b in any::<(u64, u64)>()) {
        let enc = TupleCodecHandler::new(1);
        let key = |(parent, id): (u64, u64)| {
            enc.get_encoder()
                .encode_primary_index_key(0, 1, 1, &[parent.into(), id.into()])
        };
        prop_assert_eq!(key(a).cmp(&key(b)), a.cmp(&b));
    }
}

// =============================================================================
// Field Encoding Tests
// =============================================================================

#[test]
fn test_markers() {
    assert_eq!(encode(&FieldValue::Null), vec![0x00]);
    assert_eq!(encode(&"".into())[0], ValueType::String.marker());
    assert_eq!(encode(&Vec::<u8>::new().into())[0], ValueType::Bytes.marker());
    assert_eq!(encode(&7u64.into())[0], 0x20);
    assert_eq!(encode(&(-7i64).into())[0], 0x21);
    assert_eq!(encode(&1.5f64.into())[0], 0x22);
}

#[test]
fn test_string_prefix_sorts_first() {
    assert!(encode(&"abc".into()) < encode(&"abd".into()));
    assert!(encode(&"ab".into()) < encode(&"abc".into()));
    assert!(encode(&"ab".into()) < encode(&FieldValue::from("ab\u{0}")));
}

#[test]
fn test_decode_sequence_of_fields() {
    let values = vec![
        FieldValue::Uint64(9),
        FieldValue::String("name".to_string()),
        FieldValue::Null,
        FieldValue::Bytes(vec![0, 0, 1]),
        FieldValue::Int64(-3),
    ];
    let mut buf = BytesMut::new();
    for v in &values {
        OrderedEncoder.encode_field(&mut buf, v);
    }

    let mut rest = &buf[..];
    let mut decoded = Vec::new();
    while !rest.is_empty() {
        let (next, item) = OrderedDecoder.decode_field(rest).unwrap();
        decoded.push(item.value);
        rest = next;
    }
    assert_eq!(decoded, values);
}

#[test]
fn test_decode_typed_mismatch() {
    let buf = encode(&"text".into());

    let err = OrderedDecoder.decode_uint64(&buf).unwrap_err();
    assert!(matches!(
        err,
        StrataError::TypeMismatch {
            expected: ValueType::Uint64,
            actual: ValueType::String
        }
    ));
    let err = OrderedDecoder.decode_expected(&buf, ValueType::Bytes).unwrap_err();
    assert!(matches!(err, StrataError::TypeMismatch { .. }));
    assert_eq!(OrderedDecoder.decode_string(&buf).unwrap().1, "text");
}

#[test]
fn test_decode_malformed_input() {
    let cases: [&[u8]; 6] = [
        &[],
        &[0x99],
        &[0x20, 0, 0, 0],
        &[0x13, b'a', b'b'],
        &[0x12, 0x00, 0x05],
        &[0x13, 0xC3, 0x28, 0x00, 0x01],
    ];
    for case in cases {
        let err = OrderedDecoder.decode_field(case).unwrap_err();
        assert!(matches!(err, StrataError::Codec(_)), "input {:?}", case);
    }
}

// =============================================================================
// Tuple Key Tests
// =============================================================================

#[test]
fn test_decode_primary_index_key() {
    let handler = TupleCodecHandler::new(42);
    let key = handler
        .get_encoder()
        .encode_primary_index_key(0, 1, 1, &[5u64.into(), "users".into()]);

    let (prefix, items) = handler.get_decoder().decode_primary_index_key(&key).unwrap();

    assert_eq!(
        prefix,
        IndexPrefix {
            tenant_id: 42,
            db_id: 0,
            table_id: 1,
            index_id: 1
        }
    );
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].value, FieldValue::Uint64(5));
    assert_eq!(items[1].value, FieldValue::String("users".to_string()));
}

#[test]
fn test_index_prefix_is_key_prefix() {
    let handler = TupleCodecHandler::new(1);
    let enc = handler.get_encoder();
    let mut prefix = BytesMut::new();
    enc.encode_index_prefix(&mut prefix, 0, 1, 1);
    let mut table_prefix = BytesMut::new();
    enc.encode_table_prefix(&mut table_prefix, 0, 1);

    let key = enc.encode_primary_index_key(0, 1, 1, &[3u64.into()]);
    assert!(key.starts_with(&prefix));
    assert!(key.starts_with(&table_prefix));

    let other_table = enc.encode_primary_index_key(0, 2, 1, &[3u64.into()]);
    assert!(!other_table.starts_with(&prefix));
}

#[test]
fn test_tenants_are_disjoint() {
    let a = TupleCodecHandler::new(1);
    let b = TupleCodecHandler::new(2);
    let mut prefix_a = BytesMut::new();
    a.get_encoder().encode_tenant_prefix(&mut prefix_a);

    let key_b = b.get_encoder().encode_primary_index_key(0, 1, 1, &[]);
    assert!(!key_b.starts_with(&prefix_a));
    assert_eq!(a.get_decoder().tenant_id(), 1);
}

#[test]
fn test_decode_prefix_rejects_non_uint_component() {
    let mut buf = BytesMut::new();
    OrderedEncoder.encode_uint64(&mut buf, 1);
    OrderedEncoder.encode_string(&mut buf, "db");
    let handler = TupleCodecHandler::new(1);

    let err = handler.get_decoder().decode_index_prefix(&buf).unwrap_err();
    assert!(matches!(err, StrataError::TypeMismatch { .. }));
}

// =============================================================================
// Value Serializer Tests
// =============================================================================

#[test]
fn test_serializer_round_trip_fields() {
    let serializer = DefaultValueSerializer::new();
    let fields = vec![
        FieldValue::Uint64(1),
        FieldValue::Uint64(2),
        FieldValue::String("t".to_string()),
        FieldValue::Bytes(b"{}".to_vec()),
    ];

    let value = encode_fields(&serializer, &fields).unwrap();
    let items = decode_fields(&serializer, &value, 4).unwrap();

    let decoded: Vec<_> = items.into_iter().map(|i| i.value).collect();
    assert_eq!(decoded, fields);
}

#[test]
fn test_serializer_returns_rest() {
    let serializer = DefaultValueSerializer::new();
    let mut out = BytesMut::new();
    serializer.serialize_value(&mut out, &7u64.into()).unwrap();
    serializer.serialize_value(&mut out, &"x".into()).unwrap();

    let (rest, item) = serializer.deserialize_value(&out).unwrap();
    assert_eq!(item.value, FieldValue::Uint64(7));
    assert_eq!(item.bytes_read, 9);
    assert_eq!(rest.len(), out.len() - 9);
}

#[test]
fn test_decode_fields_too_few() {
    let serializer = DefaultValueSerializer::new();
    let value = encode_fields(&serializer, &[1u64.into()]).unwrap();

    assert!(decode_fields(&serializer, &value, 2).is_err());
}

// =============================================================================
// Key Successor Tests
// =============================================================================

#[test]
fn test_successor_of_key_is_next_key() {
    let key = b"k1".to_vec();
    let next = successor_of_key(&key);
    assert!(next > key);
    // nothing fits between a key and its successor
    assert!(next < b"k1\x00\x00".to_vec());
    assert!(next < b"k2".to_vec());
}

#[test]
fn test_successor_of_prefix_bounds_range() {
    let handler = TupleCodecHandler::new(1);
    let mut prefix = BytesMut::new();
    handler.get_encoder().encode_index_prefix(&mut prefix, 0, 1, 1);
    let end = successor_of_prefix(&prefix).unwrap();

    let inside = handler
        .get_encoder()
        .encode_primary_index_key(0, 1, 1, &[u64::MAX.into()]);
    let outside = handler
        .get_encoder()
        .encode_primary_index_key(0, 1, 2, &[0u64.into()]);
    assert!(inside < end);
    assert!(outside >= end);
    assert_eq!(successor_of_prefix(&[0xFF]), None);
}

// =============================================================================
// Row ID Tests
// =============================================================================

#[test]
fn test_row_ids_strictly_increase() {
    let gen = RowIdGenerator::new();
    let mut last = gen.next(0);
    for _ in 0..10_000 {
        let id = gen.next(0);
        assert_eq!(id.cmp(&last), Ordering::Greater);
        last = id;
    }
}

#[test]
fn test_row_id_carries_node_bits() {
    let gen = RowIdGenerator::new();
    let id = gen.next(0x15);
    assert_eq!(id & 0x7FFF, 0x15);
}
