//! Benchmarks for tuple encoding and descriptor lookups

use std::sync::Arc;

use bytes::BytesMut;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use strata::codec::{FieldValue, OrderedDecoder, OrderedEncoder, TupleCodecHandler};
use strata::descriptor::RelationDesc;
use strata::{Config, DescriptorHandler, DescriptorHandlerImpl, KvHandler, MemKvHandler};

fn codec_benchmarks(c: &mut Criterion) {
    let fields = vec![
        FieldValue::Uint64(7),
        FieldValue::Uint64(42),
        FieldValue::String("orders_by_region".to_string()),
        FieldValue::Bytes(vec![0u8; 256]),
    ];

    c.bench_function("encode_value", |b| {
        b.iter(|| {
            let mut buf = BytesMut::with_capacity(320);
            for field in &fields {
                OrderedEncoder.encode_field(&mut buf, black_box(field));
            }
            buf
        })
    });

    let mut encoded = BytesMut::new();
    for field in &fields {
        OrderedEncoder.encode_field(&mut encoded, field);
    }
    c.bench_function("decode_value", |b| {
        b.iter(|| {
            let mut rest = black_box(&encoded[..]);
            while !rest.is_empty() {
                let (next, item) = OrderedDecoder.decode_field(rest).unwrap();
                black_box(item);
                rest = next;
            }
        })
    });

    let handler = TupleCodecHandler::new(1);
    c.bench_function("encode_primary_key", |b| {
        b.iter(|| {
            handler
                .get_encoder()
                .encode_primary_index_key(0, 1, 1, black_box(&fields[..2]))
        })
    });
}

fn descriptor_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("load_relation_by_name");
    for count in [10u32, 100, 1000] {
        let kv: Arc<dyn KvHandler> = Arc::new(MemKvHandler::new());
        let handler = DescriptorHandlerImpl::from_config(&Config::default(), kv).unwrap();
        for id in 1..=count {
            handler
                .store_relation_desc_by_id(1, id as u64, &RelationDesc::new(id, format!("t{}", id)))
                .unwrap();
        }
        let last = format!("t{}", count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &last, |b, name| {
            b.iter(|| handler.load_relation_desc_by_name(1, name).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, codec_benchmarks, descriptor_benchmarks);
criterion_main!(benches);
