#![allow(clippy::unwrap_used)]

use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

use shapewire::{from_cbor, from_json, serialize_json, to_cbor_vec, to_json_vec, Model};

#[derive(Model, Default, Debug, Clone)]
struct Point {
    x: f64,
    y: f64,
}

#[derive(Model, Default, Debug, Clone)]
struct Track {
    #[wire(max_length = 32)]
    name: String,
    #[wire(range(0, 1000))]
    id: u32,
    active: bool,
    points: Vec<Point>,
}

fn sample_track() -> Track {
    Track {
        name: "morning-run".into(),
        id: 42,
        active: true,
        points: (0..64)
            .map(|i| Point {
                x: f64::from(i) * 0.5,
                y: f64::from(i) * -1.25,
            })
            .collect(),
    }
}

fn bench_roundtrip(c: &mut Criterion) {
    let track = sample_track();
    let json = to_json_vec(&track).unwrap();
    let cbor = to_cbor_vec(&track).unwrap();

    c.bench_function("parse_json_track", |b| {
        b.iter(|| {
            let t: Track = from_json(black_box(&json)).unwrap();
            black_box(t);
        })
    });

    c.bench_function("parse_cbor_track", |b| {
        b.iter(|| {
            let t: Track = from_cbor(black_box(&cbor)).unwrap();
            black_box(t);
        })
    });

    let mut buf = vec![0u8; json.len() * 2];
    c.bench_function("serialize_json_track_slice", |b| {
        b.iter(|| {
            let n = serialize_json(black_box(&track), &mut buf).unwrap();
            black_box(n);
        })
    });

    c.bench_function("serialize_cbor_track_vec", |b| {
        b.iter(|| {
            let bytes = to_cbor_vec(black_box(&track)).unwrap();
            black_box(bytes);
        })
    });
}

criterion_group!(benches, bench_roundtrip);
criterion_main!(benches);
