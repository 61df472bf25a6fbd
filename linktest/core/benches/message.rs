use criterion::{black_box, criterion_group, criterion_main, Criterion};

use linktest_core::{sanitize, Message, RadioConfig, TestPlan};

fn bench_message(c: &mut Criterion) {
    let plan = TestPlan::builder()
        .roster([1, 2, 3])
        .p2p(RadioConfig::lora())
        .build()
        .expect("valid plan");
    let message = plan.message(7);

    c.bench_function("encode", |b| {
        let mut buf = [0u8; 256];
        b.iter(|| message.encode(black_box(&mut buf)))
    });

    c.bench_function("decode_received", |b| {
        let mut buf = [0u8; 256];
        let len = message.encode(&mut buf).expect("fits");
        b.iter(|| Message::from_received(black_box(&buf[..len])))
    });

    c.bench_function("sanitize_256", |b| {
        let raw: Vec<u8> = (0u8..=255).collect();
        b.iter(|| {
            let mut bytes = raw.clone();
            sanitize(black_box(&mut bytes))
        })
    });
}

criterion_group!(benches, bench_message);
criterion_main!(benches);
