use criterion::{criterion_group, criterion_main, Criterion};
use linkcore::message::{Message, MessageType};

fn encode_decode(c: &mut Criterion) {
    let payload = vec![0u8; 512];

    c.bench_function("encode video frame", |b| {
        b.iter(|| Message::encode(MessageType::Video, 0, 0, &payload))
    });

    let encoded = Message::encode(MessageType::Video, 0, 0, &payload).into_bytes();
    c.bench_function("decode video frame", |b| {
        b.iter(|| Message::from_bytes(encoded.clone()).unwrap())
    });
}

criterion_group!(benches, encode_decode);
criterion_main!(benches);
