//! Benchmarks for the per-payload work on the decode path
//!
//! - Credential classification for matching and non-matching payloads
//! - RGB565 to grayscale conversion of a QVGA frame
//!
//! Platform: Cross-platform (synthetic data, CI-safe)

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use scanlink::pixel::to_grayscale;
use scanlink::{CredentialParser, Frame, FrameFormat, PixelFormat, TruncationPolicy};
use std::hint::black_box;

fn bench_credential_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("credential_parse");

    let payloads: [(&str, Vec<u8>); 4] = [
        ("wifi_uri", b"WIFI:T:WPA;S:Office Network;P:correct horse battery staple;;".to_vec()),
        ("plain_text", b"https://example.com/menu?table=12".to_vec()),
        ("overlong", format!("S:{};P:{};", "n".repeat(200), "p".repeat(200)).into_bytes()),
        ("nul_terminated", b"S:Home;P:hunter2;\0\0\0\0\0\0\0\0".to_vec()),
    ];

    for policy in [TruncationPolicy::Silent, TruncationPolicy::Reject] {
        let parser = CredentialParser::new(policy);
        for (name, payload) in &payloads {
            group.throughput(Throughput::Bytes(payload.len() as u64));
            group.bench_function(format!("{policy:?}/{name}"), |b| {
                b.iter(|| black_box(parser.parse(black_box(payload))))
            });
        }
    }

    group.finish();
}

fn bench_rgb565_conversion(c: &mut Criterion) {
    let format = FrameFormat::new(320, 240, PixelFormat::Rgb565);
    let data: Vec<u8> = (0..format.buffer_len()).map(|i| (i % 251) as u8).collect();
    let frame = Frame::new(data, format, 0);

    let mut group = c.benchmark_group("rgb565_to_grayscale");
    group.throughput(Throughput::Elements(format.pixel_count() as u64));
    group.bench_function("qvga", |b| b.iter(|| black_box(to_grayscale(black_box(&frame)).len())));
    group.finish();
}

criterion_group!(benches, bench_credential_parse, bench_rgb565_conversion);
criterion_main!(benches);
