//! Benchmarks for pngframe encoding.
//!
//! Compares against the `image` crate for still PNG encoding, and measures
//! filter strategies, interlacing, palette output and animations.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use image::ImageEncoder;

use pngframe::png::{self, FilterType, InterlaceMode, PngEncoder, PngEncoderOptions};
use pngframe::{FrameMetadata, Image, ImageFrame, PixelFormat, PngColorType};

/// Generate a test image with gradient pattern.
fn generate_test_image(width: u32, height: u32) -> Vec<u8> {
    let mut pixels = Vec::with_capacity((width * height * 3) as usize);
    for y in 0..height {
        for x in 0..width {
            let r = ((x * 255) / width) as u8;
            let g = ((y * 255) / height) as u8;
            let b = (((x + y) * 127) / (width + height)) as u8;
            pixels.extend_from_slice(&[r, g, b]);
        }
    }
    pixels
}

/// Generate a test image with random-ish pattern (harder to compress).
fn generate_noisy_image(width: u32, height: u32) -> Vec<u8> {
    let mut pixels = Vec::with_capacity((width * height * 3) as usize);
    let mut seed = 12345u32;
    for _ in 0..(width * height * 3) {
        // Simple LCG for deterministic "random" values
        seed = seed.wrapping_mul(1103515245).wrapping_add(12345);
        pixels.push((seed >> 16) as u8);
    }
    pixels
}

fn rgb_image(width: u32, height: u32, pixels: Vec<u8>) -> Image {
    Image::new(ImageFrame::from_u8(width, height, PixelFormat::Rgb8, pixels).unwrap())
}

fn png_encoding_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("PNG Encoding");

    for size in [64, 128, 256, 512].iter() {
        let pixels = generate_test_image(*size, *size);
        let pixel_bytes = (*size as u64) * (*size as u64) * 3;
        let image = rgb_image(*size, *size, pixels.clone());

        group.throughput(Throughput::Bytes(pixel_bytes));

        let mut png_buf = Vec::new();
        group.bench_with_input(
            BenchmarkId::new("pngframe", format!("{size}x{size}")),
            &image,
            |b, image| {
                b.iter(|| {
                    png::encode_into(&mut png_buf, black_box(image), &PngEncoderOptions::default())
                        .unwrap()
                });
            },
        );

        // Compare with image crate
        group.bench_with_input(
            BenchmarkId::new("image_crate", format!("{size}x{size}")),
            &pixels,
            |b, pixels| {
                b.iter(|| {
                    let mut output = Vec::new();
                    let encoder = image::codecs::png::PngEncoder::new(&mut output);
                    encoder
                        .write_image(
                            black_box(pixels),
                            *size,
                            *size,
                            image::ExtendedColorType::Rgb8,
                        )
                        .unwrap();
                    output
                });
            },
        );
    }

    group.finish();
}

fn filter_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("PNG Filters");
    let image = rgb_image(256, 256, generate_noisy_image(256, 256));
    let filters = [
        ("none", FilterType::None),
        ("sub", FilterType::Sub),
        ("paeth", FilterType::Paeth),
        ("adaptive", FilterType::Adaptive),
    ];

    for (name, filter) in filters {
        let options = PngEncoderOptions {
            filter: Some(filter),
            ..PngEncoderOptions::default()
        };
        let mut buf = Vec::new();
        group.bench_function(name, |b| {
            b.iter(|| {
                png::encode_into(&mut buf, black_box(&image), &options).unwrap();
                buf.len()
            });
        });
    }

    group.finish();
}

fn variant_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("PNG Variants");
    let image = rgb_image(256, 256, generate_test_image(256, 256));

    let interlaced = PngEncoderOptions {
        interlace: Some(InterlaceMode::Adam7),
        ..PngEncoderOptions::default()
    };
    let mut buf = Vec::new();
    group.bench_function("adam7", |b| {
        b.iter(|| {
            png::encode_into(&mut buf, black_box(&image), &interlaced).unwrap();
            buf.len()
        });
    });

    let palette = PngEncoderOptions {
        color_type: Some(PngColorType::Palette),
        ..PngEncoderOptions::default()
    };
    group.bench_function("palette", |b| {
        b.iter(|| {
            png::encode_into(&mut buf, black_box(&image), &palette).unwrap();
            buf.len()
        });
    });

    for (name, options) in [
        ("fast", PngEncoderOptions::fast()),
        ("max_compression", PngEncoderOptions::max_compression()),
    ] {
        group.bench_function(name, |b| {
            b.iter(|| {
                png::encode_into(&mut buf, black_box(&image), &options).unwrap();
                buf.len()
            });
        });
    }

    group.finish();
}

fn animation_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("APNG Encoding");
    let frames: Vec<ImageFrame> = (0..8u32)
        .map(|i| {
            let mut pixels = generate_test_image(128, 128);
            pixels.rotate_left((i * 3 * 128) as usize);
            ImageFrame::from_u8(128, 128, PixelFormat::Rgb8, pixels)
                .unwrap()
                .with_metadata(FrameMetadata::with_delay_ms(40))
        })
        .collect();
    let image = Image::from_frames(frames).unwrap();

    group.throughput(Throughput::Bytes(8 * 128 * 128 * 3));
    group.bench_function("8 frames 128x128", |b| {
        let mut encoder = PngEncoder::new(PngEncoderOptions::default());
        b.iter(|| encoder.encode_to_vec(black_box(&image)).unwrap().len());
    });

    group.finish();
}

criterion_group!(
    benches,
    png_encoding_benchmark,
    filter_benchmark,
    variant_benchmark,
    animation_benchmark
);
criterion_main!(benches);
