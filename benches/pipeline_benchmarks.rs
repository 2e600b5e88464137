use breed_classifier::{
    decide, softmax, ImagePreprocessor, InputTransform, OutputMode, OutputNormalizer,
    RawOutputVector,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use std::io::Cursor;

fn encoded_image(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let mut buffer = ImageBuffer::new(width, height);
    for (x, y, pixel) in buffer.enumerate_pixels_mut() {
        *pixel = Rgb([(x % 256) as u8, (y % 256) as u8, ((x ^ y) % 256) as u8]);
    }
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(buffer)
        .write_to(&mut out, format)
        .expect("encode benchmark image");
    out.into_inner()
}

fn bench_preprocessing(c: &mut Criterion) {
    let mut group = c.benchmark_group("preprocessing");
    let preprocessor = ImagePreprocessor::new([320, 320], InputTransform::EfficientNetV2);

    for (width, height) in [(320, 320), (640, 480), (1920, 1080)] {
        let jpeg = encoded_image(width, height, ImageFormat::Jpeg);
        group.bench_with_input(
            BenchmarkId::new("jpeg_to_tensor", format!("{width}x{height}")),
            &jpeg,
            |b, bytes| b.iter(|| preprocessor.preprocess(black_box(bytes)).expect("preprocess")),
        );
    }

    let decoded = ImagePreprocessor::decode(&encoded_image(1024, 768, ImageFormat::Png))
        .expect("decode benchmark image");
    for transform in [InputTransform::EfficientNetV2, InputTransform::imagenet()] {
        let preprocessor = ImagePreprocessor::new([320, 320], transform);
        group.bench_function(BenchmarkId::new("resize_and_transform", transform), |b| {
            b.iter(|| {
                preprocessor
                    .preprocess_image(black_box(&decoded))
                    .expect("preprocess")
            });
        });
    }

    group.finish();
}

fn bench_normalization(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalization");

    for categories in [10_usize, 120, 1000] {
        let logits: Vec<f32> = (0..categories).map(|i| (i as f32 * 0.37).sin() * 8.0).collect();
        let raw = RawOutputVector::from_vec(logits.clone());

        group.bench_with_input(BenchmarkId::new("softmax", categories), &logits, |b, v| {
            b.iter(|| softmax(black_box(v)));
        });

        let normalizer = OutputNormalizer::new(OutputMode::Auto);
        group.bench_with_input(
            BenchmarkId::new("normalize_and_decide", categories),
            &raw,
            |b, raw| {
                b.iter(|| {
                    let probs = normalizer.normalize(black_box(raw)).expect("normalize");
                    decide(&probs, 0.4)
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_preprocessing, bench_normalization);
criterion_main!(benches);
