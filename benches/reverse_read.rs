use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use flate2::{write::GzEncoder, Compression};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use revline::reader::{LineEnding, ReverseStreamReader, SourceCapabilities};
use revline::{open_reverse, ReaderConfig};
use std::io::{Cursor, Write};
use tempfile::NamedTempFile;

fn log_content(size_kb: usize) -> Vec<u8> {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let target_size = size_kb * 1024;
    let mut content = Vec::with_capacity(target_size + 256);
    let mut line_num = 0;

    while content.len() < target_size {
        let padding = "x".repeat(rng.gen_range(0..120));
        let log_line = format!(
            "[2024-09-02T10:{:02}:{:02}] INFO: Request {} user_{} {}\n",
            (line_num / 60) % 60,
            line_num % 60,
            line_num,
            line_num % 1000,
            padding
        );
        content.extend_from_slice(log_line.as_bytes());
        line_num += 1;
    }
    content
}

fn create_test_file(size_kb: usize) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
    temp_file.write_all(&log_content(size_kb)).unwrap();
    temp_file.flush().unwrap();
    temp_file
}

fn create_compressed_test_file(size_kb: usize) -> NamedTempFile {
    let compressed_file = NamedTempFile::new().unwrap();
    let file = std::fs::File::create(compressed_file.path()).unwrap();
    let mut encoder = GzEncoder::new(file, Compression::default());
    encoder.write_all(&log_content(size_kb)).unwrap();
    encoder.finish().unwrap();
    compressed_file
}

fn size_label(size_kb: usize) -> String {
    if size_kb < 1024 {
        format!("{}KB", size_kb)
    } else {
        format!("{}MB", size_kb / 1024)
    }
}

fn bench_full_reverse(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_reverse");
    group.sample_size(10);
    group.measurement_time(std::time::Duration::from_secs(5));

    let config = ReaderConfig::default();
    for &size_kb in &[50, 500, 5000, 20000] {
        let plain = create_test_file(size_kb);
        group.bench_with_input(
            BenchmarkId::new("mmap", size_label(size_kb)),
            &plain.path(),
            |b, path| {
                b.iter(|| {
                    let count = open_reverse(path, &config).unwrap().count();
                    black_box(count);
                });
            },
        );

        let compressed = create_compressed_test_file(size_kb);
        group.bench_with_input(
            BenchmarkId::new("gzip", size_label(size_kb)),
            &compressed.path(),
            |b, path| {
                b.iter(|| {
                    let count = open_reverse(path, &config).unwrap().count();
                    black_box(count);
                });
            },
        );
    }

    group.finish();
}

fn bench_stream_modes(c: &mut Criterion) {
    let mut group = c.benchmark_group("stream_modes");
    group.sample_size(10);

    let content = log_content(2000);
    let whole_config = ReaderConfig {
        max_mem: u64::MAX,
        ..ReaderConfig::default()
    };
    group.bench_function("whole_reverse", |b| {
        b.iter(|| {
            let reader = ReverseStreamReader::forward_only(content.as_slice(), LineEnding::Lf)
                .unwrap();
            black_box(reader.count());
        });
    });

    for &block_size in &[512usize, 4096, 65536] {
        let config = ReaderConfig {
            block_size,
            max_mem: 1,
            ..whole_config.clone()
        };
        let caps = SourceCapabilities::seekable(content.len() as u64, false, &config);
        group.bench_with_input(
            BenchmarkId::new("block_scan", block_size),
            &block_size,
            |b, _| {
                b.iter(|| {
                    let reader = ReverseStreamReader::new(
                        Cursor::new(content.clone()),
                        LineEnding::Lf,
                        caps,
                        &config,
                    )
                    .unwrap();
                    black_box(reader.count());
                });
            },
        );
    }

    group.finish();
}

fn bench_first_lines(c: &mut Criterion) {
    let mut group = c.benchmark_group("first_lines");

    // Tail-style access should not depend on file size
    let config = ReaderConfig::default();
    for &size_kb in &[500, 20000] {
        let plain = create_test_file(size_kb);
        group.bench_with_input(
            BenchmarkId::new("last_100", size_label(size_kb)),
            &plain.path(),
            |b, path| {
                b.iter(|| {
                    let lines: Vec<_> = open_reverse(path, &config).unwrap().take(100).collect();
                    black_box(lines);
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_full_reverse, bench_stream_modes, bench_first_lines);
criterion_main!(benches);
