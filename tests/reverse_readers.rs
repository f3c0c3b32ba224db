use std::fs::File;
use std::io::{Cursor, Write};

use bstr::BString;
use flate2::write::GzEncoder;
use flate2::Compression;
use proptest::prelude::*;
use tempfile::NamedTempFile;

use revline::reader::{
    detect_in_bytes, open_reverse, ByteRange, Diagnostic, LineEnding, ReverseFileReader,
    ReverseStreamReader, SourceCapabilities, StreamMode,
};
use revline::{ReaderConfig, Result, RevlineError};

fn create_test_file(content: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp file");
    file.write_all(content).expect("write contents");
    file.flush().expect("flush contents");
    file
}

fn via_file_reader(content: &[u8], ending: LineEnding) -> Vec<BString> {
    let file = create_test_file(content);
    ReverseFileReader::from_file(file.reopen().unwrap(), ending)
        .unwrap()
        .collect()
}

fn via_whole_reverse(content: &[u8], ending: LineEnding) -> Vec<BString> {
    ReverseStreamReader::forward_only(content, ending)
        .unwrap()
        .collect::<Result<Vec<_>>>()
        .unwrap()
}

fn via_block_scan(content: &[u8], ending: LineEnding, block_size: usize) -> Vec<BString> {
    let config = ReaderConfig {
        block_size,
        max_mem: 1,
        force_whole_reverse: false,
    };
    // Even an empty source must take the block-wise path here
    let caps = SourceCapabilities {
        is_size_bounded: false,
        ..SourceCapabilities::seekable(content.len() as u64, false, &config)
    };
    let reader =
        ReverseStreamReader::new(Cursor::new(content.to_vec()), ending, caps, &config).unwrap();
    assert_eq!(reader.mode(), Some(StreamMode::BlockScan { block_size }));
    reader.collect::<Result<Vec<_>>>().unwrap()
}

/// Every strategy, labelled for assertion messages
fn all_strategies(content: &[u8], ending: LineEnding) -> Vec<(&'static str, Vec<BString>)> {
    vec![
        ("file", via_file_reader(content, ending)),
        ("whole", via_whole_reverse(content, ending)),
        ("block-1", via_block_scan(content, ending, 1)),
        ("block-3", via_block_scan(content, ending, 3)),
        ("block-4096", via_block_scan(content, ending, 4096)),
    ]
}

fn reassemble(lines: Vec<BString>) -> Vec<u8> {
    lines.iter().rev().flat_map(|line| line.iter().copied()).collect()
}

#[test]
fn lf_lines_come_back_last_first() {
    for (name, lines) in all_strategies(b"a\nb\nc\n", LineEnding::Lf) {
        assert_eq!(lines, vec!["c\n", "b\n", "a\n"], "strategy {name}");
    }
}

#[test]
fn crlf_file_is_detected_and_reversed() {
    let content = b"a\r\nbb\r\n";
    let detection = detect_in_bytes(content).unwrap();
    assert_eq!(detection.ending, LineEnding::Crlf);

    for (name, lines) in all_strategies(content, detection.ending) {
        assert_eq!(lines, vec!["bb\r\n", "a\r\n"], "strategy {name}");
    }
}

#[test]
fn single_unterminated_line_stays_unterminated() {
    for (name, lines) in all_strategies(b"lonely", LineEnding::Lf) {
        assert_eq!(lines, vec!["lonely"], "strategy {name}");
    }
}

#[test]
fn empty_file_yields_nothing_with_diagnostic() {
    let detection = detect_in_bytes(b"").unwrap();
    assert_eq!(detection.ending, LineEnding::Lf);
    assert_eq!(detection.diagnostic, Some(Diagnostic::EmptyFile));

    for (name, lines) in all_strategies(b"", detection.ending) {
        assert!(lines.is_empty(), "strategy {name}");
    }

    let file = create_test_file(b"");
    let lines = open_reverse(file.path(), &ReaderConfig::default()).unwrap();
    assert_eq!(lines.diagnostic(), Some(Diagnostic::EmptyFile));
    assert_eq!(lines.count(), 0);
}

#[test]
fn detection_failure_surfaces_before_any_line() {
    let file = create_test_file(b"truncated first line");
    match open_reverse(file.path(), &ReaderConfig::default()) {
        Err(RevlineError::UnknownLineEnding { first_line }) => {
            assert_eq!(first_line, "truncated first line");
        }
        other => panic!("expected UnknownLineEnding, got {other:?}"),
    }
}

#[test]
fn stream_open_switches_to_block_scan_for_large_files() {
    let mut content = Vec::new();
    for i in 0..500 {
        content.extend_from_slice(format!("line number {i}\n").as_bytes());
    }
    let file = create_test_file(&content);
    let config = ReaderConfig {
        block_size: 64,
        max_mem: 1024,
        force_whole_reverse: false,
    };

    let reader = ReverseStreamReader::open(file.path(), &config).unwrap();
    assert_eq!(reader.mode(), Some(StreamMode::BlockScan { block_size: 64 }));

    let lines = reader.collect::<Result<Vec<_>>>().unwrap();
    assert_eq!(lines.len(), 500);
    assert_eq!(lines[0], "line number 499\n");
    assert_eq!(lines[499], "line number 0\n");
    assert_eq!(reassemble(lines), content);
}

#[test]
fn costly_seek_reads_in_budget_sized_blocks() {
    let content = b"one\ntwo\nthree\nfour\n".to_vec();
    let config = ReaderConfig {
        block_size: 1,
        max_mem: 8,
        force_whole_reverse: false,
    };
    let caps = SourceCapabilities::seekable(content.len() as u64, true, &config);
    let reader =
        ReverseStreamReader::new(Cursor::new(content.clone()), LineEnding::Lf, caps, &config)
            .unwrap();
    assert_eq!(reader.mode(), Some(StreamMode::BlockScan { block_size: 8 }));
    assert_eq!(
        reader.collect::<Result<Vec<_>>>().unwrap(),
        vec!["four\n", "three\n", "two\n", "one\n"]
    );
}

#[test]
fn gzip_file_round_trips_through_both_paths() {
    let content = b"alpha\nbeta\ngamma\n";
    let compressed = NamedTempFile::new().unwrap();
    {
        let file = File::create(compressed.path()).unwrap();
        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder.write_all(content).unwrap();
        encoder.finish().unwrap();
    }

    let in_memory = open_reverse(compressed.path(), &ReaderConfig::default())
        .unwrap()
        .collect::<Result<Vec<_>>>()
        .unwrap();
    let spilled_config = ReaderConfig {
        max_mem: 1,
        ..ReaderConfig::default()
    };
    let spilled = open_reverse(compressed.path(), &spilled_config)
        .unwrap()
        .collect::<Result<Vec<_>>>()
        .unwrap();

    assert_eq!(in_memory, vec!["gamma\n", "beta\n", "alpha\n"]);
    assert_eq!(in_memory, spilled);
}

#[test]
fn plain_text_that_looks_compressed_opens_as_text() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, b"BZh is a prefix\nsecond\n").unwrap();

    let lines = open_reverse(&path, &ReaderConfig::default())
        .unwrap()
        .collect::<Result<Vec<_>>>()
        .unwrap();
    assert_eq!(lines, vec!["second\n", "BZh is a prefix\n"]);

    let streamed = ReverseStreamReader::open(&path, &ReaderConfig::default())
        .unwrap()
        .collect::<Result<Vec<_>>>()
        .unwrap();
    assert_eq!(streamed, lines);

    // Genuine gzip bytes behind a plain extension are not decoded either
    let path = dir.path().join("raw.log");
    std::fs::write(&path, b"\x1f\x8b\x08 odd\n").unwrap();
    let lines = open_reverse(&path, &ReaderConfig::default())
        .unwrap()
        .collect::<Result<Vec<_>>>()
        .unwrap();
    assert_eq!(lines, vec![b"\x1f\x8b\x08 odd\n".as_slice()]);
}

#[test]
fn early_drop_stops_midway() {
    let file = create_test_file(b"1\n2\n3\n4\n");
    let mut lines = open_reverse(file.path(), &ReaderConfig::default()).unwrap();
    assert_eq!(lines.next().unwrap().unwrap(), "4\n");
    lines.close();
    assert!(lines.next().is_none());

    let mut reader =
        ReverseFileReader::new(ByteRange::InMemory(b"x\ny\n".to_vec()), LineEnding::Lf);
    assert_eq!(reader.next().unwrap(), "y\n");
    drop(reader);
}

fn line_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(prop::sample::select(vec![b'a', b'b', b' ', b'\r', b'\n']), 0..64)
}

proptest! {
    #[test]
    fn lf_round_trip(content in line_strategy(), block_size in 1usize..16) {
        prop_assert_eq!(reassemble(via_file_reader(&content, LineEnding::Lf)), content.clone());
        prop_assert_eq!(reassemble(via_whole_reverse(&content, LineEnding::Lf)), content.clone());
        prop_assert_eq!(
            reassemble(via_block_scan(&content, LineEnding::Lf, block_size)),
            content
        );
    }

    #[test]
    fn crlf_round_trip(
        lines in prop::collection::vec("[a-z ]{0,8}", 0..12),
        terminated in any::<bool>(),
        block_size in 1usize..16,
    ) {
        let mut content = lines.join("\r\n").into_bytes();
        if terminated && !lines.is_empty() {
            content.extend_from_slice(b"\r\n");
        }

        let expected_count = lines.len().max(usize::from(!content.is_empty()));
        for (name, reversed) in all_strategies(&content, LineEnding::Crlf) {
            prop_assert!(reversed.len() <= expected_count, "strategy {}", name);
            prop_assert_eq!(reassemble(reversed), content.clone(), "strategy {}", name);
        }
        prop_assert_eq!(
            reassemble(via_block_scan(&content, LineEnding::Crlf, block_size)),
            content
        );
    }

    #[test]
    fn strategies_agree(content in line_strategy()) {
        let expected = via_file_reader(&content, LineEnding::Lf);
        for (name, lines) in all_strategies(&content, LineEnding::Lf) {
            prop_assert_eq!(&lines, &expected, "strategy {}", name);
        }
    }
}
