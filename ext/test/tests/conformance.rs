//! Conformance tests that run YAML fixtures against chainer
//!
//! Run with: cargo test -p chainer-test --test conformance --features chainer-test/fixtures
//!
//! Note: This test file requires the `fixtures` feature to be enabled.

#![cfg(feature = "fixtures")]

use chainer_test::fixture::Fixture;
use std::fs;
use std::path::{Path, PathBuf};

/// The fixtures directory next to this crate's manifest
fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures")
}

/// Load and run every fixture in one file
fn run_fixture_file(name: &str) {
    let path = fixtures_dir().join(name);
    let yaml = fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {e}", path.display()));

    // Parse potentially multiple fixtures (separated by ---)
    let fixtures = Fixture::from_yaml_multi(&yaml).unwrap_or_else(|e| {
        panic!("Failed to parse {}: {}", path.display(), e);
    });
    assert!(!fixtures.is_empty(), "{} holds no fixtures", path.display());

    for fixture in fixtures {
        println!("  Running: {}", fixture.name);
        fixture.run_and_assert();
    }
}

#[test]
fn test_ordering() {
    run_fixture_file("01_ordering.yaml");
}

#[test]
fn test_jumps() {
    run_fixture_file("02_jumps.yaml");
}

#[test]
fn test_route_if() {
    run_fixture_file("03_route_if.yaml");
}

#[test]
fn test_drop() {
    run_fixture_file("04_drop.yaml");
}

#[test]
fn test_errors() {
    run_fixture_file("05_errors.yaml");
}

#[test]
fn test_every_fixture_file_is_covered() {
    let mut files: Vec<_> = fs::read_dir(fixtures_dir())
        .expect("read fixtures dir")
        .filter_map(|entry| {
            let path = entry.ok()?.path();
            let is_yaml = path.extension().is_some_and(|e| e == "yaml" || e == "yml");
            is_yaml.then(|| path.file_name()?.to_str().map(str::to_owned))?
        })
        .collect();
    files.sort();
    assert_eq!(
        files,
        [
            "01_ordering.yaml",
            "02_jumps.yaml",
            "03_route_if.yaml",
            "04_drop.yaml",
            "05_errors.yaml"
        ]
    );
}
