#![allow(dead_code)]

use std::fs::File;
use std::io::{self, Write};

use approx::assert_abs_diff_eq;
use camino::{Utf8Path, Utf8PathBuf};
use flate2::write::GzEncoder;
use flate2::Compression;
use nalgebra::Vector3;

/// Path of a fixture under `tests/data`.
pub fn data_path(name: &str) -> Utf8PathBuf {
    Utf8Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/data")
        .join(name)
}

/// Write a gzip compressed copy of the fixture `name` into `dir` as `target`.
pub fn gzip_fixture(name: &str, dir: &Utf8Path, target: &str) -> io::Result<Utf8PathBuf> {
    let text = std::fs::read(data_path(name))?;
    let path = dir.join(target);
    let mut encoder = GzEncoder::new(File::create(&path)?, Compression::default());
    encoder.write_all(&text)?;
    encoder.finish()?;
    Ok(path)
}

/// Temporary directory as a UTF-8 path.
pub fn utf8_tempdir() -> (tempfile::TempDir, Utf8PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
    (dir, path)
}

pub fn assert_vector_close(actual: &Vector3<f64>, expected: &Vector3<f64>, epsilon: f64) {
    assert_abs_diff_eq!(actual.x, expected.x, epsilon = epsilon);
    assert_abs_diff_eq!(actual.y, expected.y, epsilon = epsilon);
    assert_abs_diff_eq!(actual.z, expected.z, epsilon = epsilon);
}
