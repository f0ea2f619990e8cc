#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use rlora_agg::{Catalog, ReportWriter};
use serde_json::Value;
use tempfile::TempDir;

/// Temporary campaign tree with `data/` and `out/` below one root.
pub struct Campaign {
    dir: TempDir,
}

impl Campaign {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("tmp dir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn data(&self) -> PathBuf {
        self.dir.path().join("data")
    }

    pub fn out(&self) -> PathBuf {
        self.dir.path().join("out")
    }

    /// Writes `contents` to `data/<relative>`, creating parents.
    pub fn put(&self, relative: &str, contents: &str) -> PathBuf {
        let path = self.data().join(relative);
        fs::create_dir_all(path.parent().expect("parent")).expect("create dirs");
        fs::write(&path, contents).expect("write fixture");
        path
    }

    pub fn put_json(&self, relative: &str, value: &Value) -> PathBuf {
        self.put(relative, &serde_json::to_string_pretty(value).expect("fixture json"))
    }

    pub fn catalog(&self, protocols: &[&str], dimensions: &[&str]) -> Catalog {
        Catalog::new(
            self.data(),
            protocols.iter().map(|p| p.to_string()).collect(),
            dimensions.iter().map(|d| d.to_string()).collect(),
        )
    }

    pub fn writer(&self) -> ReportWriter {
        ReportWriter::new(self.out())
    }

    pub fn report(&self, kind_dir: &str, file_name: &str) -> PathBuf {
        self.out().join(kind_dir).join(file_name)
    }
}

/// Plain-text run summary with the two labelled blocks the parsers read.
pub fn text_summary(collisions: f64, data_bytes: f64, total_bytes: f64) -> String {
    format!(
        "Simulation summary\n\nCollisions\n{collisions}\n\nBytes Received\n{data_bytes}\n{total_bytes}\nMessages Sent\nn/a\n"
    )
}

pub fn read_json(path: &Path) -> Value {
    let bytes = fs::read(path).expect("read report");
    serde_json::from_slice(&bytes).expect("parse report")
}

pub fn approx(actual: &Value, expected: f64) {
    let actual = actual.as_f64().expect("numeric value");
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}
