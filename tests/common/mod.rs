#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::{TempDir, tempdir};

pub const TARGET_CSV: &str = "\
SKU,Name,Price,Stock
A1,Shirt,,3
B2,Hat,5,
C3,Sock,7,1
D4,Scarf,,
D4,Scarf copy,,
,Loose,,
";

pub const SUPPLIER_CSV: &str = "\
SKU,Name,Price,Stock
a1 ,shirt,10,30
B2,HAT,6,40
D4,scarf,9,50
Z9,Gloves,4,60
";

pub const PROFILE_YAML: &str = "\
profile_version: 1
name: supplier prices
key_columns:
  - target: SKU
    source: SKU
rules:
  - source_column: Price
    target_column: Price
    write_mode: fill_if_empty
  - source_column: Stock
    target_column: Stock
    write_mode: overwrite
";

/// Scratch directory that is removed on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        fs::write(&path, contents).expect("write temp file");
        path
    }

    pub fn read(&self, name: &str) -> String {
        fs::read_to_string(self.temp_dir.path().join(name)).expect("read temp file")
    }

    /// Target, supplier source and profile fixtures.
    pub fn standard_inputs(&self) -> (PathBuf, PathBuf, PathBuf) {
        (
            self.write("target.csv", TARGET_CSV),
            self.write("supplier.csv", SUPPLIER_CSV),
            self.write("profile.yaml", PROFILE_YAML),
        )
    }
}

pub fn bin() -> Command {
    Command::cargo_bin("csv-keymerge").expect("binary exists")
}

pub fn arg(path: &Path) -> &str {
    path.to_str().expect("utf-8 path")
}

/// Parses CSV text into rows, header included.
pub fn csv_rows(contents: &str) -> Vec<Vec<String>> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(contents.as_bytes())
        .records()
        .map(|record| {
            record
                .expect("csv record")
                .iter()
                .map(str::to_string)
                .collect()
        })
        .collect()
}
