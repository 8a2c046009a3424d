#![allow(dead_code)]

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::TempDir;

use kira_sample_catalog::config::{Config, ConfigLoader, ResolvedConfig};
use kira_sample_catalog::dataset::DatasetInfo;

pub const DATASET: &str = "FMT";

/// Temporary filesystem with one registered dataset:
///
/// - `S1` in raw, trimmed and trimmed_filtered, counts only in trimmed_filtered
/// - `S2` in raw, R1 only in trimmed
/// - `S3` R1 only in raw
pub struct Fixture {
    _dir: TempDir,
    pub root: Utf8PathBuf,
    pub fs_prefix: Utf8PathBuf,
    pub registry: Utf8PathBuf,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let fs_prefix = root.join("data");
        let registry = root.join("registry");

        let fixture = Self {
            _dir: dir,
            root,
            fs_prefix,
            registry,
        };
        for stage in ["raw", "trimmed", "trimmed_filtered"] {
            fixture.reads(stage, "S1", "R1", b"@r1\nACGT\n+\nFFFF\n");
            fixture.reads(stage, "S1", "R2", b"@r2\nTGCA\n+\nFFFF\n");
        }
        fixture.count("trimmed_filtered", "S1", "R1", "1000 150000\n");
        fixture.count("trimmed_filtered", "S1", "R2", "1000 150000\n");
        fixture.reads("raw", "S2", "R1", b"@a\nA\n+\nF\n");
        fixture.reads("raw", "S2", "R2", b"@b\nC\n+\nF\n");
        fixture.reads("trimmed", "S2", "R1", b"@a\nA\n+\nF\n");
        fixture.reads("raw", "S3", "R1", b"@c\nG\n+\nF\n");
        fixture.register(DATASET, &format!("dataset_name: {DATASET}\nfs_prefix: {}\n", fixture.fs_prefix));
        fixture
    }

    pub fn info(&self) -> DatasetInfo {
        DatasetInfo::new(DATASET, self.fs_prefix.as_str())
    }

    pub fn reads(&self, stage: &str, sample: &str, strand: &str, content: &[u8]) {
        let path = self
            .dataset_dir()
            .join("reads")
            .join(stage)
            .join(format!("{sample}_{strand}.fastq.gz"));
        write(&path, content);
    }

    pub fn count(&self, stage: &str, sample: &str, strand: &str, content: &str) {
        let path = self
            .dataset_dir()
            .join("reads")
            .join(stage)
            .join("profile")
            .join(format!("{sample}_{strand}.count"));
        write(&path, content.as_bytes());
    }

    pub fn metadata(&self, content: &str) {
        write(&self.dataset_dir().join("df_samples.tsv"), content.as_bytes());
    }

    pub fn register(&self, name: &str, descriptor: &str) {
        let path = self.registry.join("datasets").join(name).join("df_info.yaml");
        write(&path, descriptor.as_bytes());
    }

    pub fn dataset_dir(&self) -> Utf8PathBuf {
        self.fs_prefix.join(DATASET)
    }

    pub fn config(&self) -> ResolvedConfig {
        ConfigLoader::resolve_config(Config {
            registry_root: self.registry.to_string(),
            ..Config::default()
        })
        .unwrap()
    }
}

pub fn write(path: &Utf8Path, content: &[u8]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}
