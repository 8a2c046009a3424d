use std::collections::BTreeMap;
use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::catalog::SampleCatalog;
use crate::resolver::{SampleRecord, SelectionStrategy, select_canonical};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetInfo {
    #[serde(alias = "df")]
    pub dataset_name: String,
    pub fs_prefix: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl DatasetInfo {
    pub fn new(dataset_name: impl Into<String>, fs_prefix: impl Into<String>) -> Self {
        Self {
            dataset_name: dataset_name.into(),
            fs_prefix: fs_prefix.into(),
            extra: BTreeMap::new(),
        }
    }

    pub fn full_path(&self) -> Utf8PathBuf {
        Utf8Path::new(&self.fs_prefix).join(&self.dataset_name)
    }

    pub fn reads_dir(&self) -> Utf8PathBuf {
        self.full_path().join("reads")
    }

    pub fn metadata_path(&self, file_name: &str) -> Utf8PathBuf {
        self.full_path().join(file_name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetDescriptor {
    #[serde(flatten)]
    pub info: DatasetInfo,
    pub sample_sets: BTreeMap<String, SampleCatalog>,
}

impl DatasetDescriptor {
    pub fn new(info: DatasetInfo, sample_sets: BTreeMap<String, SampleCatalog>) -> Self {
        Self { info, sample_sets }
    }

    pub fn name(&self) -> &str {
        &self.info.dataset_name
    }

    pub fn fs_prefix(&self) -> &str {
        &self.info.fs_prefix
    }

    pub fn full_path(&self) -> Utf8PathBuf {
        self.info.full_path()
    }

    pub fn preprocessings(&self) -> Vec<&str> {
        self.sample_sets.keys().map(String::as_str).collect()
    }

    pub fn sample_set(&self, preprocessing: &str) -> Option<&SampleCatalog> {
        self.sample_sets.get(preprocessing)
    }

    pub fn default_preprocessing<S: SelectionStrategy + ?Sized>(&self, strategy: &S) -> Option<&str> {
        let stages = self.sample_sets.keys().cloned().collect::<Vec<_>>();
        let chosen = select_canonical(strategy, &stages)?.to_string();
        self.sample_sets
            .get_key_value(&chosen)
            .map(|(name, _)| name.as_str())
    }

    pub fn records(&self) -> impl Iterator<Item = &SampleRecord> {
        self.sample_sets.values().flat_map(SampleCatalog::iter)
    }

    /// Read counts per sample across stages; the sentinel `-1` is kept so
    /// missing counts stay distinguishable from zero.
    pub fn read_count_matrix(&self) -> ReadCountMatrix {
        let mut rows: BTreeMap<String, BTreeMap<String, i64>> = BTreeMap::new();
        for (stage, catalog) in &self.sample_sets {
            for record in catalog.iter() {
                rows.entry(record.fs_name.clone())
                    .or_default()
                    .insert(stage.clone(), record.reads);
            }
        }
        ReadCountMatrix {
            preprocessings: self.sample_sets.keys().cloned().collect(),
            rows: rows
                .into_iter()
                .map(|(sample, reads)| ReadCountRow { sample, reads })
                .collect(),
        }
    }
}

impl fmt::Display for DatasetDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Dataset name: {}", self.info.dataset_name)?;
        writeln!(f, "Filesystem prefix: {}", self.info.fs_prefix)?;
        writeln!(f, "Full path: {}", self.full_path())?;
        for (stage, catalog) in &self.sample_sets {
            writeln!(f, "Samples in {stage} - {}", catalog.len())?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadCountMatrix {
    pub preprocessings: Vec<String>,
    pub rows: Vec<ReadCountRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadCountRow {
    pub sample: String,
    pub reads: BTreeMap<String, i64>,
}

impl ReadCountRow {
    pub fn retained(&self, from: &str, to: &str) -> Option<f64> {
        let before = *self.reads.get(from)?;
        let after = *self.reads.get(to)?;
        (before > 0 && after >= 0).then(|| after as f64 / before as f64)
    }
}
