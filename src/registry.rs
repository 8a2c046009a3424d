use std::collections::BTreeMap;
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::catalog::{SampleCatalog, SampleSelection};
use crate::dataset::{DatasetDescriptor, DatasetInfo};
use crate::domain::PreprocessingSelector;
use crate::error::CatalogError;
use crate::fs_util;
use crate::manifest;
use crate::resolver::{SampleResolver, SelectionStrategy};

pub const DESCRIPTOR_FILE: &str = "df_info.yaml";
pub const FS_SAMPLES_FILE: &str = "fs_samples.tsv";

#[derive(Debug, Deserialize)]
struct RawDescriptor {
    #[serde(alias = "df", default)]
    dataset_name: Option<String>,
    #[serde(default)]
    fs_prefix: Option<String>,
    #[serde(flatten)]
    extra: BTreeMap<String, serde_yaml::Value>,
}

impl RawDescriptor {
    fn into_info(self) -> Option<DatasetInfo> {
        Some(DatasetInfo {
            dataset_name: self.dataset_name.filter(|name| !name.is_empty())?,
            fs_prefix: self.fs_prefix?,
            extra: self.extra,
        })
    }
}

#[derive(Debug, Clone)]
pub struct DatasetRegistry {
    root: Utf8PathBuf,
}

impl DatasetRegistry {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn datasets_dir(&self) -> Utf8PathBuf {
        self.root.join("datasets")
    }

    pub fn descriptor_path(&self, dataset: &str) -> Utf8PathBuf {
        self.datasets_dir().join(dataset).join(DESCRIPTOR_FILE)
    }

    pub fn fs_samples_path(&self, dataset: &str) -> Utf8PathBuf {
        self.datasets_dir().join(dataset).join(FS_SAMPLES_FILE)
    }

    pub fn list_datasets(&self) -> Result<BTreeMap<String, DatasetInfo>, CatalogError> {
        let pattern = format!(
            "{}/*/{DESCRIPTOR_FILE}",
            glob::Pattern::escape(self.datasets_dir().as_str())
        );

        let mut datasets = BTreeMap::new();
        for path in fs_util::glob_utf8(&pattern)? {
            let content = match fs::read_to_string(path.as_std_path()) {
                Ok(content) => content,
                Err(err) => {
                    warn!(%path, error = %err, "skipping unreadable descriptor");
                    continue;
                }
            };
            let raw = match serde_yaml::from_str::<RawDescriptor>(&content) {
                Ok(raw) => raw,
                Err(err) => {
                    warn!(%path, error = %err, "skipping malformed descriptor");
                    continue;
                }
            };
            match raw.into_info() {
                Some(info) => {
                    datasets.insert(info.dataset_name.clone(), info);
                }
                None => warn!(%path, "skipping descriptor without dataset_name or fs_prefix"),
            }
        }
        Ok(datasets)
    }

    pub fn load_info(&self, dataset: &str) -> Result<DatasetInfo, CatalogError> {
        let path = self.descriptor_path(dataset);
        if !path.as_std_path().is_file() {
            return Err(CatalogError::DatasetNotFound(dataset.to_string()));
        }
        let content = fs::read_to_string(path.as_std_path())
            .map_err(|err| CatalogError::Filesystem(format!("read {path}: {err}")))?;
        let raw: RawDescriptor =
            serde_yaml::from_str(&content).map_err(|err| CatalogError::DescriptorParse {
                path: path.clone(),
                message: err.to_string(),
            })?;
        raw.into_info()
            .ok_or(CatalogError::InvalidDescriptor(path))
    }

    pub fn load_dataset<S: SelectionStrategy>(
        &self,
        dataset: &str,
        resolver: &SampleResolver<S>,
    ) -> Result<DatasetDescriptor, CatalogError> {
        let info = self.load_info(dataset)?;
        build_dataset(info, resolver)
    }

    pub fn write_fs_samples(&self, dataset: &DatasetDescriptor) -> Result<Utf8PathBuf, CatalogError> {
        let path = self.fs_samples_path(dataset.name());
        let content = manifest::records_tsv(dataset.records())?;
        fs_util::write_atomic(&path, &content)?;
        Ok(path)
    }
}

pub fn build_dataset<S: SelectionStrategy>(
    info: DatasetInfo,
    resolver: &SampleResolver<S>,
) -> Result<DatasetDescriptor, CatalogError> {
    let mut sample_sets = BTreeMap::new();
    for stage in fs_util::list_subdirs(&info.reads_dir())? {
        let mut catalog = SampleCatalog::new(stage.clone());
        let selector = PreprocessingSelector::Named(stage.clone());
        catalog.add_samples(resolver, &info, &selector, &SampleSelection::all())?;
        if catalog.is_empty() {
            debug!(dataset = %info.dataset_name, %stage, "stage has no samples");
            continue;
        }
        sample_sets.insert(stage, catalog);
    }
    Ok(DatasetDescriptor::new(info, sample_sets))
}
