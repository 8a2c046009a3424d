use std::collections::BTreeMap;
use std::fs;

use camino::Utf8PathBuf;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::counts::CountOptions;
use crate::domain::CountConvention;
use crate::error::CatalogError;
use crate::registry::DatasetRegistry;
use crate::resolver::{LongestName, ResolveOptions, SampleResolver, SelectionStrategy, StageOrder};
use crate::template::PathTemplates;

pub const CONFIG_FILE: &str = "kira-sc.json";
pub const DEFAULT_METADATA_FILE: &str = "df_samples.tsv";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    pub registry_root: String,
    #[serde(default)]
    pub templates: BTreeMap<String, String>,
    #[serde(default)]
    pub count_convention: Option<CountConvention>,
    #[serde(default)]
    pub report_bases: Option<bool>,
    #[serde(default)]
    pub report_size: Option<bool>,
    #[serde(default)]
    pub metadata_file: Option<String>,
    #[serde(default)]
    pub stage_order: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub registry_root: Utf8PathBuf,
    pub templates: PathTemplates,
    pub resolve: ResolveOptions,
    pub metadata_file: String,
    pub stage_order: Option<Vec<String>>,
}

impl ResolvedConfig {
    pub fn registry(&self) -> DatasetRegistry {
        DatasetRegistry::new(self.registry_root.clone())
    }

    pub fn strategy(&self) -> Box<dyn SelectionStrategy> {
        match &self.stage_order {
            Some(order) => Box::new(StageOrder::new(order.clone())),
            None => Box::new(LongestName),
        }
    }

    pub fn resolver(&self) -> SampleResolver<Box<dyn SelectionStrategy>> {
        SampleResolver::with_strategy(self.templates.clone(), self.resolve, self.strategy())
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Explicit path, then `kira-sc.json` in the working directory, then the
    /// user config directory.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, CatalogError> {
        let config_path = match path {
            Some(path) => Utf8PathBuf::from(path),
            None => Self::discover().ok_or(CatalogError::MissingConfig)?,
        };

        let content = fs::read_to_string(config_path.as_std_path())
            .map_err(|_| CatalogError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| CatalogError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, CatalogError> {
        if config.registry_root.trim().is_empty() {
            return Err(CatalogError::ConfigParse(
                "registry_root must not be empty".to_string(),
            ));
        }

        let mut templates = PathTemplates::with_defaults();
        templates.merge(config.templates);

        let resolve = ResolveOptions {
            counts: CountOptions {
                convention: config.count_convention.unwrap_or_default(),
                report_bases: config.report_bases.unwrap_or(true),
            },
            report_size: config.report_size.unwrap_or(true),
        };

        Ok(ResolvedConfig {
            schema_version: config.schema_version.unwrap_or(1),
            registry_root: Utf8PathBuf::from(config.registry_root),
            templates,
            resolve,
            metadata_file: config
                .metadata_file
                .unwrap_or_else(|| DEFAULT_METADATA_FILE.to_string()),
            stage_order: config.stage_order.filter(|order| !order.is_empty()),
        })
    }

    fn discover() -> Option<Utf8PathBuf> {
        let local = Utf8PathBuf::from(CONFIG_FILE);
        if local.as_std_path().is_file() {
            return Some(local);
        }
        BaseDirs::new()
            .and_then(|dirs| {
                Utf8PathBuf::from_path_buf(
                    dirs.config_dir()
                        .join("kira-sample-catalog")
                        .join("config.json"),
                )
                .ok()
            })
            .filter(|path| path.as_std_path().is_file())
    }
}
