use std::collections::BTreeMap;

use chrono::Local;
use serde::Serialize;
use tracing::info;

use crate::catalog::{SampleCatalog, SampleSelection, sample_set_name};
use crate::config::ResolvedConfig;
use crate::dataset::{DatasetInfo, ReadCountMatrix};
use crate::domain::{PreprocessingSelector, Strand};
use crate::error::CatalogError;
use crate::fs_util::{self, WriteStatus};
use crate::manifest::{self, MergeManifest, PreparedSampleSets, QcManifest};
use crate::metadata::MetadataSheet;
use crate::registry::DatasetRegistry;
use crate::resolver::{SampleResolver, SelectionStrategy, select_canonical};
use crate::template::Placeholders;

#[derive(Debug, Clone, Default)]
pub struct SampleSetRequest {
    pub dataset: String,
    pub preprocessing: Option<String>,
    pub meta_column: Option<String>,
    pub column_value: Option<String>,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub pattern: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListResult {
    pub datasets: Vec<ListEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListEntry {
    pub dataset: String,
    pub fs_prefix: String,
    pub full_path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct InfoResult {
    pub dataset: String,
    pub fs_prefix: String,
    pub full_path: String,
    pub preprocessings: Vec<StageSummary>,
    pub read_counts: ReadCountMatrix,
}

#[derive(Debug, Clone, Serialize)]
pub struct StageSummary {
    pub preprocessing: String,
    pub samples: usize,
    pub samples_with_counts: usize,
    pub total_reads: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SamplesResult {
    pub sample_sets: Vec<SampleCatalog>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResultsResult {
    pub paths: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QcResult {
    pub sample_sets: BTreeMap<String, QcManifest>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableResult {
    pub sample_sets: BTreeMap<String, WriteStatus>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MergeResult {
    pub sample_sets: BTreeMap<String, MergeManifest>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportResult {
    pub dataset: String,
    pub path: String,
    pub records: usize,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

fn emit(sink: &dyn ProgressSink, message: impl Into<String>) {
    sink.event(ProgressEvent {
        message: message.into(),
    });
}

pub struct App<S: SelectionStrategy> {
    config: ResolvedConfig,
    registry: DatasetRegistry,
    resolver: SampleResolver<S>,
}

impl App<Box<dyn SelectionStrategy>> {
    pub fn from_config(config: ResolvedConfig) -> Self {
        let resolver = config.resolver();
        Self::new(config, resolver)
    }
}

impl<S: SelectionStrategy> App<S> {
    pub fn new(config: ResolvedConfig, resolver: SampleResolver<S>) -> Self {
        let registry = config.registry();
        Self {
            config,
            registry,
            resolver,
        }
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    pub fn registry(&self) -> &DatasetRegistry {
        &self.registry
    }

    pub fn resolver(&self) -> &SampleResolver<S> {
        &self.resolver
    }

    pub fn list(&self, sink: &dyn ProgressSink) -> Result<ListResult, CatalogError> {
        emit(sink, format!("phase=Resolve; scanning {}", self.registry.root()));
        let datasets = self
            .registry
            .list_datasets()?
            .into_values()
            .map(|info| ListEntry {
                full_path: info.full_path().to_string(),
                dataset: info.dataset_name,
                fs_prefix: info.fs_prefix,
            })
            .collect();
        Ok(ListResult { datasets })
    }

    pub fn info(&self, dataset: &str, sink: &dyn ProgressSink) -> Result<InfoResult, CatalogError> {
        emit(sink, format!("phase=Resolve; loading dataset {dataset}"));
        let loaded = self.registry.load_dataset(dataset, &self.resolver)?;
        let preprocessings = loaded
            .sample_sets
            .iter()
            .map(|(stage, catalog)| StageSummary {
                preprocessing: stage.clone(),
                samples: catalog.len(),
                samples_with_counts: catalog.iter().filter(|r| r.has_counts()).count(),
                total_reads: catalog
                    .iter()
                    .filter_map(|r| u64::try_from(r.reads).ok())
                    .sum(),
            })
            .collect();
        Ok(InfoResult {
            dataset: loaded.name().to_string(),
            fs_prefix: loaded.fs_prefix().to_string(),
            full_path: loaded.full_path().to_string(),
            read_counts: loaded.read_count_matrix(),
            preprocessings,
        })
    }

    pub fn sample_sets(
        &self,
        request: &SampleSetRequest,
        sink: &dyn ProgressSink,
    ) -> Result<BTreeMap<String, SampleCatalog>, CatalogError> {
        let dataset = self.registry.load_info(&request.dataset)?;
        let selector = self.selector(&dataset, request, sink)?;
        let now = Local::now();

        let mut sets = BTreeMap::new();
        let Some(column) = request.meta_column.as_deref() else {
            let selection = SampleSelection {
                include: request.include.clone(),
                exclude: request.exclude.clone(),
                pattern: request.pattern.clone(),
            };
            let name = sample_set_name(request.name.as_deref(), None, None, &now);
            emit(sink, format!("phase=Resolve; building sample set {name}"));
            let catalog = self.build_set(&dataset, &selector, &selection, &name)?;
            sets.insert(name, catalog);
            return Ok(sets);
        };

        let sheet = MetadataSheet::load(&dataset.metadata_path(&self.config.metadata_file))?;
        let values = match request.column_value.as_deref() {
            Some(value) => vec![value.to_string()],
            None => sheet.unique_values(column)?,
        };
        for value in values {
            let selected = sheet.filter(column, &value)?;
            let include = if request.include.is_empty() {
                selected
            } else {
                selected
                    .into_iter()
                    .filter(|name| request.include.contains(name))
                    .collect()
            };
            let empty = || CatalogError::EmptySelection {
                column: column.to_string(),
                value: value.clone(),
            };
            if include.is_empty() {
                return Err(empty());
            }

            let selection = SampleSelection {
                include,
                exclude: request.exclude.clone(),
                pattern: request.pattern.clone(),
            };
            let name = sample_set_name(
                request.name.as_deref(),
                Some(column),
                Some(value.as_str()),
                &now,
            );
            emit(sink, format!("phase=Resolve; building sample set {name}"));
            let catalog = self.build_set(&dataset, &selector, &selection, &name)?;
            if catalog.is_empty() {
                return Err(empty());
            }
            sets.insert(name, catalog);
        }
        Ok(sets)
    }

    pub fn samples(
        &self,
        request: &SampleSetRequest,
        sink: &dyn ProgressSink,
    ) -> Result<SamplesResult, CatalogError> {
        let sets = self.sample_sets(request, sink)?;
        Ok(SamplesResult {
            sample_sets: sets.into_values().collect(),
        })
    }

    pub fn results(
        &self,
        request: &SampleSetRequest,
        template: &str,
        extra: &Placeholders,
        sink: &dyn ProgressSink,
    ) -> Result<ResultsResult, CatalogError> {
        let sets = self.sample_sets(request, sink)?;
        emit(sink, format!("phase=Render; template {template}"));
        let mut paths = Vec::new();
        for catalog in sets.values() {
            paths.extend(catalog.result_paths(&self.config.templates, template, extra)?);
        }
        Ok(ResultsResult { paths })
    }

    pub fn qc_manifest(
        &self,
        request: &SampleSetRequest,
        strand: Strand,
        write: bool,
        sink: &dyn ProgressSink,
    ) -> Result<QcResult, CatalogError> {
        let sets = self.sample_sets(request, sink)?;
        let mut manifests = BTreeMap::new();
        for (name, catalog) in &sets {
            emit(sink, format!("phase=Write; qc manifest {name} {strand}"));
            let target = write.then_some(name.as_str());
            manifests.insert(
                name.clone(),
                manifest::qc_manifest(catalog, &self.config.templates, strand, target)?,
            );
        }
        Ok(QcResult {
            sample_sets: manifests,
        })
    }

    pub fn assembly_table(
        &self,
        request: &SampleSetRequest,
        assembler: &str,
        params: &str,
        overwrite: bool,
        sink: &dyn ProgressSink,
    ) -> Result<TableResult, CatalogError> {
        let sets = self.sample_sets(request, sink)?;
        let mut tables = BTreeMap::new();
        for (name, catalog) in &sets {
            emit(sink, format!("phase=Write; assembly table {assembler}/{params} {name}"));
            let status = manifest::write_assembly_table(
                catalog,
                &self.config.templates,
                assembler,
                params,
                name,
                overwrite,
            )?;
            tables.insert(name.clone(), status);
        }
        Ok(TableResult {
            sample_sets: tables,
        })
    }

    pub fn merge_manifest(
        &self,
        request: &SampleSetRequest,
        overwrite: bool,
        sink: &dyn ProgressSink,
    ) -> Result<MergeResult, CatalogError> {
        let sets = self.sample_sets(request, sink)?;
        let mut manifests = BTreeMap::new();
        for (name, catalog) in &sets {
            emit(sink, format!("phase=Write; merge manifest {name}"));
            manifests.insert(
                name.clone(),
                manifest::write_merge_manifest(catalog, &self.config.templates, name, overwrite)?,
            );
        }
        Ok(MergeResult {
            sample_sets: manifests,
        })
    }

    pub fn prepare(
        &self,
        request: &SampleSetRequest,
        result_template: &str,
        extra: &Placeholders,
        overwrite: bool,
        sink: &dyn ProgressSink,
    ) -> Result<PreparedSampleSets, CatalogError> {
        let sets = self.sample_sets(request, sink)?;
        emit(sink, "phase=Write; preparing sample sets");
        manifest::prepare_sample_sets(
            &self.config.templates,
            &sets,
            result_template,
            extra,
            overwrite,
        )
    }

    pub fn export(&self, dataset: &str, sink: &dyn ProgressSink) -> Result<ExportResult, CatalogError> {
        emit(sink, format!("phase=Resolve; loading dataset {dataset}"));
        let loaded = self.registry.load_dataset(dataset, &self.resolver)?;
        emit(sink, "phase=Write; exporting sample table");
        let path = self.registry.write_fs_samples(&loaded)?;
        Ok(ExportResult {
            dataset: loaded.name().to_string(),
            path: path.to_string(),
            records: loaded.records().count(),
        })
    }

    fn selector(
        &self,
        dataset: &DatasetInfo,
        request: &SampleSetRequest,
        sink: &dyn ProgressSink,
    ) -> Result<PreprocessingSelector, CatalogError> {
        if let Some(value) = request.preprocessing.as_deref() {
            return value.parse();
        }
        let mut stages = Vec::new();
        for stage in fs_util::list_subdirs(&dataset.reads_dir())? {
            let named = PreprocessingSelector::Named(stage.clone());
            let samples = self.resolver.discover_samples(
                &dataset.fs_prefix,
                &dataset.dataset_name,
                &named,
                None,
            )?;
            if !samples.is_empty() {
                stages.push(stage);
            }
        }
        match select_canonical(self.resolver.strategy(), &stages) {
            Some(stage) => {
                info!(dataset = %dataset.dataset_name, %stage, "preprocessing not specified, using default stage");
                emit(sink, format!("phase=Resolve; using preprocessing {stage}"));
                Ok(PreprocessingSelector::Named(stage.to_string()))
            }
            None => Ok(PreprocessingSelector::Longest),
        }
    }

    fn build_set(
        &self,
        dataset: &DatasetInfo,
        selector: &PreprocessingSelector,
        selection: &SampleSelection,
        name: &str,
    ) -> Result<SampleCatalog, CatalogError> {
        let mut catalog = SampleCatalog::new(name);
        catalog.add_samples(&self.resolver, dataset, selector, selection)?;
        Ok(catalog)
    }
}
