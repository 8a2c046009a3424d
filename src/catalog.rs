use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, TimeZone};
use serde::Serialize;
use tracing::debug;

use crate::dataset::DatasetInfo;
use crate::domain::{PreprocessingSelector, SampleKey};
use crate::error::CatalogError;
use crate::resolver::{SampleRecord, SampleResolver, SelectionStrategy};
use crate::template::{PathTemplates, Placeholders};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleSelection {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub pattern: Option<String>,
}

impl SampleSelection {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn only(names: Vec<String>) -> Self {
        Self {
            include: names,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SampleCatalog {
    name: String,
    records: Vec<SampleRecord>,
    #[serde(skip)]
    keys: HashSet<SampleKey>,
}

impl SampleCatalog {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn from_records(
        name: impl Into<String>,
        records: Vec<SampleRecord>,
    ) -> Result<Self, CatalogError> {
        let mut catalog = Self::new(name);
        catalog.extend_checked(records)?;
        Ok(catalog)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[SampleRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &SampleRecord> {
        self.records.iter()
    }

    pub fn push(&mut self, record: SampleRecord) -> Result<(), CatalogError> {
        self.extend_checked(vec![record]).map(|_| ())
    }

    /// Union of two catalogs. Any shared key rejects the whole append and
    /// leaves `self` unchanged.
    pub fn append(&mut self, other: SampleCatalog) -> Result<(), CatalogError> {
        self.extend_checked(other.records).map(|_| ())
    }

    pub fn add_samples<S: SelectionStrategy>(
        &mut self,
        resolver: &SampleResolver<S>,
        dataset: &DatasetInfo,
        selector: &PreprocessingSelector,
        selection: &SampleSelection,
    ) -> Result<usize, CatalogError> {
        let discovered = resolver.discover_samples(
            &dataset.fs_prefix,
            &dataset.dataset_name,
            selector,
            selection.pattern.as_deref(),
        )?;

        // Names repeated in `include` (metadata rows, comma lists) resolve once.
        let mut seen = HashSet::new();
        let names: Vec<&String> = if selection.include.is_empty() {
            discovered.iter().collect()
        } else {
            selection
                .include
                .iter()
                .filter(|name| discovered.contains(*name) && seen.insert(name.as_str()))
                .collect()
        };

        let mut records = Vec::with_capacity(names.len());
        for name in names {
            if selection.exclude.contains(name) {
                debug!(sample = %name, "excluded");
                continue;
            }
            records.push(resolver.resolve_sample(
                &dataset.fs_prefix,
                &dataset.dataset_name,
                selector,
                name,
            )?);
        }
        self.extend_checked(records)
    }

    pub fn exclude(&mut self, names: &[String]) {
        self.retain(|record| !names.contains(&record.fs_name));
    }

    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&SampleRecord) -> bool,
    {
        self.records.retain(|record| keep(record));
        self.keys = self.records.iter().map(SampleRecord::key).collect();
    }

    pub fn sample_names(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.fs_name.as_str()).collect()
    }

    pub fn single_dataset(&self) -> Result<(&str, &str), CatalogError> {
        let first = self.records.first().ok_or(CatalogError::EmptyCatalog)?;
        let origins: BTreeSet<(&str, &str)> = self
            .records
            .iter()
            .map(|r| (r.dataset.as_str(), r.fs_prefix.as_str()))
            .collect();
        if origins.len() > 1 {
            let listed = origins
                .iter()
                .map(|(dataset, prefix)| format!("{dataset} ({prefix})"))
                .collect::<Vec<_>>()
                .join(", ");
            return Err(CatalogError::MixedDatasets(listed));
        }
        Ok((first.dataset.as_str(), first.fs_prefix.as_str()))
    }

    pub fn result_paths(
        &self,
        templates: &PathTemplates,
        template_name: &str,
        extra: &Placeholders,
    ) -> Result<Vec<String>, CatalogError> {
        let template = templates.get(template_name)?;
        self.records
            .iter()
            .map(|record| {
                let mut values = record.placeholders();
                values.extend_missing(extra);
                template.render(&values)
            })
            .collect()
    }

    fn extend_checked(&mut self, records: Vec<SampleRecord>) -> Result<usize, CatalogError> {
        let mut incoming = HashSet::with_capacity(records.len());
        for record in &records {
            let key = record.key();
            if self.keys.contains(&key) || !incoming.insert(key.clone()) {
                return Err(CatalogError::DuplicateSampleKey(key.to_string()));
            }
        }
        let added = records.len();
        self.keys.extend(incoming);
        self.records.extend(records);
        Ok(added)
    }
}

pub fn sample_set_name<Tz: TimeZone>(
    base: Option<&str>,
    meta_column: Option<&str>,
    column_value: Option<&str>,
    now: &DateTime<Tz>,
) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let base = match base {
        Some(base) => base.to_string(),
        None => now.format("%d%b%y_%H%M").to_string(),
    };
    match (meta_column, column_value) {
        (Some(column), Some(value)) => format!("{base}__{column}_{value}"),
        (Some(column), None) => format!("{base}__{column}"),
        _ => base,
    }
}
