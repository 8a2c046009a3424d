use std::collections::BTreeSet;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::counts::{self, CountOptions, CountOutcome};
use crate::domain::{PreprocessingSelector, SampleKey, Strand};
use crate::error::CatalogError;
use crate::fs_util;
use crate::template::{self, PathTemplates, Placeholders};

pub trait SelectionStrategy {
    /// `true` when `candidate` should replace `current`. Returning `false` on
    /// ties keeps the first stage in discovery order.
    fn prefers(&self, candidate: &str, current: &str) -> bool;
}

impl<S: SelectionStrategy + ?Sized> SelectionStrategy for Box<S> {
    fn prefers(&self, candidate: &str, current: &str) -> bool {
        (**self).prefers(candidate, current)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LongestName;

impl SelectionStrategy for LongestName {
    fn prefers(&self, candidate: &str, current: &str) -> bool {
        candidate.len() > current.len()
    }
}

#[derive(Debug, Clone, Default)]
pub struct StageOrder {
    stages: Vec<String>,
}

impl StageOrder {
    pub fn new(stages: Vec<String>) -> Self {
        Self { stages }
    }

    fn rank(&self, stage: &str) -> Option<usize> {
        self.stages.iter().position(|item| item == stage)
    }
}

impl SelectionStrategy for StageOrder {
    fn prefers(&self, candidate: &str, current: &str) -> bool {
        self.rank(candidate) > self.rank(current)
    }
}

pub fn select_canonical<'a, S: SelectionStrategy + ?Sized>(
    strategy: &S,
    candidates: &'a [String],
) -> Option<&'a str> {
    let mut iter = candidates.iter();
    let mut best = iter.next()?.as_str();
    for candidate in iter {
        if strategy.prefers(candidate, best) {
            best = candidate;
        }
    }
    Some(best)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleRecord {
    pub dataset: String,
    pub fs_name: String,
    pub sample: String,
    pub preprocessing: String,
    pub fs_prefix: String,
    pub reads: i64,
    #[serde(default)]
    pub bases: Option<i64>,
    #[serde(default)]
    pub bytes: Option<u64>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub preprocessings: BTreeSet<String>,
}

impl SampleRecord {
    pub fn key(&self) -> SampleKey {
        SampleKey::new(&self.fs_name, &self.preprocessing)
    }

    pub fn has_counts(&self) -> bool {
        self.reads != counts::UNAVAILABLE
    }

    pub fn is_resolved(&self) -> bool {
        !self.preprocessing.is_empty()
    }

    pub fn placeholders(&self) -> Placeholders {
        Placeholders::new()
            .with("fs_prefix", self.fs_prefix.as_str())
            .with("dataset", self.dataset.as_str())
            .with("preprocessing", self.preprocessing.as_str())
            .with("sample", self.fs_name.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOptions {
    pub counts: CountOptions,
    pub report_size: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            counts: CountOptions {
                report_bases: true,
                ..CountOptions::default()
            },
            report_size: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SampleResolver<S = LongestName> {
    templates: PathTemplates,
    options: ResolveOptions,
    strategy: S,
}

impl SampleResolver<LongestName> {
    pub fn new(templates: PathTemplates, options: ResolveOptions) -> Self {
        Self::with_strategy(templates, options, LongestName)
    }
}

impl<S: SelectionStrategy> SampleResolver<S> {
    pub fn with_strategy(templates: PathTemplates, options: ResolveOptions, strategy: S) -> Self {
        Self {
            templates,
            options,
            strategy,
        }
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    pub fn discover_stages(
        &self,
        fs_prefix: &str,
        dataset: &str,
        selector: &PreprocessingSelector,
        sample: &str,
    ) -> Result<Vec<String>, CatalogError> {
        let literals = base_values(fs_prefix, dataset)
            .with("sample", sample)
            .with("strand", Strand::R1.as_str());
        let (literals, wildcards) = split_selector(literals, selector);
        self.capture_all(&literals, &wildcards, "preprocessing")
    }

    pub fn discover_samples(
        &self,
        fs_prefix: &str,
        dataset: &str,
        selector: &PreprocessingSelector,
        pattern: Option<&str>,
    ) -> Result<Vec<String>, CatalogError> {
        let literals = base_values(fs_prefix, dataset).with("strand", Strand::R1.as_str());
        let (literals, wildcards) = split_selector(literals, selector);
        let wildcards = wildcards.with("sample", pattern.unwrap_or(template::WILDCARD));
        self.capture_all(&literals, &wildcards, "sample")
    }

    pub fn reads_path(
        &self,
        fs_prefix: &str,
        dataset: &str,
        preprocessing: &str,
        sample: &str,
        strand: Strand,
    ) -> Result<Utf8PathBuf, CatalogError> {
        self.sample_path(template::FASTQ_GZ, fs_prefix, dataset, preprocessing, sample, strand)
    }

    pub fn count_path(
        &self,
        fs_prefix: &str,
        dataset: &str,
        preprocessing: &str,
        sample: &str,
        strand: Strand,
    ) -> Result<Utf8PathBuf, CatalogError> {
        self.sample_path(template::COUNT, fs_prefix, dataset, preprocessing, sample, strand)
    }

    /// Resolves one sample. Missing reads or counts never fail the call, they
    /// show up as an empty `preprocessing` and the `-1` read count.
    pub fn resolve_sample(
        &self,
        fs_prefix: &str,
        dataset: &str,
        selector: &PreprocessingSelector,
        sample: &str,
    ) -> Result<SampleRecord, CatalogError> {
        let mut verified = Vec::new();
        for stage in self.discover_stages(fs_prefix, dataset, selector, sample)? {
            let r1 = self.reads_path(fs_prefix, dataset, &stage, sample, Strand::R1)?;
            let r2 = self.reads_path(fs_prefix, dataset, &stage, sample, Strand::R2)?;
            if r1.is_file() && r2.is_file() {
                verified.push(stage);
            } else {
                debug!(%sample, %stage, "rejecting stage without both strands");
            }
        }

        let mut record = SampleRecord {
            dataset: dataset.to_string(),
            fs_name: sample.to_string(),
            sample: sample.to_string(),
            preprocessing: String::new(),
            fs_prefix: fs_prefix.to_string(),
            reads: counts::UNAVAILABLE,
            bases: CountOutcome::Unavailable.base_count(self.options.counts.report_bases),
            bytes: None,
            size: None,
            preprocessings: BTreeSet::new(),
        };

        let Some(stage) = select_canonical(&self.strategy, &verified).map(str::to_string) else {
            debug!(%dataset, %sample, %selector, "no paired stage found");
            return Ok(record);
        };

        if self.options.report_size {
            let r1 = self.reads_path(fs_prefix, dataset, &stage, sample, Strand::R1)?;
            let r2 = self.reads_path(fs_prefix, dataset, &stage, sample, Strand::R2)?;
            if let (Some(a), Some(b)) = (fs_util::file_size(&r1), fs_util::file_size(&r2)) {
                record.bytes = Some(a + b);
                record.size = Some(fs_util::human_size(a + b));
            }
        }

        let c1 = self.count_path(fs_prefix, dataset, &stage, sample, Strand::R1)?;
        let c2 = self.count_path(fs_prefix, dataset, &stage, sample, Strand::R2)?;
        let outcome = counts::load_counts(&c1, &c2, self.options.counts);
        record.reads = outcome.read_count();
        record.bases = outcome.base_count(self.options.counts.report_bases);
        record.preprocessing = stage;
        record.preprocessings = verified.into_iter().collect();
        Ok(record)
    }

    fn sample_path(
        &self,
        template_name: &str,
        fs_prefix: &str,
        dataset: &str,
        preprocessing: &str,
        sample: &str,
        strand: Strand,
    ) -> Result<Utf8PathBuf, CatalogError> {
        let values = base_values(fs_prefix, dataset)
            .with("preprocessing", preprocessing)
            .with("sample", sample)
            .with("strand", strand.as_str());
        self.templates
            .render(template_name, &values)
            .map(Utf8PathBuf::from)
    }

    // `literals` are escaped before globbing; only `wildcards` carry glob syntax.
    fn capture_all(
        &self,
        literals: &Placeholders,
        wildcards: &Placeholders,
        capture: &str,
    ) -> Result<Vec<String>, CatalogError> {
        let template = self.templates.get(template::FASTQ_GZ)?;
        let mut glob_values: Placeholders = literals
            .iter()
            .map(|(name, value)| (name.to_string(), glob::Pattern::escape(value)))
            .collect();
        glob_values.extend_missing(wildcards);
        let pattern = template.render(&glob_values)?;

        let mut values = literals.clone();
        values.extend_missing(wildcards);
        let matcher = template.matcher(&values, capture)?;

        let mut found = Vec::new();
        for path in fs_util::glob_utf8(&pattern)? {
            if let Some(value) = matcher.capture(path.as_str()) {
                if !found.contains(&value) {
                    found.push(value);
                }
            }
        }
        Ok(found)
    }
}

fn split_selector(
    literals: Placeholders,
    selector: &PreprocessingSelector,
) -> (Placeholders, Placeholders) {
    match selector {
        PreprocessingSelector::Longest => (
            literals,
            Placeholders::new().with("preprocessing", selector.glob_value()),
        ),
        PreprocessingSelector::Named(stage) => {
            (literals.with("preprocessing", stage.as_str()), Placeholders::new())
        }
    }
}

fn base_values(fs_prefix: &str, dataset: &str) -> Placeholders {
    Placeholders::new()
        .with("fs_prefix", fs_prefix)
        .with("dataset", dataset)
}
