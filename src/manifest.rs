use std::collections::BTreeMap;
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use csv::{ReaderBuilder, WriterBuilder};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::catalog::SampleCatalog;
use crate::domain::Strand;
use crate::error::CatalogError;
use crate::fs_util::{self, WriteStatus};
use crate::resolver::SampleRecord;
use crate::template::{self, PathTemplates, Placeholders};

pub const ASSEMBLY_HEADER: [&str; 3] = ["dataset", "sample", "preprocessing"];
pub const MERGE_HEADER: [&str; 4] = ["sample", "R1_path", "R2_path", "merged_output_path"];
pub const RECORD_HEADER: [&str; 10] = [
    "dataset",
    "fs_name",
    "sample",
    "preprocessing",
    "fs_prefix",
    "reads",
    "bases",
    "bytes",
    "size",
    "preprocessings",
];
pub const SAMPLE_SET_FILE: &str = "sample_set.tsv";

#[derive(Debug, Clone, Serialize)]
pub struct QcManifest {
    pub strand: Strand,
    pub entries: Vec<String>,
    pub write: Option<WriteStatus>,
}

/// Per-sample QC report paths for one strand. With `sample_set`, the list is
/// also written to the dataset's multiqc location; an existing list is never
/// replaced.
pub fn qc_manifest(
    catalog: &SampleCatalog,
    templates: &PathTemplates,
    strand: Strand,
    sample_set: Option<&str>,
) -> Result<QcManifest, CatalogError> {
    let strand_value = Placeholders::new().with("strand", strand.as_str());
    let entries = catalog.result_paths(templates, template::FASTQC_DATA, &strand_value)?;

    let write = match sample_set {
        Some(sample_set) => {
            let values = dataset_values(catalog, sample_set)?.with("strand", strand.as_str());
            let path = Utf8PathBuf::from(templates.render(template::MULTIQC_FASTQC, &values)?);
            let status = fs_util::write_new(&path, entries.join("\n").as_bytes())?;
            log_status(&status);
            Some(status)
        }
        None => None,
    };

    Ok(QcManifest {
        strand,
        entries,
        write,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssemblyRow {
    pub dataset: String,
    pub sample: String,
    pub preprocessing: String,
}

pub fn assembly_rows(catalog: &SampleCatalog) -> Vec<AssemblyRow> {
    catalog
        .iter()
        .map(|record| AssemblyRow {
            dataset: record.dataset.clone(),
            sample: record.fs_name.clone(),
            preprocessing: record.preprocessing.clone(),
        })
        .collect()
}

pub fn write_assembly_table(
    catalog: &SampleCatalog,
    templates: &PathTemplates,
    assembler: &str,
    params: &str,
    sample_set: &str,
    overwrite: bool,
) -> Result<WriteStatus, CatalogError> {
    let values = dataset_values(catalog, sample_set)?
        .with("assembler", assembler)
        .with("params", params);
    let path = Utf8PathBuf::from(templates.render(template::ASSEMBLY_TABLE, &values)?);
    let content = to_tsv(&ASSEMBLY_HEADER, &assembly_rows(catalog))?;
    let status = fs_util::write_file(&path, &content, overwrite)?;
    log_status(&status);
    Ok(status)
}

pub fn read_assembly_table(path: &Utf8Path) -> Result<Vec<AssemblyRow>, CatalogError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .from_path(path.as_std_path())
        .map_err(|err| CatalogError::Filesystem(format!("read {path}: {err}")))?;
    reader
        .deserialize()
        .collect::<Result<Vec<AssemblyRow>, _>>()
        .map_err(|err| CatalogError::Filesystem(format!("parse {path}: {err}")))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeEntry {
    pub sample: String,
    #[serde(rename = "R1_path")]
    pub r1_path: String,
    #[serde(rename = "R2_path")]
    pub r2_path: String,
    pub merged_output_path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MergeManifest {
    pub entries: Vec<MergeEntry>,
    pub write: WriteStatus,
}

pub fn merge_entries(
    catalog: &SampleCatalog,
    templates: &PathTemplates,
    sample_set: &str,
) -> Result<Vec<MergeEntry>, CatalogError> {
    let reads = templates.get(template::FASTQ_GZ)?;
    let merged = templates.get(template::MERGED_PAIRS)?;
    catalog
        .iter()
        .map(|record| -> Result<MergeEntry, CatalogError> {
            let values = record.placeholders().with("sample_set", sample_set);
            Ok(MergeEntry {
                sample: record.fs_name.clone(),
                r1_path: reads.render(&values.clone().with("strand", Strand::R1.as_str()))?,
                r2_path: reads.render(&values.clone().with("strand", Strand::R2.as_str()))?,
                merged_output_path: merged.render(&values)?,
            })
        })
        .collect()
}

pub fn write_merge_manifest(
    catalog: &SampleCatalog,
    templates: &PathTemplates,
    sample_set: &str,
    overwrite: bool,
) -> Result<MergeManifest, CatalogError> {
    let values = dataset_values(catalog, sample_set)?;
    let path = Utf8PathBuf::from(templates.render(template::MERGE_MANIFEST, &values)?);
    let entries = merge_entries(catalog, templates, sample_set)?;
    let content = to_tsv(&MERGE_HEADER, &entries)?;
    let write = fs_util::write_file(&path, &content, overwrite)?;
    log_status(&write);
    Ok(MergeManifest { entries, write })
}

pub fn records_tsv<'a, I>(records: I) -> Result<Vec<u8>, CatalogError>
where
    I: IntoIterator<Item = &'a SampleRecord>,
{
    let mut writer = WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(RECORD_HEADER).map_err(csv_err)?;
    for record in records {
        let optional = |value: Option<String>| value.unwrap_or_default();
        writer
            .write_record([
                record.dataset.clone(),
                record.fs_name.clone(),
                record.sample.clone(),
                record.preprocessing.clone(),
                record.fs_prefix.clone(),
                record.reads.to_string(),
                optional(record.bases.map(|v| v.to_string())),
                optional(record.bytes.map(|v| v.to_string())),
                optional(record.size.clone()),
                record
                    .preprocessings
                    .iter()
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(","),
            ])
            .map_err(csv_err)?;
    }
    writer
        .into_inner()
        .map_err(|err| CatalogError::Filesystem(err.to_string()))
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PreparedSampleSets {
    pub results: Vec<String>,
    pub tables: Vec<WriteStatus>,
    pub created_dirs: Vec<String>,
    pub created_files: Vec<String>,
}

impl PreparedSampleSets {
    pub fn rollback(&self) -> Result<(), CatalogError> {
        for file in self.created_files.iter().map(Utf8Path::new) {
            if file.as_std_path().exists() {
                fs::remove_file(file.as_std_path())
                    .map_err(|err| CatalogError::Filesystem(format!("remove {file}: {err}")))?;
            }
        }
        for dir in self.created_dirs.iter().rev().map(Utf8Path::new) {
            if dir.as_std_path().exists() {
                fs::remove_dir_all(dir.as_std_path())
                    .map_err(|err| CatalogError::Filesystem(format!("remove {dir}: {err}")))?;
            }
        }
        Ok(())
    }
}

pub fn prepare_sample_sets(
    templates: &PathTemplates,
    sample_sets: &BTreeMap<String, SampleCatalog>,
    result_template: &str,
    extra: &Placeholders,
    overwrite: bool,
) -> Result<PreparedSampleSets, CatalogError> {
    let mut prepared = PreparedSampleSets::default();
    for (name, catalog) in sample_sets {
        let mut values = dataset_values(catalog, name)?;
        let dir = Utf8PathBuf::from(templates.render(template::SAMPLE_SET_DIR, &values)?);
        if !dir.as_std_path().exists() {
            fs::create_dir_all(dir.as_std_path())
                .map_err(|err| CatalogError::Filesystem(format!("create {dir}: {err}")))?;
            prepared.created_dirs.push(dir.to_string());
        }

        let table = dir.join(SAMPLE_SET_FILE);
        let existed = table.as_std_path().exists();
        let status = fs_util::write_file(&table, &records_tsv(catalog.iter())?, overwrite)?;
        if !existed {
            prepared.created_files.push(table.to_string());
        }
        log_status(&status);
        prepared.tables.push(status);

        values.extend_missing(extra);
        prepared
            .results
            .push(templates.render(result_template, &values)?);
    }
    Ok(prepared)
}

fn dataset_values(catalog: &SampleCatalog, sample_set: &str) -> Result<Placeholders, CatalogError> {
    let (dataset, fs_prefix) = catalog.single_dataset()?;
    Ok(Placeholders::new()
        .with("fs_prefix", fs_prefix)
        .with("dataset", dataset)
        .with("sample_set", sample_set))
}

fn to_tsv<T: Serialize>(header: &[&str], rows: &[T]) -> Result<Vec<u8>, CatalogError> {
    let mut writer = WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(header).map_err(csv_err)?;
    for row in rows {
        writer.serialize(row).map_err(csv_err)?;
    }
    writer
        .into_inner()
        .map_err(|err| CatalogError::Filesystem(err.to_string()))
}

fn csv_err(err: csv::Error) -> CatalogError {
    CatalogError::Filesystem(format!("tsv: {err}"))
}

fn log_status(status: &WriteStatus) {
    match status {
        WriteStatus::Conflict { path } => {
            warn!(%path, "manifest already exists, use a new name or overwrite")
        }
        WriteStatus::Written { path } | WriteStatus::Overwritten { path } => {
            info!(%path, "manifest written")
        }
    }
}
