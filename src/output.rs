use std::io::{self, Write};

use serde::Serialize;

use crate::app::{
    ExportResult, InfoResult, ListResult, MergeResult, ProgressEvent, ProgressSink, QcResult,
    ResultsResult, SamplesResult, TableResult,
};
use crate::fs_util::WriteStatus;
use crate::manifest::PreparedSampleSets;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Interactive,
    NonInteractive,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

pub struct TextOutput;

impl TextOutput {
    pub fn print_list(result: &ListResult) -> io::Result<()> {
        let mut out = io::stdout().lock();
        if result.datasets.is_empty() {
            return writeln!(out, "no datasets registered");
        }
        for entry in &result.datasets {
            writeln!(out, "{}\t{}", entry.dataset, entry.full_path)?;
        }
        Ok(())
    }

    pub fn print_info(result: &InfoResult) -> io::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "Dataset name: {}", result.dataset)?;
        writeln!(out, "Filesystem prefix: {}", result.fs_prefix)?;
        writeln!(out, "Full path: {}", result.full_path)?;
        for stage in &result.preprocessings {
            writeln!(
                out,
                "Samples in {} - {} ({} with counts, {} reads)",
                stage.preprocessing, stage.samples, stage.samples_with_counts, stage.total_reads
            )?;
        }
        if result.read_counts.rows.is_empty() {
            return Ok(());
        }
        writeln!(out)?;
        writeln!(out, "sample\t{}", result.read_counts.preprocessings.join("\t"))?;
        for row in &result.read_counts.rows {
            let counts = result
                .read_counts
                .preprocessings
                .iter()
                .map(|stage| match row.reads.get(stage) {
                    Some(reads) => reads.to_string(),
                    None => "-".to_string(),
                })
                .collect::<Vec<_>>();
            writeln!(out, "{}\t{}", row.sample, counts.join("\t"))?;
        }
        Ok(())
    }

    pub fn print_samples(result: &SamplesResult) -> io::Result<()> {
        let mut out = io::stdout().lock();
        for catalog in &result.sample_sets {
            writeln!(out, "# {} ({} samples)", catalog.name(), catalog.len())?;
            for record in catalog.iter() {
                writeln!(
                    out,
                    "{}\t{}\t{}\t{}",
                    record.fs_name,
                    record.preprocessing,
                    record.reads,
                    record.size.as_deref().unwrap_or("-")
                )?;
            }
        }
        Ok(())
    }

    pub fn print_results(result: &ResultsResult) -> io::Result<()> {
        let mut out = io::stdout().lock();
        for path in &result.paths {
            writeln!(out, "{path}")?;
        }
        Ok(())
    }

    pub fn print_qc(result: &QcResult) -> io::Result<()> {
        let mut out = io::stdout().lock();
        for (name, manifest) in &result.sample_sets {
            match &manifest.write {
                Some(status) => writeln!(out, "{name}: {}", describe(status))?,
                None => {
                    for entry in &manifest.entries {
                        writeln!(out, "{entry}")?;
                    }
                }
            }
        }
        Ok(())
    }

    pub fn print_tables(result: &TableResult) -> io::Result<()> {
        let mut out = io::stdout().lock();
        for (name, status) in &result.sample_sets {
            writeln!(out, "{name}: {}", describe(status))?;
        }
        Ok(())
    }

    pub fn print_merge(result: &MergeResult) -> io::Result<()> {
        let mut out = io::stdout().lock();
        for (name, manifest) in &result.sample_sets {
            writeln!(
                out,
                "{name}: {} ({} samples)",
                describe(&manifest.write),
                manifest.entries.len()
            )?;
        }
        Ok(())
    }

    pub fn print_prepare(result: &PreparedSampleSets) -> io::Result<()> {
        let mut out = io::stdout().lock();
        for status in &result.tables {
            writeln!(out, "{}", describe(status))?;
        }
        for path in &result.results {
            writeln!(out, "{path}")?;
        }
        Ok(())
    }

    pub fn print_export(result: &ExportResult) -> io::Result<()> {
        writeln!(
            io::stdout().lock(),
            "exported {} records of {} to {}",
            result.records,
            result.dataset,
            result.path
        )
    }
}

impl ProgressSink for TextOutput {
    fn event(&self, event: ProgressEvent) {
        eprintln!("{}", event.message);
    }
}

fn describe(status: &WriteStatus) -> String {
    match status {
        WriteStatus::Written { path } => format!("wrote {path}"),
        WriteStatus::Overwritten { path } => format!("overwrote {path}"),
        WriteStatus::Conflict { path } => format!("kept existing {path}"),
    }
}
