mod common;

use std::collections::BTreeMap;
use std::fs;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use kira_sample_catalog::catalog::{SampleCatalog, SampleSelection};
use kira_sample_catalog::domain::{PreprocessingSelector, Strand};
use kira_sample_catalog::error::CatalogError;
use kira_sample_catalog::fs_util::WriteStatus;
use kira_sample_catalog::manifest::{
    self, AssemblyRow, SAMPLE_SET_FILE, qc_manifest, read_assembly_table, write_assembly_table,
    write_merge_manifest,
};
use kira_sample_catalog::resolver::{ResolveOptions, SampleResolver};
use kira_sample_catalog::template::{self, PathTemplates, Placeholders};

use common::Fixture;

fn catalog(fixture: &Fixture, samples: &[&str]) -> SampleCatalog {
    let resolver = SampleResolver::new(PathTemplates::with_defaults(), ResolveOptions::default());
    let mut catalog = SampleCatalog::new("set1");
    catalog
        .add_samples(
            &resolver,
            &fixture.info(),
            &PreprocessingSelector::Longest,
            &SampleSelection::only(samples.iter().map(|s| s.to_string()).collect()),
        )
        .unwrap();
    catalog
}

#[test]
fn qc_manifest_never_overwrites() {
    let fixture = Fixture::new();
    let templates = PathTemplates::with_defaults();
    let set = catalog(&fixture, &["S1", "S2"]);

    let first = qc_manifest(&set, &templates, Strand::R1, Some("set1")).unwrap();
    assert_eq!(first.entries.len(), 2);
    assert!(first.entries[0].ends_with("trimmed_filtered/S1/S1_R1/fastqc_data.txt"));
    let status = first.write.unwrap();
    assert_matches!(status, WriteStatus::Written { .. });

    let path = Utf8PathBuf::from(status.path());
    assert_eq!(
        path,
        fixture
            .dataset_dir()
            .join("profile/multiqc/set1/R1/fastqc_list.txt")
    );
    let before = fs::read(&path).unwrap();

    let other = catalog(&fixture, &["S1"]);
    let second = qc_manifest(&other, &templates, Strand::R1, Some("set1")).unwrap();
    assert!(second.write.unwrap().is_conflict());
    assert_eq!(fs::read(&path).unwrap(), before);
}

#[test]
fn qc_manifest_without_sample_set_only_lists() {
    let fixture = Fixture::new();
    let set = catalog(&fixture, &["S1"]);
    let manifest = qc_manifest(&set, &PathTemplates::with_defaults(), Strand::R2, None).unwrap();
    assert!(manifest.write.is_none());
    assert!(manifest.entries[0].ends_with("S1/S1_R2/fastqc_data.txt"));
    assert!(!fixture.dataset_dir().join("profile").exists());
}

#[test]
fn assembly_table_round_trip_and_conflict() {
    let fixture = Fixture::new();
    let templates = PathTemplates::with_defaults();
    let set = catalog(&fixture, &["S2", "S1"]);

    let status =
        write_assembly_table(&set, &templates, "megahit", "default", "set1", false).unwrap();
    assert_matches!(status, WriteStatus::Written { .. });
    let path = Utf8PathBuf::from(status.path());
    assert_eq!(
        path,
        fixture
            .dataset_dir()
            .join("assembly/megahit__default/set1/sample_set.tsv")
    );

    let mut rows = read_assembly_table(&path).unwrap();
    rows.sort();
    assert_eq!(
        rows,
        vec![
            AssemblyRow {
                dataset: "FMT".to_string(),
                sample: "S1".to_string(),
                preprocessing: "trimmed_filtered".to_string(),
            },
            AssemblyRow {
                dataset: "FMT".to_string(),
                sample: "S2".to_string(),
                preprocessing: "raw".to_string(),
            },
        ]
    );

    let again =
        write_assembly_table(&set, &templates, "megahit", "default", "set1", false).unwrap();
    assert!(again.is_conflict());
    let replaced =
        write_assembly_table(&set, &templates, "megahit", "default", "set1", true).unwrap();
    assert_matches!(replaced, WriteStatus::Overwritten { .. });
}

#[test]
fn merge_manifest_lists_both_strands() {
    let fixture = Fixture::new();
    let templates = PathTemplates::with_defaults();
    let set = catalog(&fixture, &["S1"]);

    let manifest = write_merge_manifest(&set, &templates, "set1", false).unwrap();
    assert_eq!(manifest.entries.len(), 1);
    let entry = &manifest.entries[0];
    assert!(entry.r1_path.ends_with("reads/trimmed_filtered/S1_R1.fastq.gz"));
    assert!(entry.r2_path.ends_with("reads/trimmed_filtered/S1_R2.fastq.gz"));
    assert!(
        entry
            .merged_output_path
            .ends_with("reads/trimmed_filtered/merged/set1/S1.fastq.gz")
    );

    let content = fs::read_to_string(manifest.write.path()).unwrap();
    assert!(content.starts_with("sample\tR1_path\tR2_path\tmerged_output_path\n"));

    let second = write_merge_manifest(&set, &templates, "set1", false).unwrap();
    assert!(second.write.is_conflict());
}

#[test]
fn manifests_reject_mixed_and_empty_catalogs() {
    let fixture = Fixture::new();
    let templates = PathTemplates::with_defaults();

    let empty = SampleCatalog::new("empty");
    let err = write_merge_manifest(&empty, &templates, "empty", false).unwrap_err();
    assert_matches!(err, CatalogError::EmptyCatalog);

    let mut mixed = catalog(&fixture, &["S1"]);
    let mut foreign = mixed.records()[0].clone();
    foreign.dataset = "OTHER".to_string();
    foreign.fs_name = "S9".to_string();
    mixed.push(foreign).unwrap();
    let err = write_assembly_table(&mixed, &templates, "spades", "k21", "mixed", false).unwrap_err();
    assert_matches!(err, CatalogError::MixedDatasets(_));
}

#[test]
fn prepare_writes_tables_and_rolls_back() {
    let fixture = Fixture::new();
    let templates = PathTemplates::with_defaults();
    let mut sets = BTreeMap::new();
    sets.insert("set1".to_string(), catalog(&fixture, &["S1", "S2"]));

    let prepared = manifest::prepare_sample_sets(
        &templates,
        &sets,
        template::SAMPLE_SET_DIR,
        &Placeholders::new(),
        false,
    )
    .unwrap();

    let dir = fixture.dataset_dir().join("sample_sets/set1");
    assert_eq!(prepared.results, vec![dir.to_string()]);
    let table = fs::read_to_string(dir.join(SAMPLE_SET_FILE)).unwrap();
    assert_eq!(table.lines().count(), 3);
    assert!(table.lines().nth(1).unwrap().starts_with("FMT\tS1\tS1\ttrimmed_filtered\t"));

    let json = serde_json::to_value(&prepared).unwrap();
    assert_eq!(json["created_dirs"][0], dir.as_str());
    assert_eq!(json["tables"][0]["status"], "written");

    prepared.rollback().unwrap();
    assert!(!dir.exists());
}
