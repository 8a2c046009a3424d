mod common;

use std::cell::RefCell;

use assert_matches::assert_matches;

use kira_sample_catalog::app::{App, ProgressEvent, ProgressSink, SampleSetRequest};
use kira_sample_catalog::domain::Strand;
use kira_sample_catalog::error::CatalogError;
use kira_sample_catalog::fs_util::WriteStatus;
use kira_sample_catalog::template::{self, Placeholders};

use common::{DATASET, Fixture};

#[derive(Default)]
struct Recorder {
    messages: RefCell<Vec<String>>,
}

impl ProgressSink for Recorder {
    fn event(&self, event: ProgressEvent) {
        self.messages.borrow_mut().push(event.message);
    }
}

fn request() -> SampleSetRequest {
    SampleSetRequest {
        dataset: DATASET.to_string(),
        name: Some("batch".to_string()),
        ..SampleSetRequest::default()
    }
}

const METADATA: &str = "sample\tgroup\nS1\tcase\nS2\tcontrol\nS3\tcase\n";

#[test]
fn default_stage_is_longest_on_disk() {
    let fixture = Fixture::new();
    let app = App::from_config(fixture.config());
    let sink = Recorder::default();

    let sets = app.sample_sets(&request(), &sink).unwrap();
    assert_eq!(sets.keys().collect::<Vec<_>>(), vec!["batch"]);
    let set = &sets["batch"];
    assert_eq!(set.sample_names(), vec!["S1"]);
    assert_eq!(set.records()[0].preprocessing, "trimmed_filtered");
    assert!(
        sink.messages
            .borrow()
            .iter()
            .any(|message| message.contains("using preprocessing trimmed_filtered"))
    );
}

#[test]
fn metadata_column_and_value_select_one_set() {
    let fixture = Fixture::new();
    fixture.metadata(METADATA);
    let app = App::from_config(fixture.config());

    let sets = app
        .sample_sets(
            &SampleSetRequest {
                preprocessing: Some("longest".to_string()),
                meta_column: Some("group".to_string()),
                column_value: Some("case".to_string()),
                ..request()
            },
            &Recorder::default(),
        )
        .unwrap();

    let set = &sets["batch__group_case"];
    assert_eq!(set.sample_names(), vec!["S1", "S3"]);
}

#[test]
fn metadata_column_alone_splits_by_value() {
    let fixture = Fixture::new();
    fixture.metadata(METADATA);
    let app = App::from_config(fixture.config());

    let sets = app
        .sample_sets(
            &SampleSetRequest {
                preprocessing: Some("raw".to_string()),
                meta_column: Some("group".to_string()),
                exclude: vec!["S3".to_string()],
                ..request()
            },
            &Recorder::default(),
        )
        .unwrap();

    assert_eq!(
        sets.keys().collect::<Vec<_>>(),
        vec!["batch__group_case", "batch__group_control"]
    );
    assert_eq!(sets["batch__group_case"].sample_names(), vec!["S1"]);
    assert_eq!(sets["batch__group_control"].sample_names(), vec!["S2"]);
}

#[test]
fn metadata_errors() {
    let fixture = Fixture::new();
    let app = App::from_config(fixture.config());
    let by_group = |value: &str| SampleSetRequest {
        meta_column: Some("group".to_string()),
        column_value: Some(value.to_string()),
        ..request()
    };

    assert_matches!(
        app.sample_sets(&by_group("case"), &Recorder::default()),
        Err(CatalogError::MetadataNotFound(_))
    );

    fixture.metadata(METADATA);
    assert_matches!(
        app.sample_sets(&by_group("unknown"), &Recorder::default()),
        Err(CatalogError::EmptySelection { column, value }) if column == "group" && value == "unknown"
    );
    assert_matches!(
        app.sample_sets(
            &SampleSetRequest {
                meta_column: Some("site".to_string()),
                ..request()
            },
            &Recorder::default()
        ),
        Err(CatalogError::MetadataColumnNotFound { column, .. }) if column == "site"
    );
}

#[test]
fn unknown_dataset_is_reported() {
    let fixture = Fixture::new();
    let app = App::from_config(fixture.config());
    let result = app.sample_sets(
        &SampleSetRequest {
            dataset: "absent".to_string(),
            ..request()
        },
        &Recorder::default(),
    );
    assert_matches!(result, Err(CatalogError::DatasetNotFound(_)));
}

#[test]
fn list_info_and_export() {
    let fixture = Fixture::new();
    let app = App::from_config(fixture.config());
    let sink = Recorder::default();

    let list = app.list(&sink).unwrap();
    assert_eq!(list.datasets.len(), 1);
    assert_eq!(list.datasets[0].dataset, DATASET);

    let info = app.info(DATASET, &sink).unwrap();
    let stages = info
        .preprocessings
        .iter()
        .map(|stage| (stage.preprocessing.as_str(), stage.samples, stage.total_reads))
        .collect::<Vec<_>>();
    assert_eq!(
        stages,
        vec![("raw", 3, 0), ("trimmed", 2, 0), ("trimmed_filtered", 1, 2000)]
    );
    assert_eq!(info.read_counts.rows.len(), 3);

    let export = app.export(DATASET, &sink).unwrap();
    assert_eq!(export.records, 6);
    assert!(export.path.ends_with("datasets/FMT/fs_samples.tsv"));
}

#[test]
fn results_and_manifests_per_set() {
    let fixture = Fixture::new();
    let app = App::from_config(fixture.config());
    let sink = Recorder::default();
    let request = SampleSetRequest {
        preprocessing: Some("longest".to_string()),
        include: vec!["S1".to_string(), "S2".to_string()],
        ..request()
    };

    let results = app
        .results(
            &request,
            template::FASTQC_DATA,
            &Placeholders::new().with("strand", "R1"),
            &sink,
        )
        .unwrap();
    assert_eq!(results.paths.len(), 2);

    let qc = app.qc_manifest(&request, Strand::R2, true, &sink).unwrap();
    assert_matches!(qc.sample_sets["batch"].write, Some(WriteStatus::Written { .. }));

    let tables = app
        .assembly_table(&request, "megahit", "default", false, &sink)
        .unwrap();
    assert_matches!(tables.sample_sets["batch"], WriteStatus::Written { .. });

    let merged = app.merge_manifest(&request, false, &sink).unwrap();
    assert_eq!(merged.sample_sets["batch"].entries.len(), 2);

    let prepared = app
        .prepare(&request, template::SAMPLE_SET_DIR, &Placeholders::new(), false, &sink)
        .unwrap();
    assert_eq!(prepared.tables.len(), 1);
    assert!(prepared.results[0].ends_with("sample_sets/batch"));
}

#[test]
fn repeated_metadata_rows_select_sample_once() {
    let fixture = Fixture::new();
    fixture.metadata("sample\tgroup\nS1\tcase\nS1\tcase\nS2\tcontrol\n");
    let app = App::from_config(fixture.config());

    let sets = app
        .sample_sets(
            &SampleSetRequest {
                preprocessing: Some("raw".to_string()),
                meta_column: Some("group".to_string()),
                column_value: Some("case".to_string()),
                include: vec!["S1".to_string(), "S1".to_string()],
                ..request()
            },
            &Recorder::default(),
        )
        .unwrap();
    assert_eq!(sets["batch__group_case"].sample_names(), vec!["S1"]);
}

#[test]
fn default_stage_skips_directories_without_reads() {
    let fixture = Fixture::new();
    common::write(
        &fixture.dataset_dir().join("reads/trimmed_filtered_rerun/profile/S1_R1.count"),
        b"10 100\n",
    );
    let app = App::from_config(fixture.config());

    let sets = app.sample_sets(&request(), &Recorder::default()).unwrap();
    assert_eq!(sets["batch"].records()[0].preprocessing, "trimmed_filtered");
}
