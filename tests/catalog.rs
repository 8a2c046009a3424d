mod common;

use assert_matches::assert_matches;

use kira_sample_catalog::catalog::{SampleCatalog, SampleSelection};
use kira_sample_catalog::domain::PreprocessingSelector;
use kira_sample_catalog::error::CatalogError;
use kira_sample_catalog::resolver::{ResolveOptions, SampleResolver};
use kira_sample_catalog::template::{self, PathTemplates, Placeholders};

use common::Fixture;

fn resolver() -> SampleResolver {
    SampleResolver::new(PathTemplates::with_defaults(), ResolveOptions::default())
}

#[test]
fn add_all_samples() {
    let fixture = Fixture::new();
    let mut catalog = SampleCatalog::new("all");
    let added = catalog
        .add_samples(
            &resolver(),
            &fixture.info(),
            &PreprocessingSelector::Longest,
            &SampleSelection::all(),
        )
        .unwrap();

    assert_eq!(added, 3);
    assert_eq!(catalog.sample_names(), vec!["S1", "S2", "S3"]);
    assert_eq!(catalog.records()[0].preprocessing, "trimmed_filtered");
    assert_eq!(catalog.records()[2].reads, -1);
}

#[test]
fn include_exclude_and_pattern() {
    let fixture = Fixture::new();
    let resolver = resolver();

    let mut included = SampleCatalog::new("inc");
    included
        .add_samples(
            &resolver,
            &fixture.info(),
            &PreprocessingSelector::Longest,
            &SampleSelection::only(vec!["S2".to_string(), "missing".to_string()]),
        )
        .unwrap();
    assert_eq!(included.sample_names(), vec!["S2"]);

    let mut excluded = SampleCatalog::new("exc");
    excluded
        .add_samples(
            &resolver,
            &fixture.info(),
            &PreprocessingSelector::Longest,
            &SampleSelection {
                exclude: vec!["S1".to_string()],
                ..SampleSelection::all()
            },
        )
        .unwrap();
    assert_eq!(excluded.sample_names(), vec!["S2", "S3"]);

    let mut patterned = SampleCatalog::new("pat");
    patterned
        .add_samples(
            &resolver,
            &fixture.info(),
            &PreprocessingSelector::Longest,
            &SampleSelection {
                pattern: Some("S?".to_string()),
                exclude: vec!["S3".to_string()],
                ..SampleSelection::all()
            },
        )
        .unwrap();
    assert_eq!(patterned.sample_names(), vec!["S1", "S2"]);
}

#[test]
fn adding_twice_is_rejected_without_partial_append() {
    let fixture = Fixture::new();
    let resolver = resolver();
    let mut catalog = SampleCatalog::new("dup");
    catalog
        .add_samples(
            &resolver,
            &fixture.info(),
            &PreprocessingSelector::Longest,
            &SampleSelection::only(vec!["S1".to_string()]),
        )
        .unwrap();

    let err = catalog
        .add_samples(
            &resolver,
            &fixture.info(),
            &PreprocessingSelector::Longest,
            &SampleSelection::all(),
        )
        .unwrap_err();
    assert_matches!(err, CatalogError::DuplicateSampleKey(key) if key == "S1:trimmed_filtered");
    assert_eq!(catalog.len(), 1);
}

#[test]
fn same_sample_from_two_stages_coexists() {
    let fixture = Fixture::new();
    let resolver = resolver();
    let mut catalog = SampleCatalog::new("stages");
    for stage in ["raw", "trimmed_filtered"] {
        catalog
            .add_samples(
                &resolver,
                &fixture.info(),
                &PreprocessingSelector::Named(stage.to_string()),
                &SampleSelection::only(vec!["S1".to_string()]),
            )
            .unwrap();
    }
    assert_eq!(catalog.len(), 2);
}

#[test]
fn result_paths_use_record_values() {
    let fixture = Fixture::new();
    let mut catalog = SampleCatalog::new("paths");
    catalog
        .add_samples(
            &resolver(),
            &fixture.info(),
            &PreprocessingSelector::Longest,
            &SampleSelection::only(vec!["S1".to_string()]),
        )
        .unwrap();

    let extra = Placeholders::new()
        .with("strand", "R2")
        .with("sample", "ignored");
    let paths = catalog
        .result_paths(&PathTemplates::with_defaults(), template::FASTQC_DATA, &extra)
        .unwrap();
    assert_eq!(
        paths,
        vec![format!(
            "{}/FMT/profile/fastqc/trimmed_filtered/S1/S1_R2/fastqc_data.txt",
            fixture.fs_prefix
        )]
    );

    let err = catalog
        .result_paths(&PathTemplates::with_defaults(), template::FASTQC_DATA, &Placeholders::new())
        .unwrap_err();
    assert_matches!(err, CatalogError::MissingPlaceholder { placeholder, .. } if placeholder == "strand");
}

#[test]
fn repeated_include_names_resolve_once() {
    let fixture = Fixture::new();
    let mut catalog = SampleCatalog::new("repeat");
    let added = catalog
        .add_samples(
            &resolver(),
            &fixture.info(),
            &PreprocessingSelector::Named("raw".to_string()),
            &SampleSelection::only(vec![
                "S1".to_string(),
                "S2".to_string(),
                "S1".to_string(),
            ]),
        )
        .unwrap();
    assert_eq!(added, 2);
    assert_eq!(catalog.sample_names(), vec!["S1", "S2"]);
}
