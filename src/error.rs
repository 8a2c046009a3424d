use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum CatalogError {
    #[error("template `{template}` references placeholder `{placeholder}` but no value was supplied")]
    MissingPlaceholder { template: String, placeholder: String },

    #[error("unknown path template: {0}")]
    UnknownTemplate(String),

    #[error("invalid placeholder value for `{name}`: {value}")]
    InvalidPlaceholder { name: String, value: String },

    #[error("invalid glob pattern {pattern}: {message}")]
    InvalidGlob { pattern: String, message: String },

    #[error("duplicate sample key in catalog: {0}")]
    DuplicateSampleKey(String),

    #[error("metadata column `{column}` not found in {path}")]
    MetadataColumnNotFound { column: String, path: Utf8PathBuf },

    #[error("metadata sheet not found: {0}")]
    MetadataNotFound(Utf8PathBuf),

    #[error("failed to parse metadata sheet {path}: {message}")]
    MetadataParse { path: Utf8PathBuf, message: String },

    #[error("there are 0 samples for {column} == {value}")]
    EmptySelection { column: String, value: String },

    #[error("catalog spans multiple datasets: {0}")]
    #[diagnostic(help("build one sample set per dataset before generating manifests"))]
    MixedDatasets(String),

    #[error("catalog is empty")]
    EmptyCatalog,

    #[error("dataset not found in registry: {0}")]
    DatasetNotFound(String),

    #[error("failed to parse dataset descriptor {path}: {message}")]
    DescriptorParse { path: Utf8PathBuf, message: String },

    #[error("dataset descriptor {0} has no dataset_name or fs_prefix")]
    InvalidDescriptor(Utf8PathBuf),

    #[error("invalid strand: {0}")]
    InvalidStrand(String),

    #[error("missing config file kira-sc.json in current directory")]
    MissingConfig,

    #[error("failed to read config file at {0}")]
    ConfigRead(Utf8PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
