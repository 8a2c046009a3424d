use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use kira_sample_catalog::app::{App, SampleSetRequest};
use kira_sample_catalog::config::ConfigLoader;
use kira_sample_catalog::domain::{CountConvention, Strand, split_list};
use kira_sample_catalog::error::CatalogError;
use kira_sample_catalog::output::{JsonOutput, OutputMode, TextOutput};
use kira_sample_catalog::resolver::SelectionStrategy;
use kira_sample_catalog::template::{self, Placeholders};

#[derive(Parser)]
#[command(name = "kira-sc")]
#[command(about = "Sample catalog for sequencing datasets laid out by preprocessing stage")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<String>,

    #[arg(long, global = true)]
    non_interactive: bool,

    #[arg(long, global = true, value_enum, help = "Overrides the configured read-count convention")]
    count_convention: Option<CountConvention>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "List registered datasets")]
    Datasets,
    #[command(about = "Show stages and read counts of a dataset")]
    Info(InfoArgs),
    #[command(about = "Resolve sample sets")]
    Samples(SetArgs),
    #[command(about = "Render a result path per sample")]
    Results(ResultsArgs),
    #[command(about = "Write the per-strand QC report list")]
    QcManifest(QcArgs),
    #[command(about = "Write the assembler input table")]
    AssemblyTable(AssemblyArgs),
    #[command(about = "Write the paired-read merge manifest")]
    MergeManifest(WriteArgs),
    #[command(about = "Materialise sample sets and render their result paths")]
    Prepare(PrepareArgs),
    #[command(about = "Export all sample records of a dataset to the registry")]
    Export(InfoArgs),
}

#[derive(Args)]
struct InfoArgs {
    dataset: String,
}

#[derive(Args, Clone)]
struct SetArgs {
    #[arg(short, long)]
    dataset: String,

    #[arg(short, long, help = "Stage name, or `longest`")]
    preprocessing: Option<String>,

    #[arg(short = 'c', long)]
    meta_column: Option<String>,

    #[arg(short = 'v', long)]
    column_value: Option<String>,

    #[arg(short, long, help = "Comma-separated sample names")]
    samples: Option<String>,

    #[arg(short = 'x', long, help = "Comma-separated sample names to drop")]
    exclude: Option<String>,

    #[arg(long)]
    pattern: Option<String>,

    #[arg(long)]
    name: Option<String>,
}

#[derive(Args)]
struct ResultsArgs {
    #[command(flatten)]
    set: SetArgs,

    #[arg(short, long)]
    template: String,

    #[arg(long = "set", value_name = "KEY=VALUE", help = "Extra placeholder values, `key=value`")]
    values: Vec<String>,
}

#[derive(Args)]
struct QcArgs {
    #[command(flatten)]
    set: SetArgs,

    #[arg(long, default_value = "R1")]
    strand: String,

    #[arg(long, help = "Also write the list under the dataset's multiqc directory")]
    write: bool,
}

#[derive(Args)]
struct AssemblyArgs {
    #[command(flatten)]
    set: SetArgs,

    #[arg(long)]
    assembler: String,

    #[arg(long)]
    params: String,

    #[arg(long)]
    overwrite: bool,
}

#[derive(Args)]
struct WriteArgs {
    #[command(flatten)]
    set: SetArgs,

    #[arg(long)]
    overwrite: bool,
}

#[derive(Args)]
struct PrepareArgs {
    #[command(flatten)]
    set: SetArgs,

    #[arg(short, long, default_value = template::SAMPLE_SET_DIR)]
    template: String,

    #[arg(long = "set", value_name = "KEY=VALUE")]
    values: Vec<String>,

    #[arg(long)]
    overwrite: bool,
}

impl SetArgs {
    fn request(&self) -> SampleSetRequest {
        SampleSetRequest {
            dataset: self.dataset.clone(),
            preprocessing: self.preprocessing.clone(),
            meta_column: self.meta_column.clone(),
            column_value: self.column_value.clone(),
            include: self.samples.as_deref().map(split_list).unwrap_or_default(),
            exclude: self.exclude.as_deref().map(split_list).unwrap_or_default(),
            pattern: self.pattern.clone(),
            name: self.name.clone(),
        }
    }
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<CatalogError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &CatalogError) -> u8 {
    match error {
        CatalogError::DatasetNotFound(_)
        | CatalogError::MissingConfig
        | CatalogError::MetadataNotFound(_)
        | CatalogError::EmptySelection { .. } => 2,
        CatalogError::DuplicateSampleKey(_)
        | CatalogError::MixedDatasets(_)
        | CatalogError::EmptyCatalog => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    let mut resolved = ConfigLoader::resolve(cli.config.as_deref())?;
    if let Some(convention) = cli.count_convention {
        resolved.resolve.counts.convention = convention;
    }
    let app = App::from_config(resolved);

    match output_mode {
        OutputMode::NonInteractive => run_json(cli.command, &app),
        OutputMode::Interactive => run_text(cli.command, &app),
    }
}

fn run_json(command: Commands, app: &App<Box<dyn SelectionStrategy>>) -> miette::Result<()> {
    let sink = JsonOutput;
    let printed = match command {
        Commands::Datasets => JsonOutput::print(&app.list(&sink)?),
        Commands::Info(args) => JsonOutput::print(&app.info(&args.dataset, &sink)?),
        Commands::Samples(args) => JsonOutput::print(&app.samples(&args.request(), &sink)?),
        Commands::Results(args) => {
            let extra = parse_values(&args.values)?;
            JsonOutput::print(&app.results(&args.set.request(), &args.template, &extra, &sink)?)
        }
        Commands::QcManifest(args) => {
            let strand: Strand = args.strand.parse()?;
            JsonOutput::print(&app.qc_manifest(&args.set.request(), strand, args.write, &sink)?)
        }
        Commands::AssemblyTable(args) => JsonOutput::print(&app.assembly_table(
            &args.set.request(),
            &args.assembler,
            &args.params,
            args.overwrite,
            &sink,
        )?),
        Commands::MergeManifest(args) => {
            JsonOutput::print(&app.merge_manifest(&args.set.request(), args.overwrite, &sink)?)
        }
        Commands::Prepare(args) => {
            let extra = parse_values(&args.values)?;
            JsonOutput::print(&app.prepare(
                &args.set.request(),
                &args.template,
                &extra,
                args.overwrite,
                &sink,
            )?)
        }
        Commands::Export(args) => JsonOutput::print(&app.export(&args.dataset, &sink)?),
    };
    printed.into_diagnostic()
}

fn run_text(command: Commands, app: &App<Box<dyn SelectionStrategy>>) -> miette::Result<()> {
    let sink = TextOutput;
    let printed = match command {
        Commands::Datasets => TextOutput::print_list(&app.list(&sink)?),
        Commands::Info(args) => TextOutput::print_info(&app.info(&args.dataset, &sink)?),
        Commands::Samples(args) => TextOutput::print_samples(&app.samples(&args.request(), &sink)?),
        Commands::Results(args) => {
            let extra = parse_values(&args.values)?;
            TextOutput::print_results(&app.results(
                &args.set.request(),
                &args.template,
                &extra,
                &sink,
            )?)
        }
        Commands::QcManifest(args) => {
            let strand: Strand = args.strand.parse()?;
            TextOutput::print_qc(&app.qc_manifest(&args.set.request(), strand, args.write, &sink)?)
        }
        Commands::AssemblyTable(args) => TextOutput::print_tables(&app.assembly_table(
            &args.set.request(),
            &args.assembler,
            &args.params,
            args.overwrite,
            &sink,
        )?),
        Commands::MergeManifest(args) => {
            TextOutput::print_merge(&app.merge_manifest(&args.set.request(), args.overwrite, &sink)?)
        }
        Commands::Prepare(args) => {
            let extra = parse_values(&args.values)?;
            TextOutput::print_prepare(&app.prepare(
                &args.set.request(),
                &args.template,
                &extra,
                args.overwrite,
                &sink,
            )?)
        }
        Commands::Export(args) => TextOutput::print_export(&app.export(&args.dataset, &sink)?),
    };
    printed.into_diagnostic()
}

fn parse_values(values: &[String]) -> miette::Result<Placeholders> {
    let mut placeholders = Placeholders::new();
    for value in values {
        let (key, val) = value
            .split_once('=')
            .ok_or_else(|| miette::Report::msg(format!("expected KEY=VALUE, got `{value}`")))?;
        placeholders.set(key.trim(), val.trim());
    }
    Ok(placeholders)
}
