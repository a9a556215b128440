use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use dge_scope::app::App;
use dge_scope::config::{ConfigLoader, DEFAULT_API_BASE_URL, DEFAULT_STUDIES_BASE_URL, ResolvedConfig};
use dge_scope::domain::{FilterConfig, GeneSelection, RankMetric, StudyKind, StudyName};
use dge_scope::enrich::{
    DEFAULT_CUTOFF, DEFAULT_TOP_N, EnrichClient, EnrichHttpClient, EnrichRequest, RawEnrichment,
};
use dge_scope::error::ScopeError;
use dge_scope::output::{JsonOutput, OutputMode, TraceSink};
use dge_scope::studies::{FileStudyClient, StudyClient, StudyHttpClient};
use dge_scope::tui::Viewer;

#[derive(Parser)]
#[command(name = "dge-scope")]
#[command(about = "Explore differential gene expression studies: filter, classify overlaps, enrich")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    non_interactive: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Filter one study into up/downregulated partitions")]
    Filter(FilterArgs),
    #[command(about = "Classify base-study genes against must/not comparison studies")]
    Classify(ClassifyArgs),
    #[command(about = "Run enrichment analysis per study and rank terms")]
    Enrich(EnrichArgs),
    #[command(about = "List gene-set libraries available on the enrichment API")]
    GeneSets(ApiArgs),
    #[command(about = "Per-study summary for the configured studies")]
    Summary(SummaryArgs),
}

#[derive(Args, Clone)]
struct SourceArgs {
    /// Base URL serving /studies and /processed JSON files
    #[arg(long)]
    base_url: Option<String>,

    /// Read study files from a local directory instead of HTTP
    #[arg(long)]
    data_dir: Option<Utf8PathBuf>,

    /// Path to dge-scope.json
    #[arg(long)]
    config: Option<String>,
}

#[derive(Args, Clone)]
struct ThresholdArgs {
    /// Significance threshold on the -log10(p-value) scale
    #[arg(long)]
    significance: Option<f64>,

    /// Absolute log2 fold-change threshold
    #[arg(long)]
    fold_change: Option<f64>,

    #[arg(long, value_enum)]
    selection: Option<GeneSelection>,
}

#[derive(Args)]
struct FilterArgs {
    study: String,

    #[arg(long, value_enum, default_value_t = StudyKind::Study)]
    kind: StudyKind,

    #[command(flatten)]
    source: SourceArgs,

    #[command(flatten)]
    thresholds: ThresholdArgs,
}

#[derive(Args)]
struct ClassifyArgs {
    base: String,

    /// Comparison studies whose genes must agree in direction
    #[arg(long = "must", num_args = 1..)]
    must: Vec<String>,

    /// Comparison studies whose genes must disagree in direction
    #[arg(long = "not", num_args = 1..)]
    not: Vec<String>,

    #[arg(long, value_enum, default_value_t = StudyKind::Study)]
    kind: StudyKind,

    #[command(flatten)]
    source: SourceArgs,

    #[command(flatten)]
    thresholds: ThresholdArgs,
}

#[derive(Args)]
struct EnrichArgs {
    /// Studies to enrich; defaults to the configured study list
    studies: Vec<String>,

    #[arg(long, value_enum, default_value_t = StudyKind::Study)]
    kind: StudyKind,

    #[arg(long, default_value = "GO_Biological_Process_2021")]
    gene_set: String,

    #[arg(long, default_value_t = DEFAULT_CUTOFF)]
    cutoff: f64,

    #[arg(long, value_enum, default_value_t = RankMetric::CombinedScore)]
    metric: RankMetric,

    #[arg(long, default_value_t = DEFAULT_TOP_N)]
    top: usize,

    /// Base URL of the enrichment API
    #[arg(long)]
    api_url: Option<String>,

    #[command(flatten)]
    source: SourceArgs,

    #[command(flatten)]
    thresholds: ThresholdArgs,
}

#[derive(Args)]
struct ApiArgs {
    #[arg(long)]
    api_url: Option<String>,

    #[arg(long)]
    config: Option<String>,
}

#[derive(Args)]
struct SummaryArgs {
    #[command(flatten)]
    source: SourceArgs,

    #[command(flatten)]
    thresholds: ThresholdArgs,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(scope) = report.downcast_ref::<ScopeError>() {
            return ExitCode::from(map_exit_code(scope));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &ScopeError) -> u8 {
    match error {
        ScopeError::StudyNotFound(_) => 2,
        ScopeError::MissingConfig => 2,
        ScopeError::StudyHttp(_)
        | ScopeError::StudyStatus { .. }
        | ScopeError::EnrichHttp(_)
        | ScopeError::EnrichStatus { .. } => 3,
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

    match cli.command {
        Commands::Filter(args) => run_filter(args, output_mode),
        Commands::Classify(args) => run_classify(args, output_mode),
        Commands::Enrich(args) => run_enrich(args, output_mode),
        Commands::GeneSets(args) => run_gene_sets(args, output_mode),
        Commands::Summary(args) => run_summary(args, output_mode),
    }
}

/// Resolve the project config when present: an explicit --config path is
/// authoritative, the default path is optional.
fn maybe_config(path: Option<&str>) -> miette::Result<Option<ResolvedConfig>> {
    match ConfigLoader::resolve(path) {
        Ok(resolved) => Ok(Some(resolved)),
        Err(ScopeError::MissingConfig) if path.is_none() => Ok(None),
        Err(err) => Err(err).into_diagnostic(),
    }
}

fn resolve_filter(
    config: Option<&ResolvedConfig>,
    thresholds: &ThresholdArgs,
) -> miette::Result<FilterConfig> {
    let base = config.map(|c| c.filter).unwrap_or_default();
    FilterConfig::new(
        thresholds.significance.unwrap_or(base.significance_threshold),
        thresholds.fold_change.unwrap_or(base.fold_change_threshold),
        thresholds.selection.unwrap_or(base.gene_selection),
    )
    .into_diagnostic()
}

fn study_client(
    source: &SourceArgs,
    config: Option<&ResolvedConfig>,
) -> miette::Result<Box<dyn StudyClient>> {
    if let Some(dir) = &source.data_dir {
        return Ok(Box::new(FileStudyClient::new(dir.clone())));
    }
    let base_url = source
        .base_url
        .clone()
        .or_else(|| config.map(|c| c.studies_base_url.clone()))
        .unwrap_or_else(|| DEFAULT_STUDIES_BASE_URL.to_string());
    Ok(Box::new(StudyHttpClient::new(&base_url).into_diagnostic()?))
}

fn enrich_client(
    api_url: Option<&str>,
    config: Option<&ResolvedConfig>,
) -> miette::Result<EnrichHttpClient> {
    let base_url = api_url
        .map(|url| url.to_string())
        .or_else(|| config.map(|c| c.api_base_url.clone()))
        .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
    EnrichHttpClient::new(&base_url).into_diagnostic()
}

/// Enrichment client for commands that never call the API.
struct NopEnrich;

impl EnrichClient for NopEnrich {
    fn apply_enrichment(&self, _request: &EnrichRequest) -> Result<RawEnrichment, ScopeError> {
        Err(ScopeError::EnrichHttp(
            "enrichment client not configured".to_string(),
        ))
    }

    fn gene_sets(&self) -> Result<Vec<String>, ScopeError> {
        Err(ScopeError::EnrichHttp(
            "enrichment client not configured".to_string(),
        ))
    }
}

fn run_filter(args: FilterArgs, output_mode: OutputMode) -> miette::Result<()> {
    let config = maybe_config(args.source.config.as_deref())?;
    let cfg = resolve_filter(config.as_ref(), &args.thresholds)?;
    let study: StudyName = args.study.parse().into_diagnostic()?;
    let app = App::new(study_client(&args.source, config.as_ref())?, NopEnrich);

    match output_mode {
        OutputMode::NonInteractive => {
            let result = app
                .filter(&study, args.kind, &cfg, &JsonOutput)
                .into_diagnostic()?;
            JsonOutput::print_filter(&result).into_diagnostic()?;
            Ok(())
        }
        OutputMode::Interactive => {
            let result = app
                .filter(&study, args.kind, &cfg, &TraceSink)
                .into_diagnostic()?;
            Viewer::show_filter(&result)
        }
    }
}

fn run_classify(args: ClassifyArgs, output_mode: OutputMode) -> miette::Result<()> {
    let config = maybe_config(args.source.config.as_deref())?;
    let cfg = resolve_filter(config.as_ref(), &args.thresholds)?;
    let base: StudyName = args.base.parse().into_diagnostic()?;
    let must = parse_names(&args.must)?;
    let not = parse_names(&args.not)?;
    let app = App::new(study_client(&args.source, config.as_ref())?, NopEnrich);

    match output_mode {
        OutputMode::NonInteractive => {
            let result = app
                .classify(&base, args.kind, &must, &not, &cfg, &JsonOutput)
                .into_diagnostic()?;
            JsonOutput::print_classify(&result).into_diagnostic()?;
            Ok(())
        }
        OutputMode::Interactive => {
            let result = app
                .classify(&base, args.kind, &must, &not, &cfg, &TraceSink)
                .into_diagnostic()?;
            Viewer::show_classify(&result)
        }
    }
}

fn run_enrich(args: EnrichArgs, output_mode: OutputMode) -> miette::Result<()> {
    let config = maybe_config(args.source.config.as_deref())?;
    let cfg = resolve_filter(config.as_ref(), &args.thresholds)?;

    let studies: Vec<(StudyName, StudyKind)> = if args.studies.is_empty() {
        let config = config
            .as_ref()
            .ok_or(ScopeError::MissingConfig)
            .into_diagnostic()?;
        config
            .studies
            .iter()
            .map(|request| (request.name.clone(), request.kind))
            .collect()
    } else {
        parse_names(&args.studies)?
            .into_iter()
            .map(|name| (name, args.kind))
            .collect()
    };

    let app = App::new(
        study_client(&args.source, config.as_ref())?,
        enrich_client(args.api_url.as_deref(), config.as_ref())?,
    );

    match output_mode {
        OutputMode::NonInteractive => {
            let result = app
                .enrich(
                    &studies,
                    &cfg,
                    &args.gene_set,
                    args.cutoff,
                    args.metric,
                    args.top,
                    &JsonOutput,
                )
                .into_diagnostic()?;
            JsonOutput::print_enrich(&result).into_diagnostic()?;
            Ok(())
        }
        OutputMode::Interactive => {
            let result = app
                .enrich(
                    &studies,
                    &cfg,
                    &args.gene_set,
                    args.cutoff,
                    args.metric,
                    args.top,
                    &TraceSink,
                )
                .into_diagnostic()?;
            Viewer::show_enrich(&result)
        }
    }
}

fn run_gene_sets(args: ApiArgs, output_mode: OutputMode) -> miette::Result<()> {
    let config = maybe_config(args.config.as_deref())?;
    let enrich = enrich_client(args.api_url.as_deref(), config.as_ref())?;
    let app = App::new(NopStudies, enrich);

    match output_mode {
        OutputMode::NonInteractive => {
            let result = app.gene_sets(&JsonOutput).into_diagnostic()?;
            JsonOutput::print_gene_sets(&result).into_diagnostic()?;
            Ok(())
        }
        OutputMode::Interactive => {
            let result = app.gene_sets(&TraceSink).into_diagnostic()?;
            Viewer::show_gene_sets(&result)
        }
    }
}

fn run_summary(args: SummaryArgs, output_mode: OutputMode) -> miette::Result<()> {
    let config = ConfigLoader::resolve(args.source.config.as_deref()).into_diagnostic()?;
    let cfg = resolve_filter(Some(&config), &args.thresholds)?;
    let studies: Vec<(StudyName, StudyKind)> = config
        .studies
        .iter()
        .map(|request| (request.name.clone(), request.kind))
        .collect();
    let app = App::new(study_client(&args.source, Some(&config))?, NopEnrich);

    match output_mode {
        OutputMode::NonInteractive => {
            let result = app.summary(&studies, &cfg, &JsonOutput).into_diagnostic()?;
            JsonOutput::print_summary(&result).into_diagnostic()?;
            Ok(())
        }
        OutputMode::Interactive => {
            let result = app.summary(&studies, &cfg, &TraceSink).into_diagnostic()?;
            Viewer::show_summary(&result)
        }
    }
}

fn parse_names(values: &[String]) -> miette::Result<Vec<StudyName>> {
    values
        .iter()
        .map(|value| value.parse::<StudyName>())
        .collect::<Result<Vec<_>, _>>()
        .into_diagnostic()
}

/// Study client for commands that never load studies.
struct NopStudies;

impl StudyClient for NopStudies {
    fn fetch_study(
        &self,
        name: &StudyName,
        _kind: StudyKind,
    ) -> Result<dge_scope::dataset::StudyFile, ScopeError> {
        Err(ScopeError::StudyNotFound(name.as_str().to_string()))
    }
}
