//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use dossier_artifacts::FileSink;
use dossier_core::manifest::{load_document, load_manifest, parse_document_arg};
use dossier_core::pipeline::{CompileRequest, ProgressReporter};
use dossier_core::toc::{TocLineKind, toc_lines};
use dossier_core::{CancelToken, DossierMeta};
use dossier_pdf::PdfBackend;
use dossier_shared::{
    AppConfig, CompileConfig, CompileReport, InputDocument, init_config, load_config,
    load_config_from,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Dossier: compile regulatory documents into one paginated PDF.
#[derive(Parser)]
#[command(
    name = "dossier",
    version,
    about = "Compile categorized regulatory documents into a single paginated PDF dossier.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.dossier/dossier.toml.
    #[arg(long, global = true, env = "DOSSIER_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Compile documents into a dossier PDF.
    Compile {
        #[command(flatten)]
        input: InputArgs,

        /// Output directory (defaults to `output.output_dir` from config).
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Print the pagination plan and table of contents without rendering.
    Plan {
        #[command(flatten)]
        input: InputArgs,

        /// Print only the plan as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Document selection and layout overrides shared by `compile` and `plan`.
#[derive(Args, Debug, Clone)]
pub(crate) struct InputArgs {
    /// Dossier type, e.g. impd, ind, cta. Overrides the manifest.
    #[arg(short = 't', long = "type")]
    pub dossier_type: Option<String>,

    /// Cover title. Overrides the manifest.
    #[arg(long)]
    pub title: Option<String>,

    /// TOML manifest listing the documents.
    #[arg(short, long)]
    pub manifest: Option<PathBuf>,

    /// Document as `<category>=<path>` (repeatable). A bare path goes to `other`.
    #[arg(short, long = "doc")]
    pub docs: Vec<String>,

    /// Bytes of embedded PDF assumed per page when planning.
    #[arg(long)]
    pub bytes_per_page: Option<u64>,

    /// Embed long documents whole instead of cutting them to their planned range.
    #[arg(long)]
    pub no_strict: bool,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "dossier=info",
        1 => "dossier=debug",
        _ => "dossier=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.clone();
    match cli.command {
        Command::Compile { input, out } => cmd_compile(config_path.as_deref(), &input, out).await,
        Command::Plan { input, json } => cmd_plan(config_path.as_deref(), &input, json).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(config_path.as_deref()).await,
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_compile(config_path: Option<&Path>, input: &InputArgs, out: Option<PathBuf>) -> Result<()> {
    let mut config = compile_config(config_path, input)?;
    if let Some(out) = out {
        config.output_dir = out;
    }

    let request = build_request(input)?;
    let backend = PdfBackend::lopdf(&config.layout);
    let sink = FileSink::new(&config.output_dir);
    let cancel = cancel_on_ctrl_c();

    info!(
        documents = request.documents.len(),
        out = %config.output_dir.display(),
        "compiling dossier"
    );

    let reporter = CliProgress::new();
    let report =
        dossier_core::compile(request, &config, &backend, &sink, &reporter, &cancel).await?;

    print_report(&report, &sink.path_for(&report.file_name));
    Ok(())
}

async fn cmd_plan(config_path: Option<&Path>, input: &InputArgs, json: bool) -> Result<()> {
    let config = compile_config(config_path, input)?;
    let request = build_request(input)?;
    let backend = PdfBackend::lopdf(&config.layout);

    let plan = dossier_core::plan_only(request, &config, &backend, &cancel_on_ctrl_c())?;

    println!("{}", serde_json::to_string_pretty(&plan)?);
    if json {
        return Ok(());
    }

    println!();
    println!("Table of Contents");
    for line in toc_lines(&plan, config.layout.toc_name_max_chars) {
        let indent = match line.kind {
            TocLineKind::Category => "",
            TocLineKind::Document => "    ",
        };
        println!("  {indent}{:<52} {}", line.label, line.page_label());
    }
    println!();
    println!("  Summary on page {} of {}", plan.summary_page, plan.total_pages);
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = app_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Request building
// ---------------------------------------------------------------------------

fn app_config(config_path: Option<&Path>) -> Result<AppConfig> {
    Ok(match config_path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    })
}

/// Config file values overridden by CLI flags.
fn compile_config(config_path: Option<&Path>, input: &InputArgs) -> Result<CompileConfig> {
    let mut config = CompileConfig::from(&app_config(config_path)?);
    apply_overrides(&mut config, input);
    dossier_core::pipeline::validate_config(&config)?;
    Ok(config)
}

fn apply_overrides(config: &mut CompileConfig, input: &InputArgs) {
    if let Some(bytes) = input.bytes_per_page {
        config.layout.bytes_per_page_estimate = bytes;
    }
    if input.no_strict {
        config.layout.strict_page_budget = false;
    }
}

/// Collect documents from the manifest and `--doc` flags, manifest first.
fn build_request(input: &InputArgs) -> Result<CompileRequest> {
    let mut dossier_type = None;
    let mut title = None;
    let mut documents: Vec<InputDocument> = Vec::new();

    if let Some(path) = &input.manifest {
        let manifest = load_manifest(path)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        documents.extend(manifest.load_documents(base_dir)?);
        dossier_type = manifest.dossier_type;
        title = manifest.title;
    }

    for arg in &input.docs {
        let (category, path) = parse_document_arg(arg)?;
        documents.push(load_document(&path, category)?);
    }

    if input.manifest.is_none() && input.docs.is_empty() {
        return Err(eyre!("no documents given: pass --manifest or at least one --doc"));
    }

    let mut meta = DossierMeta {
        dossier_type: input.dossier_type.clone().or(dossier_type),
        title: input.title.clone().or(title),
        generated_at: chrono::Utc::now(),
    };
    if meta.dossier_type.is_none() {
        warn!("no dossier type given");
    }
    meta.title = meta.title.filter(|t| !t.trim().is_empty());

    Ok(CompileRequest { meta, documents })
}

/// Token cancelled on the first Ctrl-C.
fn cancel_on_ctrl_c() -> CancelToken {
    let cancel = CancelToken::new();
    let handle = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling");
            handle.cancel();
        }
    });
    cancel
}

fn print_report(report: &CompileReport, path: &Path) {
    println!();
    println!("  Dossier compiled successfully!");
    println!("  File:      {}", path.display());
    println!("  Type:      {}", report.dossier_type);
    println!("  Documents: {}", report.document_count);
    println!("  Pages:     {}", report.page_count);
    println!("  SHA-256:   {}", report.sha256);
    println!("  Run:       {}", report.run_id);
    if !report.failed_documents.is_empty() {
        println!("  Not merged:");
        for name in &report.failed_documents {
            println!("    - {name}");
        }
    }
    println!();
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn done(&self, _report: &CompileReport) {
        self.spinner.finish_and_clear();
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}
