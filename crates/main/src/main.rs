use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use hms_report::narrative::knowledge::{self, KnowledgeBase};
use hms_report::narrative::{self, analyzer, risk, rules::RuleSet, NarrativeInput, NarrativeSource};
use hms_report::scheduler::{self, AutoReportScheduler};
use hms_report::summary::{self, CategorySnapshot};
use hms_report::{pdf, Category, HmsConfig, ReportMetadata};
use log::{info, warn};
use serde::de::DeserializeOwned;
use tracing_subscriber::EnvFilter;

/// HMS incident reports from the command line.
///
/// Settings come from the environment (`HMS_UPLOAD_ROOT`, `HMS_LOGO_PATH`,
/// `HMS_FONTS_DIR`, `HMS_KB_DIR`, `HMS_AUTO_REPORTS_*`, `OPENAI_API_KEY`).  Set `RUST_LOG`
/// to control log output.
#[derive(Parser)]
#[command(author, version, about = "Generate HMS incident reports and category summaries")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Strategy {
    /// Fixed skeleton filled from the form, then the override rules.
    Local,
    /// Likelihood × consequence matrix report.
    Matrix,
}

#[derive(Subcommand)]
enum Commands {
    /// Render report metadata (JSON) to a PDF file.
    Render {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        /// Logo drawn in the top right corner; overrides HMS_LOGO_PATH.
        #[arg(long)]
        logo: Option<PathBuf>,
    },

    /// Print the report generated locally from a form (JSON).
    Draft {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, value_enum, default_value = "local")]
        strategy: Strategy,
    },

    /// Print the keyword triage of a free-text observation.
    Analyze {
        text: String,
    },

    /// Compose a smart report from a form (JSON) and store its PDF under the upload root.
    Smart {
        #[arg(long)]
        input: PathBuf,
        /// Report id used in the file name.
        #[arg(long)]
        id: u64,
    },

    /// Write a category summary from a snapshot (JSON) under the upload root.
    Summary {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, default_value = "Admin")]
        created_by: String,
    },

    /// Run the weekly automatic summaries until the process is terminated.
    Schedule {
        /// Generate the summaries once immediately and exit.
        #[arg(long)]
        once: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(err) = run(cli.command) {
        eprintln!("Error: {}", err);
        print_error_sources(err.as_ref());
        std::process::exit(1);
    }
}

fn run(command: Commands) -> Result<(), Box<dyn Error>> {
    let config = HmsConfig::from_env()?;

    match command {
        Commands::Render {
            input,
            output,
            logo,
        } => {
            let metadata: ReportMetadata = read_json(&input)?;
            let logo = logo.or_else(|| config.logo_path.clone());
            let rendered = pdf::render(&output, &metadata, logo.as_deref())?;
            println!(
                "Generated {} ({} page(s))",
                output.display(),
                rendered.pages
            );
        }
        Commands::Draft { input, strategy } => {
            let form: NarrativeInput = read_json(&input)?;
            let report = match strategy {
                Strategy::Local => {
                    narrative::compose_with_fallback(None, &form, &RuleSet::default()).report
                }
                Strategy::Matrix => risk::matrix_report(&form).report,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Analyze { text } => {
            let analysis = analyzer::analyze(&text);
            println!("{}", serde_json::to_string_pretty(&analysis)?);
        }
        Commands::Smart { input, id } => {
            let form: NarrativeInput = read_json(&input)?;
            let category = Category::from_code(&form.category)?;
            let excerpts = KnowledgeBase::load(&config.knowledge_dir)
                .excerpts(&form.notes(), knowledge::DEFAULT_EXCERPTS);
            info!("{} knowledge excerpt(s) selected", excerpts.len());
            let primary = primary_source(&config, excerpts);
            let composed =
                narrative::compose_with_fallback(primary.as_deref(), &form, &RuleSet::default());

            let date = if form.date.trim().is_empty() {
                chrono::Local::now().format("%Y-%m-%d").to_string()
            } else {
                form.date.trim().to_string()
            };
            let metadata = composed
                .report
                .to_metadata(category.code(), &date, form.reporter())
                .with_logo(config.logo_path.clone());

            let layout = config.upload_layout();
            let path = layout.smart_report_path(category, id);
            pdf::render(&path, &metadata, None)?;
            println!("{}", path.display());
        }
        Commands::Summary { input, created_by } => {
            let snapshot: CategorySnapshot = read_json(&input)?;
            let path = summary::generate_category_summary(
                &config.upload_layout(),
                &snapshot,
                chrono::Local::now().naive_local(),
                &created_by,
                config.logo_path.as_deref(),
            )?;
            println!("{}", path.display());
        }
        Commands::Schedule { once } => run_schedule(&config, once)?,
    }

    Ok(())
}

fn run_schedule(config: &HmsConfig, once: bool) -> Result<(), Box<dyn Error>> {
    let categories = config.auto_report_categories.clone();
    if categories.is_empty() {
        warn!("HMS_AUTO_REPORTS_CATEGORIES selects no categories; nothing to generate");
    }
    let layout = config.upload_layout();

    if once {
        let report = scheduler::generate_summaries(&layout, &categories, config.logo_path.as_deref());
        for path in &report.generated {
            println!("{}", path.display());
        }
        for (category, reason) in &report.failed {
            eprintln!("{}: {}", category, reason);
        }
        if !report.is_complete() {
            return Err(format!(
                "{} of {} categories failed",
                report.failed.len(),
                categories.len()
            )
            .into());
        }
        return Ok(());
    }

    if !config.auto_reports_enabled {
        warn!("HMS_AUTO_REPORTS_ENABLED is not set; nothing to schedule");
        return Ok(());
    }

    layout.ensure_all()?;
    let logo = config.logo_path.clone();
    let mut auto_reports = AutoReportScheduler::new(config.schedule, move || {
        scheduler::generate_summaries(&layout, &categories, logo.as_deref());
    });
    auto_reports.start()?;
    info!("scheduler running; stop the process to exit");

    loop {
        std::thread::park();
    }
}

#[cfg(feature = "openai")]
fn primary_source(config: &HmsConfig, excerpts: Vec<String>) -> Option<Box<dyn NarrativeSource>> {
    use hms_report::narrative::llm::LlmNarrativeSource;
    use hms_report::narrative::openai::OpenAiClient;

    let key = config.openai_api_key.as_deref()?;
    match OpenAiClient::new(key) {
        Ok(client) => Some(Box::new(LlmNarrativeSource::new(client).with_excerpts(excerpts))),
        Err(err) => {
            warn!("language model unavailable: {}", err);
            None
        }
    }
}

#[cfg(not(feature = "openai"))]
fn primary_source(_config: &HmsConfig, _excerpts: Vec<String>) -> Option<Box<dyn NarrativeSource>> {
    None
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, Box<dyn Error>> {
    let text = fs::read_to_string(path)
        .map_err(|err| format!("failed to read {}: {}", path.display(), err))?;
    let value = serde_json::from_str(&text)
        .map_err(|err| format!("invalid JSON in {}: {}", path.display(), err))?;
    Ok(value)
}

fn print_error_sources(mut error: &(dyn Error + 'static)) {
    while let Some(source) = error.source() {
        eprintln!("  caused by: {}", source);
        error = source;
    }
}
