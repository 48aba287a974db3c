//! persona-sim - Questionnaire-seeded persona conversations
//!
//! Entry point for the `persona-sim` binary. Loads configuration, sets up
//! logging, builds the text generator and dispatches the chosen command.

mod cli;
mod config;
mod dialogue;
mod error;
mod gateway;
mod logging;
mod persona;
mod pipeline;
mod questionnaire;
mod scoring;
mod storage;

use std::path::{Path, PathBuf};

use clap::Parser;
use tracing::{info, warn};

use crate::cli::{Cli, Commands, ConfigSubcommand, RunArgs};
use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::gateway::{ChatMessage, Fallback, OpenAiGateway, ScriptedGenerator, TextGenerator};
use crate::logging::LogGuards;
use crate::persona::PersonaCatalog;
use crate::pipeline::{BatchReport, Pipeline, PipelineOptions};
use crate::questionnaire::{AnswerSheet, QuestionSet, Scale};
use crate::scoring::ScoredSheet;

/// Canned reply used by `--dry-run`; scoreable on every scale
const DRY_RUN_REPLY: &str = "Sometimes, I guess. Choice: Several days";

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprint!("{}", e.format_for_terminal());
        std::process::exit(e.exit_code());
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Version => {
            println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
            println!("{}", env!("CARGO_PKG_DESCRIPTION"));
            Ok(())
        }
        Commands::Config { subcommand } => handle_config_command(subcommand),
        Commands::Interview { scale, run } => {
            let (config, _guards) = load_run_config(&run, None, cli.verbose, cli.quiet)?;
            block_on(async {
                let generator = Generator::build(&config, run.dry_run)?;
                let catalog = load_catalog(&config, &run)?;
                let pipeline = Pipeline::new(generator.as_dyn(), config.output_dir(), PipelineOptions::from_config(&config));
                let report = pipeline.interview(&catalog, scale).await;
                generator.log_usage();
                finish_batch(report?)
            })
        }
        Commands::Converse { scale, counterpart, rounds, run } => {
            let (config, _guards) = load_run_config(&run, rounds, cli.verbose, cli.quiet)?;
            block_on(async {
                let generator = Generator::build(&config, run.dry_run)?;
                let catalog = load_catalog(&config, &run)?;
                let pipeline = Pipeline::new(generator.as_dyn(), config.output_dir(), PipelineOptions::from_config(&config));
                let report = pipeline.converse(&catalog, scale, counterpart).await;
                generator.log_usage();
                finish_batch(report?)
            })
        }
        Commands::Pipeline { rounds, run } => {
            let (config, _guards) = load_run_config(&run, rounds, cli.verbose, cli.quiet)?;
            block_on(async {
                let generator = Generator::build(&config, run.dry_run)?;
                let catalog = load_catalog(&config, &run)?;
                let pipeline = Pipeline::new(generator.as_dyn(), config.output_dir(), PipelineOptions::from_config(&config));
                let report = pipeline.run_all(&catalog).await;
                generator.log_usage();
                finish_batch(report?)
            })
        }
        Commands::Score { file, scale, config, json } => {
            let config = AppConfig::load(config.as_deref())?;
            let _guards = logging::init_logging(&config.logging, cli.verbose, cli.quiet)?;
            score_command(&config, Path::new(&file), scale, json)
        }
        Commands::Summarize { dir, scale, out, config } => {
            let config = AppConfig::load(config.as_deref())?;
            let _guards = logging::init_logging(&config.logging, cli.verbose, cli.quiet)?;
            summarize_command(&config, Path::new(&dir), scale, out.as_deref())
        }
        Commands::Ping { config } => {
            let config = AppConfig::load(config.as_deref())?;
            let _guards = logging::init_logging(&config.logging, cli.verbose, cli.quiet)?;
            block_on(ping(&config))
        }
    }
}

/// Load configuration, fold in command-line overrides and start logging
fn load_run_config(
    run: &RunArgs,
    rounds: Option<usize>,
    verbose: u8,
    quiet: bool,
) -> Result<(AppConfig, LogGuards)> {
    let mut config = AppConfig::load(run.config.as_deref())?;

    if let Some(ref output) = run.output {
        config.paths.output_dir = output.clone();
    }
    if let Some(ref personas_file) = run.personas_file {
        config.paths.personas_file = personas_file.clone();
    }
    if let Some(rounds) = rounds {
        config.dialogue.rounds = rounds;
        config.dialogue.combined_rounds = rounds;
    }
    config.pipeline.skip_existing |= run.skip_existing;
    config.validate()?;

    let guards = logging::init_logging(&config.logging, verbose, quiet)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        model = %config.generation.model,
        output_dir = %config.paths.output_dir,
        dry_run = run.dry_run,
        "Starting persona-sim"
    );
    Ok((config, guards))
}

fn load_catalog(config: &AppConfig, run: &RunArgs) -> Result<PersonaCatalog> {
    let catalog = PersonaCatalog::load(&config.personas_file())?.select(&run.personas)?;
    info!(
        source = %catalog.source().display(),
        personas = catalog.len(),
        "Persona catalog loaded"
    );
    Ok(catalog)
}

fn block_on<F: std::future::Future<Output = Result<()>>>(future: F) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::Internal(format!("Failed to create runtime: {}", e)))?;
    runtime.block_on(future)
}

fn finish_batch(report: BatchReport) -> Result<()> {
    println!(
        "{} written, {} skipped, {} failed",
        report.written.len(),
        report.skipped.len(),
        report.failures.len()
    );
    report.into_result().map(|_| ())
}

// ─────────────────────────────────────────────────────────────────
// Generator Selection
// ─────────────────────────────────────────────────────────────────

/// The live gateway, or the scripted one for offline runs
enum Generator {
    Live(OpenAiGateway),
    DryRun(ScriptedGenerator),
}

impl Generator {
    fn build(config: &AppConfig, dry_run: bool) -> Result<Self> {
        if dry_run {
            info!("Dry run: using the scripted generator");
            let scripted = ScriptedGenerator::with_fallback(Fallback::Fixed(DRY_RUN_REPLY.to_string()))
                .with_model("dry-run");
            return Ok(Generator::DryRun(scripted));
        }

        if config.generation.api_key.is_empty() && config.generation.base_url.contains("api.openai.com") {
            warn!("No API key configured; set PERSONA_SIM_API_KEY or OPENAI_API_KEY");
        }
        Ok(Generator::Live(OpenAiGateway::new(config.openai_config())?))
    }

    fn as_dyn(&self) -> &dyn TextGenerator {
        match self {
            Generator::Live(gateway) => gateway,
            Generator::DryRun(scripted) => scripted,
        }
    }

    fn log_usage(&self) {
        match self {
            Generator::Live(gateway) => {
                let usage = gateway.usage();
                info!(
                    requests = usage.requests,
                    failed_attempts = usage.failed_attempts,
                    prompt_tokens = usage.prompt_tokens,
                    completion_tokens = usage.completion_tokens,
                    "Token usage"
                );
            }
            Generator::DryRun(scripted) => {
                info!(requests = scripted.call_count(), "Dry run finished");
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────

/// First path component that names a scale, e.g. `output/PHQ9/answers`
fn infer_scale(path: &Path) -> Option<Scale> {
    path.components()
        .rev()
        .find_map(|c| c.as_os_str().to_str().and_then(|s| s.parse::<Scale>().ok()))
}

fn score_command(config: &AppConfig, file: &Path, scale: Option<Scale>, json: bool) -> Result<()> {
    let sheet = AnswerSheet::load(file, scale.or_else(|| infer_scale(file)))?;
    let scale = scale.unwrap_or(sheet.scale);
    let questions = QuestionSet::for_scale(scale, config.questions_dir().as_deref())?;
    let scored = scoring::score_sheet(&sheet, &questions);

    if json {
        println!("{}", serde_json::to_string_pretty(&scored)?);
    } else {
        print_scored(&scored);
    }
    Ok(())
}

fn print_scored(scored: &ScoredSheet) {
    println!("{} - {}", scored.persona, scored.scale);
    for item in &scored.items {
        let score = item
            .score
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:>2}  {:>2}  {}",
            item.question_id.unwrap_or_default(),
            score,
            item.question
        );
    }
    println!("Total: {} ({} missing)", scored.total, scored.missing);
}

fn summarize_command(config: &AppConfig, dir: &Path, scale: Option<Scale>, out: Option<&str>) -> Result<()> {
    let scale = scale.or_else(|| infer_scale(dir)).ok_or_else(|| {
        Error::config_field_invalid(
            "scale",
            format!("cannot tell the scale of {}; pass --scale", dir.display()),
        )
    })?;

    let questions = QuestionSet::for_scale(scale, config.questions_dir().as_deref())?;
    let summary = scoring::summarize_folder(dir, &questions)?;

    let out_dir = match out {
        Some(out) => PathBuf::from(out),
        None => storage::OutputLayout::new(config.output_dir())
            .analysis_dir()
            .join(scale.tag()),
    };
    let written = scoring::export(&summary, &out_dir)?;

    println!(
        "Scored {} sheets ({} failed) for {}",
        summary.rows.len(),
        summary.failed(),
        scale
    );
    for path in written {
        println!("  {}", path.display());
    }
    Ok(())
}

async fn ping(config: &AppConfig) -> Result<()> {
    let gateway = OpenAiGateway::new(config.openai_config())?;
    let reply = gateway
        .generate(&[ChatMessage::user("Say 'pong'")], 0.0)
        .await?;
    println!("{} ({}): {}", config.generation.base_url, gateway.model(), reply);
    Ok(())
}

/// Handle configuration subcommands
fn handle_config_command(subcommand: ConfigSubcommand) -> Result<()> {
    match subcommand {
        ConfigSubcommand::Show { config } => {
            let cfg = AppConfig::load(config.as_deref())?;
            println!("{}", toml::to_string_pretty(&cfg.redacted())?);
        }
        ConfigSubcommand::Init { path, force } => {
            let written = config::init_config(path.as_deref(), force)?;
            println!("Configuration written to {}", written.display());
        }
        ConfigSubcommand::Validate { config } => {
            AppConfig::load(config.as_deref())?;
            println!("Configuration is valid.");
        }
    }

    Ok(())
}
