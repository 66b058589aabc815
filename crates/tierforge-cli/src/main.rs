//! Tierforge CLI
//!
//! Generate, inspect and check three-tier lesson content from the terminal.
//!
//! # Usage
//! ```bash
//! tierforge generate --topic "Introduction to CSS" --audience beginners --prerequisite "HTML basics"
//! tierforge prompt --topic "Introduction to CSS" --audience beginners
//! tierforge validate reply.json
//! tierforge fallback --topic "Introduction to CSS" --audience beginners
//! ```

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tierforge_agent::{ContentSource, VersionOrchestrator};
use tierforge_core::{
    audit, sanitize, validate, ContentSet, FallbackSynthesizer, GenerationRequest, PromptBuilder,
    Tier,
};
use tracing_subscriber::EnvFilter;

/// Tierforge - three-tier lesson content generation
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Write JSON output to this file instead of stdout
    #[arg(short, long, global = true, value_name = "FILE")]
    output: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline against the configured model
    Generate {
        #[command(flatten)]
        request: RequestArgs,

        /// Emit only the content set, without generation metadata
        #[arg(long)]
        content_only: bool,
    },

    /// Print the prompt that would be sent to the model
    Prompt {
        #[command(flatten)]
        request: RequestArgs,

        /// Output as JSON instead of plain text
        #[arg(long)]
        json: bool,
    },

    /// Sanitize and validate a saved model reply
    Validate {
        /// File holding the raw model reply
        file: PathBuf,
    },

    /// Print deterministic fallback content without calling a model
    Fallback {
        #[command(flatten)]
        request: RequestArgs,
    },
}

#[derive(Args, Debug)]
struct RequestArgs {
    /// Lesson subject
    #[arg(short, long)]
    topic: String,

    /// Who the lesson is for
    #[arg(short, long)]
    audience: String,

    /// Assumed prior knowledge (repeatable)
    #[arg(short, long = "prerequisite", value_name = "TEXT")]
    prerequisites: Vec<String>,

    /// Duration hint in minutes
    #[arg(short, long, default_value_t = tierforge_core::types::DEFAULT_DURATION_MINUTES)]
    duration: u32,
}

impl RequestArgs {
    fn into_request(self) -> GenerationRequest {
        GenerationRequest::new(self.topic, self.audience)
            .with_prerequisites(self.prerequisites)
            .with_duration_minutes(self.duration)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Generate {
            request,
            content_only,
        } => {
            let request = request.into_request();
            let orchestrator =
                VersionOrchestrator::from_env().context("Failed to load model configuration")?;
            tracing::debug!(
                topic = %request.topic,
                max_attempts = orchestrator.pipeline().attempts(),
                "Starting generation"
            );
            let generation = orchestrator.generate(&request).await?;

            match generation.source {
                ContentSource::Model => eprintln!(
                    "{} model content after {} attempt(s)",
                    "✓".green().bold(),
                    generation.attempts
                ),
                ContentSource::Fallback => {
                    let reason = generation
                        .fallback_reason
                        .as_ref()
                        .map(|r| format!("{} stage: {}", r.stage, r.message))
                        .unwrap_or_default();
                    eprintln!("{} fallback content ({})", "⚠".yellow().bold(), reason);
                }
            }

            let json = if content_only {
                serde_json::to_string_pretty(&generation.content_set)?
            } else {
                serde_json::to_string_pretty(&generation)?
            };
            emit(cli.output.as_deref(), &json)?;
        }
        Commands::Prompt { request, json } => {
            let prompt = PromptBuilder::build(&request.into_request());
            if json {
                emit(cli.output.as_deref(), &serde_json::to_string_pretty(&prompt)?)?;
            } else {
                let text = format!(
                    "=== SYSTEM ===\n{}\n\n=== USER ===\n{}",
                    prompt.system_message, prompt.user_message
                );
                emit(cli.output.as_deref(), &text)?;
            }
        }
        Commands::Validate { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let content_set = check_reply(&raw)?;

            eprintln!("{} {} is a valid content set", "✓".green().bold(), file.display());
            print_audit(&content_set);
            emit(
                cli.output.as_deref(),
                &serde_json::to_string_pretty(&content_set)?,
            )?;
        }
        Commands::Fallback { request } => {
            let content_set = FallbackSynthesizer::synthesize(&request.into_request());
            emit(
                cli.output.as_deref(),
                &serde_json::to_string_pretty(&content_set)?,
            )?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .init();
}

fn check_reply(raw: &str) -> anyhow::Result<ContentSet> {
    let json = match sanitize(raw) {
        Ok(json) => json,
        Err(error) => {
            eprintln!("{} {}", "✗".red().bold(), error);
            bail!("reply does not contain a JSON object");
        }
    };

    match validate(json) {
        Ok(content_set) => Ok(content_set),
        Err(error) => {
            for violation in &error.violations {
                eprintln!("  {} {}", "✗".red(), violation);
            }
            bail!("{} schema violation(s)", error.violations.len());
        }
    }
}

fn print_audit(content_set: &ContentSet) {
    let report = audit(content_set);
    if report.is_clean() {
        return;
    }
    for tier in Tier::ALL {
        for finding in report.for_tier(tier) {
            eprintln!("  {} {}", "!".yellow(), finding);
        }
    }
}

fn emit(output: Option<&Path>, text: &str) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, text)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("{} wrote {}", "✓".green().bold(), path.display());
        }
        None => println!("{}", text),
    }
    Ok(())
}
