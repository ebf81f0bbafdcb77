// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]

mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use config::CxoConfig;
use cxo_core::{Blob, CancellationToken, CompressOptions, ContentTag, DetailLevel};
use cxo_tools::{ToolContext, ToolRegistry, ToolRequest, ToolResponse};
use std::io::Read;
use std::path::PathBuf;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

/// Exit code for runtime errors.
const EXIT_RUNTIME_ERROR: i32 = 1;

#[derive(Parser, Debug)]
#[command(name = "cxo", version, about = "Context-engineering optimizer for LLM workflows")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging.
    #[arg(long)]
    debug: bool,

    /// Config file (defaults to ./cxo.toml when present).
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DetailArg {
    Minimal,
    Normal,
    Detailed,
}

impl From<DetailArg> for DetailLevel {
    fn from(arg: DetailArg) -> Self {
        match arg {
            DetailArg::Minimal => DetailLevel::Minimal,
            DetailArg::Normal => DetailLevel::Normal,
            DetailArg::Detailed => DetailLevel::Detailed,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Classify input and print its content tag.
    Detect {
        /// Input file; stdin when omitted.
        file: Option<PathBuf>,
    },

    /// Run input through the compression pipeline.
    Compress {
        /// Input file; stdin when omitted.
        file: Option<PathBuf>,

        /// Force a content type instead of detection.
        #[arg(long = "type")]
        content_type: Option<String>,

        /// Output verbosity.
        #[arg(long, value_enum)]
        detail: Option<DetailArg>,

        /// Desired compressed/original token ratio.
        #[arg(long)]
        target_ratio: Option<f64>,

        /// Token budget for budget-aware stages.
        #[arg(long)]
        max_tokens: Option<u64>,

        /// Regex whose matching lines survive verbatim. Can be repeated.
        #[arg(long)]
        preserve: Vec<String>,

        /// Print per-stage accounting to stderr.
        #[arg(long)]
        stats: bool,
    },

    /// List registered tools.
    Tools {
        /// Include JSON input schemas.
        #[arg(long)]
        schemas: bool,
    },

    /// Invoke one tool with raw JSON args and print the JSON response.
    Call {
        /// Tool name.
        tool: String,

        /// JSON arguments object.
        #[arg(long, default_value = "{}")]
        args: String,

        /// Session id for accounting.
        #[arg(long, default_value = "cli")]
        session: String,
    },

    /// Count tokens in the input.
    Count {
        /// Input file; stdin when omitted.
        file: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(EXIT_RUNTIME_ERROR);
        }
    };

    // --debug wins; otherwise the config file's log_level applies.
    let filter = if cli.debug {
        EnvFilter::new("cxo=debug")
    } else {
        match config.log_level.as_deref() {
            Some(level) => EnvFilter::new(format!("cxo={level}")),
            None => EnvFilter::new("cxo=info"),
        }
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run(cli, config) {
        eprintln!("error: {err:#}");
        std::process::exit(EXIT_RUNTIME_ERROR);
    }
}

fn load_config(cli: &Cli) -> Result<CxoConfig> {
    match &cli.config {
        Some(path) => CxoConfig::load(path),
        None => CxoConfig::load_default(),
    }
}

fn run(cli: Cli, config: CxoConfig) -> Result<()> {
    let working_dir = config
        .working_dir
        .clone()
        .map(PathBuf::from)
        .unwrap_or(std::env::current_dir().context("resolve working directory")?);

    match cli.command {
        Commands::Detect { file } => {
            let text = read_input(file.as_deref())?;
            println!("{}", cxo_detect::detect(&text));
            Ok(())
        }
        Commands::Compress {
            file,
            content_type,
            detail,
            target_ratio,
            max_tokens,
            preserve,
            stats,
        } => cmd_compress(
            &config,
            working_dir,
            file.as_deref(),
            content_type.as_deref(),
            detail,
            target_ratio,
            max_tokens,
            preserve,
            stats,
        ),
        Commands::Tools { schemas } => cmd_tools(working_dir, schemas),
        Commands::Call {
            tool,
            args,
            session,
        } => cmd_call(working_dir, &tool, &args, &session),
        Commands::Count { file } => {
            let text = read_input(file.as_deref())?;
            println!("{}", cxo_tokenizer::count(&text));
            Ok(())
        }
    }
}

fn read_input(file: Option<&std::path::Path>) -> Result<String> {
    match file {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))
        }
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("read stdin")?;
            Ok(buffer)
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_compress(
    config: &CxoConfig,
    working_dir: PathBuf,
    file: Option<&std::path::Path>,
    content_type: Option<&str>,
    detail: Option<DetailArg>,
    target_ratio: Option<f64>,
    max_tokens: Option<u64>,
    mut preserve: Vec<String>,
    stats: bool,
) -> Result<()> {
    let text = read_input(file)?;

    let mut blob = Blob::new(text);
    if let Some(name) = content_type {
        let tag = ContentTag::from_str(name)
            .map_err(|e| anyhow::anyhow!("{e} (expected one of logs, stacktrace, config, code, diff, build, generic)"))?;
        blob = blob.with_declared_type(tag);
    }

    let detail = detail.map(DetailLevel::from).or_else(|| {
        config
            .detail
            .as_deref()
            .and_then(|d| match d {
                "minimal" => Some(DetailLevel::Minimal),
                "normal" => Some(DetailLevel::Normal),
                "detailed" => Some(DetailLevel::Detailed),
                _ => None,
            })
    });
    preserve.extend(config.preserve.iter().cloned());

    let options = CompressOptions {
        detail: detail.unwrap_or_default(),
        target_ratio,
        max_tokens,
        preserve,
        ..CompressOptions::default()
    };

    let context = ToolContext::new(working_dir);
    let outcome = cxo_pipeline::run(&blob, &options, &context, &CancellationToken::new());

    print!("{}", outcome.blob.text);
    if !outcome.blob.text.ends_with('\n') {
        println!();
    }

    if stats {
        eprintln!("tag: {}", outcome.tag);
        for record in &outcome.stages {
            match &record.error {
                Some(message) => eprintln!("  {}: failed ({message})", record.stage),
                None => eprintln!(
                    "  {}: {} -> {} tokens ({:.1}% reduction, {})",
                    record.stage,
                    record.stats.original_tokens,
                    record.stats.compressed_tokens,
                    record.stats.reduction_percent,
                    record.stats.technique,
                ),
            }
        }
        if let Some(combined) = outcome.combined_stats() {
            eprintln!(
                "  total: {} -> {} tokens ({:.1}% reduction)",
                combined.original_tokens, combined.compressed_tokens, combined.reduction_percent
            );
        }
    }
    Ok(())
}

fn cmd_tools(working_dir: PathBuf, schemas: bool) -> Result<()> {
    let registry = ToolRegistry::with_defaults(ToolContext::new(working_dir));
    for tool in registry.list() {
        println!("{:24} {}", tool.name, tool.description);
        if schemas {
            println!("{}", serde_json::to_string_pretty(&tool.input_schema)?);
        }
    }
    Ok(())
}

fn cmd_call(working_dir: PathBuf, tool: &str, args: &str, session: &str) -> Result<()> {
    let args: serde_json::Value =
        serde_json::from_str(args).context("parse --args as a JSON object")?;
    let registry = ToolRegistry::with_defaults(ToolContext::new(working_dir));
    let response = registry.invoke(
        &ToolRequest {
            tool: tool.to_string(),
            args,
            session_id: session.to_string(),
        },
        &CancellationToken::new(),
    );
    println!("{}", serde_json::to_string_pretty(&response)?);
    if matches!(response, ToolResponse::Failure { .. }) {
        std::process::exit(EXIT_RUNTIME_ERROR);
    }
    Ok(())
}
