mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use nodeshadow::config::{self, Config, LogFormat, OutputFormat};

#[derive(Parser)]
#[command(
    name = "nodeshadow",
    version,
    about = "Reconcile desired and reported node state for edge fleets"
)]
struct Cli {
    /// Path to config file (default: ~/.config/nodeshadow/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (overrides config)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge newly reported data into an existing document
    Merge {
        /// Current document
        base: PathBuf,
        /// Newly reported data
        incoming: PathBuf,
    },

    /// Compute the merge patch that moves a reported document to the desired one
    Diff {
        /// Desired document
        desired: PathBuf,
        /// Reported document
        reported: PathBuf,

        /// Keep null markers for keys the desired document no longer has
        #[arg(long)]
        with_nil: bool,
    },

    /// Apply a merge patch to a document
    Patch {
        /// Document to evolve
        document: PathBuf,
        /// Merge patch
        delta: PathBuf,
    },

    /// Show the operator view of a node
    View {
        /// Node record (JSON or YAML)
        node: PathBuf,

        /// Seconds after which a report is stale (overrides config)
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Output format (overrides config)
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut cfg = config::load(cli.config.as_deref())?;
    if let Some(level) = cli.log_level {
        cfg.log_level = level;
    }
    init_tracing(&cfg);

    match cli.command {
        Commands::Merge { base, incoming } => commands::merge::run(&base, &incoming),
        Commands::Diff {
            desired,
            reported,
            with_nil,
        } => commands::diff::run(&desired, &reported, with_nil),
        Commands::Patch { document, delta } => commands::patch::run(&document, &delta),
        Commands::View {
            node,
            timeout_secs,
            format,
        } => {
            if let Some(secs) = timeout_secs {
                cfg.view.timeout_secs = secs;
            }
            commands::view::run(&node, cfg.view.timeout(), format.unwrap_or(cfg.output))
        }
    }
}

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match config.log_format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Text => subscriber.init(),
    }
}
