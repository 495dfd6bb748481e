mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::SelectorArgs;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "aqualisys")]
#[command(version, about = "Aqualisys data-quality CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a suite against its dataset
    Validate {
        /// Path to the suite file (YAML or TOML)
        config: String,

        #[command(flatten)]
        selectors: SelectorArgs,

        /// Output format: text, json
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Do not persist the run
        #[arg(long)]
        no_log: bool,

        /// Use a fixed run id instead of a generated one
        #[arg(long)]
        run_id: Option<String>,
    },

    /// Build the rules of a suite and show the run plan without reading data
    Check {
        /// Path to the suite file (YAML or TOML)
        config: String,

        #[command(flatten)]
        selectors: SelectorArgs,

        /// Output format: text, json
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// List the registered rule types
    Rules {
        /// Only show rule types carrying this tag
        #[arg(short, long)]
        tag: Option<String>,

        /// Output format: text, json
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show runs persisted in a run log
    History {
        /// Path to the SQLite run log
        db: String,

        /// Only show runs of this dataset
        #[arg(short, long)]
        dataset: Option<String>,

        /// Maximum number of runs to show
        #[arg(short, long, default_value_t = 10)]
        limit: usize,

        /// Show the rule results of one run
        #[arg(short, long)]
        run: Option<String>,

        /// Output format: text, json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    // Logs go to stderr so JSON output on stdout stays parseable.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_level(true)
                .compact(),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();

    // Execute command
    match cli.command {
        Commands::Validate {
            config,
            selectors,
            format,
            no_log,
            run_id,
        } => commands::validate::execute(&config, selectors, &format, no_log, run_id).await,

        Commands::Check {
            config,
            selectors,
            format,
        } => commands::check::execute(&config, selectors, &format),

        Commands::Rules { tag, format } => commands::rules::execute(tag.as_deref(), &format),

        Commands::History {
            db,
            dataset,
            limit,
            run,
            format,
        } => commands::history::execute(&db, dataset.as_deref(), limit, run.as_deref(), &format),
    }
}
