//! Stackmap CLI entry point

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "stackmap")]
#[command(about = "Map workflows onto the database objects they depend on", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Project root holding the extracts (defaults to current directory)
    #[arg(short, long, default_value = ".", global = true)]
    root: PathBuf,

    /// Configuration file (defaults to <root>/stackmap.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

/// Input overrides shared by every command that merges.
#[derive(Args, Debug, Default, Clone)]
pub struct InputArgs {
    /// Workflow extract, instead of the configured candidates
    #[arg(long)]
    pub workflows: Option<PathBuf>,

    /// Schema extract, instead of the configured candidates
    #[arg(long)]
    pub schema: Option<PathBuf>,

    /// Schema assumed for unqualified names
    #[arg(long)]
    pub default_schema: Option<String>,

    /// Comma-separated schema allow-list
    #[arg(long)]
    pub schemas: Option<String>,

    /// Treat a missing extract as empty instead of failing
    #[arg(long)]
    pub allow_missing: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge both extracts and write the interchange document and report
    Merge {
        #[command(flatten)]
        inputs: InputArgs,

        /// Interchange output path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Markdown report path
        #[arg(long)]
        report: Option<PathBuf>,

        /// Skip the markdown report
        #[arg(long)]
        no_report: bool,

        /// Leave the explicit graph section out of the interchange document
        #[arg(long)]
        no_graph: bool,

        /// Timestamp to record instead of the current time (RFC 3339)
        #[arg(long)]
        generated_at: Option<String>,
    },
    /// Print the markdown report
    Report {
        #[command(flatten)]
        inputs: InputArgs,
    },
    /// List the workflows affected by a change to a node
    Impact {
        /// Node id, name or qualified name
        node: String,

        #[command(flatten)]
        inputs: InputArgs,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Find nodes by name
    Search {
        query: String,

        #[command(flatten)]
        inputs: InputArgs,

        #[arg(long)]
        json: bool,
    },
    /// Show the nodes directly connected to a node
    Neighbors {
        node: String,

        #[command(flatten)]
        inputs: InputArgs,

        #[arg(long)]
        json: bool,
    },
    /// Start the query server
    Serve {
        #[command(flatten)]
        inputs: InputArgs,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Open browser automatically
        #[arg(long)]
        open: bool,
    },
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging; stdout is reserved for command output
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!("stackmap={}", log_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!("Stackmap v{}", env!("CARGO_PKG_VERSION"));
    tracing::debug!("Project root: {}", cli.root.display());

    let ctx = commands::Context {
        root: cli.root,
        config: cli.config,
    };

    match cli.command {
        Commands::Merge {
            inputs,
            output,
            report,
            no_report,
            no_graph,
            generated_at,
        } => commands::merge(
            &ctx,
            &inputs,
            commands::MergeFlags {
                output,
                report,
                no_report,
                no_graph,
                generated_at,
            },
        ),
        Commands::Report { inputs } => commands::report(&ctx, &inputs),
        Commands::Impact { node, inputs, json } => commands::impact(&ctx, &inputs, &node, json),
        Commands::Search {
            query,
            inputs,
            json,
        } => commands::search(&ctx, &inputs, &query, json),
        Commands::Neighbors { node, inputs, json } => {
            commands::neighbors(&ctx, &inputs, &node, json)
        }
        Commands::Serve {
            inputs,
            port,
            host,
            open,
        } => commands::serve(&ctx, &inputs, host, port, open).await,
        Commands::Version => {
            println!("Stackmap v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
