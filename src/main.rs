mod audit;
mod commands;
mod config;
mod diagnostics;
mod emoji;
mod error;
mod resolver;
mod rewriter;
mod scanner;
mod types;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};

/// Exit code for configuration and other fatal errors.
const FATAL: u8 = 2;

#[derive(Parser)]
#[command(name = "sitemigrate", version, about = "One-shot migration tools for static sites")]
struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Site root to operate on (overrides `root` in the config)
    #[arg(short, long, global = true)]
    root: Option<PathBuf>,

    /// Config file (default: .sitemigrate.toml in the working directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check every href/src link and report broken ones by document and category
    Audit {
        /// Emit findings as JSON instead of markdown
        #[arg(long)]
        json: bool,
        /// Also write the markdown report to this path (relative to the root)
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Rewrite legacy paths: relocations, vendor suffixes, replacement table
    Rewrite {
        /// Report what would change without writing
        #[arg(long)]
        dry_run: bool,
    },
    /// Remove decorative emoji from markup, keeping the configured symbols
    StripEmoji {
        /// Report what would change without writing
        #[arg(long)]
        dry_run: bool,
    },
    /// Count emoji remaining in markup; exit 1 if any should have been removed
    VerifyEmoji {
        /// Also write the report to this path (relative to the root)
        #[arg(long)]
        report: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            diagnostics::print_error(&e);
            ExitCode::from(FATAL)
        },
    }
}

/// Load configuration and dispatch to the selected command.
///
/// # Errors
///
/// Returns config loading errors and fatal command errors.
fn run(cli: Cli) -> Result<ExitCode, error::Error> {
    let cwd = PathBuf::from(".");
    let mut config = config::Config::load(&cwd, cli.config.as_deref())?;
    if let Some(root) = cli.root {
        config = config.with_root(root);
    }
    tracing::debug!("site root: {}", config.root.display());

    match cli.command {
        Commands::Audit { json, report } => commands::audit(&config, json, report.as_deref()),
        Commands::Rewrite { dry_run } => commands::rewrite(&config, dry_run),
        Commands::StripEmoji { dry_run } => commands::strip_emoji(&config, dry_run),
        Commands::VerifyEmoji { report } => commands::verify_emoji(&config, report.as_deref()),
    }
}

/// Install a stderr subscriber. `RUST_LOG` refines the `-v` level.
fn setup_logging(verbosity: u8) {
    use tracing_subscriber::layer::SubscriberExt as _;
    use tracing_subscriber::util::SubscriberInitExt as _;

    let level = match verbosity {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    tracing_subscriber::registry().with(filter).with(fmt_layer).init();
}
