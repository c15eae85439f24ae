mod commands;
mod watch;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use linkref::check::OutputFormat;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter, e.g. `LINKREF_LOG=linkref=debug`.
const LOG_ENV: &str = "LINKREF_LOG";

/// Command-line arguments.
#[derive(Parser)]
#[command(name = "linkref", about = "Resolve and check relative markdown and wiki links", long_about = None)]
struct Cli {
    /// Command to run.
    #[command(subcommand)]
    command: Commands,
}

/// `linkref` subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Check every link under the current directory (exit 0 = all resolve, 1 = broken)
    Check {
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Resolve one link as written in a markdown file
    Resolve {
        /// Keep the `#anchor` in the output
        #[arg(long)]
        anchor: bool,
        /// Map `../../wiki`, `../../issues` and friends to repository URLs
        #[arg(long)]
        external: bool,
        /// Link target as written, e.g. `../guide.md#setup`
        #[arg(index = 2)]
        link: String,
        /// Markdown file containing the link
        #[arg(index = 1)]
        source: PathBuf,
        /// Resolve as a wiki page (wiki homes become `Home`, `.md` is inferred)
        #[arg(long)]
        wiki: bool,
    },
    /// Check, then re-check whenever files change
    Watch {
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

/// Run the selected command; errors print as `error: ...` and exit 1.
fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Check { format } => commands::check(format),
        Commands::Resolve { anchor, external, link, source, wiki } => {
            commands::resolve(&source, &link, commands::ResolveFlags { anchor, external, wiki })
        },
        Commands::Watch { format } => watch::run(format),
    };

    return match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        },
    };
}

/// Log to stderr, filtered by `LINKREF_LOG` (default `warn`).
fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| return EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
