mod commands;
mod config;

use clap::{ArgAction, Parser, Subcommand};
use config::Overrides;
use feditil::{Resolver, TracingObserver};
use miette::{Context, IntoDiagnostic, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Feditil: Fediverse utilities
#[derive(Parser)]
#[command(name = "feditil")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Display extra output. May be repeated for even more output
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file (default: $XDG_CONFIG_HOME/feditil/config.toml)
    #[arg(long, env = "FEDITIL_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// User-Agent header for actor requests
    #[arg(long, global = true)]
    user_agent: Option<String>,

    /// Run WebFinger discovery over plain http (local test servers only)
    #[arg(long, global = true)]
    insecure_http: bool,

    /// Number of identifiers resolved in parallel
    #[arg(long, global = true)]
    concurrency: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a Webfinger query
    WebfingerResolve {
        /// Profile URLs, acct: URIs or user@domain handles
        #[arg(required = true)]
        identifiers: Vec<String>,
    },

    /// Determine the ActivityPub actor JSON
    ActorResolve {
        /// Profile URLs, acct: URIs or user@domain handles
        #[arg(required = true)]
        identifiers: Vec<String>,
    },
}

/// Log filter for the given number of `-v` flags
fn verbosity_filter(verbose: u8) -> String {
    match verbose {
        0 => "warn".to_string(),
        1 => "warn,feditil=info".to_string(),
        2 => "warn,feditil=debug".to_string(),
        _ => "warn,feditil=trace".to_string(),
    }
}

fn init_logging(verbose: u8) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(verbosity_filter(verbose))),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let settings = config::load_config(cli.config.as_deref())?.apply(Overrides {
        user_agent: cli.user_agent.clone(),
        insecure_http: cli.insecure_http,
        concurrency: cli.concurrency,
    });

    let resolver = Resolver::with_config(settings.resolver_config(), Some(Arc::new(TracingObserver)))
        .into_diagnostic()
        .wrap_err("Failed to set up the HTTP client")?;

    let mut stdout = std::io::stdout().lock();
    let summary = match &cli.command {
        Commands::WebfingerResolve { identifiers } => {
            commands::run_batch(
                identifiers,
                settings.concurrency(),
                |candidate| commands::webfinger_one(&resolver, candidate),
                &mut stdout,
            )
            .await?
        }
        Commands::ActorResolve { identifiers } => {
            commands::run_batch(
                identifiers,
                settings.concurrency(),
                |candidate| commands::actor_one(&resolver, candidate),
                &mut stdout,
            )
            .await?
        }
    };

    summary.into_result()
}
