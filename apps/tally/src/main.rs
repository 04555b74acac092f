//! # Tally - Keyboard Calculator
//!
//! The main binary: interactive calculator, one-shot evaluation, and the
//! calculation history service.
//!
//! ## Usage
//!
//! ```bash
//! # Interactive calculator
//! tally
//!
//! # One key sequence
//! tally eval "5+3*2="
//!
//! # History service
//! tally server --host 0.0.0.0 --port 5000
//! tally --history-url http://127.0.0.1:5000 history -n 10
//! ```

use clap::Parser;
use tally::cli::{self, Cli, Commands};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    let interactive = matches!(
        cli.command,
        None | Some(Commands::Repl { .. }) | Some(Commands::Server { .. })
    );
    if interactive && !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing on stderr; `TALLY_LOG_FORMAT=json` enables
/// machine-parseable output.
fn init_tracing(verbose: bool) {
    let log_format = std::env::var("TALLY_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let default_filter = if verbose {
        "tally=debug,tally_core=debug,tower_http=debug"
    } else {
        "tally=info,tower_http=debug"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

/// Print the Tally startup banner.
fn print_banner() {
    println!(
        r#"
  ┌───────────────────┐
  │ ████████████ 16   │   Tally v{}
  ├───┬───┬───┬───────┤
  │ 7 │ 8 │ 9 │   ÷   │   Type keys, e.g. 5+3*2=
  │ 4 │ 5 │ 6 │   ×   │   :help for commands
  │ 1 │ 2 │ 3 │   -   │
  │ 0 │ . │ = │   +   │
  └───┴───┴───┴───────┘
"#,
        env!("CARGO_PKG_VERSION")
    );
}
