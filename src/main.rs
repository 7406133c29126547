// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Set up logging (tracing, controlled by RUST_LOG)
// 2. Parse command-line arguments using clap
// 3. Validate the configuration (bad flags stop us before any scanning)
// 4. Run the verifier and print the report
// 5. Exit with proper code (0 = success, 1 = broken links, 2 = error)
// =============================================================================

use anyhow::{Context, Result};
use clap::Parser;
use link_verifier::cli::Cli;
use link_verifier::Verifier;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    init_tracing();

    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            // Configuration problems and other fatal errors end up here
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

// Diagnostics go to stderr so `--json` output on stdout stays clean
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("link_verifier=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

// Returns:
//   Ok(0) = no broken links
//   Ok(1) = broken links found
//   Err   = configuration or fatal error (exit code 2)
async fn run() -> Result<i32> {
    let cli = Cli::parse();
    let json = cli.json;
    let config = cli.into_config();

    let verifier = Verifier::new(config).context("invalid configuration")?;

    if !json {
        println!("🔍 Verifying links in {}", verifier.root().display());
        if verifier.config().skip_external {
            println!("⏭️  External links will not be checked");
        } else if verifier.config().only_external {
            println!("🌐 Only external links will be checked");
        }
        println!();
    }

    let report = verifier
        .run()
        .await
        .context("verification failed")?;

    if json {
        println!("{}", report.to_json()?);
    } else {
        print!("{}", report.render_text());
    }

    Ok(report.exit_code())
}
