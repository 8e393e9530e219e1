//! `rewrite-auth`: migrate API routes to the `getVerifiedUser()` helper.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tiered_transcribe::cli::Output;
use tiered_transcribe::rewrite::{auth_migration_rules, rewrite_file, FileOutcome, DEFAULT_TARGETS};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Apply the auth migration rules to route files under a project root.
#[derive(Parser, Debug)]
#[command(name = "rewrite-auth")]
#[command(version, about, long_about = None)]
struct RewriteCli {
    /// Project root the file paths are relative to
    #[arg(short, long, default_value = ".")]
    base: String,

    /// Files to rewrite (default: the built-in API route list)
    files: Vec<String>,

    /// Increase verbosity (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = RewriteCli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| format!("tiered_transcribe={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let base = PathBuf::from(shellexpand::tilde(&cli.base).to_string());
    let rules = auth_migration_rules()?;

    let targets: Vec<String> = if cli.files.is_empty() {
        DEFAULT_TARGETS.iter().map(|s| s.to_string()).collect()
    } else {
        cli.files
    };

    let mut updated = 0;
    for target in &targets {
        let path = base.join(target);
        match rewrite_file(&path, &rules) {
            Ok(FileOutcome::Updated) => {
                Output::success(&format!("Updated: {}", path.display()));
                updated += 1;
            }
            Ok(FileOutcome::Unchanged) => {
                Output::info(&format!("Skipped: {} (no changes needed)", path.display()));
            }
            Ok(FileOutcome::Missing) => {
                Output::warning(&format!("File not found: {}", path.display()));
            }
            Err(e) => {
                Output::error(&format!("Error processing {}: {}", path.display(), e));
            }
        }
    }

    println!();
    Output::success(&format!("Refactoring complete! Updated {} files.", updated));
    Ok(())
}
