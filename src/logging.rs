//! Tracing subscriber setup

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

/// Directive used when `RUST_LOG` is unset
pub const DEFAULT_DIRECTIVE: &str = "notegate=info,tower_http=info";

/// Install a global `fmt` subscriber filtered by `RUST_LOG`
///
/// Falls back to `default_directive` when `RUST_LOG` is unset or empty.
/// Fails if a global subscriber is already installed.
pub fn init_tracing(default_directive: &str) -> Result<()> {
    let filter = env_filter(std::env::var("RUST_LOG").ok().as_deref(), default_directive)?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))
        .context("failed to install tracing subscriber")
}

fn env_filter(rust_log: Option<&str>, default_directive: &str) -> Result<EnvFilter> {
    let directives = rust_log
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(default_directive);
    EnvFilter::try_new(directives)
        .with_context(|| format!("invalid tracing directive '{}'", directives))
}
