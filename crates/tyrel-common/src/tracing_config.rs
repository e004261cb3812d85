//! Tracing configuration for debugging subtype comparisons.
//!
//! Supports three output formats controlled by `TYREL_LOG_FORMAT`:
//!
//! - `text` (default): Standard `tracing-subscriber` flat output
//! - `tree`: Hierarchical indented output via `tracing-tree`
//! - `json`: One JSON object per span/event
//!
//! ## Quick start
//!
//! ```bash
//! # Every comparison the cascade makes
//! TYREL_LOG=tyrel_solver=trace TYREL_LOG_FORMAT=tree cargo test
//!
//! # Only constraint narrowing and monitored-mode warnings
//! TYREL_LOG=tyrel_solver=debug cargo test
//! ```
//!
//! The subscriber is only initialised when `TYREL_LOG` (or `RUST_LOG`) is set,
//! so there is zero overhead in normal builds.

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Registry, fmt};

/// Tracing output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Standard flat text lines (default).
    Text,
    /// Hierarchical indented tree via `tracing-tree`.
    Tree,
    /// Newline-delimited JSON objects.
    Json,
}

impl LogFormat {
    /// Parse a format name; unknown names select [`LogFormat::Text`].
    pub fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "tree" => Self::Tree,
            "json" => Self::Json,
            _ => Self::Text,
        }
    }

    fn from_env() -> Self {
        Self::parse(&std::env::var("TYREL_LOG_FORMAT").unwrap_or_default())
    }
}

/// Build an `EnvFilter` from `TYREL_LOG`, falling back to `RUST_LOG`.
fn build_filter() -> EnvFilter {
    if let Ok(val) = std::env::var("TYREL_LOG") {
        EnvFilter::builder().parse_lossy(val)
    } else {
        EnvFilter::from_default_env()
    }
}

/// Initialise the global tracing subscriber.
///
/// Does nothing when neither `TYREL_LOG` nor `RUST_LOG` is set. Safe to call
/// more than once: later calls leave the first subscriber in place, which is
/// what test binaries calling this from every test need.
///
/// All output goes to stderr.
pub fn init_tracing() {
    let has_tyrel_log = std::env::var("TYREL_LOG").is_ok();
    let has_rust_log = std::env::var("RUST_LOG").is_ok();
    if !has_tyrel_log && !has_rust_log {
        return;
    }

    let filter = build_filter();

    // An already-installed subscriber is not an error here.
    let _ = match LogFormat::from_env() {
        LogFormat::Tree => {
            let tree_layer = tracing_tree::HierarchicalLayer::default()
                .with_indent_amount(2)
                .with_indent_lines(true)
                .with_deferred_spans(true)
                .with_span_retrace(true)
                .with_targets(true);

            Registry::default().with(filter).with(tree_layer).try_init()
        }
        LogFormat::Json => {
            let json_layer = fmt::layer().json().with_writer(std::io::stderr);

            Registry::default().with(filter).with(json_layer).try_init()
        }
        LogFormat::Text => {
            let text_layer = fmt::layer().with_writer(std::io::stderr);

            Registry::default().with(filter).with(text_layer).try_init()
        }
    };
}
