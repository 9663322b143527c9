// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use serde::{Deserialize, Serialize};
use tracing_subscriber::{EnvFilter, Registry, prelude::*};

/// Logging options, read from the `[log]` table of the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Extra `EnvFilter` directives appended to the defaults.
    pub filter: Option<String>,
    /// Emit JSON lines instead of human readable output.
    pub json: bool,
    /// Disable ANSI colors.
    pub no_color: bool,
}

/// Installs the global `tracing` subscriber. Call once per process.
pub fn setup_logger(config: &LogConfig) {
    let filter = get_env_filter(default_env_filter(config.filter.as_deref()));
    let layer: Box<dyn tracing_subscriber::layer::Layer<Registry> + Send + Sync> = if config.json
    {
        Box::new(
            tracing_subscriber::fmt::Layer::new()
                .json()
                .with_filter(filter),
        )
    } else {
        Box::new(
            tracing_subscriber::fmt::Layer::new()
                .with_ansi(!config.no_color)
                .with_filter(filter),
        )
    };
    if tracing_subscriber::registry().with(layer).try_init().is_err() {
        tracing::debug!("global subscriber already installed");
    }
}

/// Returns an [`EnvFilter`] according to the `RUST_LOG` environment variable, or a default
/// - see [`default_env_filter`]
///
/// Note that [`tracing_subscriber::filter::Builder`] only allows a single default directive,
/// whereas we want to provide multiple.
fn get_env_filter(def: EnvFilter) -> EnvFilter {
    use std::env::{
        self,
        VarError::{NotPresent, NotUnicode},
    };
    match env::var(tracing_subscriber::EnvFilter::DEFAULT_ENV) {
        Ok(s) => EnvFilter::new(s),
        Err(NotPresent) => def,
        Err(NotUnicode(_)) => EnvFilter::default(),
    }
}

fn default_env_filter(extra: Option<&str>) -> EnvFilter {
    let mut directives = vec!["info", "actors=debug", "bellperson=warn", "blst=warn"];
    if let Some(extra) = extra {
        directives.push(extra);
    }
    EnvFilter::try_new(directives.join(",")).unwrap_or_else(|e| {
        eprintln!("invalid log filter, using defaults: {e}");
        EnvFilter::new("info")
    })
}

#[test]
fn test_default_env_filter() {
    let _did_not_panic = default_env_filter(None);
    let _did_not_panic = default_env_filter(Some("forest_exec::interpreter=trace"));
}
