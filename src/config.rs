// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::networks::ChainConfig;
use crate::utils::io::{read_toml, read_toml_file};
use crate::utils::logger::LogConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Execution knobs of the tipset processor.
#[derive(Serialize, Deserialize, PartialEq, Eq, Default, Debug, Clone)]
#[serde(default)]
pub struct VmConfig {
    /// Write every block straight to the base store instead of buffering the
    /// round's writes. Diagnostics only: a failed round leaves its blocks
    /// behind.
    pub disable_buffering: bool,
}

#[derive(Serialize, Deserialize, PartialEq, Default, Debug, Clone)]
#[serde(default)]
pub struct Config {
    pub chain: Arc<ChainConfig>,
    pub vm: VmConfig,
    pub log: LogConfig,
}

impl Config {
    pub fn from_toml_str(toml: &str) -> anyhow::Result<Self> {
        read_toml(toml)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        read_toml_file(path)
    }
}
