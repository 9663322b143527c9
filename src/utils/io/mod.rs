// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use serde::de::DeserializeOwned;
use std::path::Path;

/// Converts a TOML file represented as a string to `S`
pub fn read_toml<S>(toml_string: &str) -> anyhow::Result<S>
where
    S: DeserializeOwned,
{
    let new_struct: S = toml::from_str(toml_string)?;
    Ok(new_struct)
}

/// Reads a TOML file from disk and converts it to `S`
pub fn read_toml_file<S>(path: &Path) -> anyhow::Result<S>
where
    S: DeserializeOwned,
{
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    read_toml(&contents)
}
