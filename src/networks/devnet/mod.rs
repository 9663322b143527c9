// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::{Height, HeightInfo};
use crate::shim::clock::ChainEpoch;
use tracing::warn;

/// Height epochs. Every upgrade happens before genesis unless overridden with
/// a `FOREST_<HEIGHT>_HEIGHT` environment variable.
pub fn height_infos() -> Vec<HeightInfo> {
    [
        (Height::Breeze, -50),
        (Height::Smoke, -2),
        (Height::Ignition, -3),
        (Height::ActorsV2, -3),
        (Height::Liftoff, -6),
        (Height::Calico, -9),
        (Height::Shark, -20),
        (Height::Hygge, -21),
        (Height::Lightning, -22),
        (Height::Thunder, -23),
        (Height::Watermelon, -1),
    ]
    .into_iter()
    .map(|(height, default)| HeightInfo {
        height,
        epoch: get_upgrade_height_from_env(&format!(
            "FOREST_{}_HEIGHT",
            height.to_string().to_uppercase()
        ))
        .unwrap_or(default),
    })
    .collect()
}

fn get_upgrade_height_from_env(env_var_key: &str) -> Option<ChainEpoch> {
    let value = std::env::var(env_var_key).ok()?;
    match value.parse() {
        Ok(epoch) => Some(epoch),
        Err(e) => {
            warn!("failed to parse {env_var_key}={value}: {e}");
            None
        }
    }
}
