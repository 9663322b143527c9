// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

pub use super::fvm_shared_latest::clock::ChainEpoch;

/// Epochs of lookback for ticket randomness used in sector sealing.
pub const TICKET_RANDOMNESS_LOOKBACK: ChainEpoch = 1;

/// Default block delay in seconds.
pub const BLOCK_DELAY_SECS: u64 = 30;
