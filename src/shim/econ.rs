// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::sync::LazyLock;

pub use super::fvm_shared_latest::econ::TokenAmount;
use num_bigint::BigInt;

/// Total Filecoin available to the network.
pub const TOTAL_FILECOIN_BASE: i64 = 2_000_000_000;

pub static TOTAL_FILECOIN: LazyLock<TokenAmount> =
    LazyLock::new(|| TokenAmount::from_whole(TOTAL_FILECOIN_BASE));

/// Multiplies a token amount by a gas quantity.
pub fn token_mul(amount: &TokenAmount, gas: i64) -> TokenAmount {
    TokenAmount::from_atto(amount.atto() * BigInt::from(gas))
}
