// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

mod chain_message;
mod signed_message;

pub use chain_message::ChainMessage;
pub use signed_message::SignedMessage;

use crate::shim::econ::TOTAL_FILECOIN;
use crate::shim::message::Message;

/// Semantic checks a message must pass before the interpreter charges for it.
/// Does not look at chain state.
pub fn valid_for_block_inclusion(msg: &Message, block_gas_limit: u64) -> anyhow::Result<()> {
    msg.check()?;
    if msg.value > *TOTAL_FILECOIN {
        anyhow::bail!("message value cannot be greater than total FIL supply");
    }
    if msg.gas_premium > msg.gas_fee_cap {
        anyhow::bail!("gas_fee_cap less than gas_premium");
    }
    if msg.gas_limit > block_gas_limit {
        anyhow::bail!(
            "gas_limit {} cannot be greater than block gas limit",
            msg.gas_limit
        );
    }
    Ok(())
}
