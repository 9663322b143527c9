// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::{econ::TokenAmount, error::ExitCode};
use fvm_ipld_encoding::RawBytes;
use fvm_ipld_encoding::tuple::*;

/// Result of a message's execution, one per processed message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
pub struct Receipt {
    pub exit_code: ExitCode,
    pub return_data: RawBytes,
    pub gas_used: u64,
}

impl Receipt {
    pub fn exit_code(&self) -> ExitCode {
        self.exit_code
    }

    pub fn return_data(&self) -> &RawBytes {
        &self.return_data
    }

    pub fn gas_used(&self) -> u64 {
        self.gas_used
    }
}

/// Everything the VM knows about one applied message: the receipt plus the
/// fee breakdown the block reward is computed from.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ApplyRet {
    pub msg_receipt: Receipt,
    pub penalty: TokenAmount,
    pub miner_tip: TokenAmount,
    pub base_fee_burn: TokenAmount,
    pub over_estimation_burn: TokenAmount,
    pub refund: TokenAmount,
    pub gas_refund: i64,
    pub gas_burned: i64,
    /// Abort message of a failed message. Not part of the receipt.
    pub failure_info: Option<String>,
}

impl Default for Receipt {
    fn default() -> Self {
        Self {
            exit_code: ExitCode::OK,
            return_data: RawBytes::default(),
            gas_used: 0,
        }
    }
}

impl ApplyRet {
    pub fn msg_receipt(&self) -> &Receipt {
        &self.msg_receipt
    }

    pub fn failure_info(&self) -> Option<&str> {
        self.failure_info.as_deref()
    }

    pub fn miner_tip(&self) -> &TokenAmount {
        &self.miner_tip
    }

    pub fn penalty(&self) -> &TokenAmount {
        &self.penalty
    }
}
