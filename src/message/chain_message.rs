// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::SignedMessage;
use crate::shim::message::Message;
use cid::Cid;
use serde::{Deserialize, Serialize};

/// `ChainMessage` is either a signed or an unsigned message, the form a block
/// carries it in.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ChainMessage {
    Unsigned(Message),
    Signed(SignedMessage),
}

impl ChainMessage {
    pub fn message(&self) -> &Message {
        match self {
            Self::Unsigned(m) => m,
            Self::Signed(sm) => sm.message(),
        }
    }

    pub fn cid(&self) -> anyhow::Result<Cid> {
        match self {
            ChainMessage::Unsigned(msg) => msg.cid(),
            ChainMessage::Signed(msg) => msg.cid(),
        }
    }

    /// Serialized size as counted by the on-chain message gas charge.
    pub fn chain_length(&self) -> anyhow::Result<usize> {
        match self {
            ChainMessage::Unsigned(msg) => Ok(fvm_ipld_encoding::to_vec(msg)?.len()),
            ChainMessage::Signed(msg) => msg.chain_length(),
        }
    }
}

impl From<Message> for ChainMessage {
    fn from(msg: Message) -> Self {
        Self::Unsigned(msg)
    }
}

impl From<SignedMessage> for ChainMessage {
    fn from(msg: SignedMessage) -> Self {
        Self::Signed(msg)
    }
}
