// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::message::SignedMessage;
use crate::shim::message::Message;
use crate::utils::db::CborStoreExt as _;
use cid::Cid;
use fvm_ipld_blockstore::Blockstore;
use fvm_ipld_encoding::tuple::*;

use super::CachingBlockHeader;

/// Limit of BLS and SECP messages combined in a block.
pub const BLOCK_MESSAGE_LIMIT: usize = 10000;

/// A complete Filecoin block. This contains the block header as well as all BLS
/// and SECP messages.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    pub header: CachingBlockHeader,
    pub bls_messages: Vec<Message>,
    pub secp_messages: Vec<SignedMessage>,
}

impl Block {
    pub fn header(&self) -> &CachingBlockHeader {
        &self.header
    }
    pub fn bls_msgs(&self) -> &[Message] {
        &self.bls_messages
    }
    pub fn secp_msgs(&self) -> &[SignedMessage] {
        &self.secp_messages
    }
    /// Returns block header's CID.
    pub fn cid(&self) -> &Cid {
        self.header.cid()
    }

    /// Persists the header and every message in the given block store
    pub fn persist(&self, db: &impl Blockstore) -> anyhow::Result<()> {
        self.header.persist(db)?;
        for msg in self.bls_msgs() {
            db.put_cbor_default(msg)?;
        }
        for msg in self.secp_msgs() {
            db.put_cbor_default(msg)?;
        }
        Ok(())
    }
}

/// Tracks the Merkle roots of both SECP and BLS messages separately.
#[derive(Clone, Debug, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
pub struct TxMeta {
    pub bls_message_root: Cid,
    pub secp_message_root: Cid,
}
