// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::{ElectionProof, Error, Ticket, TipsetKey};
use crate::{
    beacon::BeaconEntry,
    shim::{address::Address, clock::ChainEpoch, crypto::Signature, econ::TokenAmount},
    utils::{encoding::blake2b_256, multihash::prelude::*},
};
use cid::Cid;
use fvm_ipld_blockstore::Blockstore;
use fvm_ipld_encoding::tuple::*;
use fvm_shared4::sector::PoStProof;
use num::BigInt;
use serde::{Deserialize, Serialize};

#[derive(Deserialize_tuple, Serialize_tuple, Clone, Eq, PartialEq, Debug)]
pub struct RawBlockHeader {
    /// The address of the miner actor that mined this block
    pub miner_address: Address,
    pub ticket: Option<Ticket>,
    pub election_proof: Option<ElectionProof>,
    /// The verifiable oracle randomness used to elect this block's author leader
    pub beacon_entries: Vec<BeaconEntry>,
    pub winning_post_proof: Vec<PoStProof>,
    /// The set of parents this block was based on.
    /// Typically one, but can be several in the case where there were multiple
    /// winning ticket-holders for an epoch
    pub parents: TipsetKey,
    /// The aggregate chain weight of the parent set
    #[serde(with = "fvm_shared4::bigint::bigint_ser")]
    pub weight: BigInt,
    /// The period in which a new block is generated.
    /// There may be multiple rounds in an epoch.
    pub epoch: ChainEpoch,
    /// The CID of the parent state root after calculating parent tipset.
    pub state_root: Cid,
    /// The CID of the root of an array of `MessageReceipts`
    pub message_receipts: Cid,
    /// The CID of the Merkle links for `bls_messages` and `secp_messages`
    pub messages: Cid,
    /// Aggregate signature of miner in block
    pub bls_aggregate: Option<Signature>,
    /// Block creation time, in seconds since the Unix epoch
    pub timestamp: u64,
    pub signature: Option<Signature>,
    pub fork_signal: u64,
    /// The base fee of the parent block
    pub parent_base_fee: TokenAmount,
}

impl RawBlockHeader {
    pub fn cid(&self) -> anyhow::Result<Cid> {
        Ok(self.car_block()?.0)
    }

    pub fn car_block(&self) -> anyhow::Result<(Cid, Vec<u8>)> {
        let data = fvm_ipld_encoding::to_vec(self)?;
        let cid = Cid::new_v1(
            fvm_ipld_encoding::DAG_CBOR,
            MultihashCode::Blake2b256.digest(&data),
        );
        Ok((cid, data))
    }

    /// Check to ensure block signature is valid
    pub fn verify_signature_against(&self, addr: &Address) -> Result<(), Error> {
        let signature = self
            .signature
            .as_ref()
            .ok_or_else(|| Error::InvalidSignature("Signature is nil in header".to_owned()))?;
        let signing_bytes = self
            .signing_bytes()
            .map_err(|e| Error::InvalidSignature(e.to_string()))?;
        signature
            .verify(&signing_bytes, addr)
            .map_err(|e| Error::InvalidSignature(format!("Block signature invalid: {e}")))?;

        Ok(())
    }

    /// Serializes the header to bytes for signing purposes i.e. without the
    /// signature field
    pub fn signing_bytes(&self) -> anyhow::Result<Vec<u8>> {
        let mut blk = self.clone();
        blk.signature = None;
        Ok(fvm_ipld_encoding::to_vec(&blk)?)
    }
}

/// A [`RawBlockHeader`] paired with its CID, computed once when the header is
/// built or decoded.
#[derive(Debug, Clone, derive_more::Deref)]
pub struct CachingBlockHeader {
    #[deref]
    uncached: RawBlockHeader,
    cid: Cid,
}

impl PartialEq for CachingBlockHeader {
    fn eq(&self, other: &Self) -> bool {
        self.cid == other.cid
    }
}

impl Eq for CachingBlockHeader {}

impl TryFrom<RawBlockHeader> for CachingBlockHeader {
    type Error = anyhow::Error;

    fn try_from(value: RawBlockHeader) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl CachingBlockHeader {
    pub fn new(uncached: RawBlockHeader) -> anyhow::Result<Self> {
        let cid = uncached.cid()?;
        Ok(Self { uncached, cid })
    }

    pub fn into_raw(self) -> RawBlockHeader {
        self.uncached
    }

    /// Returns [`None`] if the blockstore doesn't contain the CID.
    pub fn load(store: &impl Blockstore, cid: Cid) -> anyhow::Result<Option<Self>> {
        use fvm_ipld_encoding::CborStore as _;
        Ok(store
            .get_cbor::<RawBlockHeader>(&cid)?
            .map(|uncached| Self { uncached, cid }))
    }

    /// Writes the header to the store under its CID.
    pub fn persist(&self, store: &impl Blockstore) -> anyhow::Result<()> {
        let (cid, data) = self.uncached.car_block()?;
        store.put_keyed(&cid, &data)
    }

    pub fn cid(&self) -> &Cid {
        &self.cid
    }

    /// Key used for sorting headers within a tipset: the hash of the ticket
    /// proof, ties broken by CID bytes.
    pub(super) fn tipset_sort_key(&self) -> Option<([u8; 32], Vec<u8>)> {
        let ticket_hash = blake2b_256(self.ticket.as_ref()?.vrfproof.as_bytes());
        Some((ticket_hash, self.cid.to_bytes()))
    }
}

impl From<CachingBlockHeader> for RawBlockHeader {
    fn from(value: CachingBlockHeader) -> Self {
        value.into_raw()
    }
}

impl Serialize for CachingBlockHeader {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.uncached.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CachingBlockHeader {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawBlockHeader::deserialize(deserializer)?;
        Self::new(raw).map_err(serde::de::Error::custom)
    }
}
