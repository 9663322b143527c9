// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::fmt;

use super::{CachingBlockHeader, Error, Ticket};
use crate::shim::{clock::ChainEpoch, econ::TokenAmount};
use crate::utils::cid::CidCborExt as _;
use cid::Cid;
use fvm_ipld_blockstore::Blockstore;
use itertools::Itertools as _;
use nunny::Vec as NonEmpty;
use num::BigInt;
use serde::{Deserialize, Serialize};

/// A set of `CIDs` forming a unique key for a Tipset.
/// Equal keys will have equivalent iteration order, but note that the `CIDs`
/// are *not* maintained in the same order as the canonical iteration order of
/// blocks in a tipset (which is by ticket)
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TipsetKey(Vec<Cid>);

impl TipsetKey {
    pub fn new(cids: Vec<Cid>) -> Self {
        Self(cids)
    }

    pub fn cids(&self) -> &[Cid] {
        &self.0
    }

    pub fn into_cids(self) -> Vec<Cid> {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// CID of the key's CBOR encoding, used to cache per-tipset results.
    pub fn cid(&self) -> anyhow::Result<Cid> {
        Cid::from_cbor_blake2b256(self)
    }
}

impl From<Vec<Cid>> for TipsetKey {
    fn from(cids: Vec<Cid>) -> Self {
        Self(cids)
    }
}

impl fmt::Display for TipsetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.iter().join(", "))
    }
}

/// An immutable set of blocks at the same height with the same parent set.
/// Blocks in a tipset are canonically ordered by ticket size.
#[derive(Clone, Debug)]
pub struct Tipset {
    /// Sorted
    headers: NonEmpty<CachingBlockHeader>,
    key: TipsetKey,
}

impl PartialEq for Tipset {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Tipset {}

impl From<CachingBlockHeader> for Tipset {
    fn from(header: CachingBlockHeader) -> Self {
        let key = TipsetKey::new(vec![*header.cid()]);
        Self {
            headers: nunny::vec![header],
            key,
        }
    }
}

impl Tipset {
    /// Builds a new Tipset from a collection of blocks.
    /// A valid tipset contains a non-empty collection of distinct blocks that
    /// all specify identical epoch, parents and state root.
    pub fn new(headers: impl IntoIterator<Item = CachingBlockHeader>) -> Result<Self, Error> {
        let headers = headers.into_iter().collect_vec();
        verify_blocks(&headers)?;

        let headers = headers
            .into_iter()
            .map(|h| (h.tipset_sort_key(), h))
            .sorted_by(|(a, _), (b, _)| a.cmp(b))
            .map(|(_, h)| h)
            .collect_vec();
        let key = TipsetKey::new(headers.iter().map(|h| *h.cid()).collect());
        let headers: NonEmpty<CachingBlockHeader> =
            headers.try_into().map_err(|_| Error::NoBlocks)?;

        Ok(Self { headers, key })
    }

    /// Loads a tipset from the block store. Returns [`None`] if any header
    /// is missing.
    pub fn load(store: &impl Blockstore, tsk: &TipsetKey) -> anyhow::Result<Option<Tipset>> {
        let mut headers = Vec::with_capacity(tsk.cids().len());
        for cid in tsk.cids() {
            match CachingBlockHeader::load(store, *cid)? {
                Some(header) => headers.push(header),
                None => return Ok(None),
            }
        }
        Ok(Some(Tipset::new(headers)?))
    }

    /// Like [`Tipset::load`] but fails when the tipset is absent.
    pub fn load_required(store: &impl Blockstore, tsk: &TipsetKey) -> anyhow::Result<Tipset> {
        Tipset::load(store, tsk)?
            .ok_or_else(|| anyhow::anyhow!("Required tipset missing from database: {tsk}"))
    }

    /// Writes every header to the store.
    pub fn persist(&self, store: &impl Blockstore) -> anyhow::Result<()> {
        for header in self.headers.iter() {
            header.persist(store)?;
        }
        Ok(())
    }

    /// Returns epoch of the tipset.
    pub fn epoch(&self) -> ChainEpoch {
        self.min_ticket_block().epoch
    }

    pub fn block_headers(&self) -> &NonEmpty<CachingBlockHeader> {
        &self.headers
    }

    /// Returns the smallest ticket of all blocks in the tipset
    pub fn min_ticket(&self) -> Option<&Ticket> {
        self.min_ticket_block().ticket.as_ref()
    }

    /// Returns the block with the smallest ticket of all blocks in the tipset
    pub fn min_ticket_block(&self) -> &CachingBlockHeader {
        self.headers.first()
    }

    /// Returns the smallest timestamp of all blocks in the tipset
    pub fn min_timestamp(&self) -> u64 {
        self.headers
            .iter()
            .map(|block| block.timestamp)
            .min()
            .unwrap_or_default()
    }

    /// Returns the number of blocks in the tipset.
    pub fn len(&self) -> usize {
        self.key.cids().len()
    }

    /// Returns a key for the tipset.
    pub fn key(&self) -> &TipsetKey {
        &self.key
    }

    /// Returns slice of `CIDs` for the current tipset
    pub fn cids(&self) -> &[Cid] {
        self.key.cids()
    }

    /// Returns the keys of the parents of the blocks in the tipset.
    pub fn parents(&self) -> &TipsetKey {
        &self.min_ticket_block().parents
    }

    /// Returns the state root for the tipset parent.
    pub fn parent_state(&self) -> &Cid {
        &self.min_ticket_block().state_root
    }

    /// Returns the tipset's calculated weight
    pub fn weight(&self) -> &BigInt {
        &self.min_ticket_block().weight
    }

    /// Base fee every message in this tipset pays per unit of gas.
    pub fn parent_base_fee(&self) -> &TokenAmount {
        &self.min_ticket_block().parent_base_fee
    }
}

fn verify_blocks(headers: &[CachingBlockHeader]) -> Result<(), Error> {
    let first = headers.first().ok_or(Error::NoBlocks)?;
    let mut seen = ahash::HashSet::default();
    for header in headers {
        if header.parents != first.parents {
            return Err(Error::InvalidTipset(
                "parent cids are not equal".to_string(),
            ));
        }
        if header.state_root != first.state_root {
            return Err(Error::InvalidTipset("state_roots are not equal".to_string()));
        }
        if header.epoch != first.epoch {
            return Err(Error::InvalidTipset("epochs are not equal".to_string()));
        }
        if !seen.insert(*header.cid()) {
            return Err(Error::InvalidTipset(format!(
                "duplicate block {}",
                header.cid()
            )));
        }
    }
    Ok(())
}
