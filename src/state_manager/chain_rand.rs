// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::io::Write as _;
use std::sync::Arc;

use crate::blocks::{Tipset, TipsetKey};
use crate::chain::{ChainReader, index::ResolveNullTipset};
use crate::shim::clock::ChainEpoch;
use crate::shim::externs::Rand;
use crate::shim::randomness::{DomainSeparationTag, Randomness};
use crate::shim::version::NetworkVersion;
use crate::utils::encoding::blake2b_256;
use anyhow::{Context as _, bail};
use blake2b_simd::Params;
use byteorder::{BigEndian, WriteBytesExt as _};

/// Allows for deriving the randomness from a particular tipset.
pub struct ChainRand<C> {
    blks: TipsetKey,
    cs: Arc<C>,
}

impl<C> Clone for ChainRand<C> {
    fn clone(&self) -> Self {
        ChainRand {
            blks: self.blks.clone(),
            cs: self.cs.clone(),
        }
    }
}

impl<C: ChainReader> ChainRand<C> {
    pub fn new(blks: TipsetKey, cs: Arc<C>) -> Self {
        Self { blks, cs }
    }

    /// Gets 32 bytes of randomness for `ChainRand` parameterized by the
    /// `DomainSeparationTag`, `ChainEpoch`, Entropy from the ticket chain.
    /// With `lookback` a null round resolves to the older tipset.
    pub fn get_chain_randomness(
        &self,
        pers: DomainSeparationTag,
        round: ChainEpoch,
        entropy: &[u8],
        lookback: bool,
    ) -> anyhow::Result<Randomness> {
        let rand_ts = self.randomness_tipset(round, lookback)?;
        draw_randomness(
            rand_ts
                .min_ticket()
                .context("No ticket exists for block")?
                .vrfproof
                .as_bytes(),
            pers.as_i64(),
            round,
            entropy,
        )
    }

    /// Gets 32 bytes of randomness for `ChainRand` parameterized by the
    /// `DomainSeparationTag`, `ChainEpoch`, Entropy from the latest beacon
    /// entry.
    pub fn get_beacon_randomness(
        &self,
        pers: DomainSeparationTag,
        round: ChainEpoch,
        entropy: &[u8],
        lookback: bool,
    ) -> anyhow::Result<Randomness> {
        let rand_ts = self.randomness_tipset(round, lookback)?;
        let be = self.cs.latest_beacon_entry(&rand_ts)?;
        draw_randomness(be.data(), pers.as_i64(), round, entropy)
    }

    fn randomness_tipset(&self, round: ChainEpoch, lookback: bool) -> anyhow::Result<Arc<Tipset>> {
        let ts = self.cs.tipset(&self.blks)?;

        if round > ts.epoch() {
            bail!("cannot draw randomness from the future");
        }

        let search_height = round.max(0);
        let resolve = if lookback {
            ResolveNullTipset::TakeOlder
        } else {
            ResolveNullTipset::TakeNewer
        };
        Ok(self.cs.tipset_by_height(search_height, ts, resolve)?)
    }

    /// Networks before version 13 resolve null rounds to the older tipset.
    fn lookback(&self, round: ChainEpoch) -> bool {
        self.cs.network_version(round) < NetworkVersion::V13
    }
}

impl<C: ChainReader> Rand for ChainRand<C> {
    fn get_chain_randomness(
        &self,
        pers: DomainSeparationTag,
        round: ChainEpoch,
        entropy: &[u8],
    ) -> anyhow::Result<Randomness> {
        self.get_chain_randomness(pers, round, entropy, self.lookback(round))
    }

    fn get_beacon_randomness(
        &self,
        pers: DomainSeparationTag,
        round: ChainEpoch,
        entropy: &[u8],
    ) -> anyhow::Result<Randomness> {
        self.get_beacon_randomness(pers, round, entropy, self.lookback(round))
    }
}

/// Computes a pseudo random 32 byte `Vec`.
pub fn draw_randomness(
    rbase: &[u8],
    pers: i64,
    round: ChainEpoch,
    entropy: &[u8],
) -> anyhow::Result<Randomness> {
    blend_entropy(pers, &blake2b_256(rbase), round, entropy)
}

/// Like [`draw_randomness`] but mixes `rbase` in as is, without hashing it
/// first.
pub fn blend_entropy(
    pers: i64,
    rbase: &[u8],
    round: ChainEpoch,
    entropy: &[u8],
) -> anyhow::Result<Randomness> {
    let mut state = Params::new().hash_length(32).to_state();
    state.write_i64::<BigEndian>(pers)?;
    state.write_all(rbase)?;
    state.write_i64::<BigEndian>(round)?;
    state.write_all(entropy)?;
    let mut ret = [0u8; 32];
    ret.clone_from_slice(state.finalize().as_bytes());
    Ok(ret)
}
