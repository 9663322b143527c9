// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::{num::NonZeroUsize, sync::Arc};

use crate::blocks::{Tipset, TipsetKey};
use crate::shim::clock::ChainEpoch;
use fvm_ipld_blockstore::Blockstore;
use lru::LruCache;
use nonzero_ext::nonzero;
use parking_lot::Mutex;

use crate::chain::Error;

const DEFAULT_TIPSET_CACHE_SIZE: NonZeroUsize = nonzero!(8192usize);

type TipsetCache = Mutex<LruCache<TipsetKey, Arc<Tipset>>>;

/// Caches loaded tipsets and walks the chain of ancestors to retrieve an old
/// tipset.
pub struct ChainIndex<DB> {
    /// `Arc` reference tipset cache.
    ts_cache: TipsetCache,

    /// `Blockstore` pointer needed to load tipsets from cold storage.
    db: DB,
}

#[derive(Debug, Clone, Copy)]
/// Methods for resolving fetches of null tipsets.
/// Imagine epoch 10 is null but epoch 9 and 11 exist. If epoch we request epoch
/// 10, should 9 or 11 be returned?
pub enum ResolveNullTipset {
    TakeNewer,
    TakeOlder,
}

impl<DB: Blockstore> ChainIndex<DB> {
    pub fn new(db: DB) -> Self {
        Self::with_cache_size(db, DEFAULT_TIPSET_CACHE_SIZE)
    }

    pub fn with_cache_size(db: DB, cache_size: NonZeroUsize) -> Self {
        Self {
            ts_cache: Mutex::new(LruCache::new(cache_size)),
            db,
        }
    }

    pub fn db(&self) -> &DB {
        &self.db
    }

    /// Loads a tipset from memory given the tipset keys and cache. Semantically
    /// identical to [`Tipset::load`] but the result is cached.
    pub fn load_tipset(&self, tsk: &TipsetKey) -> Result<Arc<Tipset>, Error> {
        if let Some(ts) = self.ts_cache.lock().get(tsk) {
            return Ok(ts.clone());
        }

        let ts = Arc::new(
            Tipset::load(&self.db, tsk)?.ok_or_else(|| Error::NotFound(format!("tipset {tsk}")))?,
        );
        self.ts_cache.lock().put(tsk.clone(), ts.clone());
        Ok(ts)
    }

    /// Find tipset at epoch `to` in the chain of ancestors starting at `from`.
    /// If the tipset is _not_ in the chain of ancestors (i.e., if the `to`
    /// epoch is higher than `from.epoch()`), an error will be returned.
    ///
    /// # Why pass in the `from` argument?
    ///
    /// Imagine the database contains five tipsets and a genesis block in this
    /// configuration:
    ///
    /// ```text
    ///           ┌───────┐  ┌────────┐  ┌────────┐
    /// Genesis◄──┤Epoch 1◄──┤Epoch 2A◄──┤Epoch 3A│
    ///           └───▲───┘  └────────┘  └────────┘
    ///               │      ┌────────┐  ┌────────┐
    ///               └──────┤Epoch 2B◄──┤Epoch 3B│
    ///                      └────────┘  └────────┘
    /// ```
    ///
    /// Here we have a fork in the chain and it is ambiguous which tipset to
    /// load when epoch 2 is requested. The ambiguity is solved by passing in a
    /// younger tipset (higher epoch) from which has the desired tipset as an
    /// ancestor.
    /// Calling `tipset_by_height(2, epoch_3a)` will return `Epoch 2A`.
    /// Calling `tipset_by_height(2, epoch_3b)` will return `Epoch 2B`.
    ///
    /// # What happens when a null tipset is requested?
    ///
    /// ```text
    ///           ┌───────┐          ┌───────┐  ┌───────┐
    /// Genesis◄──┤Epoch 1│   Null   │Epoch 3◄──┤Epoch 4│
    ///           └───▲───┘          └───┬───┘  └───────┘
    ///               │                  │
    ///               └──────────────────┘
    /// ```
    /// If the requested epoch points to a null tipset, there are two options:
    /// Pick the nearest older tipset or pick the nearest younger tipset.
    /// Requesting epoch 2 with [`ResolveNullTipset::TakeNewer`] will return
    /// epoch 3. Requesting with [`ResolveNullTipset::TakeOlder`] will return
    /// epoch 1.
    pub fn tipset_by_height(
        &self,
        to: ChainEpoch,
        from: Arc<Tipset>,
        resolve: ResolveNullTipset,
    ) -> Result<Arc<Tipset>, Error> {
        if to > from.epoch() {
            return Err(Error::Other(
                "Looking for tipset with height greater than start point".to_string(),
            ));
        }

        let mut child = from;
        loop {
            if to == child.epoch() {
                return Ok(child);
            }
            if child.parents().is_empty() {
                break;
            }
            let parent = self.load_tipset(child.parents())?;
            if to > parent.epoch() {
                // We're at a point where child.epoch() > x > parent.epoch().
                return Ok(match resolve {
                    ResolveNullTipset::TakeOlder => parent,
                    ResolveNullTipset::TakeNewer => child,
                });
            }
            child = parent;
        }
        Err(Error::Other(format!("Tipset with epoch={to} does not exist")))
    }

    /// Iterate from the given tipset to genesis. Missing tipsets cut the chain
    /// short.
    pub fn chain(&self, from: Arc<Tipset>) -> impl Iterator<Item = Arc<Tipset>> + '_ {
        std::iter::successors(Some(from), move |child| {
            if child.parents().is_empty() {
                None
            } else {
                self.load_tipset(child.parents()).ok()
            }
        })
    }
}
