// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::{num::NonZeroUsize, sync::Arc};

use crate::beacon::BeaconEntry;
use crate::blocks::{CachingBlockHeader, Tipset, TipsetKey, TxMeta};
use crate::interpreter::{BlockMessages, CirculatingSupply, CirculatingSupplyCalculator};
use crate::message::{ChainMessage, SignedMessage};
use crate::networks::ChainConfig;
use crate::shim::clock::ChainEpoch;
use crate::shim::{
    executor::Receipt, message::Message, state_tree::StateTree, version::NetworkVersion,
};
use crate::utils::db::CborStoreExt as _;
use cid::Cid;
use fvm_ipld_amt::Amtv0 as Amt;
use fvm_ipld_blockstore::Blockstore;
use fvm_ipld_encoding::CborStore as _;
use fvm_ipld_encoding::tuple::*;
use lru::LruCache;
use nonzero_ext::nonzero;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use super::{
    Error,
    index::{ChainIndex, ResolveNullTipset},
};

/// Disambiguate the type to signify that we are expecting a delta and not an actual epoch/height
/// while maintaining the same type.
pub type ChainEpochDelta = ChainEpoch;

/// Number of epochs after which the chain is considered final.
pub const CHAIN_FINALITY: ChainEpochDelta = 900;

/// Look-back used by networks before version 4.
pub const LEGACY_LOOKBACK: ChainEpochDelta = 10;

/// How many tipsets are searched for a beacon entry before giving up.
const BEACON_ENTRY_SEARCH_DEPTH: usize = 20;

const DEFAULT_TIPSET_RESULT_CACHE_SIZE: NonZeroUsize = nonzero!(1024usize);

/// Output of executing a tipset, cached against its key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
pub struct TipsetResult {
    pub state_root: Cid,
    pub receipt_root: Cid,
}

/// Read access to the chain the state manager needs while executing a round.
pub trait ChainReader {
    /// Tipset by key. An empty key resolves to the heaviest tipset.
    fn tipset(&self, tsk: &TipsetKey) -> Result<Arc<Tipset>, Error>;

    fn heaviest_tipset(&self) -> Arc<Tipset>;

    fn genesis(&self) -> &CachingBlockHeader;

    /// State and receipt roots of a tipset that has already been executed.
    fn tipset_result(&self, tsk: &TipsetKey) -> Option<TipsetResult>;

    /// Records the output of a successfully executed tipset.
    fn put_tipset_result(&self, tsk: &TipsetKey, result: TipsetResult);

    /// The most recent beacon entry found in `ts` or its close ancestors.
    fn latest_beacon_entry(&self, ts: &Tipset) -> Result<BeaconEntry, Error>;

    fn tipset_by_height(
        &self,
        height: ChainEpoch,
        from: Arc<Tipset>,
        resolve: ResolveNullTipset,
    ) -> Result<Arc<Tipset>, Error>;

    /// Look-back tipset for `round`, and the state root it produced.
    fn lookback_tipset_for_round(
        &self,
        from: Arc<Tipset>,
        round: ChainEpoch,
    ) -> Result<(Arc<Tipset>, Cid), Error>;

    fn network_version(&self, epoch: ChainEpoch) -> NetworkVersion;

    fn chain_config(&self) -> &Arc<ChainConfig>;

    fn circ_supply_calculator(&self) -> &CirculatingSupplyCalculator;

    fn circulating_supply_detail(
        &self,
        epoch: ChainEpoch,
        state_root: &Cid,
    ) -> anyhow::Result<CirculatingSupply>;
}

/// Source of the messages included in a tipset.
pub trait MessageStore {
    /// Messages of every block in `ts`, in block order, with duplicates
    /// removed.
    fn load_tipset_messages(&self, ts: &Tipset) -> Result<Vec<BlockMessages>, Error>;
}

/// Stores chain data such as heaviest tipset and cached tipset info at each
/// epoch. This structure is thread-safe, and all caches are wrapped in a mutex
/// to allow a consistent `ChainStore` to be shared across tasks.
pub struct ChainStore<DB> {
    /// key-value `datastore`.
    pub db: Arc<DB>,

    /// Used as a cache for tipset `lookbacks`.
    pub chain_index: Arc<ChainIndex<Arc<DB>>>,

    chain_config: Arc<ChainConfig>,

    genesis_block_header: CachingBlockHeader,

    heaviest: Mutex<Arc<Tipset>>,

    /// Results of executed tipsets
    tipset_results: Mutex<LruCache<TipsetKey, TipsetResult>>,

    circ_supply: CirculatingSupplyCalculator,
}

impl<DB> ChainStore<DB>
where
    DB: Blockstore,
{
    pub fn new(
        db: Arc<DB>,
        chain_config: Arc<ChainConfig>,
        genesis_block_header: CachingBlockHeader,
        circ_supply: CirculatingSupplyCalculator,
    ) -> anyhow::Result<Self> {
        genesis_block_header.persist(&db)?;
        let chain_index = Arc::new(ChainIndex::new(Arc::clone(&db)));
        let heaviest = Mutex::new(Arc::new(Tipset::from(genesis_block_header.clone())));

        Ok(Self {
            db,
            chain_index,
            chain_config,
            genesis_block_header,
            heaviest,
            tipset_results: Mutex::new(LruCache::new(DEFAULT_TIPSET_RESULT_CACHE_SIZE)),
            circ_supply,
        })
    }

    /// Keeps at most `cache_size` executed tipset results, dropping the least
    /// recently used first.
    pub fn with_result_cache_size(self, cache_size: NonZeroUsize) -> Self {
        Self {
            tipset_results: Mutex::new(LruCache::new(cache_size)),
            ..self
        }
    }

    /// Returns key-value store instance.
    pub fn blockstore(&self) -> &DB {
        &self.db
    }

    pub fn set_heaviest_tipset(&self, ts: Arc<Tipset>) {
        info!("New heaviest tipset! {} (EPOCH = {})", ts.key(), ts.epoch());
        *self.heaviest.lock() = ts;
    }

    /// Writes tipset block headers to data store and updates heaviest tipset
    /// if the new one weighs more.
    pub fn put_tipset(&self, ts: &Tipset) -> Result<(), Error> {
        ts.persist(self.blockstore())?;
        let heavier = ts.weight() > self.heaviest.lock().weight();
        if heavier {
            self.set_heaviest_tipset(Arc::new(ts.clone()));
        }
        Ok(())
    }

    /// Retrieves ordered valid messages from a `Tipset`. This will only include
    /// messages that will be passed through the VM.
    pub fn messages_for_tipset(&self, ts: &Tipset) -> Result<Vec<ChainMessage>, Error> {
        let bmsgs = self.load_tipset_messages(ts)?;
        Ok(bmsgs.into_iter().flat_map(|bm| bm.messages).collect())
    }
}

impl<DB: Blockstore> ChainReader for ChainStore<DB> {
    fn tipset(&self, tsk: &TipsetKey) -> Result<Arc<Tipset>, Error> {
        if tsk.is_empty() {
            return Ok(self.heaviest_tipset());
        }
        self.chain_index.load_tipset(tsk)
    }

    fn heaviest_tipset(&self) -> Arc<Tipset> {
        self.heaviest.lock().clone()
    }

    fn genesis(&self) -> &CachingBlockHeader {
        &self.genesis_block_header
    }

    fn tipset_result(&self, tsk: &TipsetKey) -> Option<TipsetResult> {
        self.tipset_results.lock().get(tsk).cloned()
    }

    fn put_tipset_result(&self, tsk: &TipsetKey, result: TipsetResult) {
        debug!(%tsk, state_root = %result.state_root, "caching tipset result");
        self.tipset_results.lock().put(tsk.clone(), result);
    }

    fn latest_beacon_entry(&self, ts: &Tipset) -> Result<BeaconEntry, Error> {
        let mut cur = Arc::new(ts.clone());
        for _ in 0..BEACON_ENTRY_SEARCH_DEPTH {
            if let Some(entry) = cur.min_ticket_block().beacon_entries.last() {
                return Ok(entry.clone());
            }
            if cur.epoch() == 0 {
                return Err(Error::Other(
                    "made it back to genesis block without finding beacon entry".to_string(),
                ));
            }
            cur = self.chain_index.load_tipset(cur.parents())?;
        }
        Err(Error::Other(format!(
            "found NO beacon entries in the {BEACON_ENTRY_SEARCH_DEPTH} latest tipsets"
        )))
    }

    fn tipset_by_height(
        &self,
        height: ChainEpoch,
        from: Arc<Tipset>,
        resolve: ResolveNullTipset,
    ) -> Result<Arc<Tipset>, Error> {
        self.chain_index.tipset_by_height(height, from, resolve)
    }

    /// The look-back tipset for a round is the tipset with epoch `round -
    /// chain_finality`. [Chain
    /// finality](https://docs.filecoin.io/reference/general/glossary/#finality)
    /// is usually 900. `from` is a reference point in the blockchain. It must
    /// be a child of the look-back tipset.
    fn lookback_tipset_for_round(
        &self,
        from: Arc<Tipset>,
        round: ChainEpoch,
    ) -> Result<(Arc<Tipset>, Cid), Error> {
        let lb = if self.network_version(round) <= NetworkVersion::V3 {
            LEGACY_LOOKBACK
        } else {
            CHAIN_FINALITY
        };
        let lbr = (round - lb).max(0);

        // More null blocks than lookback
        if lbr >= from.epoch() {
            let result = self
                .tipset_result(from.key())
                .ok_or_else(|| Error::NotFound(format!("execution result of {}", from.key())))?;
            return Ok((from, result.state_root));
        }

        let next_ts = self
            .chain_index
            .tipset_by_height(lbr + 1, from.clone(), ResolveNullTipset::TakeNewer)
            .map_err(|e| Error::Other(format!("Could not get tipset by height {e}")))?;
        if lbr > next_ts.epoch() {
            return Err(Error::Other(format!(
                "failed to find non-null tipset {} {} which is known to exist, found {} {}",
                from.key(),
                from.epoch(),
                next_ts.key(),
                next_ts.epoch()
            )));
        }
        let lbts = self
            .chain_index
            .load_tipset(next_ts.parents())
            .map_err(|e| Error::Other(format!("Could not get tipset from keys {e}")))?;
        Ok((lbts, *next_ts.parent_state()))
    }

    fn network_version(&self, epoch: ChainEpoch) -> NetworkVersion {
        self.chain_config.network_version(epoch)
    }

    fn chain_config(&self) -> &Arc<ChainConfig> {
        &self.chain_config
    }

    fn circ_supply_calculator(&self) -> &CirculatingSupplyCalculator {
        &self.circ_supply
    }

    fn circulating_supply_detail(
        &self,
        epoch: ChainEpoch,
        state_root: &Cid,
    ) -> anyhow::Result<CirculatingSupply> {
        let state_tree = StateTree::new_from_root(Arc::clone(&self.db), state_root)?;
        self.circ_supply.get_supply_detail(epoch, &state_tree)
    }
}

impl<DB: Blockstore> MessageStore for ChainStore<DB> {
    fn load_tipset_messages(&self, ts: &Tipset) -> Result<Vec<BlockMessages>, Error> {
        BlockMessages::for_tipset(self.blockstore(), ts)
    }
}

/// Returns a Tuple of BLS messages of type `UnsignedMessage` and SECP messages
/// of type `SignedMessage`
pub fn block_messages<DB>(
    db: &DB,
    bh: &CachingBlockHeader,
) -> Result<(Vec<Message>, Vec<SignedMessage>), Error>
where
    DB: Blockstore,
{
    let (bls_cids, secpk_cids) = read_msg_cids(db, &bh.messages)?;

    let bls_msgs: Vec<Message> = messages_from_cids(db, &bls_cids)?;
    let secp_msgs: Vec<SignedMessage> = messages_from_cids(db, &secpk_cids)?;

    Ok((bls_msgs, secp_msgs))
}

/// Returns a tuple of CIDs for both unsigned and signed messages
pub fn read_msg_cids<DB>(db: &DB, msg_cid: &Cid) -> Result<(Vec<Cid>, Vec<Cid>), Error>
where
    DB: Blockstore,
{
    if let Some(roots) = db.get_cbor::<TxMeta>(msg_cid)? {
        let bls_cids = read_amt_cids(db, &roots.bls_message_root)?;
        let secpk_cids = read_amt_cids(db, &roots.secp_message_root)?;
        Ok((bls_cids, secpk_cids))
    } else {
        Err(Error::UndefinedKey(format!("no msg root with cid {msg_cid}")))
    }
}

/// Stores the messages and the [`TxMeta`] linking them. Returns the CID to put
/// in a block header's `messages` field.
pub fn persist_block_messages<DB>(
    db: &DB,
    bls_msgs: &[Message],
    secp_msgs: &[SignedMessage],
) -> Result<Cid, Error>
where
    DB: Blockstore,
{
    let mut bls_cids = Vec::with_capacity(bls_msgs.len());
    for msg in bls_msgs {
        bls_cids.push(db.put_cbor_default(msg)?);
    }
    let mut secp_cids = Vec::with_capacity(secp_msgs.len());
    for msg in secp_msgs {
        secp_cids.push(db.put_cbor_default(msg)?);
    }
    let meta = TxMeta {
        bls_message_root: Amt::new_from_iter(db, bls_cids)?,
        secp_message_root: Amt::new_from_iter(db, secp_cids)?,
    };
    Ok(db.put_cbor_default(&meta)?)
}

/// Returns a vector of CIDs from provided root CID
fn read_amt_cids<DB>(db: &DB, root: &Cid) -> Result<Vec<Cid>, Error>
where
    DB: Blockstore,
{
    let amt = Amt::<Cid, _>::load(root, db)?;

    let mut cids = Vec::new();
    for i in 0..amt.count() {
        if let Some(c) = amt.get(i)? {
            cids.push(*c);
        }
    }

    Ok(cids)
}

/// Returns messages from key-value store based on a slice of [`Cid`]s.
pub fn messages_from_cids<DB, T>(db: &DB, keys: &[Cid]) -> Result<Vec<T>, Error>
where
    DB: Blockstore,
    T: DeserializeOwned,
{
    keys.iter()
        .map(|k| {
            db.get_cbor(k)?
                .ok_or_else(|| Error::UndefinedKey(k.to_string()))
        })
        .collect()
}

/// Returns parent message receipt given `block_header` and message index.
pub fn get_parent_receipt<DB>(
    db: &DB,
    block_header: &CachingBlockHeader,
    i: usize,
) -> Result<Option<Receipt>, Error>
where
    DB: Blockstore,
{
    let amt = Amt::<Receipt, _>::load(&block_header.message_receipts, db)?;
    let receipts = amt.get(i as u64)?;
    Ok(receipts.cloned())
}
