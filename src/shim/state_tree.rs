// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::cell::RefCell;

use super::address::{Address, INIT_ACTOR_ADDR, Protocol};
use super::econ::TokenAmount;
use crate::actors::init;
use crate::utils::db::{BlockstoreExt as _, CborStoreExt as _};
use ahash::HashMap;
use anyhow::Context as _;
use cid::Cid;
use fvm_ipld_blockstore::Blockstore;
use fvm_ipld_encoding::CborStore as _;
use fvm_ipld_encoding::tuple::*;
use fvm_ipld_hamt::{BytesKey, Hamt};

/// Bit width of every HAMT in the state.
pub const HAMT_BIT_WIDTH: u32 = 5;

/// Version written into fresh state roots. Version `0` roots are bare actor
/// HAMTs and are only ever read.
pub const STATE_TREE_VERSION: u64 = 5;

/// State of all actor implementations.
#[derive(PartialEq, Eq, Clone, Debug, Serialize_tuple, Deserialize_tuple)]
pub struct ActorState {
    /// Link to code for the actor.
    pub code: Cid,
    /// Link to the state of the actor.
    pub state: Cid,
    /// Sequence of the actor.
    pub sequence: u64,
    /// Tokens available to the actor.
    pub balance: TokenAmount,
}

impl ActorState {
    pub fn new(code: Cid, state: Cid, balance: TokenAmount, sequence: u64) -> Self {
        Self {
            code,
            state,
            sequence,
            balance,
        }
    }

    /// Safely deducts funds from an Actor
    pub fn deduct_funds(&mut self, amt: &TokenAmount) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.balance >= *amt,
            "Not enough funds: balance {} is less than {amt}",
            self.balance
        );
        self.balance = TokenAmount::from_atto(self.balance.atto() - amt.atto());
        Ok(())
    }

    /// Deposits funds to an Actor
    pub fn deposit_funds(&mut self, amt: &TokenAmount) {
        self.balance = TokenAmount::from_atto(self.balance.atto() + amt.atto());
    }
}

/// Root of a versioned state tree.
#[derive(Debug, Serialize_tuple, Deserialize_tuple)]
pub struct StateRoot {
    pub version: u64,
    pub actors: Cid,
    pub info: Cid,
}

/// Empty state info record linked from every versioned root.
#[derive(Default, Serialize_tuple, Deserialize_tuple)]
struct StateInfo0 {}

/// State tree implementation using hamt. This structure is not threadsafe and
/// should only be used in sync contexts.
pub struct StateTree<S> {
    hamt: Hamt<S, ActorState>,
    version: u64,
    info: Option<Cid>,
    snaps: StateSnapshots,
}

/// Collection of state snapshots
struct StateSnapshots {
    layers: Vec<StateSnapLayer>,
}

#[derive(Debug, Default)]
struct StateSnapLayer {
    // `None` marks a deletion
    actors: RefCell<HashMap<Address, Option<ActorState>>>,
    resolve_cache: RefCell<HashMap<Address, Address>>,
}

impl StateSnapshots {
    fn new() -> Self {
        Self {
            layers: vec![StateSnapLayer::default()],
        }
    }

    fn add_layer(&mut self) {
        self.layers.push(StateSnapLayer::default())
    }

    fn drop_layer(&mut self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.layers.len() > 1,
            "drop layer failed: no snapshot on the stack"
        );
        self.layers.pop();
        Ok(())
    }

    fn merge_last_layer(&mut self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.layers.len() > 1,
            "merging layers failed: no snapshot on the stack"
        );
        let Some(last) = self.layers.pop() else {
            anyhow::bail!("merging layers failed: empty stack");
        };
        let parent = self
            .layers
            .last()
            .context("merging layers failed: missing parent layer")?;
        parent.actors.borrow_mut().extend(last.actors.into_inner());
        parent
            .resolve_cache
            .borrow_mut()
            .extend(last.resolve_cache.into_inner());
        Ok(())
    }

    fn top(&self) -> anyhow::Result<&StateSnapLayer> {
        self.layers.last().context("state snapshot stack is empty")
    }

    fn resolve_address(&self, addr: &Address) -> Option<Address> {
        self.layers
            .iter()
            .rev()
            .find_map(|layer| layer.resolve_cache.borrow().get(addr).copied())
    }

    fn cache_resolve_address(&self, addr: Address, resolved: Address) -> anyhow::Result<()> {
        self.top()?.resolve_cache.borrow_mut().insert(addr, resolved);
        Ok(())
    }

    /// `Some(None)` when the actor was deleted in a cached layer.
    fn get_actor(&self, addr: &Address) -> Option<Option<ActorState>> {
        self.layers
            .iter()
            .rev()
            .find_map(|layer| layer.actors.borrow().get(addr).cloned())
    }

    fn set_actor(&self, addr: Address, actor: ActorState) -> anyhow::Result<()> {
        self.top()?.actors.borrow_mut().insert(addr, Some(actor));
        Ok(())
    }

    fn delete_actor(&self, addr: Address) -> anyhow::Result<()> {
        self.top()?.actors.borrow_mut().insert(addr, None);
        Ok(())
    }
}

impl<S> StateTree<S>
where
    S: Blockstore,
{
    /// Creates an empty, versioned state tree.
    pub fn new(store: S) -> anyhow::Result<Self> {
        let info = store.put_cbor_default(&StateInfo0::default())?;
        Ok(Self {
            hamt: Hamt::new_with_bit_width(store, HAMT_BIT_WIDTH),
            version: STATE_TREE_VERSION,
            info: Some(info),
            snaps: StateSnapshots::new(),
        })
    }

    /// Constructor for a hamt state tree given an IPLD store
    pub fn new_from_root(store: S, c: &Cid) -> anyhow::Result<Self> {
        // Fall back to a bare actors HAMT when the root is not versioned
        let (version, info, actors) = match store.get_cbor::<StateRoot>(c) {
            Ok(Some(StateRoot {
                version,
                info,
                actors,
            })) => (version, Some(info), actors),
            _ => (0, None, *c),
        };
        let hamt = Hamt::load_with_bit_width(&actors, store, HAMT_BIT_WIDTH)
            .with_context(|| format!("failed to load state tree {c}"))?;
        Ok(Self {
            hamt,
            version,
            info,
            snaps: StateSnapshots::new(),
        })
    }

    /// Retrieve store reference to modify db.
    pub fn store(&self) -> &S {
        self.hamt.store()
    }

    /// Get actor state from an address. Will be resolved to ID address.
    pub fn get_actor(&self, addr: &Address) -> anyhow::Result<Option<ActorState>> {
        let Some(addr) = self.lookup_id(addr)? else {
            return Ok(None);
        };
        self.get_actor_by_id(&addr)
    }

    fn get_actor_by_id(&self, addr: &Address) -> anyhow::Result<Option<ActorState>> {
        if let Some(cached) = self.snaps.get_actor(addr) {
            return Ok(cached);
        }
        let act = self.hamt.get(&addr.to_bytes())?.cloned();
        if let Some(act) = &act {
            self.snaps.set_actor(*addr, act.clone())?;
        }
        Ok(act)
    }

    /// Set actor state for an address. Will set state at ID address.
    pub fn set_actor(&mut self, addr: &Address, actor: ActorState) -> anyhow::Result<()> {
        let addr = self
            .lookup_id(addr)?
            .with_context(|| format!("Resolution lookup failed for {addr}"))?;
        self.snaps.set_actor(addr, actor)
    }

    /// Get an ID address from any Address
    pub fn lookup_id(&self, addr: &Address) -> anyhow::Result<Option<Address>> {
        if addr.protocol() == Protocol::ID {
            return Ok(Some(*addr));
        }
        if let Some(resolved) = self.snaps.resolve_address(addr) {
            return Ok(Some(resolved));
        }
        let init_act = self
            .get_actor_by_id(&INIT_ACTOR_ADDR)?
            .context("Init actor address could not be resolved")?;
        let state: init::State = self.store().get_cbor_required(&init_act.state)?;
        let Some(resolved) = state.resolve_address(self.store(), addr)? else {
            return Ok(None);
        };
        self.snaps.cache_resolve_address(*addr, resolved)?;
        Ok(Some(resolved))
    }

    /// Delete actor for an address. Will resolve to ID address to delete.
    pub fn delete_actor(&mut self, addr: &Address) -> anyhow::Result<()> {
        let addr = self
            .lookup_id(addr)?
            .with_context(|| format!("Resolution lookup failed for {addr}"))?;
        self.snaps.delete_actor(addr)
    }

    /// Mutate and set actor state for an Address.
    pub fn mutate_actor<F>(&mut self, addr: &Address, mutate: F) -> anyhow::Result<()>
    where
        F: FnOnce(&mut ActorState) -> anyhow::Result<()>,
    {
        let mut act = self
            .get_actor(addr)?
            .with_context(|| format!("Actor for address: {addr} does not exist"))?;
        mutate(&mut act)?;
        self.set_actor(addr, act)
    }

    /// Register a new address through the init actor.
    pub fn register_new_address(&mut self, addr: &Address) -> anyhow::Result<Address> {
        let mut actor = self
            .get_actor(&INIT_ACTOR_ADDR)?
            .context("Could not retrieve init actor")?;
        let mut ias: init::State = self.store().get_cbor_required(&actor.state)?;
        let new_addr = ias.map_address_to_new_id(self.store(), addr)?;
        actor.state = self.store().put_cbor_default(&ias)?;
        self.set_actor(&INIT_ACTOR_ADDR, actor)?;
        Ok(new_addr)
    }

    /// Add snapshot layer to stack.
    pub fn snapshot(&mut self) {
        self.snaps.add_layer();
    }

    /// Merges last two snap shot layers.
    pub fn clear_snapshot(&mut self) -> anyhow::Result<()> {
        self.snaps.merge_last_layer()
    }

    /// Revert state cache by removing last snapshot
    pub fn revert_to_snapshot(&mut self) -> anyhow::Result<()> {
        self.snaps.drop_layer()?;
        self.snaps.add_layer();
        Ok(())
    }

    /// Number of snapshot layers above the base layer.
    pub fn snapshot_depth(&self) -> usize {
        self.snaps.layers.len() - 1
    }

    /// Flush state tree and return Cid root.
    pub fn flush(&mut self) -> anyhow::Result<Cid> {
        anyhow::ensure!(
            self.snaps.layers.len() == 1,
            "tried to flush state tree with snapshots on the stack: {}",
            self.snaps.layers.len()
        );
        let base = self.snaps.top()?.actors.borrow().clone();
        for (addr, sto) in base {
            match sto {
                None => {
                    self.hamt.delete(&addr.to_bytes())?;
                }
                Some(state) => {
                    self.hamt.set(BytesKey(addr.to_bytes()), state)?;
                }
            }
        }
        let root = self.hamt.flush()?;
        match self.info {
            None => Ok(root),
            Some(info) => self.store().put_cbor_default(&StateRoot {
                version: self.version,
                actors: root,
                info,
            }),
        }
    }

    /// Visits every actor in the flushed tree. Cached, unflushed changes are
    /// not visible.
    pub fn for_each<F>(&self, mut f: F) -> anyhow::Result<()>
    where
        F: FnMut(Address, &ActorState) -> anyhow::Result<()>,
    {
        self.hamt
            .for_each(|k, v| f(Address::from_bytes(&k.0)?, v))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actors::{ACCOUNT_ACTOR_CODE_ID, INIT_ACTOR_CODE_ID};
    use crate::db::MemoryDB;
    use crate::utils::cid::empty_object_cid;

    fn tree_with_init(db: &MemoryDB) -> StateTree<&MemoryDB> {
        let mut tree = StateTree::new(db).unwrap();
        let init_state = init::State::new(db, "test".into()).unwrap();
        let state = db.put_cbor_default(&init_state).unwrap();
        tree.set_actor(
            &INIT_ACTOR_ADDR,
            ActorState::new(*INIT_ACTOR_CODE_ID, state, TokenAmount::default(), 0),
        )
        .unwrap();
        tree
    }

    fn account(balance: u64) -> ActorState {
        ActorState::new(
            *ACCOUNT_ACTOR_CODE_ID,
            empty_object_cid().unwrap(),
            TokenAmount::from_atto(balance),
            0,
        )
    }

    #[test]
    fn get_set_and_flush() {
        let db = MemoryDB::default();
        let mut tree = tree_with_init(&db);
        let addr = Address::new_id(100);
        tree.set_actor(&addr, account(5)).unwrap();
        assert_eq!(tree.get_actor(&addr).unwrap(), Some(account(5)));

        let root = tree.flush().unwrap();
        let reloaded = StateTree::new_from_root(&db, &root).unwrap();
        assert_eq!(reloaded.get_actor(&addr).unwrap(), Some(account(5)));
        assert!(reloaded.get_actor(&Address::new_id(101)).unwrap().is_none());
    }

    #[test]
    fn deleted_actor_is_gone_before_flush() {
        let db = MemoryDB::default();
        let mut tree = tree_with_init(&db);
        let addr = Address::new_id(100);
        tree.set_actor(&addr, account(5)).unwrap();
        let root = tree.flush().unwrap();

        let mut tree = StateTree::new_from_root(&db, &root).unwrap();
        tree.delete_actor(&addr).unwrap();
        assert!(tree.get_actor(&addr).unwrap().is_none());
        let root = tree.flush().unwrap();
        let tree = StateTree::new_from_root(&db, &root).unwrap();
        assert!(tree.get_actor(&addr).unwrap().is_none());
    }

    #[test]
    fn revert_drops_changes_since_snapshot() {
        let db = MemoryDB::default();
        let mut tree = tree_with_init(&db);
        let addr = Address::new_id(100);
        tree.set_actor(&addr, account(5)).unwrap();

        tree.snapshot();
        tree.set_actor(&addr, account(7)).unwrap();
        assert_eq!(tree.get_actor(&addr).unwrap(), Some(account(7)));
        tree.revert_to_snapshot().unwrap();
        assert_eq!(tree.get_actor(&addr).unwrap(), Some(account(5)));

        tree.set_actor(&addr, account(9)).unwrap();
        tree.clear_snapshot().unwrap();
        assert_eq!(tree.snapshot_depth(), 0);
        assert_eq!(tree.get_actor(&addr).unwrap(), Some(account(9)));
    }

    #[test]
    fn flush_with_open_snapshot_fails() {
        let db = MemoryDB::default();
        let mut tree = tree_with_init(&db);
        tree.snapshot();
        assert!(tree.flush().is_err());
    }

    #[test]
    fn key_addresses_resolve_after_registration() {
        let db = MemoryDB::default();
        let mut tree = tree_with_init(&db);
        let key_addr = Address::new_secp256k1(&[4; 65]).unwrap();
        assert!(tree.lookup_id(&key_addr).unwrap().is_none());

        let id = tree.register_new_address(&key_addr).unwrap();
        assert_eq!(id, Address::new_id(crate::shim::address::FIRST_NON_SINGLETON_ADDR));
        tree.set_actor(&id, account(1)).unwrap();
        assert_eq!(tree.lookup_id(&key_addr).unwrap(), Some(id));
        assert_eq!(tree.get_actor(&key_addr).unwrap(), Some(account(1)));
    }

    #[test]
    fn deduct_funds_requires_balance() {
        let mut act = account(5);
        assert!(act.deduct_funds(&TokenAmount::from_atto(6)).is_err());
        act.deduct_funds(&TokenAmount::from_atto(5)).unwrap();
        assert!(act.balance.is_zero());
    }
}
