// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::gas_tracker::{GasTracker, PriceList};
use crate::actor_error;
use cid::Cid;
use fvm_ipld_blockstore::Blockstore;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

/// Blockstore wrapper to charge gas on reads and writes. Gas errors travel
/// through the `anyhow` seam as [`super::ActorError`] and are recovered with
/// [`super::ActorError::from_anyhow`].
pub struct GasBlockStore<DB> {
    pub price_list: PriceList,
    pub gas: Rc<RefCell<GasTracker>>,
    pub store: Arc<DB>,
}

impl<DB> GasBlockStore<DB> {
    pub fn new(price_list: PriceList, gas: Rc<RefCell<GasTracker>>, store: Arc<DB>) -> Self {
        Self {
            price_list,
            gas,
            store,
        }
    }
}

impl<DB: Blockstore> Blockstore for GasBlockStore<DB> {
    fn get(&self, k: &Cid) -> anyhow::Result<Option<Vec<u8>>> {
        let ret = self
            .store
            .get(k)
            .map_err(|e| actor_error!(fatal("failed to get block from blockstore: {e}")))?;
        if ret.is_some() {
            self.gas
                .borrow_mut()
                .charge_gas(self.price_list.on_ipld_get())?;
        }
        Ok(ret)
    }

    fn put_keyed(&self, k: &Cid, block: &[u8]) -> anyhow::Result<()> {
        self.gas
            .borrow_mut()
            .charge_gas(self.price_list.on_ipld_put(block.len()))?;
        self.store
            .put_keyed(k, block)
            .map_err(|e| actor_error!(fatal("failed to write to store: {e}")).into())
    }

    fn has(&self, k: &Cid) -> anyhow::Result<bool> {
        self.store.has(k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryDB;
    use crate::interpreter::ActorError;
    use crate::interpreter::gas_tracker::price_list_by_network_version;
    use crate::shim::error::SYS_OUT_OF_GAS;
    use crate::shim::version::NetworkVersion;
    use crate::utils::db::CborStoreExt as _;
    use fvm_ipld_encoding::CborStore as _;

    fn prices(get: i64, put: i64, put_per_byte: i64) -> PriceList {
        PriceList {
            ipld_get_base: get,
            ipld_put_base: put,
            ipld_put_per_byte: put_per_byte,
            storage_gas_multiplier: 1,
            ..price_list_by_network_version(NetworkVersion::V6)
        }
    }

    #[test]
    fn gas_blockstore() {
        let gbs = GasBlockStore::new(
            prices(4, 3, 2),
            Rc::new(RefCell::new(GasTracker::new(20, 0))),
            Arc::new(MemoryDB::default()),
        );
        assert_eq!(gbs.gas.borrow().gas_used(), 0);
        assert_eq!(fvm_ipld_encoding::to_vec(&200u8).unwrap().len(), 2);
        let c = gbs.put_cbor_default(&200u8).unwrap();
        assert_eq!(gbs.gas.borrow().gas_used(), 7);
        gbs.get_cbor::<u8>(&c).unwrap();
        assert_eq!(gbs.gas.borrow().gas_used(), 11);
    }

    #[test]
    fn missing_blocks_are_free() {
        let gbs = GasBlockStore::new(
            prices(4, 3, 2),
            Rc::new(RefCell::new(GasTracker::new(20, 0))),
            Arc::new(MemoryDB::default()),
        );
        let c = MemoryDB::default().put_cbor_default(&1u8).unwrap();
        assert!(gbs.get(&c).unwrap().is_none());
        assert_eq!(gbs.gas.borrow().gas_used(), 0);
    }

    #[test]
    fn gas_blockstore_oog() {
        let gbs = GasBlockStore::new(
            prices(0, 12, 0),
            Rc::new(RefCell::new(GasTracker::new(10, 0))),
            Arc::new(MemoryDB::default()),
        );
        let err = gbs.put_cbor_default(&200u8).unwrap_err();
        assert_eq!(
            ActorError::from_anyhow(err).exit_code(),
            Some(SYS_OUT_OF_GAS)
        );
        assert!(gbs.store.is_empty());
    }
}
