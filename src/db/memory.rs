// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::{BlockstoreLayer, BlockstoreView};
use ahash::HashMap;
use cid::Cid;
use fvm_ipld_blockstore::Blockstore;
use parking_lot::RwLock;

/// In-memory block store. Used as the write overlay of a round and as the
/// base store in tests.
#[derive(Debug, Default)]
pub struct MemoryDB {
    blockchain_db: RwLock<HashMap<Cid, Vec<u8>>>,
}

impl MemoryDB {
    /// Number of stored blocks.
    pub fn len(&self) -> usize {
        self.blockchain_db.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blockchain_db.read().is_empty()
    }
}

impl Blockstore for MemoryDB {
    fn get(&self, k: &Cid) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.blockchain_db.read().get(k).cloned())
    }

    fn put_keyed(&self, k: &Cid, block: &[u8]) -> anyhow::Result<()> {
        self.blockchain_db.write().insert(*k, block.to_vec());
        Ok(())
    }

    fn has(&self, k: &Cid) -> anyhow::Result<bool> {
        Ok(self.blockchain_db.read().contains_key(k))
    }
}

impl BlockstoreView for MemoryDB {
    fn view(
        &self,
        k: &Cid,
        f: &mut dyn FnMut(&[u8]) -> anyhow::Result<()>,
    ) -> anyhow::Result<bool> {
        match self.blockchain_db.read().get(k) {
            Some(data) => f(data).map(|()| true),
            None => Ok(false),
        }
    }
}

impl BlockstoreLayer for MemoryDB {
    fn delete_block(&self, k: &Cid) -> anyhow::Result<()> {
        self.blockchain_db.write().remove(k);
        Ok(())
    }

    fn get_size(&self, k: &Cid) -> anyhow::Result<Option<usize>> {
        Ok(self.blockchain_db.read().get(k).map(Vec::len))
    }

    fn for_each_block(
        &self,
        f: &mut dyn FnMut(&Cid, &[u8]) -> anyhow::Result<()>,
    ) -> anyhow::Result<()> {
        for (k, v) in self.blockchain_db.read().iter() {
            f(k, v)?;
        }
        Ok(())
    }

    fn as_view(&self) -> Option<&dyn BlockstoreView> {
        Some(self)
    }
}
