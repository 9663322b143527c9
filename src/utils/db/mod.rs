// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::utils::multihash::prelude::*;
use anyhow::Context as _;
use cid::Cid;
use fvm_ipld_blockstore::Blockstore;
use fvm_ipld_encoding::{CborStore, DAG_CBOR};
use serde::{Serialize, de::DeserializeOwned};

/// Extension methods for inserting and retrieving IPLD data with CIDs
pub trait BlockstoreExt: Blockstore {
    /// Get typed object from block store by `CID`, failing when the block is
    /// absent.
    fn get_cbor_required<T>(&self, cid: &Cid) -> anyhow::Result<T>
    where
        Self: Sized,
        T: DeserializeOwned,
    {
        self.get_cbor(cid)?
            .with_context(|| format!("Entry not found in block store: cid={cid}"))
    }
}

impl<T: Blockstore> BlockstoreExt for T {}

/// Extension methods for [`CborStore`] that omits default multihash code from its APIs
pub trait CborStoreExt: Blockstore {
    /// Default multihash code is [`MultihashCode::Blake2b256`]
    fn default_code() -> MultihashCode {
        MultihashCode::Blake2b256
    }

    /// Put an object in the block store and return the Cid identifier.
    fn put_cbor_default<S: Serialize>(&self, obj: &S) -> anyhow::Result<Cid> {
        let bytes = fvm_ipld_encoding::to_vec(obj)?;
        let cid = Cid::new_v1(DAG_CBOR, Self::default_code().digest(&bytes));
        self.put_keyed(&cid, &bytes)?;
        Ok(cid)
    }
}

impl<T: Blockstore> CborStoreExt for T {}
