// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::utils::multihash::prelude::*;
use cid::Cid;
use fvm_ipld_encoding::DAG_CBOR;

/// Extension methods for constructing `dag-cbor` [Cid]
pub trait CidCborExt {
    /// Default CID builder for Filecoin
    ///
    /// - The default codec is [`fvm_ipld_encoding::DAG_CBOR`]
    /// - The default hash function is 256 bit BLAKE2b
    fn from_cbor_blake2b256<S: serde::ser::Serialize>(obj: &S) -> anyhow::Result<Cid> {
        let bytes = fvm_ipld_encoding::to_vec(obj)?;
        Ok(Cid::new_v1(DAG_CBOR, MultihashCode::Blake2b256.digest(&bytes)))
    }
}

impl CidCborExt for Cid {}

/// Cid of the CBOR encoding of an empty list, the head every actor starts
/// with before it stores its own state object.
pub fn empty_object_cid() -> anyhow::Result<Cid> {
    Cid::from_cbor_blake2b256(&Vec::<()>::new())
}
