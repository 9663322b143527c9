// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::subtests;
use crate::db::{
    BlockstoreLayer, BlockstoreView, BufferedBlockstore, DISABLE_VM_BUF_ENV, DISABLE_VM_BUF_VALUE,
    MemoryDB,
};
use crate::utils::db::CborStoreExt as _;
use crate::utils::multihash::prelude::*;
use cid::Cid;
use futures::StreamExt as _;
use fvm_ipld_blockstore::Blockstore;
use serial_test::serial;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// A layer without the zero-copy view capability.
#[derive(Default)]
struct PlainDB(MemoryDB);

impl Blockstore for PlainDB {
    fn get(&self, k: &Cid) -> anyhow::Result<Option<Vec<u8>>> {
        self.0.get(k)
    }

    fn put_keyed(&self, k: &Cid, block: &[u8]) -> anyhow::Result<()> {
        self.0.put_keyed(k, block)
    }
}

impl BlockstoreLayer for PlainDB {
    fn delete_block(&self, k: &Cid) -> anyhow::Result<()> {
        self.0.delete_block(k)
    }

    fn get_size(&self, k: &Cid) -> anyhow::Result<Option<usize>> {
        self.0.get_size(k)
    }

    fn for_each_block(
        &self,
        f: &mut dyn FnMut(&Cid, &[u8]) -> anyhow::Result<()>,
    ) -> anyhow::Result<()> {
        self.0.for_each_block(f)
    }
}

fn buffered() -> BufferedBlockstore<MemoryDB> {
    BufferedBlockstore::with_buffering(Arc::new(MemoryDB::default()), true)
}

#[test]
#[serial]
fn buffered_db_behaves_like_a_store() {
    subtests::write_read(&buffered());
    subtests::get_size(&buffered());
    subtests::delete(&buffered());
    subtests::does_not_exist(&buffered());
}

#[test]
#[serial]
fn writes_stay_in_overlay_until_flush() {
    let bs = buffered();
    let cid = bs.put_cbor_default(&"pending").unwrap();

    assert!(bs.has(&cid).unwrap());
    assert!(bs.write().has(&cid).unwrap());
    assert!(!bs.read().has(&cid).unwrap());

    bs.flush().unwrap();
    assert!(bs.read().has(&cid).unwrap());
}

#[test]
#[serial]
fn dropped_overlay_leaves_base_untouched() {
    let base = Arc::new(MemoryDB::default());
    {
        let bs = BufferedBlockstore::with_buffering(base.clone(), true);
        bs.put_cbor_default(&"discarded").unwrap();
    }
    assert!(base.is_empty());
}

#[test]
#[serial]
fn put_skips_blocks_already_in_base() {
    let base = Arc::new(MemoryDB::default());
    let cid = base.put_cbor_default(&7u64).unwrap();
    let bs = BufferedBlockstore::with_buffering(base, true);

    bs.put_keyed(&cid, &bs.get(&cid).unwrap().unwrap()).unwrap();
    bs.put_many_keyed([(cid, vec![0x07])]).unwrap();
    assert!(!bs.write().has(&cid).unwrap());
}

#[test]
#[serial]
fn get_falls_through_to_base() {
    let base = Arc::new(MemoryDB::default());
    let cid = base.put_cbor_default(&"from base").unwrap();
    let bs = BufferedBlockstore::with_buffering(base, true);
    assert_eq!(
        bs.get(&cid).unwrap(),
        Some(fvm_ipld_encoding::to_vec(&"from base").unwrap())
    );
}

#[test]
#[serial]
fn get_size_prefers_base_then_overlay() {
    let bs = buffered();
    let in_overlay = bs.put_cbor_default(&vec![9u8; 10]).unwrap();
    let len = bs.get(&in_overlay).unwrap().unwrap().len();
    assert_eq!(bs.get_size(&in_overlay).unwrap(), Some(len));

    // a zero sized base entry does not hide the overlay
    let empty = Cid::new_v1(0x55, MultihashCode::Identity.digest(b"zero"));
    bs.read().put_keyed(&empty, &[]).unwrap();
    bs.write().put_keyed(&empty, &[1, 2, 3]).unwrap();
    assert_eq!(bs.get_size(&empty).unwrap(), Some(3));
}

#[test]
#[serial]
fn delete_hits_both_layers() {
    let base = Arc::new(MemoryDB::default());
    let cid = base.put_cbor_default(&1u64).unwrap();
    let bs = BufferedBlockstore::with_buffering(base, true);
    bs.write().put_keyed(&cid, &[1]).unwrap();

    bs.delete_block(&cid).unwrap();
    assert!(!bs.read().has(&cid).unwrap());
    assert!(!bs.write().has(&cid).unwrap());
}

#[test]
#[serial]
fn view_reads_overlay_then_base() {
    let base = Arc::new(MemoryDB::default());
    let in_base = base.put_cbor_default(&"base").unwrap();
    let bs = BufferedBlockstore::with_buffering(base, true);
    let in_overlay = bs.put_cbor_default(&"overlay").unwrap();

    for (cid, expected) in [(in_base, "base"), (in_overlay, "overlay")] {
        let mut seen = Vec::new();
        let found = bs
            .view(&cid, &mut |data| {
                seen.extend_from_slice(data);
                Ok(())
            })
            .unwrap();
        assert!(found);
        assert_eq!(seen, fvm_ipld_encoding::to_vec(&expected).unwrap());
    }
}

#[test]
#[serial]
fn view_falls_back_to_get_without_view_capability() {
    let read = Arc::new(PlainDB::default());
    let write = Arc::new(MemoryDB::default());
    let bs = BufferedBlockstore::new_tiered(read.clone(), write);
    let cid = read.put_cbor_default(&"plain").unwrap();

    let mut calls = 0;
    assert!(
        bs.view(&cid, &mut |_| {
            calls += 1;
            Ok(())
        })
        .unwrap()
    );
    assert_eq!(calls, 1);
}

#[test]
#[serial]
fn view_propagates_callback_errors() {
    let bs = buffered();
    let cid = bs.put_cbor_default(&"boom").unwrap();
    assert!(bs.view(&cid, &mut |_| anyhow::bail!("boom")).is_err());
}

#[tokio::test]
#[serial]
async fn all_keys_merges_both_layers() {
    let base = Arc::new(MemoryDB::default());
    let mut expected = vec![base.put_cbor_default(&"a").unwrap()];
    let bs = BufferedBlockstore::with_buffering(base, true);
    expected.push(bs.put_cbor_default(&"b").unwrap());
    expected.push(bs.put_cbor_default(&"c").unwrap());

    let mut got = bs
        .all_keys(CancellationToken::new())
        .unwrap()
        .collect::<Vec<_>>()
        .await;
    got.sort();
    expected.sort();
    assert_eq!(got, expected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn all_keys_yields_nothing_after_cancel() {
    for _ in 0..300 {
        let base = Arc::new(MemoryDB::default());
        for i in 0..20u64 {
            base.put_cbor_default(&i).unwrap();
        }
        let bs = BufferedBlockstore::with_buffering(base, true);
        for i in 20..40u64 {
            bs.put_cbor_default(&i).unwrap();
        }
        let token = CancellationToken::new();
        let mut keys = bs.all_keys(token.clone()).unwrap();
        assert!(keys.next().await.is_some());
        token.cancel();
        let rest = keys.collect::<Vec<_>>().await;
        assert!(rest.is_empty(), "{} keys after cancel", rest.len());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn enumeration_cancelled_up_front_is_empty() {
    let db = MemoryDB::default();
    for i in 0..10u64 {
        db.put_cbor_default(&i).unwrap();
    }
    let token = CancellationToken::new();
    token.cancel();
    let keys = db.all_keys(token).unwrap();
    assert!(keys.collect::<Vec<_>>().await.is_empty());
}

#[test]
#[serial]
fn escape_hatch_writes_straight_to_base() {
    // SAFETY: tests touching the environment are serialized.
    unsafe { std::env::set_var(DISABLE_VM_BUF_ENV, DISABLE_VM_BUF_VALUE) };
    let base = Arc::new(MemoryDB::default());
    let bs = BufferedBlockstore::new(base.clone());
    unsafe { std::env::remove_var(DISABLE_VM_BUF_ENV) };

    assert!(!bs.is_buffered());
    let cid = bs.put_cbor_default(&"durable").unwrap();
    assert!(base.has(&cid).unwrap());
    bs.flush().unwrap();
    assert_eq!(base.len(), 1);
}

#[test]
#[serial]
fn buffering_flag_disables_overlay() {
    let base = Arc::new(MemoryDB::default());
    let bs = BufferedBlockstore::with_buffering(base.clone(), false);
    bs.put_cbor_default(&"direct").unwrap();
    assert_eq!(base.len(), 1);
}
