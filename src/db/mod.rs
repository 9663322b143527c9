// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

mod buffered;
mod memory;

pub use buffered::{BufferedBlockstore, DISABLE_VM_BUF_ENV, DISABLE_VM_BUF_VALUE};
pub use memory::MemoryDB;

use cid::Cid;
use futures::StreamExt as _;
use futures::stream::BoxStream;
use fvm_ipld_blockstore::Blockstore;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Keys produced by [`BlockstoreLayer::all_keys`]. The stream ends as soon
/// as its cancellation token fires, even when a producer still holds a key.
pub type KeyStream = BoxStream<'static, Cid>;

/// Zero-copy read access. Implementors lend the stored bytes to a callback
/// instead of returning an owned copy.
pub trait BlockstoreView {
    /// Calls `f` with the bytes stored under `k`. Returns `Ok(false)` without
    /// calling `f` when the block is absent.
    fn view(
        &self,
        k: &Cid,
        f: &mut dyn FnMut(&[u8]) -> anyhow::Result<()>,
    ) -> anyhow::Result<bool>;
}

/// The block store surface a [`BufferedBlockstore`] layers on top of.
pub trait BlockstoreLayer: Blockstore + Send + Sync + 'static {
    /// Removes the block. Deleting an absent block is not an error.
    fn delete_block(&self, k: &Cid) -> anyhow::Result<()>;

    /// Size in bytes of the stored block, `None` when absent.
    fn get_size(&self, k: &Cid) -> anyhow::Result<Option<usize>>;

    /// Visits every stored block. Iteration order is unspecified.
    fn for_each_block(
        &self,
        f: &mut dyn FnMut(&Cid, &[u8]) -> anyhow::Result<()>,
    ) -> anyhow::Result<()>;

    /// Returns the zero-copy view capability when the layer has one.
    fn as_view(&self) -> Option<&dyn BlockstoreView> {
        None
    }

    /// Streams every key. The producer stops and the stream ends once
    /// `cancel` fires. Must be called within a tokio runtime.
    fn all_keys(&self, cancel: CancellationToken) -> anyhow::Result<KeyStream> {
        let mut keys = Vec::new();
        self.for_each_block(&mut |k, _| {
            keys.push(*k);
            Ok(())
        })?;
        Ok(spawn_key_producer(keys, cancel))
    }
}

impl<T: BlockstoreLayer> BlockstoreLayer for Arc<T>
where
    Arc<T>: Blockstore,
{
    fn delete_block(&self, k: &Cid) -> anyhow::Result<()> {
        self.as_ref().delete_block(k)
    }

    fn get_size(&self, k: &Cid) -> anyhow::Result<Option<usize>> {
        self.as_ref().get_size(k)
    }

    fn for_each_block(
        &self,
        f: &mut dyn FnMut(&Cid, &[u8]) -> anyhow::Result<()>,
    ) -> anyhow::Result<()> {
        self.as_ref().for_each_block(f)
    }

    fn as_view(&self) -> Option<&dyn BlockstoreView> {
        self.as_ref().as_view()
    }

    fn all_keys(&self, cancel: CancellationToken) -> anyhow::Result<KeyStream> {
        self.as_ref().all_keys(cancel)
    }
}

/// Sends `keys` one by one over a rendezvous channel from a background task.
pub(crate) fn spawn_key_producer(keys: Vec<Cid>, cancel: CancellationToken) -> KeyStream {
    let (tx, rx) = flume::bounded(0);
    let producer_cancel = cancel.clone();
    tokio::spawn(async move {
        for key in keys {
            if producer_cancel.is_cancelled() {
                break;
            }
            tokio::select! {
                biased;
                _ = producer_cancel.cancelled() => break,
                sent = tx.send_async(key) => {
                    if sent.is_err() {
                        // receiver dropped
                        return;
                    }
                }
            }
        }
        if producer_cancel.is_cancelled() {
            debug!("key enumeration cancelled");
        }
    });
    until_cancelled(rx, cancel)
}

/// Wraps the receiving end so nothing is yielded after `cancel` fires. A
/// rendezvous receiver can still take a key a blocked sender has parked in
/// the channel, so the producer side alone cannot guarantee this.
pub(crate) fn until_cancelled(rx: flume::Receiver<Cid>, cancel: CancellationToken) -> KeyStream {
    rx.into_stream()
        .take_until(cancel.cancelled_owned())
        .boxed()
}

#[cfg(test)]
mod tests;
