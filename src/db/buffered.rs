// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::{BlockstoreLayer, BlockstoreView, KeyStream, MemoryDB, until_cancelled};
use cid::Cid;
use futures::StreamExt as _;
use fvm_ipld_blockstore::Blockstore;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Environment variable that turns write buffering off when set to
/// [`DISABLE_VM_BUF_VALUE`].
pub const DISABLE_VM_BUF_ENV: &str = "FOREST_DISABLE_VM_BUF";
pub const DISABLE_VM_BUF_VALUE: &str = "iknowitsabadidea";

/// Two-layer block store: reads go to the write overlay first and fall
/// through to the read (base) layer, writes land in the overlay unless the
/// base already holds the block. Nothing reaches the base until
/// [`BufferedBlockstore::flush`].
///
/// With buffering disabled the overlay is the base itself and every write is
/// immediately durable.
pub struct BufferedBlockstore<R, W = MemoryDB> {
    read: Arc<R>,
    // `None` when buffering is disabled; writes then go straight to `read`.
    write: Option<Arc<W>>,
    viewable: bool,
}

impl<R: BlockstoreLayer> BufferedBlockstore<R, MemoryDB> {
    /// Buffers writes over `base` in a fresh in-memory overlay, unless the
    /// escape hatch environment variable is set.
    pub fn new(base: Arc<R>) -> Self {
        Self::with_buffering(base, !buffering_disabled_by_env())
    }

    /// Like [`BufferedBlockstore::new`] with buffering chosen by the caller
    /// (the environment variable still wins when set).
    pub fn with_buffering(base: Arc<R>, enabled: bool) -> Self {
        if !enabled || buffering_disabled_by_env() {
            warn!("VM BLOCKSTORE BUFFERING IS DISABLED");
            return Self::from_layers(base, None);
        }
        Self::from_layers(base, Some(Arc::new(MemoryDB::default())))
    }
}

impl<R: BlockstoreLayer, W: BlockstoreLayer> BufferedBlockstore<R, W> {
    /// Layers an explicit write store over an explicit read store.
    pub fn new_tiered(read: Arc<R>, write: Arc<W>) -> Self {
        Self::from_layers(read, Some(write))
    }

    fn from_layers(read: Arc<R>, write: Option<Arc<W>>) -> Self {
        let read_viewable = read.as_view().is_some();
        let write_viewable = match &write {
            Some(write) => write.as_view().is_some(),
            None => read_viewable,
        };
        if read_viewable != write_viewable {
            warn!("one of the stores is not viewable; running less efficiently");
        }
        Self {
            read,
            write,
            viewable: read_viewable && write_viewable,
        }
    }

    /// The base layer.
    pub fn read(&self) -> &Arc<R> {
        &self.read
    }

    /// The overlay. Same as the base when buffering is disabled.
    pub fn write(&self) -> &dyn BlockstoreLayer {
        match &self.write {
            Some(write) => write.as_ref(),
            None => self.read.as_ref(),
        }
    }

    pub fn is_buffered(&self) -> bool {
        self.write.is_some()
    }

    /// Copies every overlay block into the base layer.
    pub fn flush(&self) -> anyhow::Result<()> {
        let Some(write) = &self.write else {
            return Ok(());
        };
        let mut flushed = 0usize;
        write.for_each_block(&mut |k, data| {
            flushed += 1;
            self.read.put_keyed(k, data)
        })?;
        debug!(flushed, "flushed buffered blocks to base store");
        Ok(())
    }
}

fn buffering_disabled_by_env() -> bool {
    std::env::var(DISABLE_VM_BUF_ENV).is_ok_and(|v| v == DISABLE_VM_BUF_VALUE)
}

impl<R: BlockstoreLayer, W: BlockstoreLayer> Blockstore for BufferedBlockstore<R, W> {
    fn get(&self, k: &Cid) -> anyhow::Result<Option<Vec<u8>>> {
        match self.write().get(k)? {
            Some(data) => Ok(Some(data)),
            None => self.read.get(k),
        }
    }

    fn put_keyed(&self, k: &Cid, block: &[u8]) -> anyhow::Result<()> {
        if self.read.has(k)? {
            return Ok(());
        }
        self.write().put_keyed(k, block)
    }

    fn has(&self, k: &Cid) -> anyhow::Result<bool> {
        Ok(self.write().has(k)? || self.read.has(k)?)
    }

    fn put_many_keyed<D, I>(&self, blocks: I) -> anyhow::Result<()>
    where
        Self: Sized,
        D: AsRef<[u8]>,
        I: IntoIterator<Item = (Cid, D)>,
    {
        for (k, block) in blocks {
            self.put_keyed(&k, block.as_ref())?;
        }
        Ok(())
    }
}

impl<R: BlockstoreLayer, W: BlockstoreLayer> BlockstoreView for BufferedBlockstore<R, W> {
    fn view(
        &self,
        k: &Cid,
        f: &mut dyn FnMut(&[u8]) -> anyhow::Result<()>,
    ) -> anyhow::Result<bool> {
        if !self.viewable {
            return match self.get(k)? {
                Some(data) => f(&data).map(|()| true),
                None => Ok(false),
            };
        }
        let (Some(write), Some(read)) = (self.write().as_view(), self.read.as_view()) else {
            anyhow::bail!("block store lost its view capability");
        };
        if write.view(k, f)? {
            return Ok(true);
        }
        read.view(k, f)
    }
}

impl<R: BlockstoreLayer, W: BlockstoreLayer> BlockstoreLayer for BufferedBlockstore<R, W> {
    fn delete_block(&self, k: &Cid) -> anyhow::Result<()> {
        self.read.delete_block(k)?;
        if let Some(write) = &self.write {
            write.delete_block(k)?;
        }
        Ok(())
    }

    fn get_size(&self, k: &Cid) -> anyhow::Result<Option<usize>> {
        match self.read.get_size(k)? {
            None | Some(0) => self.write().get_size(k),
            size => Ok(size),
        }
    }

    fn for_each_block(
        &self,
        f: &mut dyn FnMut(&Cid, &[u8]) -> anyhow::Result<()>,
    ) -> anyhow::Result<()> {
        self.read.for_each_block(f)?;
        if let Some(write) = &self.write {
            write.for_each_block(f)?;
        }
        Ok(())
    }

    fn as_view(&self) -> Option<&dyn BlockstoreView> {
        Some(self)
    }

    /// Keys of both layers, interleaved in arrival order. A key present in
    /// both layers is reported twice.
    fn all_keys(&self, cancel: CancellationToken) -> anyhow::Result<KeyStream> {
        let mut read_keys = self.read.all_keys(cancel.clone())?;
        let mut write_keys = match &self.write {
            Some(write) => Some(write.all_keys(cancel.clone())?),
            None => None,
        };
        let (tx, rx) = flume::bounded(0);
        let merge_cancel = cancel.clone();
        tokio::spawn(async move {
            let mut read_done = false;
            loop {
                let write_done = write_keys.is_none();
                if read_done && write_done {
                    break;
                }
                let key = tokio::select! {
                    biased;
                    _ = merge_cancel.cancelled() => return,
                    key = read_keys.next(), if !read_done => match key {
                        Some(key) => key,
                        None => {
                            read_done = true;
                            continue;
                        }
                    },
                    key = next_key(&mut write_keys), if !write_done => match key {
                        Some(key) => key,
                        None => {
                            write_keys = None;
                            continue;
                        }
                    },
                };
                if merge_cancel.is_cancelled() {
                    return;
                }
                tokio::select! {
                    biased;
                    _ = merge_cancel.cancelled() => return,
                    sent = tx.send_async(key) => {
                        if sent.is_err() {
                            return;
                        }
                    }
                }
            }
        });
        Ok(until_cancelled(rx, cancel))
    }
}

async fn next_key(keys: &mut Option<KeyStream>) -> Option<Cid> {
    match keys {
        Some(keys) => keys.next().await,
        None => None,
    }
}
