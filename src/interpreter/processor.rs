// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::vm::{BlockMessages, ExecutionContext, VM};
use crate::blocks::{Tipset, TipsetKey};
use crate::config::VmConfig;
use crate::db::{BlockstoreLayer, BufferedBlockstore};
use crate::message::ChainMessage;
use crate::shim::{
    clock::ChainEpoch,
    executor::{ApplyRet, Receipt},
};
use cid::Cid;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Stack reserved for a round. Nested sends recurse through the runtime.
const VM_STACK_SIZE: usize = 64 << 20;

/// Applies the messages of one tipset on top of its parent state.
pub trait Processor {
    /// Returns the new state root and one receipt per applied message, in
    /// block then message order. Nothing is written to the base store unless
    /// the whole tipset succeeds.
    fn apply_tipset_messages(
        &self,
        blocks: &[BlockMessages],
        parent: &Tipset,
        child: &TipsetKey,
        parent_epoch: ChainEpoch,
        epoch: ChainEpoch,
        ctx: ExecutionContext,
    ) -> anyhow::Result<(Cid, Vec<Receipt>)>;
}

/// [`Processor`] running the [`VM`] over a write buffer on top of `db`.
pub struct DefaultProcessor<DB> {
    db: Arc<DB>,
    vm_config: VmConfig,
}

impl<DB: BlockstoreLayer> DefaultProcessor<DB> {
    pub fn new(db: Arc<DB>, vm_config: VmConfig) -> Self {
        Self { db, vm_config }
    }

    pub fn db(&self) -> &Arc<DB> {
        &self.db
    }
}

impl<DB: BlockstoreLayer> Processor for DefaultProcessor<DB> {
    #[instrument(skip_all, fields(child = %child, epoch = epoch))]
    fn apply_tipset_messages(
        &self,
        blocks: &[BlockMessages],
        parent: &Tipset,
        child: &TipsetKey,
        parent_epoch: ChainEpoch,
        epoch: ChainEpoch,
        ctx: ExecutionContext,
    ) -> anyhow::Result<(Cid, Vec<Receipt>)> {
        anyhow::ensure!(
            epoch > parent_epoch,
            "tipset epoch {epoch} is not above its parent's epoch {parent_epoch}"
        );
        if epoch - parent_epoch > 1 {
            debug!(
                parent = %parent.key(),
                null_rounds = epoch - parent_epoch - 1,
                "applying messages over null rounds"
            );
        }

        let store = Arc::new(BufferedBlockstore::with_buffering(
            self.db.clone(),
            !self.vm_config.disable_buffering,
        ));
        let (state_root, receipts) = stacker::grow(VM_STACK_SIZE, || -> anyhow::Result<_> {
            let mut vm = VM::new(ctx, store.clone())?;
            let receipts = vm.apply_block_messages(
                blocks,
                None::<fn(&Cid, &ChainMessage, &ApplyRet) -> anyhow::Result<()>>,
            )?;
            Ok((vm.flush()?, receipts))
        })?;

        store.flush()?;
        debug!(%state_root, receipts = receipts.len(), "tipset applied");
        Ok((state_root, receipts))
    }
}
