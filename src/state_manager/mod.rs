// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

pub mod chain_rand;
mod errors;
pub use self::chain_rand::{ChainRand, blend_entropy, draw_randomness};
pub use self::errors::*;

use std::sync::Arc;

use crate::blocks::Tipset;
use crate::chain::{ChainReader, ChainStore, MessageStore, TipsetResult};
use crate::config::VmConfig;
use crate::db::BlockstoreLayer;
use crate::interpreter::{DefaultProcessor, DefaultSyscalls, ExecutionContext, Processor};
use crate::shim::executor::Receipt;
use cid::Cid;
use fvm_ipld_amt::Amtv0 as Amt;
use fvm_ipld_blockstore::Blockstore;
use tracing::{info, instrument, trace};

/// State and receipts produced by applying the messages of a tipset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateOutput {
    pub state_root: Cid,
    pub receipt_root: Cid,
    pub receipts: Vec<Receipt>,
}

impl From<&StateOutput> for TipsetResult {
    fn from(out: &StateOutput) -> Self {
        TipsetResult {
            state_root: out.state_root,
            receipt_root: out.receipt_root,
        }
    }
}

/// Drives state transitions: gathers a tipset's messages and chain context,
/// hands them to a [`Processor`] and records the outcome.
pub struct StateManager<DB, C = ChainStore<DB>, P = DefaultProcessor<DB>> {
    db: Arc<DB>,
    cs: Arc<C>,
    processor: P,
}

impl<DB> StateManager<DB>
where
    DB: BlockstoreLayer,
{
    pub fn new(cs: Arc<ChainStore<DB>>, vm_config: VmConfig) -> Self {
        let db = Arc::clone(&cs.db);
        Self {
            processor: DefaultProcessor::new(Arc::clone(&db), vm_config),
            db,
            cs,
        }
    }
}

impl<DB, C, P> StateManager<DB, C, P>
where
    DB: Blockstore,
    C: ChainReader + MessageStore + 'static,
    P: Processor,
{
    pub fn from_parts(db: Arc<DB>, cs: Arc<C>, processor: P) -> Self {
        Self { db, cs, processor }
    }

    /// Returns the chain the state manager reads from.
    pub fn chain_store(&self) -> &Arc<C> {
        &self.cs
    }

    pub fn blockstore(&self) -> &Arc<DB> {
        &self.db
    }

    pub fn processor(&self) -> &P {
        &self.processor
    }

    /// Applies the messages of `ts` on top of `parent_state_root`.
    ///
    /// The genesis tipset has nothing to apply and yields its parent state
    /// unchanged. Otherwise the processor either commits the whole round or
    /// nothing, and only a successful round is recorded with the chain.
    #[instrument(skip_all, fields(tipset = %ts.key(), epoch = ts.epoch()))]
    pub fn run_state_transition(
        &self,
        ts: &Tipset,
        parent_state_root: Cid,
    ) -> Result<StateOutput, Error> {
        if ts.epoch() == 0 {
            return Ok(StateOutput {
                state_root: parent_state_root,
                receipt_root: ts.min_ticket_block().message_receipts,
                receipts: vec![],
            });
        }

        let parent = self.cs.tipset(ts.parents())?;
        let blocks = self
            .cs
            .load_tipset_messages(ts)
            .map_err(|e| Error::MessageLoad(e.to_string()))?;

        info!(
            "Evaluating tipset: EPOCH = {}, blocks = {}",
            ts.epoch(),
            ts.len(),
        );
        let ctx = self.execution_context(ts, parent_state_root);
        let (state_root, receipts) = self
            .processor
            .apply_tipset_messages(
                &blocks,
                &parent,
                ts.key(),
                parent.epoch(),
                ts.epoch(),
                ctx,
            )
            .map_err(|e| Error::Validation(format!("{e:#}")))?;

        let receipt_root = Amt::new_from_iter(self.db.as_ref(), receipts.iter().cloned())
            .map_err(|e| Error::Other(format!("failed to store receipts: {e}")))?;
        let output = StateOutput {
            state_root,
            receipt_root,
            receipts,
        };
        // Only a run from the tipset's own parent state is its result.
        if parent_state_root == *ts.parent_state() {
            self.cs.put_tipset_result(ts.key(), TipsetResult::from(&output));
        }
        trace!("Completed tipset state calculation {:?}", ts.cids());
        Ok(output)
    }

    /// State and receipt roots of `ts`, executing it only when the chain has
    /// no result recorded for it yet.
    pub fn tipset_state(&self, ts: &Tipset) -> Result<TipsetResult, Error> {
        if let Some(result) = self.cs.tipset_result(ts.key()) {
            return Ok(result);
        }
        let output = self.run_state_transition(ts, *ts.parent_state())?;
        Ok(TipsetResult::from(&output))
    }

    /// Checks that executing the parent of `child` reproduces the state and
    /// receipt roots `child` commits to.
    pub fn validate_tipset_state(&self, child: &Tipset) -> Result<TipsetResult, Error> {
        let parent = self.cs.tipset(child.parents())?;
        let result = self.tipset_state(&parent)?;
        if result.state_root != *child.parent_state() {
            return Err(Error::StateRootMismatch {
                expected: *child.parent_state(),
                actual: result.state_root,
            });
        }
        let expected = child.min_ticket_block().message_receipts;
        if result.receipt_root != expected {
            return Err(Error::ReceiptRootMismatch {
                expected,
                actual: result.receipt_root,
            });
        }
        Ok(result)
    }

    fn execution_context(&self, ts: &Tipset, parent_state_root: Cid) -> ExecutionContext {
        ExecutionContext {
            state_tree_root: parent_state_root,
            epoch: ts.epoch(),
            rand: Box::new(ChainRand::new(ts.key().clone(), Arc::clone(&self.cs))),
            base_fee: ts.parent_base_fee().clone(),
            circ_supply: self.cs.circ_supply_calculator().clone(),
            chain_config: Arc::clone(self.cs.chain_config()),
            syscalls: Box::new(DefaultSyscalls),
        }
    }
}

impl<DB, C, P> StateManager<DB, C, P>
where
    DB: Blockstore + Send + Sync + 'static,
    C: ChainReader + MessageStore + Send + Sync + 'static,
    P: Processor + Send + Sync + 'static,
{
    /// Runs [`StateManager::run_state_transition`] on the blocking thread
    /// pool.
    pub async fn compute_tipset_state(
        self: &Arc<Self>,
        ts: Arc<Tipset>,
        parent_state_root: Cid,
    ) -> Result<StateOutput, Error> {
        let this = Arc::clone(self);
        tokio::task::spawn_blocking(move || this.run_state_transition(&ts, parent_state_root))
            .await
            .map_err(|e| Error::Other(e.to_string()))?
    }
}
