// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::circ_supply::CirculatingSupplyCalculator;
use super::default_runtime::{CallContext, vm_send};
use super::gas_outputs::GasOutputs;
use super::gas_tracker::{PriceList, price_list_by_network_version};
use super::syscalls::Syscalls;
use super::ActorError;
use crate::actors::is_account_actor;
use crate::blocks::Tipset;
use crate::chain::{self, block_messages};
use crate::message::ChainMessage;
use crate::networks::ChainConfig;
use crate::shim::{
    address::{Address, BURNT_FUNDS_ACTOR_ADDR, REWARD_ACTOR_ADDR},
    clock::ChainEpoch,
    econ::{TokenAmount, token_mul},
    error::{ExitCode, OK, SYS_OUT_OF_GAS, SYS_SENDER_INVALID, SYS_SENDER_STATE_INVALID},
    executor::{ApplyRet, Receipt},
    externs::Rand,
    message::Message,
    state_tree::{ActorState, StateTree},
    version::NetworkVersion,
};
use crate::utils::cid::empty_object_cid;
use ahash::{HashMap, HashMapExt as _, HashSet};
use anyhow::Context as _;
use cid::Cid;
use fvm_ipld_blockstore::Blockstore;
use fvm_ipld_encoding::RawBytes;
use std::sync::Arc;
use tracing::debug;

/// Gas limit of messages the VM applies on its own behalf.
pub const IMPLICIT_MESSAGE_GAS_LIMIT: i64 = i64::MAX / 2;

/// Contains all messages to process through the VM as well as miner information
/// for block rewards.
#[derive(Debug, Clone)]
pub struct BlockMessages {
    pub miner: Address,
    pub messages: Vec<ChainMessage>,
    pub win_count: i64,
}

impl BlockMessages {
    /// Retrieves block messages to be passed through the VM and removes
    /// duplicate messages which appear in multiple blocks. Within a block BLS
    /// messages come before secp messages.
    pub fn for_tipset(db: &impl Blockstore, ts: &Tipset) -> Result<Vec<BlockMessages>, chain::Error> {
        let mut applied = HashMap::new();
        let mut select_msg = |m: ChainMessage| -> Option<ChainMessage> {
            // The first match for a sender is guaranteed to have correct nonce
            // the block isn't valid otherwise.
            let entry = applied
                .entry(m.message().from)
                .or_insert_with(|| m.message().sequence);

            if *entry != m.message().sequence {
                return None;
            }

            *entry += 1;
            Some(m)
        };

        ts.block_headers()
            .iter()
            .map(|b| {
                let (usm, sm) = block_messages(db, b)?;

                let mut messages = Vec::with_capacity(usm.len() + sm.len());
                messages.extend(
                    usm.into_iter()
                        .filter_map(|m| select_msg(ChainMessage::Unsigned(m))),
                );
                messages.extend(
                    sm.into_iter()
                        .filter_map(|m| select_msg(ChainMessage::Signed(m))),
                );

                Ok(BlockMessages {
                    miner: b.miner_address,
                    messages,
                    win_count: b
                        .election_proof
                        .as_ref()
                        .map(|e| e.win_count)
                        .unwrap_or_default(),
                })
            })
            .collect()
    }
}

/// Round-wide execution parameters, fixed before the first message runs.
#[derive(Debug, Clone, PartialEq)]
pub struct MachineContext {
    pub epoch: ChainEpoch,
    pub network_version: NetworkVersion,
    pub base_fee: TokenAmount,
    pub price_list: PriceList,
    pub empty_object_cid: Cid,
}

/// Everything the VM needs from the chain, assembled by the caller per round.
pub struct ExecutionContext {
    // State-tree generated by the parent tipset.
    pub state_tree_root: Cid,
    // Epoch of the messages to be executed.
    pub epoch: ChainEpoch,
    // Source of deterministic randomness
    pub rand: Box<dyn Rand>,
    // https://spec.filecoin.io/systems/filecoin_vm/gas_fee/
    pub base_fee: TokenAmount,
    // https://filecoin.io/blog/filecoin-circulating-supply/
    pub circ_supply: CirculatingSupplyCalculator,
    // The chain config is used to determine which consensus rules to use.
    pub chain_config: Arc<ChainConfig>,
    pub syscalls: Box<dyn Syscalls>,
}

/// Interpreter which handles execution of state transitioning messages and
/// returns receipts from the VM execution.
pub struct VM<DB> {
    state: StateTree<Arc<DB>>,
    machine: MachineContext,
    rand: Box<dyn Rand>,
    syscalls: Box<dyn Syscalls>,
    circ_supply: CirculatingSupplyCalculator,
}

impl<DB: Blockstore> VM<DB> {
    pub fn new(
        ExecutionContext {
            state_tree_root,
            epoch,
            rand,
            base_fee,
            circ_supply,
            chain_config,
            syscalls,
        }: ExecutionContext,
        store: Arc<DB>,
    ) -> anyhow::Result<Self> {
        let network_version = chain_config.network_version(epoch);
        let state = StateTree::new_from_root(store, &state_tree_root)
            .with_context(|| format!("failed to load parent state {state_tree_root}"))?;
        let machine = MachineContext {
            epoch,
            network_version,
            base_fee,
            price_list: price_list_by_network_version(network_version),
            empty_object_cid: empty_object_cid()?,
        };
        Ok(Self {
            state,
            machine,
            rand,
            syscalls,
            circ_supply,
        })
    }

    pub fn machine(&self) -> &MachineContext {
        &self.machine
    }

    pub fn state_tree(&self) -> &StateTree<Arc<DB>> {
        &self.state
    }

    /// Flush stores in VM and return state root.
    pub fn flush(&mut self) -> anyhow::Result<Cid> {
        self.state.flush()
    }

    /// Get actor state from an address. Will be resolved to ID address.
    pub fn get_actor(&self, addr: &Address) -> anyhow::Result<Option<ActorState>> {
        self.state.get_actor(addr)
    }

    /// Apply block messages from a Tipset.
    /// Returns the receipts from the transactions.
    pub fn apply_block_messages(
        &mut self,
        messages: &[BlockMessages],
        mut callback: Option<impl FnMut(&Cid, &ChainMessage, &ApplyRet) -> anyhow::Result<()>>,
    ) -> anyhow::Result<Vec<Receipt>> {
        let mut receipts = Vec::new();
        let mut processed = HashSet::<Cid>::default();

        for block in messages.iter() {
            let mut penalty = TokenAmount::default();
            let mut gas_reward = TokenAmount::default();

            for msg in block.messages.iter() {
                let cid = msg.cid()?;
                // Ensure no duplicate processing of a message
                if !processed.insert(cid) {
                    continue;
                }
                let ret = self.apply_message(msg)?;

                if let Some(cb) = &mut callback {
                    cb(&cid, msg, &ret)?;
                }

                gas_reward += ret.miner_tip();
                penalty += ret.penalty();
                receipts.push(ret.msg_receipt);
            }

            debug!(
                miner = %block.miner,
                win_count = block.win_count,
                %penalty,
                %gas_reward,
                "applied block messages"
            );
        }

        Ok(receipts)
    }

    /// Applies a message on behalf of the system: no sequence check and no
    /// gas payment.
    pub fn apply_implicit_message(&mut self, msg: &Message) -> anyhow::Result<ApplyRet> {
        let gas_limit = i64::try_from(msg.gas_limit).unwrap_or(IMPLICIT_MESSAGE_GAS_LIMIT);
        let (res, _) = self.send_message(msg, gas_limit, 0)?;
        let (exit_code, return_data, failure_info) = match res {
            Ok(ret) => (OK, ret, None),
            Err(e) => (
                e.exit_code().unwrap_or(SYS_OUT_OF_GAS),
                RawBytes::default(),
                Some(e.to_string()),
            ),
        };
        Ok(ApplyRet {
            msg_receipt: Receipt {
                exit_code,
                return_data,
                gas_used: 0,
            },
            failure_info,
            ..Default::default()
        })
    }

    /// Applies the state transition for a single message.
    /// Returns `ApplyRet` structure which contains the message receipt and some
    /// meta data.
    pub fn apply_message(&mut self, msg: &ChainMessage) -> anyhow::Result<ApplyRet> {
        // Basic validity check
        msg.message().check()?;

        let unsigned = msg.message();
        let pl = self.machine.price_list;
        let msg_gas_cost = pl.on_chain_message(msg.chain_length()?);
        let cost_total = msg_gas_cost.total();
        let gas_limit = i64::try_from(unsigned.gas_limit).unwrap_or(i64::MAX);

        if cost_total > gas_limit {
            return Ok(self.prevalidation_failure(
                SYS_OUT_OF_GAS,
                format!("out of gas: on-chain message size costs {cost_total}, limit {gas_limit}"),
                cost_total,
            ));
        }

        let from_act = match self.state.get_actor(&unsigned.from)? {
            Some(act) if is_account_actor(&act.code) => act,
            Some(_) => {
                return Ok(self.prevalidation_failure(
                    SYS_SENDER_INVALID,
                    "send from not account actor".to_owned(),
                    cost_total,
                ));
            }
            None => {
                return Ok(self.prevalidation_failure(
                    SYS_SENDER_INVALID,
                    "sender actor not found".to_owned(),
                    cost_total,
                ));
            }
        };

        if unsigned.sequence != from_act.sequence {
            return Ok(self.prevalidation_failure(
                SYS_SENDER_STATE_INVALID,
                format!(
                    "actor sequence invalid: {} != {}",
                    unsigned.sequence, from_act.sequence
                ),
                cost_total,
            ));
        }

        let required = unsigned.required_funds();
        if from_act.balance < required {
            return Ok(self.prevalidation_failure(
                SYS_SENDER_STATE_INVALID,
                format!(
                    "actor balance less than needed: {} < {}",
                    from_act.balance, required
                ),
                cost_total,
            ));
        }

        let gas_cost = token_mul(&unsigned.gas_fee_cap, gas_limit);
        self.state.mutate_actor(&unsigned.from, |act| {
            act.deduct_funds(&gas_cost)?;
            act.sequence += 1;
            Ok(())
        })?;

        let (res, gas_used) = self.send_message(unsigned, gas_limit, cost_total)?;

        let (exit_code, return_data, failure_info) = match res {
            Ok(ret) => (OK, ret, None),
            Err(ActorError::Abort { exit_code, msg }) => {
                debug!(%exit_code, "VM message execution failure: {msg}");
                (exit_code, RawBytes::default(), Some(msg))
            }
            Err(fatal) => anyhow::bail!(fatal),
        };

        let gas_used = gas_used.max(0);
        let outputs = GasOutputs::compute(
            gas_used,
            gas_limit,
            &self.machine.base_fee,
            &unsigned.gas_fee_cap,
            &unsigned.gas_premium,
        );
        self.transfer_from_gas_holder(&BURNT_FUNDS_ACTOR_ADDR, &outputs.base_fee_burn)?;
        self.transfer_from_gas_holder(&BURNT_FUNDS_ACTOR_ADDR, &outputs.over_estimation_burn)?;
        self.transfer_from_gas_holder(&unsigned.from, &outputs.refund)?;
        self.transfer_from_gas_holder(&REWARD_ACTOR_ADDR, &outputs.miner_tip)?;

        let paid = outputs.base_fee_burn.clone()
            + &outputs.over_estimation_burn
            + &outputs.refund
            + &outputs.miner_tip;
        anyhow::ensure!(
            paid == gas_cost,
            "gas handling math is wrong: paid {paid}, prepaid {gas_cost}"
        );

        Ok(ApplyRet {
            msg_receipt: Receipt {
                exit_code,
                return_data,
                gas_used: gas_used as u64,
            },
            penalty: outputs.miner_penalty,
            miner_tip: outputs.miner_tip,
            base_fee_burn: outputs.base_fee_burn,
            over_estimation_burn: outputs.over_estimation_burn,
            refund: outputs.refund,
            gas_refund: outputs.gas_refund,
            gas_burned: outputs.gas_burned,
            failure_info,
        })
    }

    /// Runs the message's send in a state snapshot that is dropped when the
    /// send aborts. Only fatal errors leave this function as `Err`.
    fn send_message(
        &mut self,
        msg: &Message,
        gas_limit: i64,
        gas_used: i64,
    ) -> anyhow::Result<(Result<RawBytes, ActorError>, i64)> {
        self.state.snapshot();
        let mut ctx = CallContext::new(
            &mut self.state,
            gas_limit,
            gas_used,
            &self.machine,
            self.rand.as_ref(),
            self.syscalls.as_ref(),
            &self.circ_supply,
            msg.from,
            msg.sequence,
        );
        let mut res = vm_send(
            &mut ctx,
            msg.from,
            msg.to,
            msg.method_num,
            &msg.value,
            &msg.params,
        );
        if let Ok(ret) = &res {
            let charge = self.machine.price_list.on_chain_return_value(ret.len());
            if let Err(e) = ctx.charge(charge) {
                res = Err(e);
            }
        }
        let gas_used = ctx.gas_used();
        drop(ctx);

        if let Err(ActorError::Fatal(reason)) = &res {
            tracing::error!("fatal error applying message: {reason}");
            anyhow::bail!(ActorError::Fatal(reason.clone()));
        }
        if res.is_err() {
            self.state.revert_to_snapshot()?;
        }
        self.state.clear_snapshot()?;
        Ok((res, gas_used))
    }

    fn prevalidation_failure(&self, exit_code: ExitCode, msg: String, cost: i64) -> ApplyRet {
        debug!(%exit_code, "message failed pre-validation: {msg}");
        ApplyRet {
            msg_receipt: Receipt {
                exit_code,
                return_data: RawBytes::default(),
                gas_used: 0,
            },
            penalty: token_mul(&self.machine.base_fee, cost),
            failure_info: Some(msg),
            ..Default::default()
        }
    }

    fn transfer_from_gas_holder(&mut self, addr: &Address, amt: &TokenAmount) -> anyhow::Result<()> {
        anyhow::ensure!(!amt.is_negative(), "attempted to transfer negative value from gas holder");
        if amt.is_zero() {
            return Ok(());
        }
        self.state
            .mutate_actor(addr, |act| {
                act.deposit_funds(amt);
                Ok(())
            })
            .with_context(|| format!("failed to deposit gas funds to {addr}"))
    }
}

#[cfg(test)]
mod tests;
