// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::circ_supply::CirculatingSupplyCalculator;
use super::gas_block_store::GasBlockStore;
use super::gas_tracker::{GasCharge, GasTracker, PriceList};
use super::runtime::{CallerPattern, MessageInfo, Runtime, SendOutcome, forbidden_caller};
use super::syscalls::Syscalls;
use super::vm::MachineContext;
use super::{ActorError, resolve_to_key_addr};
use crate::actor_error;
use crate::actors::{self, ACCOUNT_ACTOR_CODE_ID, is_builtin_actor, is_singleton_actor};
use crate::shim::{
    address::{Address, SYSTEM_ACTOR_ADDR, is_key_address},
    clock::ChainEpoch,
    econ::TokenAmount,
    error::{ExitCode, OK, SYS_OUT_OF_GAS},
    externs::Rand,
    message::{METHOD_CONSTRUCTOR, METHOD_SEND, MethodNum},
    randomness::{DomainSeparationTag, Randomness},
    state_tree::{ActorState, StateTree},
    version::NetworkVersion,
};
use crate::utils::multihash::prelude::*;
use byteorder::{BigEndian, WriteBytesExt as _};
use cid::Cid;
use fvm_ipld_blockstore::Blockstore;
use fvm_ipld_encoding::{DAG_CBOR, RawBytes};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use tracing::{Level, warn};

/// State shared by every invocation made on behalf of one message.
pub(crate) struct CallContext<'a, DB> {
    pub state: &'a mut StateTree<Arc<DB>>,
    pub store: GasBlockStore<DB>,
    pub gas: Rc<RefCell<GasTracker>>,
    pub machine: &'a MachineContext,
    pub rand: &'a dyn Rand,
    pub syscalls: &'a dyn Syscalls,
    pub circ_supply: &'a CirculatingSupplyCalculator,
    /// Key or ID address of the account that signed the message.
    pub origin: Address,
    pub origin_nonce: u64,
    pub num_actors_created: u64,
}

impl<'a, DB: Blockstore> CallContext<'a, DB> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        state: &'a mut StateTree<Arc<DB>>,
        gas_limit: i64,
        gas_used: i64,
        machine: &'a MachineContext,
        rand: &'a dyn Rand,
        syscalls: &'a dyn Syscalls,
        circ_supply: &'a CirculatingSupplyCalculator,
        origin: Address,
        origin_nonce: u64,
    ) -> Self {
        let gas = Rc::new(RefCell::new(GasTracker::new(gas_limit, gas_used)));
        let store = GasBlockStore::new(machine.price_list, gas.clone(), state.store().clone());
        Self {
            state,
            store,
            gas,
            machine,
            rand,
            syscalls,
            circ_supply,
            origin,
            origin_nonce,
            num_actors_created: 0,
        }
    }

    pub fn charge(&self, charge: GasCharge) -> Result<(), ActorError> {
        self.gas.borrow_mut().charge_gas(charge)
    }

    pub fn gas_used(&self) -> i64 {
        self.gas.borrow().gas_used()
    }

    fn price_list(&self) -> PriceList {
        self.machine.price_list
    }

    fn get_actor(&self, addr: &Address) -> Result<Option<ActorState>, ActorError> {
        self.state
            .get_actor(addr)
            .map_err(|e| actor_error!(fatal("failed to get actor {}: {:#}", addr, e)))
    }

    fn lookup_id(&self, addr: &Address) -> Result<Option<Address>, ActorError> {
        self.state
            .lookup_id(addr)
            .map_err(|e| actor_error!(fatal("failed to resolve address {}: {:#}", addr, e)))
    }
}

/// Implementation of the Runtime trait for one actor invocation.
pub struct DefaultRuntime<'c, 'a, DB> {
    ctx: &'c mut CallContext<'a, DB>,
    msg: MessageInfo,
    method: MethodNum,
    caller_validated: bool,
    allow_side_effects: bool,
}

impl<'c, 'a, DB: Blockstore> DefaultRuntime<'c, 'a, DB> {
    pub(crate) fn new(ctx: &'c mut CallContext<'a, DB>, msg: MessageInfo, method: MethodNum) -> Self {
        Self {
            ctx,
            msg,
            method,
            caller_validated: false,
            allow_side_effects: true,
        }
    }

    pub fn method(&self) -> MethodNum {
        self.method
    }

    pub fn gas_used(&self) -> i64 {
        self.ctx.gas_used()
    }

    fn receiver_actor(&self, missing: ExitCode, what: &str) -> Result<ActorState, ActorError> {
        self.ctx.get_actor(&self.msg.receiver)?.ok_or_else(|| {
            ActorError::new(
                missing,
                format!("actor {} not found for {what}", self.msg.receiver),
            )
        })
    }
}

impl<DB: Blockstore> Runtime for DefaultRuntime<'_, '_, DB> {
    fn message(&self) -> &MessageInfo {
        &self.msg
    }

    fn curr_epoch(&self) -> ChainEpoch {
        self.ctx.machine.epoch
    }

    fn network_version(&self) -> NetworkVersion {
        self.ctx.machine.network_version
    }

    fn validate_immediate_caller(&mut self, pattern: &CallerPattern) -> Result<(), ActorError> {
        if self.caller_validated {
            return Err(actor_error!(SYS_ILLEGAL_ACTOR;
                "Method must validate caller identity exactly once"));
        }
        self.caller_validated = true;
        let caller = self.msg.caller;
        if pattern.is_match(&caller, || self.get_actor_code_cid(&caller))? {
            Ok(())
        } else {
            Err(forbidden_caller(&caller, pattern))
        }
    }

    fn current_balance(&self) -> Result<TokenAmount, ActorError> {
        Ok(self
            .ctx
            .get_actor(&self.msg.receiver)?
            .map(|act| act.balance)
            .unwrap_or_default())
    }

    fn resolve_address(&self, address: &Address) -> Result<Option<Address>, ActorError> {
        self.ctx.lookup_id(address)
    }

    fn get_actor_code_cid(&self, addr: &Address) -> Result<Option<Cid>, ActorError> {
        Ok(self.ctx.get_actor(addr)?.map(|act| act.code))
    }

    fn get_randomness_from_tickets(
        &self,
        personalization: DomainSeparationTag,
        rand_epoch: ChainEpoch,
        entropy: &[u8],
    ) -> Result<Randomness, ActorError> {
        self.ctx
            .rand
            .get_chain_randomness(personalization, rand_epoch, entropy)
            .map_err(|e| actor_error!(fatal("could not get randomness: {:#}", e)))
    }

    fn get_randomness_from_beacon(
        &self,
        personalization: DomainSeparationTag,
        rand_epoch: ChainEpoch,
        entropy: &[u8],
    ) -> Result<Randomness, ActorError> {
        self.ctx
            .rand
            .get_beacon_randomness(personalization, rand_epoch, entropy)
            .map_err(|e| actor_error!(fatal("could not get randomness: {:#}", e)))
    }

    fn readonly_head(&self) -> Result<Cid, ActorError> {
        Ok(self
            .receiver_actor(crate::shim::error::SYS_ILLEGAL_ARGUMENT, "readonly state")?
            .state)
    }

    fn begin_transaction(&mut self) -> Result<Cid, ActorError> {
        let act = self.receiver_actor(crate::shim::error::SYS_ILLEGAL_ACTOR, "transaction")?;
        if act.state == self.ctx.machine.empty_object_cid {
            return Err(actor_error!(SYS_ILLEGAL_ACTOR;
                "actor {} has no state to transact on", self.msg.receiver));
        }
        self.allow_side_effects = false;
        Ok(act.state)
    }

    fn end_transaction(&mut self) {
        self.allow_side_effects = true;
    }

    fn commit_head(&mut self, expected: &Cid, new: Cid) -> Result<(), ActorError> {
        let receiver = self.msg.receiver;
        let mut actor = self
            .ctx
            .get_actor(&receiver)?
            .ok_or_else(|| actor_error!(fatal("failed to get actor {} to commit state", receiver)))?;
        if &actor.state != expected {
            return Err(actor_error!(fatal(
                "failed to update {}, inconsistent base reference: expected {}, found {}",
                receiver,
                expected,
                actor.state
            )));
        }
        actor.state = new;
        self.ctx
            .state
            .set_actor(&receiver, actor)
            .map_err(|e| actor_error!(fatal("failed to set actor in commit_head: {:#}", e)))
    }

    fn empty_object_cid(&self) -> Cid {
        self.ctx.machine.empty_object_cid
    }

    fn store(&self) -> &dyn Blockstore {
        &self.ctx.store
    }

    fn store_get(&self, cid: &Cid) -> Result<Option<Vec<u8>>, ActorError> {
        self.ctx.store.get(cid).map_err(ActorError::from_anyhow)
    }

    fn store_put(&self, block: &[u8]) -> Result<Cid, ActorError> {
        let cid = Cid::new_v1(DAG_CBOR, MultihashCode::Blake2b256.digest(block));
        self.ctx
            .store
            .put_keyed(&cid, block)
            .map_err(ActorError::from_anyhow)?;
        Ok(cid)
    }

    fn send(
        &mut self,
        to: Address,
        method: MethodNum,
        params: RawBytes,
        value: TokenAmount,
    ) -> Result<SendOutcome, ActorError> {
        if !self.allow_side_effects {
            return Err(actor_error!(SYS_ILLEGAL_ACTOR; "runtime.send() is not allowed"));
        }
        let from = self.msg.receiver;
        match internal_send(self.ctx, from, to, method, &value, &params) {
            Ok(return_data) => Ok(SendOutcome {
                exit_code: OK,
                return_data,
            }),
            Err(ActorError::Abort { exit_code, msg }) => {
                warn!(%to, method, %exit_code, "internal send failed: {msg}");
                Ok(SendOutcome {
                    exit_code,
                    return_data: RawBytes::default(),
                })
            }
            Err(fatal) => Err(fatal),
        }
    }

    fn price_list(&self) -> PriceList {
        self.ctx.price_list()
    }

    fn charge_gas(
        &mut self,
        name: &'static str,
        compute: i64,
        virtual_compute: i64,
    ) -> Result<(), ActorError> {
        self.ctx
            .charge(GasCharge::new(name, compute, 0).with_virtual(virtual_compute, 0))
    }

    fn new_actor_address(&mut self) -> Result<Address, ActorError> {
        let oa = resolve_to_key_addr(&*self.ctx.state, &self.ctx.origin)?;
        let mut b = fvm_ipld_encoding::to_vec(&oa).map_err(|e| {
            actor_error!(USR_SERIALIZATION;
                "could not serialize address in new_actor_address: {}", e)
        })?;
        b.write_u64::<BigEndian>(self.ctx.origin_nonce)
            .map_err(|e| actor_error!(fatal("writing nonce address into a buffer: {}", e)))?;
        b.write_u64::<BigEndian>(self.ctx.num_actors_created)
            .map_err(|e| actor_error!(fatal("writing number of actors created into a buffer: {}", e)))?;
        let addr = Address::new_actor(&b);
        self.ctx.num_actors_created += 1;
        Ok(addr)
    }

    fn create_actor(&mut self, code_id: Cid, address: &Address) -> Result<(), ActorError> {
        if !is_builtin_actor(&code_id) || is_singleton_actor(&code_id) {
            return Err(actor_error!(SYS_ILLEGAL_ARGUMENT;
                "can only create non-singleton built-in actors, got {}", code_id));
        }
        if self.ctx.get_actor(address)?.is_some() {
            return Err(actor_error!(SYS_ILLEGAL_ARGUMENT;
                "actor address {} already exists", address));
        }
        self.ctx.charge(self.ctx.price_list().on_create_actor())?;
        let actor = ActorState::new(
            code_id,
            self.ctx.machine.empty_object_cid,
            TokenAmount::default(),
            0,
        );
        self.ctx
            .state
            .set_actor(address, actor)
            .map_err(|e| actor_error!(fatal("creating actor entry: {:#}", e)))
    }

    fn delete_actor(&mut self, beneficiary: &Address) -> Result<(), ActorError> {
        self.ctx.charge(self.ctx.price_list().on_delete_actor())?;
        let receiver = self.msg.receiver;
        let actor = self.receiver_actor(crate::shim::error::SYS_ILLEGAL_ACTOR, "delete actor")?;
        if !actor.balance.is_zero() {
            let beneficiary_id = self.ctx.lookup_id(beneficiary)?.ok_or_else(|| {
                actor_error!(SYS_ILLEGAL_ARGUMENT; "beneficiary {} does not exist", beneficiary)
            })?;
            if beneficiary_id == receiver {
                return Err(actor_error!(SYS_ILLEGAL_ARGUMENT;
                    "benefactor cannot be beneficiary"));
            }
            transfer(self.ctx.state, &receiver, &beneficiary_id, &actor.balance)?;
        }
        self.ctx
            .state
            .delete_actor(&receiver)
            .map_err(|e| actor_error!(fatal("failed to delete actor: {:#}", e)))
    }

    fn total_fil_circ_supply(&self) -> Result<TokenAmount, ActorError> {
        self.ctx
            .circ_supply
            .get_circulating_supply(self.ctx.machine.epoch, &*self.ctx.state)
            .map_err(|e| actor_error!(fatal("failed to compute circulating supply: {:#}", e)))
    }

    fn syscalls(&self) -> &dyn Syscalls {
        self.ctx.syscalls
    }

    fn log(&self, level: Level, msg: &str) {
        let receiver = self.msg.receiver;
        match level {
            Level::ERROR => tracing::error!(target: "actors", %receiver, "{msg}"),
            Level::WARN => tracing::warn!(target: "actors", %receiver, "{msg}"),
            Level::INFO => tracing::info!(target: "actors", %receiver, "{msg}"),
            Level::DEBUG => tracing::debug!(target: "actors", %receiver, "{msg}"),
            Level::TRACE => tracing::trace!(target: "actors", %receiver, "{msg}"),
        }
    }
}

/// Runs a nested send in its own state snapshot: aborts revert everything
/// the callee did, success folds it into the caller's layer.
pub(crate) fn internal_send<DB: Blockstore>(
    ctx: &mut CallContext<'_, DB>,
    from: Address,
    to: Address,
    method: MethodNum,
    value: &TokenAmount,
    params: &RawBytes,
) -> Result<RawBytes, ActorError> {
    ctx.state.snapshot();
    let res = vm_send(ctx, from, to, method, value, params);
    if matches!(res, Err(ActorError::Abort { .. })) {
        ctx.state
            .revert_to_snapshot()
            .map_err(|e| actor_error!(fatal("failed to revert snapshot: {:#}", e)))?;
    }
    ctx.state
        .clear_snapshot()
        .map_err(|e| actor_error!(fatal("failed to clear snapshot: {:#}", e)))?;
    res
}

/// Shared logic between the runtime and the VM: charges the invocation,
/// creates the receiving account if needed, moves the value and invokes the
/// receiver's code.
pub(crate) fn vm_send<DB: Blockstore>(
    ctx: &mut CallContext<'_, DB>,
    from: Address,
    to: Address,
    method: MethodNum,
    value: &TokenAmount,
    params: &RawBytes,
) -> Result<RawBytes, ActorError> {
    ctx.charge(ctx.price_list().on_method_invocation(value, method))?;

    let to_actor = match ctx.get_actor(&to)? {
        Some(act) => act,
        None => try_create_account_actor(ctx, &to)?,
    };
    let from_id = ctx
        .lookup_id(&from)?
        .ok_or_else(|| actor_error!(fatal("failed to lookup from id for address {}", from)))?;
    let to_id = ctx
        .lookup_id(&to)?
        .ok_or_else(|| actor_error!(fatal("failed to lookup to id for address {}", to)))?;

    if !value.is_zero() {
        transfer(ctx.state, &from_id, &to_id, value)?;
    }

    if method == METHOD_SEND {
        return Ok(RawBytes::default());
    }

    let msg = MessageInfo {
        caller: from_id,
        receiver: to_id,
        value_received: value.clone(),
    };
    let mut rt = DefaultRuntime::new(ctx, msg, method);
    let res = actors::invoke(&to_actor.code, &mut rt, method, params);
    let caller_validated = rt.caller_validated;
    match res {
        Ok(_) if !caller_validated => Err(actor_error!(SYS_ILLEGAL_ACTOR;
            "method {} of actor {} did not validate its caller", method, to_id)),
        Err(ActorError::Abort { exit_code, msg })
            if exit_code != SYS_OUT_OF_GAS && ctx.gas.borrow().is_exhausted() =>
        {
            Err(ActorError::new(
                SYS_OUT_OF_GAS,
                format!("out of gas (reported as {exit_code}): {msg}"),
            ))
        }
        other => other,
    }
}

/// Transfers funds from one Actor to another Actor
fn transfer<S: Blockstore>(
    state: &mut StateTree<S>,
    from: &Address,
    to: &Address,
    value: &TokenAmount,
) -> Result<(), ActorError> {
    if from == to {
        return Ok(());
    }
    if value.is_negative() {
        return Err(actor_error!(SYS_FORBIDDEN;
            "attempted to transfer negative transfer value {}", value));
    }

    let mut f = state
        .get_actor(from)
        .map_err(|e| actor_error!(fatal("{:#}", e)))?
        .ok_or_else(|| actor_error!(fatal("sender actor does not exist in state during transfer")))?;
    let mut t = state
        .get_actor(to)
        .map_err(|e| actor_error!(fatal("{:#}", e)))?
        .ok_or_else(|| actor_error!(fatal("receiver actor does not exist in state during transfer")))?;

    f.deduct_funds(value).map_err(|e| {
        actor_error!(SYS_INSUFFICIENT_FUNDS;
            "transfer failed when deducting funds ({}): {}", value, e)
    })?;
    t.deposit_funds(value);

    state
        .set_actor(from, f)
        .map_err(|e| actor_error!(fatal("{:#}", e)))?;
    state
        .set_actor(to, t)
        .map_err(|e| actor_error!(fatal("{:#}", e)))?;
    Ok(())
}

/// Creates account actors from only BLS/SECP256K1 addresses.
fn try_create_account_actor<DB: Blockstore>(
    ctx: &mut CallContext<'_, DB>,
    addr: &Address,
) -> Result<ActorState, ActorError> {
    if !is_key_address(addr) {
        return Err(actor_error!(SYS_INVALID_RECEIVER; "no actor with address {}", addr));
    }
    ctx.charge(ctx.price_list().on_create_actor())?;

    let addr_id = ctx
        .state
        .register_new_address(addr)
        .map_err(|e| actor_error!(fatal("failed to register address {}: {:#}", addr, e)))?;
    let act = ActorState::new(
        *ACCOUNT_ACTOR_CODE_ID,
        ctx.machine.empty_object_cid,
        TokenAmount::default(),
        0,
    );
    ctx.state
        .set_actor(&addr_id, act)
        .map_err(|e| actor_error!(fatal("{:#}", e)))?;

    let params = RawBytes::serialize(addr)
        .map_err(|e| actor_error!(fatal("couldn't serialize params for actor construction: {}", e)))?;
    vm_send(
        ctx,
        SYSTEM_ACTOR_ADDR,
        addr_id,
        METHOD_CONSTRUCTOR,
        &TokenAmount::default(),
        &params,
    )?;

    ctx.get_actor(&addr_id)?
        .ok_or_else(|| actor_error!(fatal("failed to retrieve created actor state")))
}

#[cfg(test)]
mod tests;
