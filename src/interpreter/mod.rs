// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

mod circ_supply;
mod default_runtime;
mod errors;
mod gas_outputs;
mod gas_block_store;
pub mod gas_tracker;
mod processor;
mod runtime;
mod syscalls;
mod vm;

pub use self::circ_supply::{
    CirculatingSupply, CirculatingSupplyCalculator, FIL_RESERVED, VestingSchedule,
};
pub use self::default_runtime::DefaultRuntime;
pub use self::errors::ActorError;
pub use self::gas_block_store::GasBlockStore;
pub use self::gas_outputs::{GasOutputs, compute_gas_overestimation_burn};
pub use self::processor::{DefaultProcessor, Processor};
pub use self::runtime::{
    ActorStore, CallerPattern, MessageInfo, Runtime, RuntimeExt, SendOutcome, store_error,
};
pub use self::syscalls::{DefaultSyscalls, Syscalls};
pub use self::vm::*;

use crate::actor_error;
use crate::actors::account;
use crate::shim::{address::Address, state_tree::StateTree};
use crate::utils::db::BlockstoreExt as _;
use fvm_ipld_blockstore::Blockstore;

/// Returns the public key address (`BLS`/`SECP256K1`) of the account actor
/// identified by `addr`.
pub fn resolve_to_key_addr<S: Blockstore>(
    st: &StateTree<S>,
    addr: &Address,
) -> Result<Address, ActorError> {
    if crate::shim::address::is_key_address(addr) {
        return Ok(*addr);
    }

    let act = st
        .get_actor(addr)
        .map_err(|e| actor_error!(fatal("failed to load actor {}: {:#}", addr, e)))?
        .ok_or_else(|| actor_error!(SYS_ILLEGAL_ARGUMENT; "failed to find actor: {}", addr))?;
    if !crate::actors::is_account_actor(&act.code) {
        return Err(actor_error!(SYS_ILLEGAL_ARGUMENT;
            "address {} was not for an account actor", addr));
    }
    let acc_st: account::State = st
        .store()
        .get_cbor_required(&act.state)
        .map_err(|e| actor_error!(fatal("failed to load account state of {}: {:#}", addr, e)))?;

    Ok(acc_st.pubkey_address())
}
