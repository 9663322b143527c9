// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::{ActorCode, deserialize_params, invalid_method, is_builtin_actor, is_singleton_actor, serialize_return};
use crate::actor_error;
use crate::interpreter::{ActorError, ActorStore, Runtime, RuntimeExt as _, store_error};
use crate::shim::address::{Address, FIRST_NON_SINGLETON_ADDR, Protocol, SYSTEM_ACTOR_ADDR};
use crate::shim::error::USR_ILLEGAL_STATE;
use crate::shim::message::{METHOD_CONSTRUCTOR, MethodNum};
use crate::shim::state_tree::HAMT_BIT_WIDTH;
use cid::Cid;
use fvm_ipld_blockstore::Blockstore;
use fvm_ipld_encoding::RawBytes;
use fvm_ipld_encoding::tuple::*;
use fvm_ipld_hamt::Hamt;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive as _;

/// Init actor methods available
#[derive(FromPrimitive)]
#[repr(u64)]
pub enum Method {
    Constructor = METHOD_CONSTRUCTOR,
    Exec = 2,
}

/// Init actor state. Maps key and robust addresses to the ID addresses it
/// allocates.
#[derive(Serialize_tuple, Deserialize_tuple, Clone, Debug, PartialEq, Eq)]
pub struct State {
    pub address_map: Cid,
    pub next_id: u64,
    pub network_name: String,
}

impl State {
    pub fn new<BS: Blockstore>(store: &BS, network_name: String) -> anyhow::Result<Self> {
        let address_map = Hamt::<_, u64>::new_with_bit_width(store, HAMT_BIT_WIDTH).flush()?;
        Ok(Self {
            address_map,
            next_id: FIRST_NON_SINGLETON_ADDR,
            network_name,
        })
    }

    /// Allocates a new ID address and stores a mapping of the argument address to it.
    /// Fails if the argument address is already present in the map.
    pub fn map_address_to_new_id<BS: Blockstore>(
        &mut self,
        store: &BS,
        addr: &Address,
    ) -> anyhow::Result<Address> {
        let id = self.next_id;
        let mut map: Hamt<_, u64> =
            Hamt::load_with_bit_width(&self.address_map, store, HAMT_BIT_WIDTH)?;
        let is_new = map.set_if_absent(addr.to_bytes().into(), id)?;
        anyhow::ensure!(is_new, "address {addr} is already allocated in the address map");
        self.address_map = map.flush()?;
        self.next_id += 1;
        Ok(Address::new_id(id))
    }

    /// Resolves an address to an ID-address, if possible. ID addresses pass
    /// through unchanged; anything else is looked up in the address map.
    pub fn resolve_address<BS: Blockstore>(
        &self,
        store: &BS,
        addr: &Address,
    ) -> anyhow::Result<Option<Address>> {
        if addr.protocol() == Protocol::ID {
            return Ok(Some(*addr));
        }
        let map: Hamt<_, u64> = Hamt::load_with_bit_width(&self.address_map, store, HAMT_BIT_WIDTH)?;
        Ok(map.get(&addr.to_bytes())?.copied().map(Address::new_id))
    }
}

/// Init actor Constructor parameters
#[derive(Serialize_tuple, Deserialize_tuple, Clone, Debug)]
pub struct ConstructorParams {
    pub network_name: String,
}

/// Init actor Exec Params
#[derive(Serialize_tuple, Deserialize_tuple, Clone, Debug)]
pub struct ExecParams {
    pub code_cid: Cid,
    pub constructor_params: RawBytes,
}

/// Init actor Exec Return value
#[derive(Serialize_tuple, Deserialize_tuple, Clone, Debug, PartialEq, Eq)]
pub struct ExecReturn {
    /// ID based address for created actor
    pub id_address: Address,
    /// Reorg safe address for actor
    pub robust_address: Address,
}

/// Init actor
pub struct Actor;

impl Actor {
    /// Init actor constructor
    pub fn constructor(rt: &mut dyn Runtime, params: ConstructorParams) -> Result<(), ActorError> {
        rt.validate_immediate_caller_is(&[SYSTEM_ACTOR_ADDR])?;
        let state = State::new(&ActorStore(rt.store()), params.network_name)
            .map_err(|e| store_error(USR_ILLEGAL_STATE, "failed to construct state", e))?;
        rt.create(&state)
    }

    /// Exec init actor
    pub fn exec(rt: &mut dyn Runtime, params: ExecParams) -> Result<ExecReturn, ActorError> {
        rt.validate_immediate_caller_accept_any()?;
        if !can_exec(&params.code_cid) {
            return Err(actor_error!(USR_FORBIDDEN;
                "cannot exec actor type {}", params.code_cid));
        }

        // A robust address stays valid for the actor even if a re-org changes
        // the ID it ends up with.
        let robust_address = rt.new_actor_address()?;

        let id_address = rt.transaction(|st: &mut State, rt| {
            st.map_address_to_new_id(&ActorStore(rt.store()), &robust_address)
                .map_err(|e| store_error(USR_ILLEGAL_STATE, "failed to allocate ID address", e))
        })?;

        rt.create_actor(params.code_cid, &id_address)?;

        let value = rt.message().value_received().clone();
        rt.send_checked(id_address, METHOD_CONSTRUCTOR, params.constructor_params, value)?;

        Ok(ExecReturn {
            id_address,
            robust_address,
        })
    }
}

impl ActorCode for Actor {
    fn invoke_method(
        &self,
        rt: &mut dyn Runtime,
        method: MethodNum,
        params: &RawBytes,
    ) -> Result<RawBytes, ActorError> {
        match Method::from_u64(method) {
            Some(Method::Constructor) => {
                Self::constructor(rt, deserialize_params(params)?)?;
                Ok(RawBytes::default())
            }
            Some(Method::Exec) => serialize_return(&Self::exec(rt, deserialize_params(params)?)?),
            None => Err(invalid_method(method)),
        }
    }
}

fn can_exec(exec: &Cid) -> bool {
    is_builtin_actor(exec) && !is_singleton_actor(exec)
}
