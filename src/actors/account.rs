// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::{ActorCode, check_empty_params, deserialize_params, invalid_method, serialize_return};
use crate::actor_error;
use crate::interpreter::{ActorError, Runtime, RuntimeExt as _};
use crate::shim::address::{Address, INIT_ACTOR_ADDR, SYSTEM_ACTOR_ADDR, is_key_address};
use crate::shim::message::{METHOD_CONSTRUCTOR, MethodNum};
use fvm_ipld_encoding::RawBytes;
use fvm_ipld_encoding::tuple::*;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive as _;

/// Account actor methods available
#[derive(FromPrimitive)]
#[repr(u64)]
pub enum Method {
    Constructor = METHOD_CONSTRUCTOR,
    PubkeyAddress = 2,
}

/// State includes the key address for the actor
#[derive(Debug, Clone, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
pub struct State {
    pub address: Address,
}

impl State {
    pub fn pubkey_address(&self) -> Address {
        self.address
    }
}

/// Account actor
pub struct Actor;

impl Actor {
    /// Constructor for Account actor
    pub fn constructor(rt: &mut dyn Runtime, address: Address) -> Result<(), ActorError> {
        rt.validate_immediate_caller_is(&[SYSTEM_ACTOR_ADDR, INIT_ACTOR_ADDR])?;
        if !is_key_address(&address) {
            return Err(actor_error!(USR_ILLEGAL_ARGUMENT;
                "address must use BLS or SECP protocol, got {}", address.protocol()));
        }
        rt.create(&State { address })
    }

    /// Fetches the pubkey-type address from this actor.
    pub fn pubkey_address(rt: &mut dyn Runtime) -> Result<Address, ActorError> {
        rt.validate_immediate_caller_accept_any()?;
        let st: State = rt.state()?;
        Ok(st.address)
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
            Some(Method::PubkeyAddress) => {
                check_empty_params(params)?;
                serialize_return(&Self::pubkey_address(rt)?)
            }
            None => Err(invalid_method(method)),
        }
    }
}
