// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::{ActorCode, check_empty_params, invalid_method};
use crate::interpreter::{ActorError, Runtime, RuntimeExt as _};
use crate::shim::address::SYSTEM_ACTOR_ADDR;
use crate::shim::message::{METHOD_CONSTRUCTOR, MethodNum};
use fvm_ipld_encoding::RawBytes;
use fvm_ipld_encoding::tuple::*;

/// System actor state. Empty.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
pub struct State {}

/// System actor
pub struct Actor;

impl Actor {
    /// System actor constructor
    pub fn constructor(rt: &mut dyn Runtime) -> Result<(), ActorError> {
        rt.validate_immediate_caller_is(&[SYSTEM_ACTOR_ADDR])?;
        rt.create(&State::default())
    }
}

impl ActorCode for Actor {
    fn invoke_method(
        &self,
        rt: &mut dyn Runtime,
        method: MethodNum,
        params: &RawBytes,
    ) -> Result<RawBytes, ActorError> {
        match method {
            METHOD_CONSTRUCTOR => {
                check_empty_params(params)?;
                Self::constructor(rt)?;
                Ok(RawBytes::default())
            }
            _ => Err(invalid_method(method)),
        }
    }
}
