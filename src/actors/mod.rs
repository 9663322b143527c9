// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Built-in actors executed natively by the interpreter.

pub mod account;
pub mod init;
pub mod system;

use crate::actor_error;
use crate::interpreter::{ActorError, Runtime};
use crate::shim::message::MethodNum;
use crate::utils::multihash::prelude::*;
use cid::Cid;
use fvm_ipld_encoding::{IPLD_RAW, RawBytes};
use serde::{Serialize, de::DeserializeOwned};
use std::sync::LazyLock;

fn make_builtin(name: &str) -> Cid {
    Cid::new_v1(IPLD_RAW, MultihashCode::Identity.digest(name.as_bytes()))
}

pub static SYSTEM_ACTOR_CODE_ID: LazyLock<Cid> = LazyLock::new(|| make_builtin("fil/1/system"));
pub static INIT_ACTOR_CODE_ID: LazyLock<Cid> = LazyLock::new(|| make_builtin("fil/1/init"));
pub static ACCOUNT_ACTOR_CODE_ID: LazyLock<Cid> = LazyLock::new(|| make_builtin("fil/1/account"));

/// Interface for invoking methods on an Actor
pub trait ActorCode {
    /// Invokes method with runtime on the actor's code. Method number will
    /// match one defined by the actor, and parameters will be serialized and
    /// used in execution
    fn invoke_method(
        &self,
        rt: &mut dyn Runtime,
        method: MethodNum,
        params: &RawBytes,
    ) -> Result<RawBytes, ActorError>;
}

/// Returns `true` for code that may only ever be instantiated once, at genesis.
pub fn is_singleton_actor(code: &Cid) -> bool {
    code == &*SYSTEM_ACTOR_CODE_ID || code == &*INIT_ACTOR_CODE_ID
}

pub fn is_builtin_actor(code: &Cid) -> bool {
    is_singleton_actor(code) || code == &*ACCOUNT_ACTOR_CODE_ID
}

pub fn is_account_actor(code: &Cid) -> bool {
    code == &*ACCOUNT_ACTOR_CODE_ID
}

/// Dispatches a method call to the actor implementing `code`.
pub fn invoke(
    code: &Cid,
    rt: &mut dyn Runtime,
    method: MethodNum,
    params: &RawBytes,
) -> Result<RawBytes, ActorError> {
    match code {
        x if x == &*SYSTEM_ACTOR_CODE_ID => system::Actor.invoke_method(rt, method, params),
        x if x == &*INIT_ACTOR_CODE_ID => init::Actor.invoke_method(rt, method, params),
        x if x == &*ACCOUNT_ACTOR_CODE_ID => account::Actor.invoke_method(rt, method, params),
        _ => Err(actor_error!(SYS_ILLEGAL_ACTOR; "no code for actor at address {}", rt.message().receiver())),
    }
}

pub(crate) fn deserialize_params<T: DeserializeOwned>(params: &RawBytes) -> Result<T, ActorError> {
    params
        .deserialize()
        .map_err(|e| actor_error!(USR_SERIALIZATION; "failed to decode parameters: {}", e))
}

pub(crate) fn serialize_return<T: Serialize>(ret: &T) -> Result<RawBytes, ActorError> {
    RawBytes::serialize(ret)
        .map_err(|e| actor_error!(USR_SERIALIZATION; "failed to encode return value: {}", e))
}

pub(crate) fn check_empty_params(params: &RawBytes) -> Result<(), ActorError> {
    if params.bytes().is_empty() {
        Ok(())
    } else {
        Err(actor_error!(USR_SERIALIZATION; "method expects no parameters"))
    }
}

pub(crate) fn invalid_method(method: MethodNum) -> ActorError {
    actor_error!(SYS_INVALID_METHOD; "invalid method {}", method)
}
