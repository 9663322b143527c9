// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

pub use super::fvm_shared_latest::address::{Address, Error, Payload, Protocol};

/// Identifier of the system actor.
pub const SYSTEM_ACTOR_ID: u64 = 0;
/// Identifier of the init actor.
pub const INIT_ACTOR_ID: u64 = 1;
/// Identifier of the reward actor.
pub const REWARD_ACTOR_ID: u64 = 2;
/// Identifier of the reserve actor.
pub const RESERVE_ACTOR_ID: u64 = 90;
/// Identifier of the burnt funds actor.
pub const BURNT_FUNDS_ACTOR_ID: u64 = 99;

/// First identifier handed out to non-singleton actors.
pub const FIRST_NON_SINGLETON_ADDR: u64 = 100;

pub const SYSTEM_ACTOR_ADDR: Address = Address::new_id(SYSTEM_ACTOR_ID);
pub const INIT_ACTOR_ADDR: Address = Address::new_id(INIT_ACTOR_ID);
pub const REWARD_ACTOR_ADDR: Address = Address::new_id(REWARD_ACTOR_ID);
pub const RESERVE_ACTOR_ADDR: Address = Address::new_id(RESERVE_ACTOR_ID);
pub const BURNT_FUNDS_ACTOR_ADDR: Address = Address::new_id(BURNT_FUNDS_ACTOR_ID);

/// Returns `true` for key-backed addresses (BLS and `secp256k1`).
pub fn is_key_address(addr: &Address) -> bool {
    matches!(addr.protocol(), Protocol::BLS | Protocol::Secp256k1)
}
