// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::GasCharge;
use crate::shim::crypto::SignatureType;
use crate::shim::econ::TokenAmount;
use crate::shim::message::{METHOD_SEND, MethodNum};
use crate::shim::version::NetworkVersion;

const BASE_PRICES: PriceList = PriceList {
    compute_gas_multiplier: 1,
    storage_gas_multiplier: 1000,

    on_chain_message_compute_base: 38863,
    on_chain_message_storage_base: 36,
    on_chain_message_storage_per_byte: 1,

    on_chain_return_value_per_byte: 1,

    send_base: 29233,
    send_transfer_funds: 27500,
    send_transfer_only_premium: 159672,
    send_invoke_method: -5377,

    ipld_get_base: 75242,
    ipld_put_base: 84070,
    ipld_put_per_byte: 1,

    create_actor_compute: 1108454,
    create_actor_storage: 36 + 40,
    delete_actor: -(36 + 40),

    bls_sig_cost: 16598605,
    secp256k1_sig_cost: 1637292,

    hashing_base: 31355,
};

const CALICO_PRICES: PriceList = PriceList {
    storage_gas_multiplier: 1300,
    ipld_get_base: 114617,
    ipld_put_base: 353640,
    ..BASE_PRICES
};

/// Provides prices for operations in the VM
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PriceList {
    /// Compute gas charge multiplier
    // Not applied to anything yet, kept for parity with the storage multiplier.
    pub(crate) compute_gas_multiplier: i64,
    /// Storage gas charge multiplier
    pub(crate) storage_gas_multiplier: i64,

    /// Gas cost charged to the originator of an on-chain message (regardless of
    /// whether it succeeds or fails in application) is given by:
    ///   OnChainMessageBase + len(serialized message)*OnChainMessagePerByte
    pub(crate) on_chain_message_compute_base: i64,
    pub(crate) on_chain_message_storage_base: i64,
    pub(crate) on_chain_message_storage_per_byte: i64,

    /// Gas cost charged to the originator of a non-nil return value produced
    /// by an on-chain message is given by:
    ///   len(return value)*OnChainReturnValuePerByte
    pub(crate) on_chain_return_value_per_byte: i64,

    /// Gas cost for any message send execution (including the top-level one
    /// initiated by an on-chain message).
    pub(crate) send_base: i64,
    /// Charged in addition to `send_base` when value is transferred.
    pub(crate) send_transfer_funds: i64,
    /// Charged in addition to `send_base` when the message only transfers funds.
    pub(crate) send_transfer_only_premium: i64,
    /// Charged in addition to `send_base` when a method is invoked.
    pub(crate) send_invoke_method: i64,

    pub(crate) ipld_get_base: i64,
    pub(crate) ipld_put_base: i64,
    pub(crate) ipld_put_per_byte: i64,

    pub(crate) create_actor_compute: i64,
    pub(crate) create_actor_storage: i64,
    /// Negative: deleting an actor partially refunds its creation.
    pub(crate) delete_actor: i64,

    pub(crate) bls_sig_cost: i64,
    pub(crate) secp256k1_sig_cost: i64,

    pub(crate) hashing_base: i64,
}

impl PriceList {
    /// Returns the gas required for storing a message of a given size in the chain.
    #[inline]
    pub fn on_chain_message(&self, msg_size: usize) -> GasCharge {
        GasCharge::new(
            "OnChainMessage",
            self.on_chain_message_compute_base * self.compute_gas_multiplier,
            (self.on_chain_message_storage_base
                + self.on_chain_message_storage_per_byte * as_gas(msg_size))
                * self.storage_gas_multiplier,
        )
    }

    /// Returns the gas required for storing the response of a message in the chain.
    #[inline]
    pub fn on_chain_return_value(&self, data_size: usize) -> GasCharge {
        GasCharge::new(
            "OnChainReturnValue",
            0,
            as_gas(data_size) * self.on_chain_return_value_per_byte * self.storage_gas_multiplier,
        )
    }

    /// Returns the gas required when invoking a method.
    #[inline]
    pub fn on_method_invocation(&self, value: &TokenAmount, method_num: MethodNum) -> GasCharge {
        let mut ret = self.send_base;
        if !value.is_zero() {
            ret += self.send_transfer_funds;
            if method_num == METHOD_SEND {
                ret += self.send_transfer_only_premium;
            }
        }
        if method_num != METHOD_SEND {
            ret += self.send_invoke_method;
        }
        GasCharge::new("OnMethodInvocation", ret * self.compute_gas_multiplier, 0)
    }

    /// Returns the gas required for reading an object.
    #[inline]
    pub fn on_ipld_get(&self) -> GasCharge {
        GasCharge::new("OnIpldGet", self.ipld_get_base, 0)
    }

    /// Returns the gas required for storing an object.
    #[inline]
    pub fn on_ipld_put(&self, data_size: usize) -> GasCharge {
        GasCharge::new(
            "OnIpldPut",
            self.ipld_put_base,
            as_gas(data_size) * self.ipld_put_per_byte * self.storage_gas_multiplier,
        )
    }

    /// Returns the gas required for creating an actor.
    #[inline]
    pub fn on_create_actor(&self) -> GasCharge {
        GasCharge::new(
            "OnCreateActor",
            self.create_actor_compute,
            self.create_actor_storage * self.storage_gas_multiplier,
        )
    }

    /// Returns the gas required for deleting an actor.
    #[inline]
    pub fn on_delete_actor(&self) -> GasCharge {
        GasCharge::new(
            "OnDeleteActor",
            0,
            self.delete_actor * self.storage_gas_multiplier,
        )
    }

    /// Returns gas required for signature verification.
    #[inline]
    pub fn on_verify_signature(&self, sig_type: SignatureType) -> GasCharge {
        let val = match sig_type {
            SignatureType::Bls => self.bls_sig_cost,
            SignatureType::Secp256k1 => self.secp256k1_sig_cost,
        };
        GasCharge::new("OnVerifySignature", val, 0)
    }

    /// Returns gas required for hashing data.
    #[inline]
    pub fn on_hashing(&self, _: usize) -> GasCharge {
        GasCharge::new("OnHashing", self.hashing_base, 0)
    }
}

fn as_gas(size: usize) -> i64 {
    i64::try_from(size).unwrap_or(i64::MAX)
}

/// Returns gas price list by network version for gas consumption. The Calico
/// prices apply from network version 7 on.
pub fn price_list_by_network_version(network_version: NetworkVersion) -> PriceList {
    if network_version < NetworkVersion::V7 {
        BASE_PRICES
    } else {
        CALICO_PRICES
    }
}
