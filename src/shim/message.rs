// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::{address::Address, econ::TokenAmount};
use crate::utils::cid::CidCborExt as _;
use cid::Cid;
use fvm_ipld_encoding::RawBytes;
use fvm_ipld_encoding::tuple::*;
use num_bigint::BigInt;

/// Method number indicator for calling actor methods.
pub type MethodNum = u64;

/// Plain value transfer, no code is invoked.
pub const METHOD_SEND: MethodNum = 0;
/// Actor constructor, invoked once on creation.
pub const METHOD_CONSTRUCTOR: MethodNum = 1;

/// Default unsigned VM message type which includes all data needed for a state
/// transition.
#[derive(Clone, Default, PartialEq, Eq, Debug, Serialize_tuple, Deserialize_tuple)]
pub struct Message {
    pub version: u64,
    pub to: Address,
    pub from: Address,
    pub sequence: u64,
    pub value: TokenAmount,
    pub gas_limit: u64,
    pub gas_fee_cap: TokenAmount,
    pub gas_premium: TokenAmount,
    pub method_num: MethodNum,
    pub params: RawBytes,
}

impl Message {
    /// Creates a transfer message with zero gas pricing, mostly used for
    /// implicit and test messages.
    pub fn transfer(from: Address, to: Address, value: TokenAmount) -> Self {
        Self {
            from,
            to,
            value,
            ..Default::default()
        }
    }

    /// Content identifier of the message.
    pub fn cid(&self) -> anyhow::Result<Cid> {
        Cid::from_cbor_blake2b256(self)
    }

    /// Maximum amount the sender may have to pay: the full gas allowance
    /// priced at the fee cap, plus the transferred value.
    pub fn required_funds(&self) -> TokenAmount {
        TokenAmount::from_atto(
            self.gas_fee_cap.atto() * BigInt::from(self.gas_limit) + self.value.atto(),
        )
    }

    /// Syntactic checks that do not need chain state.
    pub fn check(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.version == 0, "Message version: {} not supported", self.version);
        anyhow::ensure!(self.gas_limit > 0, "message gas limit must be positive");
        anyhow::ensure!(!self.value.is_negative(), "message value cannot be negative");
        anyhow::ensure!(
            !self.gas_fee_cap.is_negative(),
            "gas_fee_cap cannot be negative"
        );
        anyhow::ensure!(
            !self.gas_premium.is_negative(),
            "gas_premium cannot be negative"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_funds_prices_gas_at_fee_cap() {
        let msg = Message {
            gas_limit: 1_000,
            gas_fee_cap: TokenAmount::from_atto(3),
            value: TokenAmount::from_atto(7),
            ..Message::transfer(Address::new_id(100), Address::new_id(101), TokenAmount::default())
        };
        assert_eq!(msg.required_funds(), TokenAmount::from_atto(3_007));
    }

    #[test]
    fn check_rejects_zero_gas_and_bad_version() {
        let mut msg = Message::transfer(
            Address::new_id(100),
            Address::new_id(101),
            TokenAmount::from_atto(1),
        );
        assert!(msg.check().is_err());
        msg.gas_limit = 10;
        msg.check().unwrap();
        msg.version = 1;
        assert!(msg.check().is_err());
    }

    #[test]
    fn cid_depends_on_content() {
        let a = Message::transfer(Address::new_id(100), Address::new_id(101), TokenAmount::from_atto(1));
        let mut b = a.clone();
        assert_eq!(a.cid().unwrap(), b.cid().unwrap());
        b.sequence = 1;
        assert_ne!(a.cid().unwrap(), b.cid().unwrap());
    }
}
