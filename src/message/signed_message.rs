// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::shim::{
    crypto::{Signature, SignatureType},
    message::Message,
};
use crate::utils::cid::CidCborExt as _;
use cid::Cid;
use fvm_ipld_encoding::to_vec;
use fvm_ipld_encoding::tuple::*;

/// Represents a wrapped message with signature bytes.
#[derive(PartialEq, Clone, Debug, Serialize_tuple, Deserialize_tuple, Eq)]
pub struct SignedMessage {
    pub message: Message,
    pub signature: Signature,
}

impl SignedMessage {
    /// Generate a new signed message from fields.
    /// The signature will be verified.
    pub fn new_from_parts(message: Message, signature: Signature) -> anyhow::Result<SignedMessage> {
        signature.verify(&message.cid()?.to_bytes(), &message.from)?;
        Ok(SignedMessage { message, signature })
    }

    /// Generate a new signed message from fields.
    /// The signature will not be verified.
    pub fn new_unchecked(message: Message, signature: Signature) -> SignedMessage {
        SignedMessage { message, signature }
    }

    /// Returns reference to the unsigned message.
    pub fn message(&self) -> &Message {
        &self.message
    }

    /// Returns signature of the signed message.
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Consumes self and returns it's unsigned message.
    pub fn into_message(self) -> Message {
        self.message
    }

    /// Checks if the signed message is a BLS message.
    pub fn is_bls(&self) -> bool {
        self.signature.signature_type() == SignatureType::Bls
    }

    /// Verifies that the from address of the message generated the signature.
    pub fn verify(&self) -> anyhow::Result<()> {
        self.signature
            .verify(&self.message.cid()?.to_bytes(), &self.message.from)
    }

    /// BLS messages are identified by their unsigned message, everything else
    /// by the signed envelope.
    pub fn cid(&self) -> anyhow::Result<Cid> {
        if self.is_bls() {
            self.message.cid()
        } else {
            Cid::from_cbor_blake2b256(self)
        }
    }

    /// Returns the length of the chain message in bytes.
    pub fn chain_length(&self) -> anyhow::Result<usize> {
        let serialized = match self.signature.signature_type() {
            // BLS chain message length doesn't include the signature
            SignatureType::Bls => to_vec(&self.message)?,
            SignatureType::Secp256k1 => to_vec(&self)?,
        };
        Ok(serialized.len())
    }

    /// Creates a mock signed message for testing purposes. The signature check will fail if
    /// invoked.
    #[cfg(test)]
    pub fn mock_bls_signed_message(message: Message) -> SignedMessage {
        let signature = Signature::new_bls(vec![0; crate::shim::crypto::BLS_SIG_LEN]);
        SignedMessage::new_unchecked(message, signature)
    }
}
