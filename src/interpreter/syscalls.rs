// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::shim::{address::Address, crypto::Signature};
use crate::utils::encoding::blake2b_256;

/// Pure functions implemented as primitives by the runtime.
pub trait Syscalls {
    /// Verifies that a signature is valid for an address and plaintext.
    fn verify_signature(
        &self,
        signature: &Signature,
        signer: &Address,
        plaintext: &[u8],
    ) -> anyhow::Result<()>;

    /// Hashes input data using blake2b with 256 bit output.
    fn hash_blake2b(&self, data: &[u8]) -> [u8; 32] {
        blake2b_256(data)
    }

    /// Verifies a batch of signatures. The result has one entry per input, in
    /// input order.
    fn batch_verify_signatures(&self, batch: &[(&Signature, &Address, &[u8])]) -> Vec<bool> {
        batch
            .iter()
            .map(|(sig, signer, plaintext)| self.verify_signature(sig, signer, plaintext).is_ok())
            .collect()
    }
}

/// Syscalls backed by the `bls-signatures` and `k256` implementations.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultSyscalls;

impl Syscalls for DefaultSyscalls {
    fn verify_signature(
        &self,
        signature: &Signature,
        signer: &Address,
        plaintext: &[u8],
    ) -> anyhow::Result<()> {
        signature.verify(plaintext, signer)
    }
}
