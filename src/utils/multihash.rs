// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Multihash code table with the `Identity` hasher that the `multihash`
//! crate no longer ships.

pub mod prelude {
    pub use super::MultihashCode;
    pub use multihash_codetable::MultihashDigest as _;
}

use multihash_derive::MultihashDigest;

/// The hash functions used for block keys: `Blake2b256` for content and
/// `Identity` for inline builtin actor code identifiers.
#[derive(Clone, Copy, Debug, Eq, MultihashDigest, PartialEq)]
#[mh(alloc_size = 64)]
pub enum MultihashCode {
    #[mh(code = 0x0, hasher = IdentityHasher::<64>)]
    Identity,
    /// BLAKE2b-256 (32-byte hash size)
    #[mh(code = 0xb220, hasher = multihash_codetable::Blake2b256)]
    Blake2b256,
}

/// Identity hasher with a maximum size. Input past `S` bytes is dropped.
#[derive(Debug)]
pub struct IdentityHasher<const S: usize> {
    i: usize,
    bytes: [u8; S],
}

impl<const S: usize> Default for IdentityHasher<S> {
    fn default() -> Self {
        Self {
            i: 0,
            bytes: [0u8; S],
        }
    }
}

impl<const S: usize> multihash_derive::Hasher for IdentityHasher<S> {
    fn update(&mut self, input: &[u8]) {
        let start = self.i.min(self.bytes.len());
        let end = (self.i + input.len()).min(self.bytes.len());
        self.bytes[start..end].copy_from_slice(input);
        self.i = end;
    }

    fn finalize(&mut self) -> &[u8] {
        &self.bytes[..self.i]
    }

    fn reset(&mut self) {
        self.i = 0
    }
}

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn identity_digest_keeps_input() {
        let mh = MultihashCode::Identity.digest(b"fil/1/account");
        assert_eq!(mh.digest(), b"fil/1/account");
        assert_eq!(mh.code(), 0);
    }

    #[test]
    fn blake2b_digest_matches_helper() {
        let mh = MultihashCode::Blake2b256.digest(b"abc");
        assert_eq!(mh.digest(), crate::utils::encoding::blake2b_256(b"abc"));
    }
}
