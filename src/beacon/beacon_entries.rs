// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::utils::encoding::serde_byte_array;
use fvm_ipld_encoding::tuple::*;
use get_size2::GetSize;

/// The result from getting an entry from `Drand`.
/// The entry contains the round, or epoch as well as the BLS signature for that
/// round of randomness.
/// This beacon entry is stored on chain in the block header.
#[cfg_attr(test, derive(derive_quickcheck_arbitrary::Arbitrary))]
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash, Deserialize_tuple, Serialize_tuple, GetSize)]
pub struct BeaconEntry {
    round: u64,
    #[serde(with = "serde_byte_array")]
    data: Vec<u8>,
}

impl BeaconEntry {
    pub fn new(round: u64, data: Vec<u8>) -> Self {
        Self { round, data }
    }
    /// Returns the current round number.
    pub fn round(&self) -> u64 {
        self.round
    }
    /// The signature of message `H(prev_round, prev_round.data, round)`.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_parts(self) -> (u64, Vec<u8>) {
        let Self { round, data } = self;
        (round, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    #[quickcheck]
    fn beacon_entry_cbor_roundtrip(entry: BeaconEntry) {
        let bytes = fvm_ipld_encoding::to_vec(&entry).unwrap();
        let parsed: BeaconEntry = fvm_ipld_encoding::from_slice(&bytes).unwrap();
        assert_eq!(entry, parsed);
    }
}
