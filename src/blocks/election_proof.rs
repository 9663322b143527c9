// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::blocks::VRFProof;
use fvm_ipld_encoding::tuple::*;
use get_size2::GetSize;

/// Proofs generated by a miner which determines the reward they earn.
/// This is generated from hashing a partial ticket and using the hash to
/// generate a value.
#[derive(
    Clone, Debug, PartialEq, Eq, Default, Hash, Serialize_tuple, Deserialize_tuple, GetSize,
)]
pub struct ElectionProof {
    /// Number of rewards the block producer earns in this round.
    pub win_count: i64,
    pub vrfproof: VRFProof,
}
