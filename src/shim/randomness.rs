// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

/// Length in bytes of every randomness value drawn from the chain.
pub const RANDOMNESS_LENGTH: usize = 32;

pub type Randomness = [u8; RANDOMNESS_LENGTH];

/// Domain separation tags mixed into every randomness draw, so that values
/// drawn for one purpose cannot be replayed for another.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[repr(i64)]
pub enum DomainSeparationTag {
    TicketProduction = 1,
    ElectionProofProduction = 2,
    WinningPoStChallengeSeed = 3,
    WindowedPoStChallengeSeed = 4,
    SealRandomness = 5,
    InteractiveSealChallengeSeed = 6,
    WindowedPoStDeadlineAssignment = 7,
    MarketDealCronSeed = 8,
    PoStChainCommit = 9,
}

impl DomainSeparationTag {
    pub fn as_i64(self) -> i64 {
        self as i64
    }
}
