// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::shim::{
    address::{BURNT_FUNDS_ACTOR_ADDR, RESERVE_ACTOR_ADDR, REWARD_ACTOR_ADDR},
    clock::ChainEpoch,
    econ::TokenAmount,
    state_tree::StateTree,
};
use fvm_ipld_blockstore::Blockstore;
use num_bigint::BigInt;
use std::sync::LazyLock;

/// Tokens set aside in the reserve actor at genesis.
pub static FIL_RESERVED: LazyLock<TokenAmount> =
    LazyLock::new(|| TokenAmount::from_whole(300_000_000));

/// Breakdown of the circulating supply at one epoch.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CirculatingSupply {
    pub fil_vested: TokenAmount,
    pub fil_mined: TokenAmount,
    pub fil_burnt: TokenAmount,
    pub fil_locked: TokenAmount,
    pub fil_circulating: TokenAmount,
    pub fil_reserve_disbursed: TokenAmount,
}

/// Linear vesting of a genesis allocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VestingSchedule {
    pub initial_balance: TokenAmount,
    pub start_epoch: ChainEpoch,
    pub unlock_duration: ChainEpoch,
}

impl VestingSchedule {
    /// Amount still locked at `epoch`.
    pub fn amount_locked(&self, epoch: ChainEpoch) -> TokenAmount {
        let elapsed = epoch - self.start_epoch;
        if elapsed >= self.unlock_duration {
            return TokenAmount::default();
        }
        if elapsed <= 0 {
            return self.initial_balance.clone();
        }
        let remaining = BigInt::from(self.unlock_duration - elapsed);
        TokenAmount::from_atto(
            self.initial_balance.atto() * remaining / BigInt::from(self.unlock_duration),
        )
    }
}

/// Computes the circulating supply from the state tree and what was known at
/// genesis.
#[derive(Clone, Debug, Default)]
pub struct CirculatingSupplyCalculator {
    genesis_vesting: Vec<VestingSchedule>,
    genesis_reward_balance: TokenAmount,
}

impl CirculatingSupplyCalculator {
    pub fn new(genesis_vesting: Vec<VestingSchedule>, genesis_reward_balance: TokenAmount) -> Self {
        Self {
            genesis_vesting,
            genesis_reward_balance,
        }
    }

    /// Reads the reward pool out of the genesis state.
    pub fn from_genesis_state<S: Blockstore>(
        genesis_state: &StateTree<S>,
        genesis_vesting: Vec<VestingSchedule>,
    ) -> anyhow::Result<Self> {
        let genesis_reward_balance = genesis_state
            .get_actor(&REWARD_ACTOR_ADDR)?
            .map(|act| act.balance)
            .unwrap_or_default();
        Ok(Self::new(genesis_vesting, genesis_reward_balance))
    }

    pub fn get_supply_detail<S: Blockstore>(
        &self,
        height: ChainEpoch,
        state_tree: &StateTree<S>,
    ) -> anyhow::Result<CirculatingSupply> {
        let fil_vested = self.get_fil_vested(height);
        let fil_mined = self.get_fil_mined(state_tree)?;
        let fil_burnt = balance_of(state_tree, &BURNT_FUNDS_ACTOR_ADDR)?;
        // No built-in actor locks funds.
        let fil_locked = TokenAmount::default();
        let fil_reserve_disbursed = get_fil_reserve_disbursed(state_tree)?;
        let circulating = fil_vested.atto() + fil_mined.atto() + fil_reserve_disbursed.atto()
            - fil_burnt.atto()
            - fil_locked.atto();
        let fil_circulating = TokenAmount::from_atto(circulating.max(BigInt::default()));
        Ok(CirculatingSupply {
            fil_vested,
            fil_mined,
            fil_burnt,
            fil_locked,
            fil_circulating,
            fil_reserve_disbursed,
        })
    }

    pub fn get_circulating_supply<S: Blockstore>(
        &self,
        height: ChainEpoch,
        state_tree: &StateTree<S>,
    ) -> anyhow::Result<TokenAmount> {
        Ok(self.get_supply_detail(height, state_tree)?.fil_circulating)
    }

    fn get_fil_vested(&self, height: ChainEpoch) -> TokenAmount {
        let vested = self
            .genesis_vesting
            .iter()
            .map(|v| v.initial_balance.atto() - v.amount_locked(height).atto())
            .sum::<BigInt>();
        TokenAmount::from_atto(vested)
    }

    /// Everything paid out of the genesis reward pool so far.
    fn get_fil_mined<S: Blockstore>(&self, state_tree: &StateTree<S>) -> anyhow::Result<TokenAmount> {
        let current = balance_of(state_tree, &REWARD_ACTOR_ADDR)?;
        let mined = self.genesis_reward_balance.atto() - current.atto();
        Ok(TokenAmount::from_atto(mined.max(BigInt::default())))
    }
}

fn balance_of<S: Blockstore>(
    state_tree: &StateTree<S>,
    addr: &crate::shim::address::Address,
) -> anyhow::Result<TokenAmount> {
    Ok(state_tree
        .get_actor(addr)?
        .map(|act| act.balance)
        .unwrap_or_default())
}

fn get_fil_reserve_disbursed<S: Blockstore>(
    state_tree: &StateTree<S>,
) -> anyhow::Result<TokenAmount> {
    // Chains without a reserve actor never disburse from it.
    let Some(reserve) = state_tree.get_actor(&RESERVE_ACTOR_ADDR)? else {
        return Ok(TokenAmount::default());
    };
    // If money enters the reserve actor, this could lead to a negative term
    Ok(TokenAmount::from_atto(
        FIL_RESERVED.atto() - reserve.balance.atto(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_vesting() {
        let v = VestingSchedule {
            initial_balance: TokenAmount::from_atto(1000),
            start_epoch: 10,
            unlock_duration: 100,
        };
        assert_eq!(v.amount_locked(0), TokenAmount::from_atto(1000));
        assert_eq!(v.amount_locked(10), TokenAmount::from_atto(1000));
        assert_eq!(v.amount_locked(35), TokenAmount::from_atto(750));
        assert_eq!(v.amount_locked(110), TokenAmount::default());
        assert_eq!(v.amount_locked(5000), TokenAmount::default());
    }

    #[test]
    fn vested_sums_all_schedules() {
        let calc = CirculatingSupplyCalculator::new(
            vec![
                VestingSchedule {
                    initial_balance: TokenAmount::from_atto(100),
                    start_epoch: 0,
                    unlock_duration: 10,
                },
                VestingSchedule {
                    initial_balance: TokenAmount::from_atto(50),
                    start_epoch: 0,
                    unlock_duration: 1,
                },
            ],
            TokenAmount::default(),
        );
        assert_eq!(calc.get_fil_vested(5), TokenAmount::from_atto(100));
    }
}
