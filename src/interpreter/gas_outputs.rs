// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::shim::econ::{TokenAmount, token_mul};
use num_bigint::BigInt;

/// Numerator of the allowed gas over-estimation ratio.
pub const GAS_OVERUSE_NUM: i64 = 11;
/// Denominator of the allowed gas over-estimation ratio.
pub const GAS_OVERUSE_DENOM: i64 = 10;

/// Where the gas funds prepaid by a message end up.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GasOutputs {
    pub base_fee_burn: TokenAmount,
    pub over_estimation_burn: TokenAmount,
    pub miner_penalty: TokenAmount,
    pub miner_tip: TokenAmount,
    pub refund: TokenAmount,
    pub gas_refund: i64,
    pub gas_burned: i64,
}

impl GasOutputs {
    pub fn compute(
        gas_used: i64,
        gas_limit: i64,
        base_fee: &TokenAmount,
        fee_cap: &TokenAmount,
        gas_premium: &TokenAmount,
    ) -> Self {
        let mut out = GasOutputs::default();

        let mut base_fee_to_pay = base_fee;
        if base_fee > fee_cap {
            base_fee_to_pay = fee_cap;
            out.miner_penalty = token_mul(&(base_fee.clone() - fee_cap), gas_used);
        }
        out.base_fee_burn = token_mul(base_fee_to_pay, gas_used);

        let mut miner_tip = gas_premium.clone();
        if &(base_fee_to_pay.clone() + &miner_tip) > fee_cap {
            miner_tip = fee_cap.clone() - base_fee_to_pay;
        }
        out.miner_tip = token_mul(&miner_tip, gas_limit);

        let (gas_refund, gas_burned) = compute_gas_overestimation_burn(gas_used, gas_limit);
        out.gas_refund = gas_refund;
        out.gas_burned = gas_burned;

        if out.gas_burned != 0 {
            out.over_estimation_burn = token_mul(base_fee_to_pay, out.gas_burned);
            out.miner_penalty += token_mul(&(base_fee.clone() - base_fee_to_pay), out.gas_burned);
        }
        let required_funds = token_mul(fee_cap, gas_limit);
        out.refund =
            required_funds - &out.base_fee_burn - &out.miner_tip - &out.over_estimation_burn;
        out
    }
}

/// Splits the unused gas of a message into the part refunded and the part
/// burned for over-estimating the limit. Returns `(refund, burned)`.
pub fn compute_gas_overestimation_burn(gas_used: i64, gas_limit: i64) -> (i64, i64) {
    if gas_used == 0 {
        return (0, gas_limit);
    }

    let mut over = gas_limit - (GAS_OVERUSE_NUM * gas_used) / GAS_OVERUSE_DENOM;
    if over < 0 {
        return (gas_limit - gas_used, 0);
    }
    if over > gas_used {
        over = gas_used;
    }

    let gas_to_burn = BigInt::from(gas_limit - gas_used) * over / gas_used;
    let gas_to_burn = i64::try_from(gas_to_burn).unwrap_or(gas_limit - gas_used);
    (gas_limit - gas_used - gas_to_burn, gas_to_burn)
}
