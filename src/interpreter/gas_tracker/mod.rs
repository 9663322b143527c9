// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

mod gas_charge;
mod price_list;

pub use self::gas_charge::GasCharge;
pub use self::price_list::{PriceList, price_list_by_network_version};

use super::ActorError;
use crate::actor_error;
use tracing::trace;

/// Gas budget of one message, shared by every nested invocation it makes.
#[derive(Debug, Clone)]
pub struct GasTracker {
    gas_limit: i64,
    gas_used: i64,
    virtual_gas_used: i64,
    exhausted: bool,
}

impl GasTracker {
    /// Gas tracker constructor
    pub fn new(gas_limit: i64, gas_used: i64) -> Self {
        Self {
            gas_limit,
            gas_used,
            virtual_gas_used: 0,
            exhausted: false,
        }
    }

    /// Safely consumes gas and returns an out of gas error if there is not
    /// sufficient enough gas remaining for charge. Running out pins the used
    /// gas to the limit.
    pub fn charge_gas(&mut self, charge: GasCharge) -> Result<(), ActorError> {
        let to_use = charge.total();
        let used = self.gas_used.saturating_add(to_use);
        self.virtual_gas_used = self.virtual_gas_used.saturating_add(charge.virtual_total());
        if used > self.gas_limit {
            let available = self.gas_available();
            self.gas_used = self.gas_limit;
            self.exhausted = true;
            return Err(actor_error!(SYS_OUT_OF_GAS;
                "not enough gas for {} (used={}, charge={}, available={})",
                charge.name, used - to_use, to_use, available));
        }
        self.gas_used = used;
        trace!(name = charge.name, to_use, used, "gas charged");
        Ok(())
    }

    /// Getter for gas available.
    pub fn gas_available(&self) -> i64 {
        self.gas_limit - self.gas_used
    }

    /// Getter for gas used.
    pub fn gas_used(&self) -> i64 {
        self.gas_used
    }

    pub fn gas_limit(&self) -> i64 {
        self.gas_limit
    }

    /// `true` once a charge has failed. Every abort after that point is
    /// reported as out of gas, whatever the actor turned it into.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Gas that was tracked but not charged.
    pub fn virtual_gas_used(&self) -> i64 {
        self.virtual_gas_used
    }
}
