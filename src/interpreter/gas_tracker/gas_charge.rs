// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

/// Single gas charge in the VM. Contains information about what gas was for, as well
/// as the amount of gas needed for computation and storage respectively.
///
/// Virtual gas is tracked for accounting only and never deducted from the
/// message's budget.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GasCharge {
    pub name: &'static str,
    pub compute_gas: i64,
    pub storage_gas: i64,
    pub virtual_compute: i64,
    pub virtual_storage: i64,
}

impl GasCharge {
    pub fn new(name: &'static str, compute_gas: i64, storage_gas: i64) -> Self {
        Self {
            name,
            compute_gas,
            storage_gas,
            virtual_compute: 0,
            virtual_storage: 0,
        }
    }

    pub fn with_virtual(self, virtual_compute: i64, virtual_storage: i64) -> Self {
        Self {
            virtual_compute,
            virtual_storage,
            ..self
        }
    }

    /// Calculates total gas charge based on compute and storage multipliers.
    pub fn total(&self) -> i64 {
        self.compute_gas.saturating_add(self.storage_gas)
    }

    pub fn virtual_total(&self) -> i64 {
        self.virtual_compute.saturating_add(self.virtual_storage)
    }
}
