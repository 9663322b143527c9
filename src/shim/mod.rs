// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

pub mod address;
pub mod clock;
pub mod crypto;
pub mod econ;
pub mod error;
pub mod executor;
pub mod externs;
pub mod message;
pub mod randomness;
pub mod state_tree;
pub mod version;

mod fvm_shared_latest {
    pub use fvm_shared4::*;
}
