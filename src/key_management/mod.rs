// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Key generation and signing. Used by block producers to sign tickets and by
//! tests to build signed chains.

mod errors;
mod keystore;
mod wallet_helpers;

pub use errors::*;
pub use keystore::*;
pub use wallet_helpers::*;
