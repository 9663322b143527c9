// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Deterministic tipset execution: the message interpreter and its actor
//! runtime, the state transition driver, ticket production and validation,
//! and the write-buffered blockstore the interpreter runs on.

pub mod actors;
pub mod beacon;
pub mod blocks;
pub mod chain;
pub mod config;
pub mod db;
pub mod fil_cns;
pub mod interpreter;
pub mod key_management;
pub mod message;
pub mod networks;
pub mod shim;
pub mod state_manager;
#[cfg(test)]
mod test_utils;
pub mod utils;

pub use config::{Config, VmConfig};
pub use fil_cns::TicketMachine;
pub use interpreter::{DefaultProcessor, Processor, VM};
pub use state_manager::{StateManager, StateOutput};
pub use utils::logger::setup_logger;
