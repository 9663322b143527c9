// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

mod ticket;

pub use self::ticket::TicketMachine;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TicketError {
    #[error("Ticket validation failed: {0}")]
    InvalidTicket(String),
    #[error("Drawing ticket randomness failed: {0}")]
    Randomness(String),
    #[error("Signing ticket randomness failed: {0}")]
    Signing(String),
}
