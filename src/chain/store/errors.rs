// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::blocks;
use thiserror::Error;

/// Chain error
#[derive(Debug, Error)]
pub enum Error {
    /// Key was not found
    #[error("Invalid tipset: {0}")]
    UndefinedKey(String),
    /// Key not found in database
    #[error("{0} not found")]
    NotFound(String),
    /// Error originating from the block store or from decoding
    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Error::Other(e.to_string())
    }
}

impl From<blocks::Error> for Error {
    fn from(e: blocks::Error) -> Self {
        Error::Other(e.to_string())
    }
}

impl From<fvm_ipld_amt::Error> for Error {
    fn from(e: fvm_ipld_amt::Error) -> Self {
        Error::Other(e.to_string())
    }
}
