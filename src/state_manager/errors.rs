// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::chain;
use cid::Cid;
use thiserror::Error;

/// State manager error
#[derive(Debug, PartialEq, Eq, Error)]
pub enum Error {
    /// The processor refused the tipset or failed while applying it.
    #[error("error validating tipset: {0}")]
    Validation(String),
    /// Messages of the tipset could not be read back from the store.
    #[error("failed to load tipset messages: {0}")]
    MessageLoad(String),
    #[error("state root mismatch: header has {expected}, execution produced {actual}")]
    StateRootMismatch { expected: Cid, actual: Cid },
    #[error("receipt root mismatch: header has {expected}, execution produced {actual}")]
    ReceiptRootMismatch { expected: Cid, actual: Cid },
    /// Other state manager error
    #[error("{0}")]
    Other(String),
}

impl From<String> for Error {
    fn from(e: String) -> Self {
        Error::Other(e)
    }
}

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Error::Other(format!("{e:#}"))
    }
}

impl From<chain::Error> for Error {
    fn from(e: chain::Error) -> Self {
        Error::Other(e.to_string())
    }
}
