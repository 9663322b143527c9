// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::shim::error::{ExitCode, exit_code_name};
use thiserror::Error;

/// Abnormal termination of an actor invocation.
///
/// [`ActorError::Abort`] unwinds the current message only and ends up as the
/// exit code of its receipt. [`ActorError::Fatal`] means the local state or
/// the execution environment can no longer be trusted; it escalates past
/// every message boundary and fails the whole tipset.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActorError {
    #[error("ActorError(exit_code: {}, msg: {msg})", exit_code_name(*exit_code))]
    Abort { exit_code: ExitCode, msg: String },
    #[error("fatal error: {0}")]
    Fatal(String),
}

impl ActorError {
    pub fn new(exit_code: ExitCode, msg: impl Into<String>) -> Self {
        Self::Abort {
            exit_code,
            msg: msg.into(),
        }
    }

    pub fn new_fatal(msg: impl std::fmt::Display) -> Self {
        Self::Fatal(msg.to_string())
    }

    /// Exit code reported in the receipt. Fatal errors never reach a receipt
    /// and report `None`.
    pub fn exit_code(&self) -> Option<ExitCode> {
        match self {
            Self::Abort { exit_code, .. } => Some(*exit_code),
            Self::Fatal(_) => None,
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }

    pub fn msg(&self) -> &str {
        match self {
            Self::Abort { msg, .. } => msg,
            Self::Fatal(msg) => msg,
        }
    }

    /// Recovers an [`ActorError`] carried through an `anyhow` seam (a gas
    /// charging block store for instance). Anything else is fatal.
    pub fn from_anyhow(err: anyhow::Error) -> Self {
        match err.downcast::<ActorError>() {
            Ok(actor_err) => actor_err,
            Err(other) => Self::Fatal(format!("{other:#}")),
        }
    }
}

/// Builds an [`ActorError`].
///
/// ```ignore
/// actor_error!(fatal("state root {} went missing", root));
/// actor_error!(SYS_FORBIDDEN; "caller {caller} is not allowed");
/// ```
#[macro_export]
macro_rules! actor_error {
    (fatal($msg:literal)) => {
        $crate::interpreter::ActorError::new_fatal(format!($msg))
    };
    (fatal($msg:literal, $($arg:expr),+ $(,)?)) => {
        $crate::interpreter::ActorError::new_fatal(format!($msg, $($arg),+))
    };
    (fatal($msg:expr)) => {
        $crate::interpreter::ActorError::new_fatal($msg)
    };
    ($code:ident; $msg:literal) => {
        $crate::interpreter::ActorError::new($crate::shim::error::$code, format!($msg))
    };
    ($code:ident; $msg:literal, $($arg:expr),+ $(,)?) => {
        $crate::interpreter::ActorError::new($crate::shim::error::$code, format!($msg, $($arg),+))
    };
    ($code:ident; $msg:expr) => {
        $crate::interpreter::ActorError::new($crate::shim::error::$code, $msg.to_string())
    };
}
