// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT
pub use super::fvm_shared_latest::error::ExitCode;

// System exit codes shared with the FVM numbering.
pub const OK: ExitCode = ExitCode::OK;
pub const SYS_SENDER_INVALID: ExitCode = ExitCode::SYS_SENDER_INVALID;
pub const SYS_SENDER_STATE_INVALID: ExitCode = ExitCode::SYS_SENDER_STATE_INVALID;
pub const SYS_ILLEGAL_INSTRUCTION: ExitCode = ExitCode::SYS_ILLEGAL_INSTRUCTION;
pub const SYS_INVALID_RECEIVER: ExitCode = ExitCode::SYS_INVALID_RECEIVER;
pub const SYS_INSUFFICIENT_FUNDS: ExitCode = ExitCode::SYS_INSUFFICIENT_FUNDS;
pub const SYS_OUT_OF_GAS: ExitCode = ExitCode::SYS_OUT_OF_GAS;

// Legacy actor-runtime system codes, numbered as the interpreter reports them
// in receipts.
pub const SYS_INVALID_METHOD: ExitCode = ExitCode::new(3);
pub const SYS_FORBIDDEN: ExitCode = ExitCode::new(8);
pub const SYS_ILLEGAL_ACTOR: ExitCode = ExitCode::new(9);
pub const SYS_ILLEGAL_ARGUMENT: ExitCode = ExitCode::new(10);

// Actor exit codes.
pub const USR_ILLEGAL_ARGUMENT: ExitCode = ExitCode::USR_ILLEGAL_ARGUMENT;
pub const USR_NOT_FOUND: ExitCode = ExitCode::USR_NOT_FOUND;
pub const USR_FORBIDDEN: ExitCode = ExitCode::USR_FORBIDDEN;
pub const USR_INSUFFICIENT_FUNDS: ExitCode = ExitCode::USR_INSUFFICIENT_FUNDS;
pub const USR_ILLEGAL_STATE: ExitCode = ExitCode::USR_ILLEGAL_STATE;
pub const USR_SERIALIZATION: ExitCode = ExitCode::USR_SERIALIZATION;
pub const USR_UNHANDLED_MESSAGE: ExitCode = ExitCode::USR_UNHANDLED_MESSAGE;

/// Human readable name of an exit code, as printed in receipts and logs.
pub fn exit_code_name(code: ExitCode) -> &'static str {
    match code.value() {
        0 => "Ok",
        1 => "SysErrSenderInvalid",
        2 => "SysErrSenderStateInvalid",
        3 => "SysErrInvalidMethod",
        4 => "SysErrIllegalInstruction",
        5 => "SysErrInvalidReceiver",
        6 => "SysErrInsufficientFunds",
        7 => "SysErrOutOfGas",
        8 => "SysErrForbidden",
        9 => "SysErrorIllegalActor",
        10 => "SysErrorIllegalArgument",
        16 => "ErrIllegalArgument",
        17 => "ErrNotFound",
        18 => "ErrForbidden",
        19 => "ErrInsufficientFunds",
        20 => "ErrIllegalState",
        21 => "ErrSerialization",
        22 => "ErrUnhandledMessage",
        c if c < ExitCode::FIRST_USER_EXIT_CODE => "SysErrReserved",
        _ => "ErrUser",
    }
}
