//! Exit code standardization for runsonctl
//!
//! Provides consistent exit codes for different error types so scripts can
//! tell a bad query apart from a broken dataset.
//!
//! ## Exit Code Convention
//!
//! - `0` = Success
//! - `1` = User error (unknown runner, invalid criteria, bad timestamps)
//! - `2` = System error (I/O failure, unreadable or ambiguous catalog)
//! - `3` = Configuration error (settings or runner file parse error)

use crate::error::RunsonError;

/// Standard exit codes for runsonctl
pub mod codes {
    /// Success
    pub const SUCCESS: i32 = 0;
    /// User error (invalid input, validation failure)
    pub const USER_ERROR: i32 = 1;
    /// System error (I/O failure, broken dataset)
    pub const SYSTEM_ERROR: i32 = 2;
    /// Configuration error (settings or runs-on.yml problems)
    pub const CONFIG_ERROR: i32 = 3;
}

/// Map a RunsonError to an appropriate exit code
pub fn exit_code_for_error(error: &RunsonError) -> i32 {
    use RunsonError::*;
    match error {
        Config(_) => codes::CONFIG_ERROR,

        UnknownRunner { .. } => codes::USER_ERROR,
        InvalidCriteria { .. } => codes::USER_ERROR,
        InvalidDuration { .. } => codes::USER_ERROR,
        UnknownRunnerLabel { .. } => codes::USER_ERROR,
        UnresolvedRunner { .. } => codes::USER_ERROR,

        CatalogLoad(_) => codes::SYSTEM_ERROR,
        DuplicateInstance { .. } => codes::SYSTEM_ERROR,
        Io(_) => codes::SYSTEM_ERROR,
        Json(_) => codes::SYSTEM_ERROR,
    }
}

/// Map an anyhow error chain to an exit code, looking for the first
/// `RunsonError` in the chain.
pub fn exit_code_for_anyhow(error: &anyhow::Error) -> i32 {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<RunsonError>())
        .map(exit_code_for_error)
        .unwrap_or(codes::USER_ERROR)
}
