//! Stable exit codes for `botforge` CLI commands.

/// Command succeeded; for `forge`, the job reached `done`.
pub const OK: i32 = 0;
/// Invalid input or configuration, or any other error before a job ran.
pub const INVALID: i32 = 1;
/// `forge` ran the pipeline and the job ended `failed`.
pub const FAILED: i32 = 2;
/// `status` or `delete` named a job id that does not exist.
pub const NOT_FOUND: i32 = 3;
