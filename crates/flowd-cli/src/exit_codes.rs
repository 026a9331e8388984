//! Coarse, CI-friendly exit codes for the `flowd` binary.

/// Everything ran and every step completed.
pub const EXIT_SUCCESS: i32 = 0;

/// A step (or the whole run, under `--strict`) failed.
pub const EXIT_RUN_FAILURE: i32 = 1;

/// Argument binding or config load failed before any execution started.
pub const EXIT_ARGS_ERROR: i32 = 2;
