//! Argument handling that is common to the demos.

use anyhow::Context;
use std::env;

/// Returns the first positional argument, falling back to the environment
/// variable `var`.
pub fn argument(var: &str) -> Option<String> {
    env::args().nth(1).or_else(|| env::var(var).ok())
}

/// Like [`argument`], but the value is required.
#[allow(dead_code)]
pub fn device_path() -> anyhow::Result<String> {
    argument(DEVICE_VAR).context(NO_DEVICE_PATH)
}

pub const DEVICE_VAR: &str = "CMDLINK_DEVICE";

const NO_DEVICE_PATH: &str = "No device path specified.\nEither provide it as \
    the first argument, or set the CMDLINK_DEVICE environment variable.";
