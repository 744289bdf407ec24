//! Exit codes for the `almaseo` binary.
//!
//! Refresh failures map through `RefreshError::exit_code`:
//! 2 unauthorized, 3 not found, 5 network/timeout/rate limit,
//! 6 backend failure or unreadable response.

use almaseo_refresh::RefreshError;

pub const SUCCESS: i32 = 0;
pub const CONFIG_ERROR: i32 = 1; // Bad flags, env or site URL

pub fn for_error(err: &RefreshError) -> i32 {
    err.exit_code()
}
