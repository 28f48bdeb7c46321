//! Exit codes of the `sparkmark` binary, following the BSD `sysexits` convention.

/// Successful termination
pub const SUCCESS: i32 = 0;

/// Command line usage error
pub const USAGE: i32 = 64;

/// Internal failure while running a command
pub const SOFTWARE: i32 = 70;

/// Missing or invalid configuration, including absent CSRF/HMAC keys
pub const CONFIG: i32 = 78;
