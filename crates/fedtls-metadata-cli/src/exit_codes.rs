//! Process exit codes. Part of the public contract for scripts and cron jobs.

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1; // Fetch, verification or lookup failed
pub const CACHE_OR_CONFIG_ERROR: i32 = 2; // Cached copy could not be reused, or bad configuration
