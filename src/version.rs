//! Generator version information.
//!
//! Written into the header of every generated test file so a stale file can be traced
//! back to the release that produced it.

/// The tfscenario version string (for example, `0.1.0`).
pub const TFSCENARIO_VERSION: &str = env!("CARGO_PKG_VERSION");
