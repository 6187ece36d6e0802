//! Logging setup shared by prwatch binaries.
//!
//! Human-readable output for terminals, JSON lines for log shippers. Both
//! honour `RUST_LOG` and fall back to a caller-supplied default level.

pub mod logging;
