//! Shared building blocks for the kadm5 workspace.
//!
//! - [`logging`]: structured logging bootstrap for binaries and tests
//! - [`time`]: the semantic time values exposed by principal accessors

pub mod logging;
pub mod time;

pub use time::{Lifetime, Moment};
