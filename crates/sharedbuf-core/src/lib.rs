#![forbid(unsafe_code)]
//! sharedbuf-core: configuration, identifiers, error taxonomy and hashing shared
//! by every sharedbuf crate.
//!
//! No locking or allocation policy lives here. The budget *interfaces* are
//! declared in [`budget`] and implemented by `sharedbuf-mem`.

pub mod budget;
pub mod config;
pub mod error;
pub mod hash;
pub mod id;
pub mod prelude;
pub mod report;

/// Crate version string recorded in run reports.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
