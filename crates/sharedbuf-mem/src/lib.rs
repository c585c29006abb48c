#![forbid(unsafe_code)]
//! sharedbuf-mem: hard memory budgeting and the fallible byte storage that
//! backs the device buffer.
//!
//! Every byte of buffer storage is accounted against a [`ByteBudget`] through an
//! RAII guard, so a resize that does not fit is refused before anything is
//! reallocated.

pub mod error;
pub mod guard;
pub mod pool;
pub mod tracking;

pub use guard::{ByteBudget, ByteGuard};
pub use pool::OwnedBuf;
pub use tracking::PeakTracker;
