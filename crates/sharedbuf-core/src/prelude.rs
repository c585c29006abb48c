//! Convenient re-exports for downstream crates.

pub use crate::config::{ConfigOverrides, DeviceConfig};
pub use crate::error::{DeviceError, Error, Result};
pub use crate::hash::Hash256;
pub use crate::id::{Major, Minor, SessionId};
pub use crate::report::{RunReport, StepOutcome};
