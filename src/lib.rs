#![forbid(unsafe_code)]
//! sharedbuf: one in-memory byte buffer reachable through a stream interface,
//! a binary command interface and a textual size attribute.
//!
//! This crate only re-exports the workspace members; see `sharedbuf-device`
//! for the buffer manager and its access paths.

pub use sharedbuf_core;
pub use sharedbuf_device;
pub use sharedbuf_mem;

pub use sharedbuf_core::config::DeviceConfig;
pub use sharedbuf_core::error::DeviceError;
pub use sharedbuf_device::{BufferManager, CommandFacade, Device, SizeAttribute, StreamSession};
