#![forbid(unsafe_code)]
//! sharedbuf-device: one shared, resizable byte buffer and the three access
//! paths that reach it.
//!
//! - [`manager::BufferManager`] owns the storage and serializes every primitive
//!   through a single lock.
//! - [`stream`] is sequential read/write against a caller-owned cursor.
//! - [`command`] decodes ioctl-style op codes with 4-byte arguments.
//! - [`attribute`] exposes the size as decimal text.
//! - [`device`] wires all three up at load time and tears them down on unload.

mod log;

pub mod attribute;
pub mod command;
pub mod device;
pub mod manager;
pub mod script;
pub mod stream;
pub mod transfer;

pub use attribute::SizeAttribute;
pub use command::{Command, CommandFacade};
pub use device::{Device, LoadError, LocalRegistrar, Registrar};
pub use manager::{BufferManager, BufferStats};
pub use stream::StreamSession;
pub use transfer::{BadAddress, Limited, UserSink, UserSource, UserWord};
