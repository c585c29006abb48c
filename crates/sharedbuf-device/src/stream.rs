//! Sequential access with a caller-owned cursor.
//!
//! The manager never stores cursors. A cursor can end up past the capacity
//! after another session shrinks the buffer; the next call on it then reports
//! out-of-space instead of being clamped.

use std::sync::Arc;

use sharedbuf_core::error::DeviceError;
use sharedbuf_core::id::{Major, Minor, SessionId};

use crate::log::dev_info;
use crate::manager::BufferManager;
use crate::transfer::{UserSink, UserSource};

/// Read at `*cursor`; on success advance it by the bytes moved.
pub fn read<S>(
    manager: &BufferManager,
    cursor: &mut u64,
    len: usize,
    sink: &mut S,
) -> Result<usize, DeviceError>
where
    S: UserSink + ?Sized,
{
    let delta = manager.read_at(*cursor, len, sink)?;
    *cursor += delta as u64;
    Ok(delta)
}

/// Write at `*cursor`; on success advance it by the bytes moved.
pub fn write<S>(
    manager: &BufferManager,
    cursor: &mut u64,
    len: usize,
    source: &mut S,
) -> Result<usize, DeviceError>
where
    S: UserSource + ?Sized,
{
    let delta = manager.write_at(*cursor, len, source)?;
    *cursor += delta as u64;
    Ok(delta)
}

/// One open handle on the stream node.
///
/// Holds its own position; dropping the session releases it.
pub struct StreamSession {
    id: SessionId,
    major: Major,
    minor: Minor,
    flags: u32,
    pos: u64,
    manager: Arc<BufferManager>,
}

impl StreamSession {
    pub fn open(
        manager: Arc<BufferManager>,
        id: SessionId,
        major: Major,
        minor: Minor,
        flags: u32,
    ) -> Self {
        let session = Self {
            id,
            major,
            minor,
            flags,
            pos: 0,
            manager,
        };
        dev_info!(
            session = id.get(),
            major = major.get(),
            minor = minor.get(),
            pos = session.pos,
            flags,
            "session opened"
        );
        session
    }

    pub fn read<S>(&mut self, len: usize, sink: &mut S) -> Result<usize, DeviceError>
    where
        S: UserSink + ?Sized,
    {
        read(&self.manager, &mut self.pos, len, sink)
    }

    pub fn write<S>(&mut self, len: usize, source: &mut S) -> Result<usize, DeviceError>
    where
        S: UserSource + ?Sized,
    {
        write(&self.manager, &mut self.pos, len, source)
    }

    /// Read up to `len` bytes into a fresh vector sized to what was moved.
    ///
    /// The scratch space never exceeds the current capacity; a concurrent grow
    /// only shortens the read.
    pub fn read_vec(&mut self, len: usize) -> Result<Vec<u8>, DeviceError> {
        let mut out = vec![0u8; len.min(self.manager.get_size() as usize)];
        let n = self.read(len, &mut out)?;
        out.truncate(n);
        Ok(out)
    }

    /// Write all of `data` (subject to capacity clamping).
    pub fn write_bytes(&mut self, mut data: &[u8]) -> Result<usize, DeviceError> {
        self.write(data.len(), &mut data)
    }

    /// Absolute repositioning. Not validated against the capacity.
    pub fn seek(&mut self, pos: u64) {
        self.pos = pos;
    }

    pub fn position(&self) -> u64 {
        self.pos
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn device_numbers(&self) -> (Major, Minor) {
        (self.major, self.minor)
    }

    pub fn flags(&self) -> u32 {
        self.flags
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        dev_info!(session = self.id.get(), pos = self.pos, "session released");
    }
}

impl std::fmt::Debug for StreamSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamSession")
            .field("id", &self.id)
            .field("pos", &self.pos)
            .finish()
    }
}
