//! The shared buffer and its single lock.
//!
//! Capacity is never stored separately from the storage: it *is* the storage
//! length, read under the same guard, so no caller can observe one without the
//! other. Every primitive takes the lock once and holds it until it returns.

use parking_lot::Mutex;

use sharedbuf_core::budget::MemoryBudget;
use sharedbuf_core::config::DeviceConfig;
use sharedbuf_core::error::DeviceError;
use sharedbuf_core::hash::{hash_bytes, Hash256};
use sharedbuf_mem::{ByteBudget, OwnedBuf, PeakTracker};

use crate::log::{dev_debug, dev_info, dev_warn};
use crate::transfer::{UserSink, UserSource};

const STORAGE_TAG: &str = "device-buffer";

/// Point-in-time view of the buffer for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferStats {
    pub capacity: u32,
    pub peak_capacity: u32,
    pub budget_used: usize,
    pub budget_capacity: usize,
}

pub struct BufferManager {
    storage: Mutex<OwnedBuf>,
    budget: ByteBudget,
    peak: PeakTracker,
}

impl BufferManager {
    /// Allocate the buffer with `config.initial_capacity` zeroed bytes under a
    /// `config.mem_cap_bytes` ceiling.
    pub fn new(config: &DeviceConfig) -> Result<Self, DeviceError> {
        Self::with_budget(config.initial_capacity, ByteBudget::new(config.mem_cap_bytes))
    }

    pub fn with_budget(capacity: u32, budget: ByteBudget) -> Result<Self, DeviceError> {
        let storage = OwnedBuf::new_zeroed(&budget, capacity as usize, STORAGE_TAG).map_err(
            |_| DeviceError::OutOfMemory {
                requested: capacity,
            },
        )?;
        Ok(Self {
            storage: Mutex::new(storage),
            budget,
            peak: PeakTracker::new(capacity as usize),
        })
    }

    /// Zero every byte; the size is unchanged.
    pub fn clear(&self) {
        let mut buf = self.storage.lock();
        buf.zero();
        dev_info!(capacity = buf.len(), "buffer cleared");
    }

    /// Current capacity in bytes.
    pub fn get_size(&self) -> u32 {
        capacity_of(&self.storage.lock())
    }

    /// Reallocate to `new_size` bytes, keeping `[0, min(old, new_size))`.
    ///
    /// Zero is accepted here; callers that forbid it check before calling. On
    /// failure the buffer and its capacity are exactly as before.
    pub fn set_size(&self, new_size: u32) -> Result<(), DeviceError> {
        let mut buf = self.storage.lock();
        let _old = capacity_of(&buf);
        if let Err(_e) = buf.try_resize(new_size as usize) {
            dev_warn!(old = _old, requested = new_size, error = %_e, "buffer resize failed");
            return Err(DeviceError::OutOfMemory {
                requested: new_size,
            });
        }
        self.peak.record(new_size as usize);
        dev_info!(old = _old, new = new_size, "buffer resized");
        Ok(())
    }

    /// Copy up to `len` bytes starting at `offset` out to `sink`.
    ///
    /// Returns the number of bytes actually copied; the caller advances its
    /// own cursor by that amount.
    pub fn read_at<S>(&self, offset: u64, len: usize, sink: &mut S) -> Result<usize, DeviceError>
    where
        S: UserSink + ?Sized,
    {
        let buf = self.storage.lock();
        let (start, to_copy) = window(&buf, offset, len)?;
        dev_debug!(requested = len, to_copy, offset, "read");
        let copied = sink.copy_out(&buf[start..start + to_copy]);
        settle("read", to_copy, copied)
    }

    /// Copy up to `len` bytes from `source` into the buffer at `offset`.
    ///
    /// Never grows the buffer; bytes past the current capacity are dropped
    /// from the request.
    pub fn write_at<S>(
        &self,
        offset: u64,
        len: usize,
        source: &mut S,
    ) -> Result<usize, DeviceError>
    where
        S: UserSource + ?Sized,
    {
        let mut buf = self.storage.lock();
        let (start, to_copy) = window(&buf, offset, len)?;
        dev_debug!(requested = len, to_copy, offset, "write");
        let copied = source.copy_in(&mut buf[start..start + to_copy]);
        settle("write", to_copy, copied)
    }

    /// blake3 digest of the current contents.
    pub fn digest(&self) -> Hash256 {
        hash_bytes(&self.storage.lock())
    }

    /// Copy of the full contents, taken under the lock.
    pub fn snapshot(&self) -> Vec<u8> {
        self.storage.lock().to_vec()
    }

    pub fn stats(&self) -> BufferStats {
        let buf = self.storage.lock();
        BufferStats {
            capacity: capacity_of(&buf),
            peak_capacity: u32::try_from(self.peak.peak()).unwrap_or(u32::MAX),
            budget_used: self.budget.used_bytes(),
            budget_capacity: self.budget.capacity_bytes(),
        }
    }
}

impl std::fmt::Debug for BufferManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferManager")
            .field("stats", &self.stats())
            .finish()
    }
}

fn capacity_of(buf: &OwnedBuf) -> u32 {
    // Lengths only ever come from a u32 size request.
    buf.len() as u32
}

/// Bounds for a transfer: the start index and how many bytes may move.
///
/// An offset at or past the end is out of space, never a zero-length success.
fn window(buf: &OwnedBuf, offset: u64, len: usize) -> Result<(usize, usize), DeviceError> {
    let capacity = buf.len();
    if offset >= capacity as u64 {
        return Err(DeviceError::OutOfSpace {
            offset,
            capacity: capacity_of(buf),
        });
    }
    let start = offset as usize;
    Ok((start, len.min(capacity - start)))
}

/// Turn a copy count into the call's result.
///
/// A short copy, even one that moved nothing, is a success carrying the short
/// count.
fn settle(_op: &'static str, to_copy: usize, copied: usize) -> Result<usize, DeviceError> {
    if copied < to_copy {
        dev_warn!(op = _op, copied, to_copy, "could only copy {} bytes", copied);
    }
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::{BadAddress, Limited};

    fn manager(capacity: u32) -> BufferManager {
        BufferManager::with_budget(capacity, ByteBudget::new(1 << 20)).unwrap()
    }

    #[test]
    fn starts_zeroed_at_configured_size() {
        let m = BufferManager::new(&DeviceConfig::default()).unwrap();
        assert_eq!(m.get_size(), 64);
        assert!(m.snapshot().iter().all(|&b| b == 0));
    }

    #[test]
    fn write_then_read_round_trips_window() {
        let m = manager(16);
        assert_eq!(m.write_at(4, 5, &mut &b"hello"[..]).unwrap(), 5);
        let mut out = vec![0u8; 5];
        assert_eq!(m.read_at(4, 5, &mut out).unwrap(), 5);
        assert_eq!(out, b"hello");
    }

    #[test]
    fn transfer_is_clamped_to_capacity() {
        let m = manager(8);
        let data = [7u8; 20];
        assert_eq!(m.write_at(5, 20, &mut &data[..]).unwrap(), 3);
        let mut out = vec![0u8; 20];
        assert_eq!(m.read_at(0, 20, &mut out).unwrap(), 8);
        assert_eq!(&out[..8], &[0, 0, 0, 0, 0, 7, 7, 7]);
    }

    #[test]
    fn offset_at_capacity_is_out_of_space() {
        let m = manager(8);
        let mut out = vec![0u8; 4];
        let err = m.read_at(8, 4, &mut out).unwrap_err();
        assert_eq!(
            err,
            DeviceError::OutOfSpace {
                offset: 8,
                capacity: 8
            }
        );
        assert!(m.write_at(100, 1, &mut &b"x"[..]).is_err());
    }

    #[test]
    fn zero_length_in_range_is_success() {
        let m = manager(8);
        let mut out: Vec<u8> = Vec::new();
        assert_eq!(m.read_at(3, 0, &mut out).unwrap(), 0);
    }

    #[test]
    fn short_copy_reports_partial_count() {
        let m = manager(16);
        let data = [1u8; 10];
        let mut src = &data[..];
        let mut limited = Limited::new(&mut src, 6);
        assert_eq!(m.write_at(0, 10, &mut limited).unwrap(), 6);
        assert_eq!(&m.snapshot()[..7], &[1, 1, 1, 1, 1, 1, 0]);
    }

    #[test]
    fn copy_that_moves_nothing_reports_zero() {
        let m = manager(16);
        m.write_at(0, 4, &mut &b"keep"[..]).unwrap();
        assert_eq!(m.read_at(0, 4, &mut BadAddress), Ok(0));
        assert_eq!(m.write_at(0, 4, &mut BadAddress), Ok(0));
        assert_eq!(&m.snapshot()[..4], b"keep");
    }

    #[test]
    fn resize_preserves_prefix_and_tracks_peak() {
        let m = manager(4);
        m.write_at(0, 4, &mut &b"abcd"[..]).unwrap();
        m.set_size(10).unwrap();
        assert_eq!(m.get_size(), 10);
        assert_eq!(&m.snapshot()[..4], b"abcd");
        m.set_size(2).unwrap();
        assert_eq!(m.snapshot(), b"ab");
        m.set_size(0).unwrap();
        assert_eq!(m.get_size(), 0);
        assert_eq!(m.stats().peak_capacity, 10);
    }

    #[test]
    fn failed_resize_changes_nothing() {
        let m = BufferManager::with_budget(8, ByteBudget::new(16)).unwrap();
        m.write_at(0, 3, &mut &b"abc"[..]).unwrap();
        let before = m.digest();
        assert_eq!(
            m.set_size(17),
            Err(DeviceError::OutOfMemory { requested: 17 })
        );
        assert_eq!(m.get_size(), 8);
        assert_eq!(m.digest(), before);
        assert_eq!(m.stats().budget_used, 8);
    }

    #[test]
    fn clear_zeroes_without_resizing() {
        let m = manager(6);
        m.write_at(0, 6, &mut &b"secret"[..]).unwrap();
        m.clear();
        assert_eq!(m.get_size(), 6);
        assert_eq!(m.snapshot(), vec![0u8; 6]);
    }
}
