//! Fallible, budget-accounted byte storage.
//!
//! `OwnedBuf` always has `len() == accounted_bytes()`: the guard and the
//! storage move together, and a failed resize leaves both exactly as they were.

use std::ops::{Deref, DerefMut};

use sharedbuf_core::budget::{BudgetGuard, MemoryBudget};

use crate::error::{Error, Result};
use crate::guard::{ByteBudget, ByteGuard};

/// Owned byte storage that returns its accounted bytes on drop via the guard.
pub struct OwnedBuf {
    guard: ByteGuard,
    buf: Vec<u8>,
}

impl OwnedBuf {
    /// Allocate `len` zeroed bytes, accounting against `budget`.
    pub fn new_zeroed(budget: &ByteBudget, len: usize, tag: &'static str) -> Result<Self> {
        let guard = budget
            .try_acquire(len, tag)
            .ok_or_else(|| Error::BudgetExceeded {
                tag,
                requested: len,
                capacity: budget.capacity_bytes(),
                used: budget.used_bytes(),
            })?;

        let mut buf = Vec::new();
        buf.try_reserve_exact(len)
            .map_err(|_| Error::AllocFailed { tag, bytes: len })?;
        buf.resize(len, 0u8);

        Ok(Self { guard, buf })
    }

    /// Current accounted size (bytes).
    pub fn accounted_bytes(&self) -> usize {
        self.guard.bytes()
    }

    /// Resize to `new_len` bytes, keeping `[0, min(old, new_len))`.
    ///
    /// Growth acquires budget first and then reserves; if either step fails the
    /// storage, its length and the accounted bytes are unchanged. Bytes past the
    /// old length have no meaningful content (they happen to be zero here).
    pub fn try_resize(&mut self, new_len: usize) -> Result<()> {
        let old_len = self.buf.len();
        if new_len <= old_len {
            self.buf.truncate(new_len);
            self.buf.shrink_to_fit();
            self.guard.try_resize(new_len);
            return Ok(());
        }

        let tag = self.guard.tag();
        let accounted = self.guard.bytes();
        if !self.guard.try_resize(new_len) {
            return Err(Error::BudgetExceeded {
                tag,
                requested: new_len,
                capacity: self.guard.budget_capacity(),
                used: self.guard.budget_used(),
            });
        }
        if self.buf.try_reserve_exact(new_len - old_len).is_err() {
            self.guard.try_resize(accounted);
            return Err(Error::AllocFailed {
                tag,
                bytes: new_len,
            });
        }
        self.buf.resize(new_len, 0u8);
        Ok(())
    }

    /// Overwrite every byte with zero; length unchanged.
    pub fn zero(&mut self) {
        self.buf.fill(0);
    }
}

impl Deref for OwnedBuf {
    type Target = [u8];
    fn deref(&self) -> &Self::Target {
        &self.buf
    }
}

impl DerefMut for OwnedBuf {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.buf
    }
}

impl std::fmt::Debug for OwnedBuf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OwnedBuf")
            .field("len", &self.buf.len())
            .field("guard", &self.guard)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_zeroed_accounts_and_zeroes() {
        let budget = ByteBudget::new(1024);
        let buf = OwnedBuf::new_zeroed(&budget, 64, "dev").unwrap();
        assert_eq!(buf.len(), 64);
        assert!(buf.iter().all(|&b| b == 0));
        assert_eq!(budget.used_bytes(), 64);
        drop(buf);
        assert_eq!(budget.used_bytes(), 0);
    }

    #[test]
    fn grow_preserves_prefix() {
        let budget = ByteBudget::new(1024);
        let mut buf = OwnedBuf::new_zeroed(&budget, 4, "dev").unwrap();
        buf.copy_from_slice(b"abcd");
        buf.try_resize(8).unwrap();
        assert_eq!(buf.len(), 8);
        assert_eq!(&buf[..4], b"abcd");
        assert_eq!(buf.accounted_bytes(), 8);
        assert_eq!(budget.used_bytes(), 8);
    }

    #[test]
    fn shrink_truncates_and_releases_budget() {
        let budget = ByteBudget::new(1024);
        let mut buf = OwnedBuf::new_zeroed(&budget, 8, "dev").unwrap();
        buf.copy_from_slice(b"abcdefgh");
        buf.try_resize(3).unwrap();
        assert_eq!(&buf[..], b"abc");
        assert_eq!(budget.used_bytes(), 3);
        buf.try_resize(0).unwrap();
        assert!(buf.is_empty());
        assert_eq!(budget.used_bytes(), 0);
    }

    #[test]
    fn grow_past_budget_leaves_everything_unchanged() {
        let budget = ByteBudget::new(100);
        let mut buf = OwnedBuf::new_zeroed(&budget, 10, "dev").unwrap();
        buf[0] = 7;
        let err = buf.try_resize(101).unwrap_err();
        assert!(matches!(err, Error::BudgetExceeded { .. }));
        assert_eq!(buf.len(), 10);
        assert_eq!(buf[0], 7);
        assert_eq!(buf.accounted_bytes(), 10);
        assert_eq!(budget.used_bytes(), 10);
    }

    #[test]
    fn initial_allocation_over_budget_fails() {
        let budget = ByteBudget::new(16);
        assert!(OwnedBuf::new_zeroed(&budget, 17, "dev").is_err());
        assert_eq!(budget.used_bytes(), 0);
    }

    #[test]
    fn zero_clears_in_place() {
        let budget = ByteBudget::new(16);
        let mut buf = OwnedBuf::new_zeroed(&budget, 4, "dev").unwrap();
        buf.copy_from_slice(&[1, 2, 3, 4]);
        buf.zero();
        assert_eq!(&buf[..], &[0, 0, 0, 0]);
        assert_eq!(buf.len(), 4);
    }
}
