//! Byte budget + RAII guard.
//!
//! Storage must *always* hold a guard for the bytes it occupies. Dropping the
//! guard returns the bytes to the budget (panic-safe).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use sharedbuf_core::budget::{BudgetGuard, MemoryBudget};

struct BudgetInner {
    capacity: usize,
    used: AtomicUsize,
}

impl BudgetInner {
    fn try_take(&self, bytes: usize) -> bool {
        let mut cur = self.used.load(Ordering::Relaxed);
        loop {
            let next = match cur.checked_add(bytes) {
                Some(n) if n <= self.capacity => n,
                _ => return false,
            };
            match self
                .used
                .compare_exchange_weak(cur, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return true,
                Err(observed) => cur = observed,
            }
        }
    }

    fn give_back(&self, bytes: usize) {
        self.used.fetch_sub(bytes, Ordering::AcqRel);
    }
}

/// Hard ceiling on buffer storage. Cloning shares the same accounting.
#[derive(Clone)]
pub struct ByteBudget {
    inner: Arc<BudgetInner>,
}

impl ByteBudget {
    pub fn new(capacity_bytes: usize) -> Self {
        Self {
            inner: Arc::new(BudgetInner {
                capacity: capacity_bytes,
                used: AtomicUsize::new(0),
            }),
        }
    }

    /// Bytes still available (advisory).
    pub fn available_bytes(&self) -> usize {
        self.inner
            .capacity
            .saturating_sub(self.inner.used.load(Ordering::Relaxed))
    }
}

impl std::fmt::Debug for ByteBudget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ByteBudget")
            .field("capacity", &self.inner.capacity)
            .field("used", &self.inner.used.load(Ordering::Relaxed))
            .finish()
    }
}

impl MemoryBudget for ByteBudget {
    type Guard = ByteGuard;

    fn try_acquire(&self, bytes: usize, tag: &'static str) -> Option<ByteGuard> {
        if bytes > 0 && !self.inner.try_take(bytes) {
            return None;
        }
        Some(ByteGuard {
            inner: Arc::clone(&self.inner),
            bytes,
            tag,
        })
    }

    fn capacity_bytes(&self) -> usize {
        self.inner.capacity
    }

    fn used_bytes(&self) -> usize {
        self.inner.used.load(Ordering::Relaxed)
    }
}

/// Accounts for a number of bytes; dropping it returns them to the budget.
pub struct ByteGuard {
    inner: Arc<BudgetInner>,
    bytes: usize,
    tag: &'static str,
}

impl ByteGuard {
    /// Move this guard to `new_bytes`. Shrinking always succeeds; growing fails
    /// (leaving the guard untouched) when the delta does not fit.
    pub fn try_resize(&mut self, new_bytes: usize) -> bool {
        if new_bytes <= self.bytes {
            self.inner.give_back(self.bytes - new_bytes);
            self.bytes = new_bytes;
            return true;
        }
        if self.inner.try_take(new_bytes - self.bytes) {
            self.bytes = new_bytes;
            true
        } else {
            false
        }
    }

    /// Capacity of the budget this guard draws from.
    pub fn budget_capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Bytes in use across the whole budget.
    pub fn budget_used(&self) -> usize {
        self.inner.used.load(Ordering::Relaxed)
    }
}

impl Drop for ByteGuard {
    fn drop(&mut self) {
        if self.bytes > 0 {
            self.inner.give_back(self.bytes);
            // NOTE: do not log here to keep drop path fast.
            self.bytes = 0;
        }
    }
}

impl BudgetGuard for ByteGuard {
    fn bytes(&self) -> usize {
        self.bytes
    }
    fn tag(&self) -> &'static str {
        self.tag
    }
}

impl std::fmt::Debug for ByteGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ByteGuard")
            .field("bytes", &self.bytes)
            .field("tag", &self.tag)
            .finish()
    }
}
