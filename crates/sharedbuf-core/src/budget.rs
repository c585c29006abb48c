//! Abstract memory budget interfaces.
//!
//! The concrete implementation lives in `sharedbuf-mem`. Only traits live here
//! so the device crate can name the API without pulling allocator details.

/// A guard returned by a memory budget when bytes are acquired.
///
/// Must release its bytes on Drop and be `Send`, since the buffer that owns it
/// moves between sessions behind the device lock.
pub trait BudgetGuard: Send {
    /// Number of bytes currently accounted for by this guard.
    fn bytes(&self) -> usize;
    /// Optional debug tag for tracing.
    fn tag(&self) -> &'static str {
        "guard"
    }
}

/// A hard ceiling on how many bytes the device buffer may occupy.
///
/// Callers use `try_acquire` before allocating. `None` means the request does
/// not fit and must be reported as out-of-memory.
pub trait MemoryBudget: Send + Sync + 'static {
    type Guard: BudgetGuard;

    /// Attempt to acquire `bytes` from the live budget. Returns a guard on success.
    fn try_acquire(&self, bytes: usize, tag: &'static str) -> Option<Self::Guard>;

    /// Total configured capacity (bytes).
    fn capacity_bytes(&self) -> usize;

    /// Currently accounted bytes (advisory; not a correctness API).
    fn used_bytes(&self) -> usize;
}

// NOTE: Do *not* add default impls here that would silently "allow" allocations.
// The mem crate is the only place where guards should be constructed.
