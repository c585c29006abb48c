use thiserror::Error;

/// Result type local to sharedbuf-mem.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("memory budget exceeded for tag '{tag}': requested {requested} bytes, capacity {capacity}, used {used}")]
    BudgetExceeded {
        tag: &'static str,
        requested: usize,
        capacity: usize,
        used: usize,
    },

    #[error("allocation failed for {bytes} bytes (tag '{tag}')")]
    AllocFailed { tag: &'static str, bytes: usize },
}
