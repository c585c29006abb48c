use thiserror::Error;

/// Canonical result for core.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Outcome taxonomy shared by all three device access paths.
///
/// Partial transfers are not errors; they are `Ok(n)` with a short count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeviceError {
    /// Offset at or beyond the current capacity on read/write.
    #[error("no space left on device: offset {offset} >= capacity {capacity}")]
    OutOfSpace { offset: u64, capacity: u32 },

    /// The caller-provided location could not be read or written.
    #[error("bad address")]
    Fault,

    /// Reallocation on set-size failed; buffer left unchanged.
    #[error("cannot allocate {requested} bytes")]
    OutOfMemory { requested: u32 },

    /// Zero or unparsable size on the attribute path.
    #[error("invalid argument")]
    InvalidArgument,

    /// Unknown command code.
    #[error("inappropriate ioctl for device: {cmd:#x}")]
    UnsupportedOperation { cmd: u32 },
}

/// POSIX error numbers the host surfaces, negated as the driver returns them.
pub mod errno {
    pub const ENOMEM: i32 = 12;
    pub const EFAULT: i32 = 14;
    pub const EINVAL: i32 = 22;
    pub const ENOTTY: i32 = 25;
    pub const ENOSPC: i32 = 28;
}

impl DeviceError {
    /// Negative errno, distinguishable from any byte count.
    pub fn errno(&self) -> i32 {
        -match self {
            DeviceError::OutOfSpace { .. } => errno::ENOSPC,
            DeviceError::Fault => errno::EFAULT,
            DeviceError::OutOfMemory { .. } => errno::ENOMEM,
            DeviceError::InvalidArgument => errno::EINVAL,
            DeviceError::UnsupportedOperation { .. } => errno::ENOTTY,
        }
    }

    /// Short stable name used in reports.
    pub fn kind(&self) -> &'static str {
        match self {
            DeviceError::OutOfSpace { .. } => "out_of_space",
            DeviceError::Fault => "fault",
            DeviceError::OutOfMemory { .. } => "out_of_memory",
            DeviceError::InvalidArgument => "invalid_argument",
            DeviceError::UnsupportedOperation { .. } => "unsupported_operation",
        }
    }
}

/// Helper for hosts that speak `ssize_t`: a count on success, `-errno` on error.
pub fn to_ssize(res: std::result::Result<usize, DeviceError>) -> isize {
    match res {
        Ok(n) => n as isize,
        Err(e) => e.errno() as isize,
    }
}
