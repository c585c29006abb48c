//! Logging hooks (feature: `tracing`).
//!
//! The macros expand to nothing unless the feature is enabled, so call sites
//! never need their own `cfg`.

macro_rules! dev_debug {
    ($($arg:tt)+) => {
        #[cfg(feature = "tracing")]
        {
            tracing::debug!(target: "sharedbuf", $($arg)+);
        }
    };
}

macro_rules! dev_info {
    ($($arg:tt)+) => {
        #[cfg(feature = "tracing")]
        {
            tracing::info!(target: "sharedbuf", $($arg)+);
        }
    };
}

macro_rules! dev_warn {
    ($($arg:tt)+) => {
        #[cfg(feature = "tracing")]
        {
            tracing::warn!(target: "sharedbuf", $($arg)+);
        }
    };
}

macro_rules! dev_error {
    ($($arg:tt)+) => {
        #[cfg(feature = "tracing")]
        {
            tracing::error!(target: "sharedbuf", $($arg)+);
        }
    };
}

pub(crate) use {dev_debug, dev_error, dev_info, dev_warn};
