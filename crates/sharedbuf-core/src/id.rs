//! Strongly-typed identifiers.
//!
//! Downstream crates should *not* pass raw integers around for sessions or
//! device numbers.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! new_id {
    ($name:ident, $repr:ty) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Ord, PartialOrd,
        )]
        #[serde(transparent)]
        pub struct $name($repr);

        impl $name {
            pub const fn new(v: $repr) -> Self {
                Self(v)
            }
            pub const fn get(self) -> $repr {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

new_id!(SessionId, u64);
new_id!(Major, u32);
new_id!(Minor, u32);
