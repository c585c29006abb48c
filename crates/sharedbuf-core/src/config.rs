//! Device configuration that the CLI and scripts can serialize/deserialize.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Capacity the buffer starts with when nothing overrides it.
pub const DEFAULT_BUFFER_SIZE: u32 = 64;

/// Default hard ceiling for the buffer allocation (16 MiB).
pub const DEFAULT_MEM_CAP_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Name the stream node and attribute directory are registered under.
    pub name: String,

    /// Capacity the buffer is allocated with at load time. Must be positive.
    pub initial_capacity: u32,

    /// Hard memory cap (in bytes). A resize beyond this reports out-of-memory.
    pub mem_cap_bytes: usize,

    /// Name of the textual size property.
    pub attribute_name: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: "hello_cdev".to_string(),
            initial_capacity: DEFAULT_BUFFER_SIZE,
            mem_cap_bytes: DEFAULT_MEM_CAP_BYTES,
            attribute_name: "buffer_size".to_string(),
        }
    }
}

impl DeviceConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `SHAREDBUF_NAME`: device name
    /// - `SHAREDBUF_BUFFER_SIZE`: initial buffer capacity in bytes
    /// - `SHAREDBUF_MEM_CAP_BYTES`: memory cap in bytes
    ///
    /// Unparsable numeric values are ignored.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(s) = std::env::var("SHAREDBUF_NAME") {
            if !s.trim().is_empty() {
                cfg.name = s;
            }
        }

        if let Ok(s) = std::env::var("SHAREDBUF_BUFFER_SIZE") {
            if let Ok(v) = s.trim().parse::<u32>() {
                cfg.initial_capacity = v;
            }
        }

        if let Ok(s) = std::env::var("SHAREDBUF_MEM_CAP_BYTES") {
            if let Ok(v) = s.trim().parse::<usize>() {
                cfg.mem_cap_bytes = v;
            }
        }

        cfg
    }

    /// Check the load-time invariants.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::Config("device name must not be empty".into()));
        }
        if self.initial_capacity == 0 {
            return Err(Error::Config(
                "initial_capacity must be a positive integer".into(),
            ));
        }
        if self.initial_capacity as usize > self.mem_cap_bytes {
            return Err(Error::Config(format!(
                "initial_capacity {} exceeds mem_cap_bytes {}",
                self.initial_capacity, self.mem_cap_bytes
            )));
        }
        Ok(())
    }
}

/// Optional overrides layered on top of a base config (script `config:` block,
/// command-line flags).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigOverrides {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "buffer_size")]
    pub initial_capacity: Option<u32>,
    #[serde(default)]
    pub mem_cap_bytes: Option<usize>,
}

impl ConfigOverrides {
    pub fn apply(&self, cfg: &mut DeviceConfig) {
        if let Some(name) = &self.name {
            cfg.name = name.clone();
        }
        if let Some(cap) = self.initial_capacity {
            cfg.initial_capacity = cap;
        }
        if let Some(mem) = self.mem_cap_bytes {
            cfg.mem_cap_bytes = mem;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_module_parameter() {
        let cfg = DeviceConfig::default();
        assert_eq!(cfg.initial_capacity, 64);
        assert_eq!(cfg.attribute_name, "buffer_size");
        cfg.validate().expect("defaults are valid");
    }

    #[test]
    fn zero_initial_capacity_is_rejected() {
        let cfg = DeviceConfig {
            initial_capacity: 0,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn initial_capacity_above_cap_is_rejected() {
        let cfg = DeviceConfig {
            initial_capacity: 4096,
            mem_cap_bytes: 1024,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn overrides_apply_only_present_fields() {
        let mut cfg = DeviceConfig::default();
        let ov = ConfigOverrides {
            initial_capacity: Some(128),
            ..Default::default()
        };
        ov.apply(&mut cfg);
        assert_eq!(cfg.initial_capacity, 128);
        assert_eq!(cfg.name, "hello_cdev");
        assert_eq!(cfg.mem_cap_bytes, DEFAULT_MEM_CAP_BYTES);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: DeviceConfig = serde_json::from_str(r#"{"initial_capacity": 32}"#).unwrap();
        assert_eq!(cfg.initial_capacity, 32);
        assert_eq!(cfg.name, "hello_cdev");
    }
}
