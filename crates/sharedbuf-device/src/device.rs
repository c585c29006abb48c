//! Load/unload lifecycle.
//!
//! Loading allocates the buffer, then registers the stream node, the attribute
//! directory and the attribute group, in that order. If any step fails, every
//! step that already succeeded is undone in reverse and the buffer is released.
//! Unloading runs the same teardown.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use thiserror::Error;

use sharedbuf_core::config::DeviceConfig;
use sharedbuf_core::error::{DeviceError, Error as CoreError};
use sharedbuf_core::id::{Major, Minor, SessionId};

use crate::attribute::SizeAttribute;
use crate::command::CommandFacade;
use crate::log::{dev_error, dev_info};
use crate::manager::BufferManager;
use crate::stream::StreamSession;

/// Which registration step failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    StreamNode,
    AttributeDir,
    AttributeGroup,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Stage::StreamNode => "stream node",
            Stage::AttributeDir => "attribute directory",
            Stage::AttributeGroup => "attribute group",
        })
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Config(#[from] CoreError),

    #[error("buffer allocation failed: {0}")]
    Alloc(DeviceError),

    #[error("failed to register {stage}: {reason}")]
    Register { stage: Stage, reason: String },
}

/// Host-side registration of the device's external nodes.
pub trait Registrar {
    /// Register the stream node; returns the assigned major number.
    fn register_stream(&mut self, name: &str) -> Result<Major, String>;
    fn unregister_stream(&mut self, major: Major, name: &str);

    fn create_attribute_dir(&mut self, name: &str) -> Result<(), String>;
    fn remove_attribute_dir(&mut self, name: &str);

    fn create_attribute_group(&mut self, dir: &str, attrs: &[&str]) -> Result<(), String>;
    fn remove_attribute_group(&mut self, dir: &str, attrs: &[&str]);
}

/// In-process registrar: dynamic majors counting down from 254, plus an
/// optional stage to fail at for exercising the unwind path.
#[derive(Debug)]
pub struct LocalRegistrar {
    next_major: u32,
    streams: BTreeMap<String, Major>,
    dirs: BTreeMap<String, BTreeSet<String>>,
    fail_at: Option<Stage>,
}

impl Default for LocalRegistrar {
    fn default() -> Self {
        Self {
            next_major: 254,
            streams: BTreeMap::new(),
            dirs: BTreeMap::new(),
            fail_at: None,
        }
    }
}

impl LocalRegistrar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_at(stage: Stage) -> Self {
        Self {
            fail_at: Some(stage),
            ..Self::default()
        }
    }

    pub fn stream_major(&self, name: &str) -> Option<Major> {
        self.streams.get(name).copied()
    }

    pub fn has_attribute_dir(&self, name: &str) -> bool {
        self.dirs.contains_key(name)
    }

    pub fn attributes(&self, dir: &str) -> Vec<String> {
        self.dirs
            .get(dir)
            .map(|a| a.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Nothing registered at all.
    pub fn is_empty(&self) -> bool {
        self.streams.is_empty() && self.dirs.is_empty()
    }

    fn check(&self, stage: Stage) -> Result<(), String> {
        if self.fail_at == Some(stage) {
            return Err(format!("injected failure at {stage}"));
        }
        Ok(())
    }
}

impl Registrar for LocalRegistrar {
    fn register_stream(&mut self, name: &str) -> Result<Major, String> {
        self.check(Stage::StreamNode)?;
        if self.streams.contains_key(name) {
            return Err(format!("{name} already registered"));
        }
        if self.next_major == 0 {
            return Err("no free major numbers".to_string());
        }
        let major = Major::new(self.next_major);
        self.next_major -= 1;
        self.streams.insert(name.to_string(), major);
        Ok(major)
    }

    fn unregister_stream(&mut self, major: Major, name: &str) {
        if self.streams.get(name) == Some(&major) {
            self.streams.remove(name);
        }
    }

    fn create_attribute_dir(&mut self, name: &str) -> Result<(), String> {
        self.check(Stage::AttributeDir)?;
        if self.dirs.contains_key(name) {
            return Err(format!("{name} already exists"));
        }
        self.dirs.insert(name.to_string(), BTreeSet::new());
        Ok(())
    }

    fn remove_attribute_dir(&mut self, name: &str) {
        self.dirs.remove(name);
    }

    fn create_attribute_group(&mut self, dir: &str, attrs: &[&str]) -> Result<(), String> {
        self.check(Stage::AttributeGroup)?;
        let entries = self
            .dirs
            .get_mut(dir)
            .ok_or_else(|| format!("{dir} does not exist"))?;
        entries.extend(attrs.iter().map(|a| a.to_string()));
        Ok(())
    }

    fn remove_attribute_group(&mut self, dir: &str, attrs: &[&str]) {
        if let Some(entries) = self.dirs.get_mut(dir) {
            for a in attrs {
                entries.remove(*a);
            }
        }
    }
}

/// A loaded device: the buffer plus its three access paths.
#[derive(Debug)]
pub struct Device {
    config: DeviceConfig,
    major: Major,
    manager: Arc<BufferManager>,
    commands: CommandFacade,
    attribute: SizeAttribute,
    next_session: AtomicU64,
}

impl Device {
    pub fn load(config: DeviceConfig, registrar: &mut dyn Registrar) -> Result<Self, LoadError> {
        config.validate()?;

        let manager = Arc::new(BufferManager::new(&config).map_err(LoadError::Alloc)?);

        let major = match registrar.register_stream(&config.name) {
            Ok(major) => major,
            Err(reason) => {
                dev_error!(name = %config.name, %reason, "can't register major number");
                return Err(LoadError::Register {
                    stage: Stage::StreamNode,
                    reason,
                });
            }
        };

        if let Err(reason) = registrar.create_attribute_dir(&config.name) {
            dev_error!(name = %config.name, %reason, "failed to create attribute directory");
            registrar.unregister_stream(major, &config.name);
            return Err(LoadError::Register {
                stage: Stage::AttributeDir,
                reason,
            });
        }

        if let Err(reason) =
            registrar.create_attribute_group(&config.name, &[config.attribute_name.as_str()])
        {
            dev_error!(name = %config.name, %reason, "failed to create attribute group");
            registrar.remove_attribute_dir(&config.name);
            registrar.unregister_stream(major, &config.name);
            return Err(LoadError::Register {
                stage: Stage::AttributeGroup,
                reason,
            });
        }

        dev_info!(name = %config.name, major = major.get(), "registered");

        Ok(Self {
            commands: CommandFacade::new(Arc::clone(&manager)),
            attribute: SizeAttribute::new(config.attribute_name.clone(), Arc::clone(&manager)),
            manager,
            major,
            config,
            next_session: AtomicU64::new(1),
        })
    }

    /// Open a new stream session positioned at 0.
    pub fn open(&self, flags: u32) -> StreamSession {
        let id = SessionId::new(self.next_session.fetch_add(1, Ordering::Relaxed));
        StreamSession::open(Arc::clone(&self.manager), id, self.major, Minor::new(0), flags)
    }

    pub fn commands(&self) -> &CommandFacade {
        &self.commands
    }

    pub fn attribute(&self) -> &SizeAttribute {
        &self.attribute
    }

    pub fn manager(&self) -> &Arc<BufferManager> {
        &self.manager
    }

    pub fn major(&self) -> Major {
        self.major
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Unregister everything and release the buffer.
    ///
    /// Sessions still open keep the storage alive until they are dropped, but
    /// the device is no longer reachable through the registrar.
    pub fn unload(self, registrar: &mut dyn Registrar) {
        let name = self.config.name.as_str();
        registrar.remove_attribute_group(name, &[self.config.attribute_name.as_str()]);
        registrar.remove_attribute_dir(name);
        registrar.unregister_stream(self.major, name);
        dev_info!(name, "unregistered");
    }
}
