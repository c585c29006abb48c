//! YAML-scripted sessions against a freshly loaded device.
//!
//! Example:
//! ```yaml
//! config: { initial_capacity: 64 }
//! steps:
//!   - { op: write, fill: 65, len: 100 }
//!   - { op: get_size }
//!   - { op: set_size, size: 128 }
//!   - { op: seek, offset: 0 }
//!   - { op: read, len: 200 }
//!   - { op: attr_store, text: "0" }
//! ```
//!
//! Every step targets session `"default"` unless it names another one. A
//! session is opened on first use.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use sharedbuf_core::config::{ConfigOverrides, DeviceConfig};
use sharedbuf_core::error::DeviceError;
use sharedbuf_core::report::{RunReport, StepOutcome};

use crate::command;
use crate::device::{Device, LoadError, LocalRegistrar};
use crate::stream::StreamSession;
use crate::transfer::{BadAddress, Limited};

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("script parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid script: {0}")]
    Invalid(String),

    #[error(transparent)]
    Load(#[from] LoadError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Script {
    #[serde(default)]
    pub config: Option<ConfigOverrides>,
    pub steps: Vec<Step>,
}

fn default_session() -> String {
    "default".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Open {
        #[serde(default = "default_session")]
        session: String,
        #[serde(default)]
        flags: u32,
    },
    Close {
        #[serde(default = "default_session")]
        session: String,
    },
    Seek {
        #[serde(default = "default_session")]
        session: String,
        offset: u64,
    },
    /// Payload is `data` (text) or `fill` repeated `len` times. `len` may ask
    /// for more than the payload holds; the copy then comes up short.
    Write {
        #[serde(default = "default_session")]
        session: String,
        #[serde(default)]
        data: Option<String>,
        #[serde(default)]
        fill: Option<u8>,
        #[serde(default)]
        len: Option<usize>,
        /// Caller region becomes unreadable after this many bytes.
        #[serde(default)]
        fault_after: Option<usize>,
    },
    Read {
        #[serde(default = "default_session")]
        session: String,
        len: usize,
        /// Caller region becomes unwritable after this many bytes.
        #[serde(default)]
        fault_after: Option<usize>,
    },
    Clear,
    GetSize,
    SetSize {
        size: u32,
    },
    /// Raw request number; `arg` absent means an unusable argument address.
    Ioctl {
        cmd: u32,
        #[serde(default)]
        arg: Option<u32>,
    },
    AttrShow,
    AttrStore {
        text: String,
    },
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::Open { .. } => "open",
            Step::Close { .. } => "close",
            Step::Seek { .. } => "seek",
            Step::Write { .. } => "write",
            Step::Read { .. } => "read",
            Step::Clear => "clear",
            Step::GetSize => "get_size",
            Step::SetSize { .. } => "set_size",
            Step::Ioctl { .. } => "ioctl",
            Step::AttrShow => "attr_show",
            Step::AttrStore { .. } => "attr_store",
        }
    }

    fn validate(&self) -> Result<(), String> {
        if let Step::Write {
            data, fill, len, ..
        } = self
        {
            match (data, fill, len) {
                (Some(_), Some(_), _) => return Err("write: give data or fill, not both".into()),
                (None, Some(_), None) => return Err("write: fill needs len".into()),
                (None, None, _) => return Err("write: missing data or fill".into()),
                _ => {}
            }
        }
        Ok(())
    }
}

pub fn parse_script(yaml: &str) -> Result<Script, ScriptError> {
    let script: Script = serde_yaml::from_str(yaml)?;
    for (i, step) in script.steps.iter().enumerate() {
        step.validate()
            .map_err(|e| ScriptError::Invalid(format!("step {i}: {e}")))?;
    }
    Ok(script)
}

/// Load a device with `base` plus the script's overrides, run every step, and
/// unload. Step failures are recorded in the report, not returned.
pub fn run_script(script: &Script, mut base: DeviceConfig) -> Result<RunReport, ScriptError> {
    if let Some(ov) = &script.config {
        ov.apply(&mut base);
    }
    let mut registrar = LocalRegistrar::new();
    let device = Device::load(base.clone(), &mut registrar)?;

    let mut report = RunReport::new(base);
    {
        let mut runner = Runner {
            device: &device,
            sessions: BTreeMap::new(),
        };
        for step in &script.steps {
            let outcome = runner.exec(step);
            report.push(step.name(), outcome);
        }
    }

    let stats = device.manager().stats();
    let report = report.finish(stats.capacity, stats.peak_capacity, device.manager().digest());
    device.unload(&mut registrar);
    Ok(report)
}

struct Runner<'d> {
    device: &'d Device,
    sessions: BTreeMap<String, StreamSession>,
}

impl Runner<'_> {
    fn session(&mut self, name: &str) -> &mut StreamSession {
        let device = self.device;
        self.sessions
            .entry(name.to_string())
            .or_insert_with(|| device.open(0))
    }

    fn exec(&mut self, step: &Step) -> StepOutcome {
        match step {
            Step::Open { session, flags } => {
                let s = self.device.open(*flags);
                let id = s.id().get();
                self.sessions.insert(session.clone(), s);
                value(id)
            }
            Step::Close { session } => {
                self.sessions.remove(session);
                done()
            }
            Step::Seek { session, offset } => {
                self.session(session).seek(*offset);
                value(*offset)
            }
            Step::Write {
                session,
                data,
                fill,
                len,
                fault_after,
            } => {
                let payload = match (data, fill) {
                    (Some(d), _) => d.as_bytes().to_vec(),
                    (None, Some(b)) => vec![*b; len.unwrap_or(0)],
                    (None, None) => Vec::new(),
                };
                let requested = len.unwrap_or(payload.len());
                let mut src = payload.as_slice();
                let s = self.session(session);
                let res = match fault_after {
                    Some(limit) => s.write(requested, &mut Limited::new(&mut src, *limit)),
                    None => s.write(requested, &mut src),
                };
                count(res)
            }
            Step::Read {
                session,
                len,
                fault_after,
            } => {
                let scratch = (*len).min(self.device.manager().get_size() as usize);
                let mut out = vec![0u8; scratch];
                let s = self.session(session);
                let res = match fault_after {
                    Some(limit) => s.read(*len, &mut Limited::new(&mut out, *limit)),
                    None => s.read(*len, &mut out),
                };
                match res {
                    Ok(n) => StepOutcome::Ok {
                        value: Some(n as u64),
                        text: Some(String::from_utf8_lossy(&out[..n]).into_owned()),
                    },
                    Err(e) => failure(e),
                }
            }
            Step::Clear => unit(self.device.commands().clear()),
            Step::GetSize => match self.device.commands().get_size() {
                Ok(n) => value(n as u64),
                Err(e) => failure(e),
            },
            Step::SetSize { size } => unit(self.device.commands().set_size(*size)),
            Step::Ioctl { cmd, arg } => {
                let commands = self.device.commands();
                let res = match arg {
                    Some(a) => {
                        let mut slot = *a;
                        commands.ioctl(*cmd, &mut slot).map(|_| slot)
                    }
                    None => commands.ioctl(*cmd, &mut BadAddress).map(|_| 0),
                };
                match res {
                    Ok(v) if *cmd == command::GET_SIZE => value(v as u64),
                    Ok(_) => done(),
                    Err(e) => failure(e),
                }
            }
            Step::AttrShow => StepOutcome::Ok {
                value: None,
                text: Some(self.device.attribute().show()),
            },
            Step::AttrStore { text } => count(self.device.attribute().store(text.as_bytes())),
        }
    }
}

fn done() -> StepOutcome {
    StepOutcome::Ok {
        value: None,
        text: None,
    }
}

fn value(v: u64) -> StepOutcome {
    StepOutcome::Ok {
        value: Some(v),
        text: None,
    }
}

fn failure(e: DeviceError) -> StepOutcome {
    StepOutcome::Err {
        kind: e.kind().to_string(),
        errno: e.errno(),
        message: e.to_string(),
    }
}

fn count(res: Result<usize, DeviceError>) -> StepOutcome {
    match res {
        Ok(n) => value(n as u64),
        Err(e) => failure(e),
    }
}

fn unit(res: Result<(), DeviceError>) -> StepOutcome {
    match res {
        Ok(()) => done(),
        Err(e) => failure(e),
    }
}
