//! Report emitted after a scripted run against the device.
//!
//! Captures what each step returned plus the final buffer state so two runs of
//! the same script can be compared byte-for-byte.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::DeviceConfig;
use crate::hash::Hash256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportId(pub Uuid);

/// Result of a single step: a count/value on success or the error kind + errno.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    Ok {
        #[serde(skip_serializing_if = "Option::is_none")]
        value: Option<u64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
    Err {
        kind: String,
        errno: i32,
        message: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub index: usize,
    pub op: String,
    pub outcome: StepOutcome,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub id: ReportId,

    /// Version string for provenance.
    pub version: String,

    /// Effective configuration the device was loaded with.
    pub config: DeviceConfig,

    pub steps: Vec<StepRecord>,

    /// Capacity after the last step.
    pub final_size: u32,

    /// Largest capacity the buffer held during the run.
    pub peak_size: u32,

    /// Digest of the buffer contents after the last step.
    pub contents_digest: Hash256,
}

impl RunReport {
    pub fn new(config: DeviceConfig) -> Self {
        Self {
            id: ReportId(Uuid::new_v4()),
            version: crate::VERSION.to_string(),
            config,
            steps: Vec::new(),
            final_size: 0,
            peak_size: 0,
            contents_digest: Hash256([0u8; 32]),
        }
    }

    pub fn push(&mut self, op: impl Into<String>, outcome: StepOutcome) {
        let index = self.steps.len();
        self.steps.push(StepRecord {
            index,
            op: op.into(),
            outcome,
        });
    }

    pub fn finish(mut self, final_size: u32, peak_size: u32, digest: Hash256) -> Self {
        self.final_size = final_size;
        self.peak_size = peak_size;
        self.contents_digest = digest;
        self
    }

    /// Number of steps that ended in an error.
    pub fn error_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| matches!(s.outcome, StepOutcome::Err { .. }))
            .count()
    }
}
