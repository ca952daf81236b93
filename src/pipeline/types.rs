use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::Config;

/// Input to one preprocessing run.
#[derive(Debug, Clone)]
pub struct ExtractInput {
    pub config: Config,
    pub annotation_dir: PathBuf,
    /// Forwarded verbatim as `--annotation <split>`.
    pub source_split: String,
    pub out_dir: PathBuf,
    /// Directory the tool was invoked from.
    pub work_dir: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Pass,
    Fail,
    Cancelled,
    Timeout,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Pass => "pass",
            RunStatus::Fail => "fail",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Timeout => "timeout",
        }
    }
}

/// Summary written with `--report`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractReport {
    pub source_split: String,
    pub image: String,
    pub annotation_dir: String,
    pub out_dir: String,
    pub pretrained_dir: String,
    pub status: RunStatus,
    pub exit_code: Option<i32>,
    pub duration_secs: f64,
}

impl ExtractReport {
    pub fn succeeded(&self) -> bool {
        self.status == RunStatus::Pass
    }

    /// Process exit code mirroring the container's; 1 when it had none.
    pub fn process_exit_code(&self) -> i32 {
        match (self.status, self.exit_code) {
            (RunStatus::Pass, _) => 0,
            (_, Some(code)) if code != 0 => code,
            _ => 1,
        }
    }
}
