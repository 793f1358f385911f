use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use crate::error::{DoseError, DoseResult};

pub const DEFAULT_EVENT_NAME: &str = "baseline_arm_1";
pub const DEFAULT_MISSING_MARKER: &str = "n/a";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub root_dir: PathBuf,
    #[serde(default = "default_min_id")]
    pub min_id: u32,
    #[serde(default = "default_max_id")]
    pub max_id: u32,
    #[serde(default)]
    pub exclude: BTreeSet<u32>,
    #[serde(default)]
    pub missing_values: MissingValuePolicy,
    #[serde(default)]
    pub completion: CompletionPolicy,
    #[serde(default)]
    pub record_id_prefix: String,
    #[serde(default = "default_event_name")]
    pub event_name: String,
    #[serde(default = "default_missing_marker")]
    pub missing_marker: String,
    /// Where the table and log land; the root directory when unset.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

fn default_min_id() -> u32 {
    1
}

fn default_max_id() -> u32 {
    9999
}

fn default_event_name() -> String {
    DEFAULT_EVENT_NAME.to_string()
}

fn default_missing_marker() -> String {
    DEFAULT_MISSING_MARKER.to_string()
}

/// How the missing marker in a metrics file is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum MissingValuePolicy {
    /// Upstream reports the marker for a true zero dose.
    #[default]
    Zero,
    Nan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CompletionPolicy {
    AllComplete,
    Strict,
    #[default]
    AnyPresent,
}

impl MissingValuePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MissingValuePolicy::Zero => "zero",
            MissingValuePolicy::Nan => "nan",
        }
    }
}

impl CompletionPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompletionPolicy::AllComplete => "all-complete",
            CompletionPolicy::Strict => "strict",
            CompletionPolicy::AnyPresent => "any-present",
        }
    }
}

impl FromStr for MissingValuePolicy {
    type Err = DoseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zero" => Ok(MissingValuePolicy::Zero),
            "nan" => Ok(MissingValuePolicy::Nan),
            _ => Err(DoseError::InvalidPolicy {
                kind: "missing-value",
                value: s.to_string(),
            }),
        }
    }
}

impl FromStr for CompletionPolicy {
    type Err = DoseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all-complete" => Ok(CompletionPolicy::AllComplete),
            "strict" => Ok(CompletionPolicy::Strict),
            "any-present" => Ok(CompletionPolicy::AnyPresent),
            _ => Err(DoseError::InvalidPolicy {
                kind: "completion",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for MissingValuePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for CompletionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for MissingValuePolicy {
    type Error = DoseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl TryFrom<String> for CompletionPolicy {
    type Error = DoseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MissingValuePolicy> for String {
    fn from(policy: MissingValuePolicy) -> Self {
        policy.as_str().to_string()
    }
}

impl From<CompletionPolicy> for String {
    fn from(policy: CompletionPolicy) -> Self {
        policy.as_str().to_string()
    }
}

impl Config {
    pub fn new<P: Into<PathBuf>>(root_dir: P) -> Self {
        Self {
            root_dir: root_dir.into(),
            min_id: default_min_id(),
            max_id: default_max_id(),
            exclude: BTreeSet::new(),
            missing_values: MissingValuePolicy::default(),
            completion: CompletionPolicy::default(),
            record_id_prefix: String::new(),
            event_name: default_event_name(),
            missing_marker: default_missing_marker(),
            output_dir: None,
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> DoseResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> DoseResult<()> {
        if self.min_id > self.max_id {
            return Err(DoseError::InvalidConfig(format!(
                "min_id ({}) must not exceed max_id ({})",
                self.min_id, self.max_id
            )));
        }

        if self.event_name.trim().is_empty() {
            return Err(DoseError::InvalidConfig(
                "event name must not be empty".to_string(),
            ));
        }

        if self.missing_marker.trim().is_empty() {
            return Err(DoseError::InvalidConfig(
                "missing marker must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    pub fn in_range(&self, id: u32) -> bool {
        (self.min_id..=self.max_id).contains(&id)
    }

    pub fn output_dir(&self) -> &Path {
        self.output_dir.as_deref().unwrap_or(&self.root_dir)
    }
}
