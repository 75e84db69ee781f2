// ringscan/src/config.rs
//
// Analysis configuration. Loaded from an optional JSON file, then overridden
// by CLI flags. Every field has a default, so `{}` is a valid config.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_MIN_GROUP_SIZE:        usize = 3;
pub const DEFAULT_SIMILARITY_THRESHOLD:  f64   = 0.7;
pub const DEFAULT_TIME_WINDOW_HOURS:     i64   = 24;
pub const DEFAULT_MAX_RESPONSES:         usize = 1000;
pub const DEFAULT_NEAR_DUP_THRESHOLD:    f64   = 0.8;
pub const DEFAULT_NEAR_DUP_LIMIT:        usize = 1000;
pub const DEFAULT_FLAG_THRESHOLD:        f64   = 0.5;
pub const MAX_TIME_WINDOW_HOURS:         i64   = 24 * 366 * 10;

/// How the answer, device and behavior detectors form groups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ClusteringMode {
    /// Single forward scan; a seed claims every later match. Order-dependent.
    #[default]
    Greedy,
    /// Connected components over the full similarity graph.
    Connected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnalysisConfig {
    pub min_group_size:           usize,
    pub similarity_threshold:     f64,
    pub time_window_hours:        i64,
    pub max_responses:            usize,
    pub near_duplicate_threshold: f64,
    pub near_duplicate_limit:     usize,
    pub flag_threshold:           f64,
    pub clustering:               ClusteringMode,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_group_size:           DEFAULT_MIN_GROUP_SIZE,
            similarity_threshold:     DEFAULT_SIMILARITY_THRESHOLD,
            time_window_hours:        DEFAULT_TIME_WINDOW_HOURS,
            max_responses:            DEFAULT_MAX_RESPONSES,
            near_duplicate_threshold: DEFAULT_NEAR_DUP_THRESHOLD,
            near_duplicate_limit:     DEFAULT_NEAR_DUP_LIMIT,
            flag_threshold:           DEFAULT_FLAG_THRESHOLD,
            clustering:               ClusteringMode::Greedy,
        }
    }
}

impl AnalysisConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let cfg: Self = serde_json::from_str(&text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let unit = [
            ("similarityThreshold",    self.similarity_threshold),
            ("nearDuplicateThreshold", self.near_duplicate_threshold),
            ("flagThreshold",          self.flag_threshold),
        ];
        for (field, value) in unit {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfRange { field, value: value.to_string() });
            }
        }
        // Groups need at least two members.
        if self.min_group_size < 2 {
            return Err(ConfigError::OutOfRange {
                field: "minGroupSize",
                value: self.min_group_size.to_string(),
            });
        }
        let sizes = [
            ("maxResponses",       self.max_responses),
            ("nearDuplicateLimit", self.near_duplicate_limit),
        ];
        for (field, value) in sizes {
            if value == 0 {
                return Err(ConfigError::OutOfRange { field, value: value.to_string() });
            }
        }
        if !(1..=MAX_TIME_WINDOW_HOURS).contains(&self.time_window_hours) {
            return Err(ConfigError::OutOfRange {
                field: "timeWindowHours",
                value: self.time_window_hours.to_string(),
            });
        }
        Ok(())
    }
}
