// ringscan/src/error.rs
//
// Error types. Analysis entry points never surface these to their callers;
// they are logged and degraded to a neutral result. Only config loading and
// the repository seam return them.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("response store unavailable: {0}")]
    Unavailable(String),

    #[error("query for survey {survey_id} failed: {reason}")]
    Query { survey_id: String, reason: String },
}

/// A device payload that cannot be read as a fingerprint at all.
/// Individual wrong-typed fields never produce this; they decode as missing.
#[derive(Debug, Error)]
pub enum FingerprintError {
    #[error("device data is not a JSON object")]
    NotAnObject,

    #[error("device data could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config field {field} out of range: {value}")]
    OutOfRange { field: &'static str, value: String },

    #[error("cannot read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("cannot parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}
