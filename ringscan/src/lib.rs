// ringscan/src/lib.rs
//
// Ringscan: survey response-integrity analysis.
//
// Two layers:
//   fingerprint  per-response device scoring (hash, similarity, automation,
//                consistency, near-duplicate scan, ingestion annotation)
//   engine       batch fraud-ring detection over one survey's recent
//                responses, fed by the pattern detectors in `workers`
//
// Storage sits behind `state::repository::ResponseRepository`.

pub mod config;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod model;
pub mod state;
pub mod workers;

pub use config::{AnalysisConfig, ClusteringMode};
pub use engine::fusion::FraudRingAggregator;
pub use error::{ConfigError, FingerprintError, RepositoryError};
pub use model::{
    DeviceFingerprint, Evidence, FraudRingAnalysis, Pattern, PatternType, RiskLevel, Severity,
    SurveyResponse, SuspiciousGroup,
};
pub use state::repository::{MemoryRepository, ResponseQuery, ResponseRepository};
