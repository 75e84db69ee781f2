// ringscan/src/model.rs
//
// Shared domain types flowing through Ringscan.
//
// SurveyResponse records are produced by the ingestion pipeline and are
// read-only here. Device data is kept as raw JSON on the record and decoded
// lazily, so one unreadable payload never poisons a whole batch.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::FingerprintError;

/// Clamp into [0, 1]. NaN collapses to 0.
pub fn clamp_unit(x: f64) -> f64 {
    if x.is_nan() { 0.0 } else { x.clamp(0.0, 1.0) }
}

/// Decode a field, mapping any wrong-typed value to `None` instead of failing.
fn lenient<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = Option::<Value>::deserialize(d)?;
    Ok(raw.and_then(|v| serde_json::from_value(v).ok()))
}

/// Decode a field, mapping an explicit `null` to the type's default.
fn null_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(d).map(Option::unwrap_or_default)
}

/// Empty strings count as absent, same as a missing field.
pub(crate) fn present(s: &Option<String>) -> Option<&str> {
    s.as_deref().filter(|v| !v.is_empty())
}

// ── Device fingerprint ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScreenInfo {
    #[serde(alias = "w", deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(alias = "h", deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(alias = "dpr", deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub device_pixel_ratio: Option<f64>,
    #[serde(alias = "depth", deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub color_depth: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HardwareInfo {
    #[serde(alias = "cores", deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub cpu_cores: Option<f64>,
    #[serde(rename = "memoryGB", alias = "memory", deserialize_with = "lenient",
            skip_serializing_if = "Option::is_none")]
    pub memory_gb: Option<f64>,
}

/// Browser/OS/hardware attributes collected client-side. Every field is
/// optional; absence is never treated as a mismatch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeviceFingerprint {
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub screen: Option<ScreenInfo>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub hardware: Option<HardwareInfo>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub canvas_fingerprint: Option<String>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub webgl_fingerprint: Option<String>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub fonts: Option<Vec<String>>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub plugins: Option<Vec<Value>>,
    #[serde(alias = "webDriver", deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub web_driver_flag: Option<bool>,
    #[serde(alias = "automation", deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub automation_flag: Option<bool>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub touch_support: Option<bool>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub max_touch_points: Option<u32>,
}

impl DeviceFingerprint {
    /// Decode a stored device payload. Only a non-object payload fails;
    /// wrong-typed fields inside an object decode as missing.
    pub fn from_value(raw: &Value) -> Result<Self, FingerprintError> {
        if !raw.is_object() {
            return Err(FingerprintError::NotAnObject);
        }
        Ok(serde_json::from_value(raw.clone())?)
    }
}

// ── Survey response ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyResponse {
    pub id: String,
    pub survey_id: String,
    #[serde(default, alias = "responses", deserialize_with = "null_default")]
    pub answers: BTreeMap<String, Value>,
    #[serde(default, alias = "deviceData", skip_serializing_if = "Option::is_none")]
    pub device_fingerprint: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, alias = "timingData", deserialize_with = "lenient",
            skip_serializing_if = "Option::is_none")]
    pub timing_samples: Option<Vec<f64>>,
    #[serde(default, alias = "mouseData", deserialize_with = "lenient",
            skip_serializing_if = "Option::is_none")]
    pub mouse_samples: Option<Vec<Value>>,
    #[serde(default, alias = "keystrokeData", deserialize_with = "lenient",
            skip_serializing_if = "Option::is_none")]
    pub keystroke_samples: Option<Vec<Value>>,
    #[serde(default, deserialize_with = "null_default")]
    pub is_flagged: bool,
    #[serde(default, deserialize_with = "null_default")]
    pub fraud_score: f64,
    #[serde(default, deserialize_with = "null_default")]
    pub flag_reasons: Vec<String>,
}

impl SurveyResponse {
    pub fn new(id: &str, survey_id: &str, created_at: DateTime<Utc>) -> Self {
        Self {
            id:                id.to_string(),
            survey_id:         survey_id.to_string(),
            answers:           BTreeMap::new(),
            device_fingerprint: None,
            ip_address:        None,
            created_at,
            timing_samples:    None,
            mouse_samples:     None,
            keystroke_samples: None,
            is_flagged:        false,
            fraud_score:       0.0,
            flag_reasons:      Vec::new(),
        }
    }

    /// `None` when no device data was stored, `Some(Err)` when it is unreadable.
    pub fn fingerprint(&self) -> Option<Result<DeviceFingerprint, FingerprintError>> {
        match &self.device_fingerprint {
            None | Some(Value::Null) => None,
            Some(raw)                => Some(DeviceFingerprint::from_value(raw)),
        }
    }

    pub fn has_device_data(&self) -> bool {
        !matches!(self.device_fingerprint, None | Some(Value::Null))
    }

    pub fn ip(&self) -> Option<&str> {
        present(&self.ip_address)
    }

    /// Carries at least one behavioral stream (timing or mouse).
    pub fn has_behavior(&self) -> bool {
        self.timing_samples.is_some() || self.mouse_samples.is_some()
    }
}

// ── Detection types ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum PatternType {
    AnswerSharing,
    CoordinatedTiming,
    DeviceSharing,
    IpSharing,
    BehavioralSimilarity,
}

impl std::fmt::Display for PatternType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AnswerSharing        => write!(f, "answer-sharing"),
            Self::CoordinatedTiming    => write!(f, "coordinated-timing"),
            Self::DeviceSharing        => write!(f, "device-sharing"),
            Self::IpSharing            => write!(f, "ip-sharing"),
            Self::BehavioralSimilarity => write!(f, "behavioral-similarity"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low    => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High   => write!(f, "high"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// ≥3 distinct overlapping types → high, 2 → medium, else low.
    pub fn from_type_count(n: usize) -> Self {
        match n {
            0..=1 => Self::Low,
            2     => Self::Medium,
            _     => Self::High,
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low    => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High   => write!(f, "high"),
        }
    }
}

/// One detector's finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pattern {
    #[serde(rename = "type")]
    pub pattern_type: PatternType,
    pub severity: Severity,
    pub description: String,
    pub affected_response_ids: Vec<String>,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuspiciousGroup {
    pub response_ids: Vec<String>,
    pub similarity_score: f64,
    pub shared_attribute_types: BTreeSet<PatternType>,
    pub risk_level: RiskLevel,
}

/// Affected-response counts per detector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evidence {
    pub identical_answers: usize,
    pub similar_behavior: usize,
    pub coordinated_timing: usize,
    pub shared_devices: usize,
    #[serde(rename = "sharedIPs")]
    pub shared_ips: usize,
}

impl Evidence {
    pub fn record(&mut self, kind: PatternType, n: usize) {
        let slot = match kind {
            PatternType::AnswerSharing        => &mut self.identical_answers,
            PatternType::CoordinatedTiming    => &mut self.coordinated_timing,
            PatternType::DeviceSharing        => &mut self.shared_devices,
            PatternType::IpSharing            => &mut self.shared_ips,
            PatternType::BehavioralSimilarity => &mut self.similar_behavior,
        };
        *slot += n;
    }

    pub fn total(&self) -> usize {
        self.identical_answers
            + self.similar_behavior
            + self.coordinated_timing
            + self.shared_devices
            + self.shared_ips
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FraudRingAnalysis {
    pub is_fraud_ring: bool,
    pub confidence: f64,
    pub ring_size: usize,
    pub patterns: Vec<Pattern>,
    pub evidence: Evidence,
    pub suspicious_groups: Vec<SuspiciousGroup>,
}

impl FraudRingAnalysis {
    /// Zero-evidence verdict returned for small batches and fetch failures.
    pub fn neutral() -> Self {
        Self {
            is_fraud_ring:     false,
            confidence:        0.0,
            ring_size:         0,
            patterns:          Vec::new(),
            evidence:          Evidence::default(),
            suspicious_groups: Vec::new(),
        }
    }
}
