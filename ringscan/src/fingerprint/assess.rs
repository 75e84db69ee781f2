// ringscan/src/fingerprint/assess.rs
//
// Ingestion-time annotation for a single response: hash, automation verdict,
// consistency report and near-duplicate count, folded into the
// `isFlagged / fraudScore / flagReasons` triple the ingestion pipeline writes
// back onto the record. Nothing is written here.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AnalysisConfig;
use crate::fingerprint::automation::{detect_automation, AutomationVerdict};
use crate::fingerprint::consistency::{validate_consistency, ConsistencyReport};
use crate::fingerprint::hash_fingerprint;
use crate::fingerprint::index::find_similar;
use crate::model::{clamp_unit, SurveyResponse};
use crate::state::repository::ResponseRepository;

pub const UNREADABLE_REASON: &str = "Unreadable device fingerprint";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseAnnotation {
    pub response_id: String,
    pub fingerprint_hash: Option<String>,
    pub automation: Option<AutomationVerdict>,
    pub consistency: Option<ConsistencyReport>,
    pub near_duplicates: usize,
    pub fraud_score: f64,
    pub is_flagged: bool,
    pub flag_reasons: Vec<String>,
}

impl ResponseAnnotation {
    fn empty(response_id: &str) -> Self {
        Self {
            response_id:      response_id.to_string(),
            fingerprint_hash: None,
            automation:       None,
            consistency:      None,
            near_duplicates:  0,
            fraud_score:      0.0,
            is_flagged:       false,
            flag_reasons:     Vec::new(),
        }
    }
}

pub fn assess_response(
    repo:     &dyn ResponseRepository,
    response: &SurveyResponse,
    config:   &AnalysisConfig,
) -> ResponseAnnotation {
    let mut out = ResponseAnnotation::empty(&response.id);

    let fp = match response.fingerprint() {
        None => return out,
        Some(Ok(fp)) => fp,
        Some(Err(e)) => {
            debug!("response {} has unreadable device data: {}", response.id, e);
            out.flag_reasons.push(UNREADABLE_REASON.to_string());
            return out;
        }
    };

    let automation  = detect_automation(&fp);
    let consistency = validate_consistency(&fp);

    // The stored copy of this response matches itself; don't count it.
    let near_duplicates = find_similar(
        repo,
        &fp,
        &response.survey_id,
        config.near_duplicate_threshold,
        config.near_duplicate_limit,
    )
    .similar_responses
    .iter()
    .filter(|s| s.id != response.id)
    .count();

    let fraud_score = if automation.confidence > 0.0 {
        automation.confidence
    } else {
        consistency.risk_score
    };

    out.flag_reasons.extend(automation.reasons.iter().cloned());
    out.flag_reasons.extend(consistency.issues.iter().cloned());
    if near_duplicates > 0 {
        out.flag_reasons.push(format!(
            "Device fingerprint matches {} other response(s) in this survey",
            near_duplicates
        ));
    }

    out.fraud_score      = clamp_unit(fraud_score);
    out.is_flagged       = automation.is_automation
        || out.fraud_score >= config.flag_threshold
        || near_duplicates > 0;
    out.fingerprint_hash = Some(hash_fingerprint(&fp));
    out.near_duplicates  = near_duplicates;
    out.automation       = Some(automation);
    out.consistency      = Some(consistency);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::repository::MemoryRepository;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn response(id: &str, device: Option<serde_json::Value>) -> SurveyResponse {
        let t = Utc.with_ymd_and_hms(2026, 7, 4, 10, 0, 0).unwrap();
        let mut r = SurveyResponse::new(id, "s", t);
        r.device_fingerprint = device;
        r
    }

    fn clean_device() -> serde_json::Value {
        json!({
            "userAgent": "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_0) Safari/605.1.15",
            "platform": "MacIntel",
            "screen": { "w": 1512, "h": 982, "dpr": 2 },
            "hardware": { "cores": 8, "memory": 8 },
            "canvasFingerprint": "cv-1",
            "webglFingerprint": "gl-1",
            "plugins": ["PDF Viewer"],
        })
    }

    #[test]
    fn no_device_data_is_neutral() {
        let repo = MemoryRepository::new();
        let a = assess_response(&repo, &response("r", None), &AnalysisConfig::default());
        assert!(!a.is_flagged);
        assert_eq!(a.fraud_score, 0.0);
        assert!(a.fingerprint_hash.is_none());
        assert!(a.flag_reasons.is_empty());
    }

    #[test]
    fn unreadable_device_data_is_annotated_but_not_flagged() {
        let repo = MemoryRepository::new();
        let a = assess_response(&repo, &response("r", Some(json!(17))), &AnalysisConfig::default());
        assert!(!a.is_flagged);
        assert_eq!(a.flag_reasons, vec![UNREADABLE_REASON.to_string()]);
    }

    #[test]
    fn clean_unique_device_passes() {
        let r = response("r", Some(clean_device()));
        let repo: MemoryRepository = [r.clone()].into_iter().collect();
        let a = assess_response(&repo, &r, &AnalysisConfig::default());
        assert!(!a.is_flagged, "{:?}", a.flag_reasons);
        assert_eq!(a.near_duplicates, 0);
        assert!(a.fingerprint_hash.is_some());
    }

    #[test]
    fn automation_reasons_come_first() {
        let mut device = clean_device();
        device["webDriver"] = json!(true);
        device["automation"] = json!(true);
        device["platform"] = json!("Win32");
        let r = response("r", Some(device));
        let repo = MemoryRepository::new();
        let a = assess_response(&repo, &r, &AnalysisConfig::default());
        assert!(a.is_flagged);
        assert!((a.fraud_score - 0.8).abs() < 1e-12);
        assert_eq!(a.flag_reasons[0], "WebDriver detected");
        assert_eq!(a.flag_reasons[1], "Automation detected");
        assert!(a.flag_reasons[2].starts_with("Platform/User-Agent mismatch"));
    }

    #[test]
    fn consistency_score_used_when_no_automation_signal() {
        let mut device = clean_device();
        device["platform"] = json!("Linux x86_64");
        let r = response("r", Some(device));
        let a = assess_response(&MemoryRepository::new(), &r, &AnalysisConfig::default());
        assert!((a.fraud_score - 0.3).abs() < 1e-12);
        assert!(!a.is_flagged);
    }

    #[test]
    fn near_duplicate_devices_flag_the_response() {
        let target = response("r", Some(clean_device()));
        let repo: MemoryRepository = [
            target.clone(),
            response("twin-1", Some(clean_device())),
            response("twin-2", Some(clean_device())),
        ]
        .into_iter()
        .collect();
        let a = assess_response(&repo, &target, &AnalysisConfig::default());
        assert_eq!(a.near_duplicates, 2);
        assert!(a.is_flagged);
        assert_eq!(
            a.flag_reasons.last().unwrap(),
            "Device fingerprint matches 2 other response(s) in this survey"
        );
    }
}
