// ringscan/src/fingerprint/automation.rs
//
// Single-fingerprint bot / headless-browser classifier.
//
// Each check adds an independent amount to a suspicion score; the total is
// clamped to 1.0 only at the end, so many simultaneous triggers can never push
// confidence past 1. Reasons are emitted in check order, one per increment.
//
// User-agent signatures go through an Aho-Corasick automaton: O(ua_len)
// regardless of how many signatures are listed. Only the first signature in
// list order is reported and scored.

use std::sync::OnceLock;

use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};
use serde::{Deserialize, Serialize};

use crate::model::{clamp_unit, present, DeviceFingerprint};

pub const AUTOMATION_THRESHOLD: f64 = 0.5;

const UA_SIGNATURES: &[&str] = &[
    "headless",
    "phantom",
    "selenium",
    "webdriver",
    "bot",
    "crawler",
    "spider",
];

const MIN_SCREEN_DIM: f64 = 100.0;
const MAX_SCREEN_DIM: f64 = 10_000.0;

static UA_AC: OnceLock<AhoCorasick> = OnceLock::new();

fn ua_automaton() -> &'static AhoCorasick {
    UA_AC.get_or_init(|| {
        AhoCorasickBuilder::new()
            .ascii_case_insensitive(true)
            .match_kind(MatchKind::Standard)
            .build(UA_SIGNATURES)
            .expect("UA signature AC build failed")
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationVerdict {
    pub is_automation: bool,
    pub confidence: f64,
    pub reasons: Vec<String>,
}

/// Earliest-listed signature present anywhere in the user agent.
fn ua_signature(ua: &str) -> Option<&'static str> {
    ua_automaton()
        .find_overlapping_iter(ua)
        .map(|m| m.pattern().as_usize())
        .min()
        .map(|i| UA_SIGNATURES[i])
}

pub fn detect_automation(fp: &DeviceFingerprint) -> AutomationVerdict {
    let mut score   = 0.0f64;
    let mut reasons = Vec::new();

    if fp.web_driver_flag == Some(true) {
        score += 0.4;
        reasons.push("WebDriver detected".to_string());
    }

    if fp.automation_flag == Some(true) {
        score += 0.4;
        reasons.push("Automation detected".to_string());
    }

    if let Some(sig) = fp.user_agent.as_deref().and_then(ua_signature) {
        score += 0.3;
        reasons.push(format!("Suspicious user agent: contains \"{}\"", sig));
    }

    if fp.plugins.as_ref().is_some_and(|p| p.is_empty()) {
        score += 0.2;
        reasons.push("No browser plugins detected".to_string());
    }

    if let Some(screen) = &fp.screen {
        let out_of_range = [screen.width, screen.height]
            .into_iter()
            .flatten()
            .any(|d| !(MIN_SCREEN_DIM..=MAX_SCREEN_DIM).contains(&d));
        if out_of_range {
            score += 0.3;
            reasons.push(format!(
                "Impossible screen dimensions: {}x{}",
                dim(screen.width), dim(screen.height)
            ));
        }
    }

    if present(&fp.canvas_fingerprint).is_none() && present(&fp.webgl_fingerprint).is_none() {
        score += 0.2;
        reasons.push("Missing canvas and WebGL fingerprints".to_string());
    }

    let mobile = fp.platform.as_deref()
        .is_some_and(|p| p.to_lowercase().contains("mobile"));
    if mobile && (fp.touch_support == Some(false) || fp.max_touch_points == Some(0)) {
        score += 0.15;
        reasons.push("Mobile platform but no touch support".to_string());
    }

    let confidence = clamp_unit(score);
    AutomationVerdict {
        is_automation: confidence >= AUTOMATION_THRESHOLD,
        confidence,
        reasons,
    }
}

fn dim(v: Option<f64>) -> String {
    v.map(|n| n.to_string()).unwrap_or_else(|| "?".into())
}
