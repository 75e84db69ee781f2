// ringscan/src/fingerprint/consistency.rs
//
// Cross-field plausibility checks on one fingerprint.
// Every score increment is paired 1:1 with an issue string, so
// `is_consistent` (no issues) and `risk_score == 0` always agree.

use serde::{Deserialize, Serialize};

use crate::model::{clamp_unit, present, DeviceFingerprint};

// (platform token, UA token, label)
const PLATFORM_FAMILIES: &[(&str, &str, &str)] = &[
    ("mac",   "mac",   "Mac"),
    ("win",   "win",   "Windows"),
    ("linux", "linux", "Linux"),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsistencyReport {
    pub is_consistent: bool,
    pub risk_score: f64,
    pub issues: Vec<String>,
}

pub fn validate_consistency(fp: &DeviceFingerprint) -> ConsistencyReport {
    let mut risk   = 0.0f64;
    let mut issues = Vec::new();

    let mut flag = |amount: f64, issue: String| {
        risk += amount;
        issues.push(issue);
    };

    if let (Some(platform), Some(ua)) = (present(&fp.platform), present(&fp.user_agent)) {
        let platform = platform.to_lowercase();
        let ua       = ua.to_lowercase();
        for (p_tok, ua_tok, label) in PLATFORM_FAMILIES {
            if platform.contains(p_tok) && !ua.contains(ua_tok) {
                flag(0.3, format!(
                    "Platform/User-Agent mismatch: {label} platform but no {label} in UA"
                ));
            }
        }
    }

    if let Some(screen) = &fp.screen {
        if let (Some(w), Some(h)) = (screen.width, screen.height) {
            if w < 100.0 || h < 100.0 {
                flag(0.4, format!("Unrealistic screen size: {}x{}", w, h));
            }
            let aspect = w / h;
            if !(0.5..=4.0).contains(&aspect) {
                flag(0.2, format!("Unusual aspect ratio: {:.2}", aspect));
            }
        }
        if let Some(dpr) = screen.device_pixel_ratio {
            if !(0.5..=5.0).contains(&dpr) {
                flag(0.2, format!("Unusual device pixel ratio: {}", dpr));
            }
        }
    }

    if let Some(hw) = &fp.hardware {
        if let Some(cores) = hw.cpu_cores {
            if !(1.0..=128.0).contains(&cores) {
                flag(0.2, format!("Unusual CPU core count: {}", cores));
            }
        }
        if let Some(mem) = hw.memory_gb {
            if !(1.0..=512.0).contains(&mem) {
                flag(0.2, format!("Unusual memory amount: {}GB", mem));
            }
        }
    }

    ConsistencyReport {
        is_consistent: issues.is_empty(),
        risk_score:    clamp_unit(risk),
        issues,
    }
}
