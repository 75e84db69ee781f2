// ringscan/src/workers/device_sharing.rs
//
// One device, many respondents.
//
// Fingerprints are decoded once per batch; unreadable ones are skipped.
// Grouping uses the weighted fingerprint similarity against the group's seed
// (greedy) or the full pair graph (connected). Groups of ≥ min_group_size
// fire at high severity: a repeated canvas/WebGL/UA combination is a much
// stronger identity signal than shared answers or timing.

use tracing::debug;

use crate::config::AnalysisConfig;
use crate::fingerprint::similarity::similarity;
use crate::model::{DeviceFingerprint, Pattern, PatternType, Severity, SurveyResponse};
use crate::workers::{cluster, ids_of, Finding};

const CONFIDENCE: f64 = 0.85;

pub fn analyze(batch: &[SurveyResponse], config: &AnalysisConfig) -> Vec<Finding> {
    let devices: Vec<Option<DeviceFingerprint>> = batch.iter()
        .map(|r| match r.fingerprint()? {
            Ok(fp) => Some(fp),
            Err(e) => {
                debug!("device_sharing: skipping response {}: {}", r.id, e);
                None
            }
        })
        .collect();

    let groups = cluster::group(
        batch.len(),
        |i| devices[i].is_some(),
        |i, j| match (&devices[i], &devices[j]) {
            (Some(a), Some(b)) => similarity(a, b),
            _ => 0.0,
        },
        config.similarity_threshold,
        config.min_group_size,
        config.clustering,
    );

    groups.into_iter()
        .map(|g| Finding {
            pattern: Pattern {
                pattern_type:          PatternType::DeviceSharing,
                severity:              Severity::High,
                description:           format!(
                    "{} responses from identical device fingerprint",
                    g.members.len()
                ),
                affected_response_ids: ids_of(batch, &g.members),
                confidence:            CONFIDENCE,
            },
            similarity: None,
        })
        .collect()
}
