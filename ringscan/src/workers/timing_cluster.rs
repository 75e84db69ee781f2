// ringscan/src/workers/timing_cluster.rs
//
// Synchronized submission bursts.
//
// A ring operator submitting from a script or a shared sheet tends to land
// many responses inside a few minutes. Responses are bucketed into fixed
// 5-minute windows (floor(createdAt / 5min)); any bucket holding at least
// MIN_BURST_SIZE responses fires.
//
// Buckets are fixed, not sliding: a burst straddling a boundary splits in two
// and may fire in neither. Buckets are reported in first-seen order.

use std::collections::HashMap;

use crate::config::AnalysisConfig;
use crate::model::{Pattern, PatternType, Severity, SurveyResponse};
use crate::workers::{ids_of, Finding};

pub const BUCKET_MINUTES: i64   = 5;
const BUCKET_MS:          i64   = BUCKET_MINUTES * 60 * 1000;
const MIN_BURST_SIZE:     usize = 5;  // responses per bucket to fire
const CONFIDENCE:         f64   = 0.7;

pub fn analyze(batch: &[SurveyResponse], _config: &AnalysisConfig) -> Vec<Finding> {
    let mut slot:    HashMap<i64, usize> = HashMap::new();
    let mut buckets: Vec<Vec<usize>>     = Vec::new();

    for (i, r) in batch.iter().enumerate() {
        let bucket = r.created_at.timestamp_millis().div_euclid(BUCKET_MS);
        let k = *slot.entry(bucket).or_insert_with(|| {
            buckets.push(Vec::new());
            buckets.len() - 1
        });
        buckets[k].push(i);
    }

    buckets.into_iter()
        .filter(|members| members.len() >= MIN_BURST_SIZE)
        .map(|members| Finding {
            pattern: Pattern {
                pattern_type:          PatternType::CoordinatedTiming,
                severity:              Severity::Medium,
                description:           format!(
                    "{} responses submitted within {} minutes",
                    members.len(),
                    BUCKET_MINUTES
                ),
                affected_response_ids: ids_of(batch, &members),
                confidence:            CONFIDENCE,
            },
            similarity: None,
        })
        .collect()
}
