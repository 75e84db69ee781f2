// ringscan/src/workers/behavioral.rs
//
// Respondents who behave alike.
//
// Two coarse behavioral metrics, each compared only when both responses
// carry a non-empty stream:
//   timing  1 - |avg_a - avg_b| / max(avg_a, avg_b, 1)   per-question mean
//   mouse   1 - |n_a - n_b| / max(n_a, n_b)               event counts
// The pair score is the mean of whichever metrics were comparable, 0 if none.
//
// A response is eligible when it carries any timing or mouse stream.

use crate::config::AnalysisConfig;
use crate::model::{clamp_unit, Pattern, PatternType, Severity, SurveyResponse};
use crate::workers::{cluster, ids_of, Finding};

pub fn analyze(batch: &[SurveyResponse], config: &AnalysisConfig) -> Vec<Finding> {
    let groups = cluster::group(
        batch.len(),
        |i| batch[i].has_behavior(),
        |i, j| behavioral_similarity(&batch[i], &batch[j]),
        config.similarity_threshold,
        config.min_group_size,
        config.clustering,
    );

    groups.into_iter()
        .map(|g| {
            let similarity = clamp_unit(g.similarity);
            Finding {
                pattern: Pattern {
                    pattern_type:          PatternType::BehavioralSimilarity,
                    severity:              Severity::Medium,
                    description:           format!(
                        "{} responses with {}% similar behavior patterns",
                        g.members.len(),
                        (similarity * 100.0).round()
                    ),
                    affected_response_ids: ids_of(batch, &g.members),
                    confidence:            similarity,
                },
                similarity: Some(similarity),
            }
        })
        .collect()
}

pub fn behavioral_similarity(a: &SurveyResponse, b: &SurveyResponse) -> f64 {
    let mut total   = 0.0;
    let mut metrics = 0u32;

    let avg = |xs: &[f64]| xs.iter().sum::<f64>() / xs.len() as f64;

    if let (Some(ta), Some(tb)) = (&a.timing_samples, &b.timing_samples) {
        if !ta.is_empty() && !tb.is_empty() {
            let (x, y) = (avg(ta.as_slice()), avg(tb.as_slice()));
            total   += clamp_unit(1.0 - (x - y).abs() / x.max(y).max(1.0));
            metrics += 1;
        }
    }

    if let (Some(ma), Some(mb)) = (&a.mouse_samples, &b.mouse_samples) {
        let (x, y) = (ma.len(), mb.len());
        if x > 0 && y > 0 {
            total   += 1.0 - x.abs_diff(y) as f64 / x.max(y) as f64;
            metrics += 1;
        }
    }

    if metrics == 0 { 0.0 } else { clamp_unit(total / metrics as f64) }
}
