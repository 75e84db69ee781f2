// ringscan/src/workers/mod.rs
//
// Pattern detectors. Each one reads the whole batch (newest first) and
// returns zero or more findings; none of them has side effects or state
// carried between runs.

pub mod answer_sharing;
pub mod behavioral;
pub mod cluster;
pub mod device_sharing;
pub mod ip_sharing;
pub mod timing_cluster;

use tracing::debug;

use crate::config::AnalysisConfig;
use crate::model::{Pattern, SurveyResponse};

/// A detector's pattern plus the group similarity behind it, when the
/// detector measures one. Device and IP groups carry `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct Finding {
    pub pattern:    Pattern,
    pub similarity: Option<f64>,
}

/// Run every detector over one batch, in a fixed order, and collect their
/// findings. Detectors that find nothing contribute nothing.
pub fn run_all(batch: &[SurveyResponse], config: &AnalysisConfig) -> Vec<Finding> {
    let stages: [(&str, fn(&[SurveyResponse], &AnalysisConfig) -> Vec<Finding>); 5] = [
        ("answer_sharing", answer_sharing::analyze),
        ("timing_cluster", timing_cluster::analyze),
        ("device_sharing", device_sharing::analyze),
        ("ip_sharing",     ip_sharing::analyze),
        ("behavioral",     behavioral::analyze),
    ];

    stages
        .into_iter()
        .flat_map(|(name, analyze)| {
            let found = analyze(batch, config);
            if !found.is_empty() {
                debug!("{} fired {} pattern(s) over {} responses", name, found.len(), batch.len());
            }
            found
        })
        .collect()
}

/// Batch indices → response ids, preserving member order.
pub(crate) fn ids_of(batch: &[SurveyResponse], members: &[usize]) -> Vec<String> {
    members.iter().map(|&i| batch[i].id.clone()).collect()
}
