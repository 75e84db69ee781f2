// ringscan/src/workers/answer_sharing.rs
//
// Shared answer sheets across respondents.
//
// Ring members typically copy one answer set and lightly paraphrase the
// free-text fields. Pairwise score:
//
//   matches / |keys(a) ∪ keys(b)|
//
// where a key matches when both values are deeply equal (numbers compared by
// value, so 4 and 4.0 agree), or both are strings whose lowercase token-set
// Jaccard exceeds TEXT_MATCH. A key present on only
// one side never matches. Groups of ≥ min_group_size scoring ≥ the configured
// threshold fire; severity is high above HIGH_SIMILARITY.

use std::collections::HashSet;

use serde_json::Value;

use crate::config::AnalysisConfig;
use crate::model::{clamp_unit, Pattern, PatternType, Severity, SurveyResponse};
use crate::workers::{cluster, ids_of, Finding};

const TEXT_MATCH:      f64 = 0.8;
const HIGH_SIMILARITY: f64 = 0.9;

pub fn analyze(batch: &[SurveyResponse], config: &AnalysisConfig) -> Vec<Finding> {
    let groups = cluster::group(
        batch.len(),
        |i| !batch[i].answers.is_empty(),
        |i, j| answer_similarity(&batch[i], &batch[j]),
        config.similarity_threshold,
        config.min_group_size,
        config.clustering,
    );

    groups.into_iter()
        .map(|g| {
            let similarity = clamp_unit(g.similarity);
            let severity = if similarity > HIGH_SIMILARITY { Severity::High } else { Severity::Medium };
            Finding {
                pattern: Pattern {
                    pattern_type:          PatternType::AnswerSharing,
                    severity,
                    description:           format!(
                        "{} responses with {}% identical answers",
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

pub fn answer_similarity(a: &SurveyResponse, b: &SurveyResponse) -> f64 {
    let keys: HashSet<&String> = a.answers.keys().chain(b.answers.keys()).collect();
    if keys.is_empty() {
        return 0.0;
    }

    let matches = keys.iter()
        .filter(|k| match (a.answers.get(**k), b.answers.get(**k)) {
            (Some(x), Some(y)) if same_answer(x, y) => true,
            (Some(Value::String(x)), Some(Value::String(y))) => text_similarity(x, y) > TEXT_MATCH,
            _ => false,
        })
        .count();

    matches as f64 / keys.len() as f64
}

/// Deep equality with numbers compared as f64.
fn same_answer(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _                  => x == y,
        },
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(x, y)| same_answer(x, y))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter().all(|(k, v)| y.get(k).is_some_and(|w| same_answer(v, w)))
        }
        _ => a == b,
    }
}

/// Lowercase whitespace-token Jaccard. Two token-free strings score 1.
pub fn text_similarity(a: &str, b: &str) -> f64 {
    let lower_a = a.to_lowercase();
    let lower_b = b.to_lowercase();
    let ta: HashSet<&str> = lower_a.split_whitespace().collect();
    let tb: HashSet<&str> = lower_b.split_whitespace().collect();

    let union = ta.union(&tb).count();
    if union == 0 {
        return 1.0;
    }
    ta.intersection(&tb).count() as f64 / union as f64
}
