// ringscan/src/engine/fusion.rs
//
// Fraud-ring fusion: detector findings → suspicious groups → verdict.
//
// Suspicious groups:
//   Every answer, device, IP and behavior finding of at least min_group_size
//   responses is a candidate. Each candidate unions in the pattern type of
//   every other candidate sharing at least one response id, and takes the max
//   similarity across them (0.5 for device/IP findings, which carry none).
//   Risk level follows the DISTINCT type count: ≥3 high, 2 medium, else low.
//   Timing buckets are reported as patterns only and never form a group.
//
// Verdict:
//   is_fraud_ring = any high-risk group OR ≥ RING_PATTERN_COUNT patterns
//   ring_size     = largest suspicious group, 0 if none
//   confidence    = clamp(0.5 · patterns/5 + 0.5 · evidence/responses)
//
// Small batches (< min_group_size) and repository failures return the
// neutral verdict. Nothing here carries state between calls.

use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use crate::config::AnalysisConfig;
use crate::error::ConfigError;
use crate::model::{
    clamp_unit, Evidence, FraudRingAnalysis, PatternType, RiskLevel, SurveyResponse,
    SuspiciousGroup,
};
use crate::state::repository::{ResponseQuery, ResponseRepository};
use crate::workers::{self, Finding};

const RING_PATTERN_COUNT:  usize = 3;
const PATTERN_SATURATION:  f64   = 5.0;  // patterns at which that half of confidence maxes out
const UNSCORED_SIMILARITY: f64   = 0.5;

#[derive(Debug, Clone, Default)]
pub struct FraudRingAggregator {
    config: AnalysisConfig,
}

impl FraudRingAggregator {
    pub fn new(config: AnalysisConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AnalysisConfig { &self.config }

    /// Analyze the survey's responses from the last `timeWindowHours`.
    pub fn analyze(&self, repo: &dyn ResponseRepository, survey_id: &str) -> FraudRingAnalysis {
        self.analyze_at(repo, survey_id, Utc::now())
    }

    /// Same as [`analyze`](Self::analyze) with the window anchored at `now`,
    /// so a static snapshot replays identically.
    pub fn analyze_at(
        &self,
        repo:      &dyn ResponseRepository,
        survey_id: &str,
        now:       DateTime<Utc>,
    ) -> FraudRingAnalysis {
        let since = now
            .checked_sub_signed(Duration::hours(self.config.time_window_hours))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let query = ResponseQuery::survey(survey_id)
            .since(since)
            .limit(self.config.max_responses);

        let batch = match repo.fetch(&query) {
            Ok(rows) => rows,
            Err(e) => {
                warn!("fraud-ring scan survey={} failed: {}", survey_id, e);
                return FraudRingAnalysis::neutral();
            }
        };

        let analysis = self.analyze_batch(&batch);
        info!(
            "survey={} responses={} ring={} confidence={:.3} patterns={} groups={}",
            survey_id,
            batch.len(),
            analysis.is_fraud_ring,
            analysis.confidence,
            analysis.patterns.len(),
            analysis.suspicious_groups.len(),
        );
        analysis
    }

    /// Analyze an already-fetched batch, newest first.
    pub fn analyze_batch(&self, batch: &[SurveyResponse]) -> FraudRingAnalysis {
        if batch.is_empty() || batch.len() < self.config.min_group_size {
            return FraudRingAnalysis::neutral();
        }

        let findings = workers::run_all(batch, &self.config);

        let mut evidence = Evidence::default();
        for f in &findings {
            evidence.record(f.pattern.pattern_type, f.pattern.affected_response_ids.len());
        }

        let suspicious_groups = suspicious_groups(&findings, self.config.min_group_size);
        let patterns: Vec<_> = findings.into_iter().map(|f| f.pattern).collect();

        let ring_size = suspicious_groups.iter()
            .map(|g| g.response_ids.len())
            .max()
            .unwrap_or(0);

        let is_fraud_ring = suspicious_groups.iter().any(|g| g.risk_level == RiskLevel::High)
            || patterns.len() >= RING_PATTERN_COUNT;

        let confidence = clamp_unit(
            0.5 * (patterns.len() as f64 / PATTERN_SATURATION)
                + 0.5 * (evidence.total() as f64 / batch.len() as f64),
        );

        FraudRingAnalysis {
            is_fraud_ring,
            confidence,
            ring_size,
            patterns,
            evidence,
            suspicious_groups,
        }
    }
}

pub fn suspicious_groups(findings: &[Finding], min_group_size: usize) -> Vec<SuspiciousGroup> {
    let candidates: Vec<(&Finding, HashSet<&str>)> = findings.iter()
        .filter(|f| f.pattern.pattern_type != PatternType::CoordinatedTiming)
        .filter(|f| f.pattern.affected_response_ids.len() >= min_group_size)
        .map(|f| {
            let ids = f.pattern.affected_response_ids.iter().map(String::as_str).collect();
            (f, ids)
        })
        .collect();

    candidates.iter()
        .enumerate()
        .map(|(i, (f, ids))| {
            let mut types: BTreeSet<PatternType> = BTreeSet::from([f.pattern.pattern_type]);
            let mut similarity = f.similarity.unwrap_or(UNSCORED_SIMILARITY);

            for (j, (other, other_ids)) in candidates.iter().enumerate() {
                if i == j || ids.is_disjoint(other_ids) { continue; }
                types.insert(other.pattern.pattern_type);
                similarity = similarity.max(other.similarity.unwrap_or(UNSCORED_SIMILARITY));
            }

            SuspiciousGroup {
                response_ids:           f.pattern.affected_response_ids.clone(),
                similarity_score:       clamp_unit(similarity),
                risk_level:             RiskLevel::from_type_count(types.len()),
                shared_attribute_types: types,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RepositoryError;
    use crate::model::{Pattern, Severity};
    use crate::state::repository::MemoryRepository;
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 14, 12, 0, 0).unwrap()
    }

    fn response(id: &str, mins_ago: i64) -> SurveyResponse {
        SurveyResponse::new(id, "s", now() - Duration::minutes(mins_ago))
    }

    fn finding(kind: PatternType, ids: &[&str], similarity: Option<f64>) -> Finding {
        Finding {
            pattern: Pattern {
                pattern_type:          kind,
                severity:              Severity::Medium,
                description:           String::new(),
                affected_response_ids: ids.iter().map(|s| s.to_string()).collect(),
                confidence:            similarity.unwrap_or(0.5),
            },
            similarity,
        }
    }

    struct DownRepository;

    impl ResponseRepository for DownRepository {
        fn fetch(&self, q: &ResponseQuery) -> Result<Vec<SurveyResponse>, RepositoryError> {
            Err(RepositoryError::Query { survey_id: q.survey_id.clone(), reason: "timeout".into() })
        }
    }

    #[test]
    fn rejects_invalid_config() {
        let cfg = AnalysisConfig { similarity_threshold: 2.0, ..Default::default() };
        assert!(FraudRingAggregator::new(cfg).is_err());
    }

    #[test]
    fn small_batch_is_neutral() {
        let agg = FraudRingAggregator::default();
        let batch = vec![response("a", 0), response("b", 1)];
        assert_eq!(agg.analyze_batch(&batch), FraudRingAnalysis::neutral());
        assert_eq!(agg.analyze_batch(&[]), FraudRingAnalysis::neutral());
    }

    #[test]
    fn fetch_failure_is_neutral() {
        let agg = FraudRingAggregator::default();
        assert_eq!(agg.analyze_at(&DownRepository, "s", now()), FraudRingAnalysis::neutral());
    }

    #[test]
    fn timing_burst_is_a_pattern_not_a_group() {
        let batch: Vec<SurveyResponse> = (0..5).map(|i| response(&format!("r{i}"), 0)).collect();
        let out = FraudRingAggregator::default().analyze_batch(&batch);
        assert_eq!(out.patterns.len(), 1);
        assert_eq!(out.patterns[0].pattern_type, PatternType::CoordinatedTiming);
        assert_eq!(out.evidence.coordinated_timing, 5);
        assert!(out.suspicious_groups.is_empty());
        assert_eq!(out.ring_size, 0);
        assert!(!out.is_fraud_ring);
        // 0.5 * 1/5 + 0.5 * 5/5
        assert!((out.confidence - 0.6).abs() < 1e-12);
    }

    #[test]
    fn overlapping_groups_raise_risk() {
        let findings = vec![
            finding(PatternType::AnswerSharing, &["a", "b", "c"], Some(0.8)),
            finding(PatternType::DeviceSharing, &["c", "d", "e"], None),
            finding(PatternType::IpSharing, &["e", "f", "g", "h", "i"], None),
            finding(PatternType::CoordinatedTiming, &["a", "b", "c", "d", "e"], None),
            finding(PatternType::BehavioralSimilarity, &["x", "y", "z"], Some(0.75)),
        ];
        let groups = suspicious_groups(&findings, 3);
        assert_eq!(groups.len(), 4);

        // answer ∩ device
        assert_eq!(groups[0].risk_level, RiskLevel::Medium);
        assert_eq!(groups[0].similarity_score, 0.8);
        // device ∩ answer, device ∩ ip
        assert_eq!(groups[1].risk_level, RiskLevel::High);
        assert_eq!(groups[1].shared_attribute_types.len(), 3);
        assert_eq!(groups[1].similarity_score, 0.8);
        // ip ∩ device
        assert_eq!(groups[2].risk_level, RiskLevel::Medium);
        assert_eq!(groups[2].similarity_score, 0.5);
        // isolated
        assert_eq!(groups[3].risk_level, RiskLevel::Low);
        assert_eq!(groups[3].similarity_score, 0.75);
    }

    #[test]
    fn duplicate_types_count_once() {
        let findings = vec![
            finding(PatternType::AnswerSharing, &["a", "b", "c"], Some(0.9)),
            finding(PatternType::AnswerSharing, &["c", "d", "e"], Some(0.7)),
        ];
        let groups = suspicious_groups(&findings, 3);
        assert!(groups.iter().all(|g| g.risk_level == RiskLevel::Low));
        assert!(groups.iter().all(|g| g.similarity_score == 0.9));
    }

    #[test]
    fn groups_below_min_size_are_not_suspicious() {
        let findings = vec![finding(PatternType::IpSharing, &["a", "b", "c", "d", "e"], None)];
        assert!(suspicious_groups(&findings, 6).is_empty());
        assert_eq!(suspicious_groups(&findings, 5).len(), 1);
    }

    #[test]
    fn coordinated_ring_end_to_end() {
        // Same device, same IP, same answers, same cadence.
        let repo: MemoryRepository = (0..6)
            .map(|i| {
                let mut r = response(&format!("ring{i}"), i);
                r.answers = serde_json::from_value(json!({"q1": 5, "q2": "love it"})).unwrap();
                r.ip_address = Some("203.0.113.5".into());
                r.device_fingerprint = Some(json!({
                    "userAgent": "Mozilla/5.0 (X11; Linux x86_64) HeadlessChrome/120.0",
                    "platform": "Linux x86_64",
                    "canvasFingerprint": "c-dead",
                }));
                r.timing_samples = Some(vec![900.0, 1100.0]);
                r
            })
            .chain((0..4).map(|i| {
                let mut r = response(&format!("human{i}"), 600 + i * 90);
                r.answers = serde_json::from_value(json!({"q1": i, "q2": format!("answer {i}")})).unwrap();
                r.ip_address = Some(format!("198.51.100.{i}"));
                r
            }))
            .collect();

        let agg = FraudRingAggregator::default();
        let out = agg.analyze_at(&repo, "s", now());

        let kinds: BTreeSet<PatternType> = out.patterns.iter().map(|p| p.pattern_type).collect();
        assert_eq!(kinds.len(), 5);
        assert!(out.is_fraud_ring);
        assert_eq!(out.ring_size, 6);
        assert!(out.suspicious_groups.iter().any(|g| g.risk_level == RiskLevel::High));
        assert_eq!(out.evidence.shared_ips, 6);
        assert_eq!(out.evidence.shared_devices, 6);
        assert!((0.0..=1.0).contains(&out.confidence));

        // Same snapshot, same answer.
        assert_eq!(agg.analyze_at(&repo, "s", now()), out);
    }

    #[test]
    fn window_excludes_old_responses() {
        let repo: MemoryRepository = (0..5)
            .map(|i| response(&format!("old{i}"), 60 * 25 + i))
            .collect();
        let out = FraudRingAggregator::default().analyze_at(&repo, "s", now());
        assert_eq!(out, FraudRingAnalysis::neutral());
    }
}
