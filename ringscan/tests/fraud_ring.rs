// ringscan/tests/fraud_ring.rs
//
// End-to-end fraud-ring scenarios through the public API.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::json;

use ringscan::{
    AnalysisConfig, ClusteringMode, FraudRingAggregator, FraudRingAnalysis, MemoryRepository,
    PatternType, RepositoryError, ResponseQuery, ResponseRepository, RiskLevel, Severity,
    SurveyResponse,
};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 1, 18, 30, 0).unwrap()
}

fn response(id: &str, survey: &str, secs_ago: i64) -> SurveyResponse {
    SurveyResponse::new(id, survey, now() - Duration::seconds(secs_ago))
}

struct FlakyRepository;

impl ResponseRepository for FlakyRepository {
    fn fetch(&self, _q: &ResponseQuery) -> Result<Vec<SurveyResponse>, RepositoryError> {
        Err(RepositoryError::Unavailable("pool exhausted".into()))
    }
}

#[test]
fn batch_below_min_group_size_is_neutral() {
    let repo: MemoryRepository = [response("a", "s", 10), response("b", "s", 20)].into_iter().collect();
    let out = FraudRingAggregator::default().analyze_at(&repo, "s", now());
    assert!(!out.is_fraud_ring);
    assert_eq!(out.confidence, 0.0);
    assert_eq!(out.ring_size, 0);
}

#[test]
fn repository_failure_is_neutral() {
    let out = FraudRingAggregator::default().analyze_at(&FlakyRepository, "s", now());
    assert_eq!(out, FraudRingAnalysis::neutral());
}

#[test]
fn five_responses_in_three_minutes_are_coordinated() {
    // 18:25:30 .. 18:28:30, one 5-minute bucket.
    let repo: MemoryRepository = (0..5)
        .map(|i| response(&format!("t{i}"), "s", 90 + i * 45))
        .collect();
    let out = FraudRingAggregator::default().analyze_at(&repo, "s", now());

    let timing: Vec<_> = out.patterns.iter()
        .filter(|p| p.pattern_type == PatternType::CoordinatedTiming)
        .collect();
    assert_eq!(timing.len(), 1);
    assert_eq!(timing[0].severity, Severity::Medium);
    let mut ids = timing[0].affected_response_ids.clone();
    ids.sort();
    assert_eq!(ids, vec!["t0", "t1", "t2", "t3", "t4"]);
}

#[test]
fn shared_answers_fire_with_confidence() {
    let repo: MemoryRepository = (0..3)
        .map(|i| {
            let mut r = response(&format!("a{i}"), "s", 3600 * (i + 1));
            r.answers = serde_json::from_value(json!({
                "q1": "Strongly agree",
                "q2": 7,
                "q3": "The onboarding flow was confusing",
            }))
            .unwrap();
            r
        })
        .collect();
    let out = FraudRingAggregator::default().analyze_at(&repo, "s", now());

    let answer = out.patterns.iter()
        .find(|p| p.pattern_type == PatternType::AnswerSharing)
        .expect("answer-sharing pattern");
    assert!(answer.confidence >= 0.7);
    assert_eq!(answer.affected_response_ids.len(), 3);
    assert_eq!(out.evidence.identical_answers, 3);
}

#[test]
fn six_from_one_ip_masks_address() {
    let repo: MemoryRepository = (0..6)
        .map(|i| {
            let mut r = response(&format!("ip{i}"), "s", 1800 * (i + 1));
            r.ip_address = Some("203.0.113.5".into());
            r
        })
        .collect();
    let out = FraudRingAggregator::default().analyze_at(&repo, "s", now());

    let ip = out.patterns.iter()
        .find(|p| p.pattern_type == PatternType::IpSharing)
        .expect("ip-sharing pattern");
    assert_eq!(ip.severity, Severity::Medium);
    assert!(ip.description.contains("203.0.xxx.xxx"));
    assert!(!ip.description.contains("113.5"));
    assert_eq!(out.suspicious_groups.len(), 1);
    assert_eq!(out.suspicious_groups[0].risk_level, RiskLevel::Low);
    assert_eq!(out.ring_size, 6);
}

#[test]
fn surveys_do_not_mix() {
    // 8 from one address overall, 4 per survey.
    let repo: MemoryRepository = (0..8)
        .map(|i| {
            let survey = if i % 2 == 0 { "even" } else { "odd" };
            let mut r = response(&format!("r{i}"), survey, 60 * i);
            r.ip_address = Some("192.0.2.1".into());
            r
        })
        .collect();
    let agg = FraudRingAggregator::default();
    for survey in ["even", "odd"] {
        let out = agg.analyze_at(&repo, survey, now());
        assert!(out.patterns.iter().all(|p| p.pattern_type != PatternType::IpSharing));
    }
}

#[test]
fn analysis_is_idempotent() {
    let repo: MemoryRepository = (0..12)
        .map(|i| {
            let mut r = response(&format!("r{i:02}"), "s", 20 * i);
            r.answers = serde_json::from_value(json!({ "q1": i % 2, "q2": "same" })).unwrap();
            r.ip_address = Some(format!("198.51.100.{}", i % 3));
            r.timing_samples = Some(vec![1000.0 + i as f64]);
            r
        })
        .collect();

    for mode in [ClusteringMode::Greedy, ClusteringMode::Connected] {
        let cfg = AnalysisConfig { clustering: mode, ..Default::default() };
        let agg = FraudRingAggregator::new(cfg).unwrap();
        let first  = agg.analyze_at(&repo, "s", now());
        let second = agg.analyze_at(&repo, "s", now());
        assert_eq!(first.patterns, second.patterns);
        assert_eq!(first.suspicious_groups, second.suspicious_groups);
        assert!((0.0..=1.0).contains(&first.confidence));
        for g in &first.suspicious_groups {
            assert!((0.0..=1.0).contains(&g.similarity_score));
        }
    }
}

#[test]
fn batch_is_capped_at_max_responses() {
    let repo: MemoryRepository = (0..50)
        .map(|i| {
            let mut r = response(&format!("r{i:02}"), "s", 3600 + 400 * i);
            r.ip_address = Some("192.0.2.9".into());
            r
        })
        .collect();
    let cfg = AnalysisConfig { max_responses: 8, ..Default::default() };
    let out = FraudRingAggregator::new(cfg).unwrap().analyze_at(&repo, "s", now());
    assert_eq!(out.evidence.shared_ips, 8);
}

#[test]
fn works_behind_shared_handle() {
    let repo: Arc<MemoryRepository> = Arc::new(
        (0..5).map(|i| response(&format!("r{i}"), "s", 10 + i)).collect(),
    );
    let agg = FraudRingAggregator::default();
    let out = agg.analyze_at(&repo, "s", now());
    assert_eq!(out.evidence.coordinated_timing, 5);
}
