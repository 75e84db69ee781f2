// ringscan/src/fingerprint/index.rs
//
// Near-duplicate scan: compare a target fingerprint against the most recent
// fingerprinted responses of one survey.
//
// Bounded by `limit` (default 1000) so the scan is O(limit) per call.
// Unreadable stored fingerprints are skipped, and a repository failure yields
// an empty result. This scan never fails its caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::fingerprint::similarity::similarity;
use crate::model::DeviceFingerprint;
use crate::state::repository::{ResponseQuery, ResponseRepository};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarResponse {
    pub id: String,
    pub similarity: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarFingerprints {
    pub count: usize,
    pub similar_responses: Vec<SimilarResponse>,
}

pub fn find_similar(
    repo:      &dyn ResponseRepository,
    target:    &DeviceFingerprint,
    survey_id: &str,
    threshold: f64,
    limit:     usize,
) -> SimilarFingerprints {
    let query = ResponseQuery::survey(survey_id).with_device_data().limit(limit);
    let rows = match repo.fetch(&query) {
        Ok(rows) => rows,
        Err(e) => {
            warn!("near-duplicate scan survey={} failed: {}", survey_id, e);
            return SimilarFingerprints::default();
        }
    };

    let mut similar: Vec<SimilarResponse> = rows.iter()
        .filter_map(|r| match r.fingerprint()? {
            Ok(fp) => Some((r, fp)),
            Err(e) => {
                debug!("skipping response {}: {}", r.id, e);
                None
            }
        })
        .filter_map(|(r, fp)| {
            let score = similarity(target, &fp);
            (score >= threshold).then(|| SimilarResponse {
                id:         r.id.clone(),
                similarity: score,
                created_at: r.created_at,
            })
        })
        .collect();

    // Stable: equal scores keep recency order.
    similar.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));

    SimilarFingerprints { count: similar.len(), similar_responses: similar }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RepositoryError;
    use crate::model::SurveyResponse;
    use crate::state::repository::MemoryRepository;
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    struct DownRepository;

    impl ResponseRepository for DownRepository {
        fn fetch(&self, _q: &ResponseQuery) -> Result<Vec<SurveyResponse>, RepositoryError> {
            Err(RepositoryError::Unavailable("connection refused".into()))
        }
    }

    fn response(id: &str, mins: i64, device: serde_json::Value) -> SurveyResponse {
        let t0 = Utc.with_ymd_and_hms(2026, 2, 10, 8, 0, 0).unwrap();
        let mut r = SurveyResponse::new(id, "s", t0 + Duration::minutes(mins));
        r.device_fingerprint = Some(device);
        r
    }

    fn target() -> DeviceFingerprint {
        DeviceFingerprint {
            user_agent: Some("UA-1".into()),
            platform: Some("Win32".into()),
            timezone: Some("UTC".into()),
            canvas_fingerprint: Some("cv".into()),
            ..Default::default()
        }
    }

    #[test]
    fn finds_matches_sorted_by_similarity() {
        let repo: MemoryRepository = [
            response("exact", 1, json!({"userAgent": "UA-1", "platform": "Win32",
                                        "timezone": "UTC", "canvasFingerprint": "cv"})),
            // 45 of 55 weight
            response("near", 2, json!({"userAgent": "UA-1", "platform": "MacIntel",
                                       "timezone": "UTC", "canvasFingerprint": "cv"})),
            response("far", 3, json!({"userAgent": "UA-2", "platform": "MacIntel",
                                      "timezone": "UTC", "canvasFingerprint": "cv"})),
            response("broken", 4, json!("garbage")),
        ]
        .into_iter()
        .collect();

        let out = find_similar(&repo, &target(), "s", 0.8, 1000);
        assert_eq!(out.count, 2);
        assert_eq!(out.similar_responses[0].id, "exact");
        assert_eq!(out.similar_responses[0].similarity, 1.0);
        assert_eq!(out.similar_responses[1].id, "near");
    }

    #[test]
    fn respects_limit_on_recent_rows() {
        let repo: MemoryRepository = (0..5)
            .map(|i| response(&format!("r{i}"), i, json!({"userAgent": "UA-1"})))
            .collect();
        let out = find_similar(&repo, &target(), "s", 0.8, 2);
        let ids: Vec<&str> = out.similar_responses.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["r4", "r3"]);
    }

    #[test]
    fn repository_failure_degrades_to_empty() {
        let out = find_similar(&DownRepository, &target(), "s", 0.8, 1000);
        assert_eq!(out, SimilarFingerprints::default());
    }
}
