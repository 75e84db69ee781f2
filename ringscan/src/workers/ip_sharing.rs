// ringscan/src/workers/ip_sharing.rs
//
// Many submissions from one network address.
//
// Exact-match grouping on the stored IP string, in first-seen order. A
// household or office NAT legitimately produces a few responses per address,
// so the floor is MIN_SHARED rather than min_group_size, and only very large
// groups escalate to high severity.
//
// The address in the description is masked before it leaves this module:
//   IPv4                  203.0.113.5          → 203.0.xxx.xxx
//   IPv6 (/48 kept)       2001:db8:85a3::7334  → 2001:db8:85a3:xxxx
//   IPv4-mapped IPv6      ::ffff:198.51.100.7  → 198.51.xxx.xxx
//   anything else         first 8 chars + "..."

use std::collections::HashMap;
use std::net::IpAddr;

use crate::config::AnalysisConfig;
use crate::model::{Pattern, PatternType, Severity, SurveyResponse};
use crate::workers::{ids_of, Finding};

const MIN_SHARED:  usize = 5;   // responses per address to fire
const HIGH_SHARED: usize = 10;  // above this → high severity
const CONFIDENCE:  f64   = 0.6;

pub fn analyze(batch: &[SurveyResponse], _config: &AnalysisConfig) -> Vec<Finding> {
    let mut slot:   HashMap<&str, usize>     = HashMap::new();
    let mut groups: Vec<(&str, Vec<usize>)> = Vec::new();

    for (i, r) in batch.iter().enumerate() {
        let Some(ip) = r.ip() else { continue };
        let k = *slot.entry(ip).or_insert_with(|| {
            groups.push((ip, Vec::new()));
            groups.len() - 1
        });
        groups[k].1.push(i);
    }

    groups.into_iter()
        .filter(|(_, members)| members.len() >= MIN_SHARED)
        .map(|(ip, members)| {
            let severity = if members.len() > HIGH_SHARED { Severity::High } else { Severity::Medium };
            Finding {
                pattern: Pattern {
                    pattern_type:          PatternType::IpSharing,
                    severity,
                    description:           format!(
                        "{} responses from IP {}",
                        members.len(),
                        mask_ip(ip)
                    ),
                    affected_response_ids: ids_of(batch, &members),
                    confidence:            CONFIDENCE,
                },
                similarity: None,
            }
        })
        .collect()
}

pub fn mask_ip(ip: &str) -> String {
    match ip.trim().parse::<IpAddr>() {
        Ok(IpAddr::V4(v4)) => {
            let o = v4.octets();
            format!("{}.{}.xxx.xxx", o[0], o[1])
        }
        Ok(IpAddr::V6(v6)) => match v6.to_ipv4_mapped() {
            Some(v4) => mask_ip(&v4.to_string()),
            None => {
                let s = v6.segments();
                format!("{:x}:{:x}:{:x}:xxxx", s[0], s[1], s[2])
            }
        },
        Err(_) => {
            let parts: Vec<&str> = ip.split('.').collect();
            if parts.len() == 4 {
                format!("{}.{}.xxx.xxx", parts[0], parts[1])
            } else {
                let head: String = ip.chars().take(8).collect();
                format!("{}...", head)
            }
        }
    }
}
