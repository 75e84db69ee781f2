// ringscan/src/fingerprint/mod.rs
//
// Per-fingerprint helpers: canonical hashing, pairwise similarity,
// automation heuristics, internal consistency checks, near-duplicate lookup
// and the combined per-response annotation.
//
// The hash is a 32-bit multiply-add rolling hash (h = h*31 + unit, wrapped to
// i32) over the UTF-16 code units of the canonical string, rendered as
// base-36 of |h|. It is an indexing key only. With 2^32 buckets, collisions
// between unrelated devices are expected at survey scale and are tolerated:
// callers must confirm a hash hit with `similarity::similarity` before
// treating two responses as the same device.

pub mod assess;
pub mod automation;
pub mod consistency;
pub mod index;
pub mod similarity;

use crate::model::DeviceFingerprint;

pub const FIELD_SEPARATOR: &str = "|";

const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Deterministic field concatenation. Missing fields render as "", and so do
/// zero or NaN numbers, keeping keys stable with those already stored.
pub fn canonical_string(fp: &DeviceFingerprint) -> String {
    let text = |v: &Option<String>| v.clone().unwrap_or_default();
    let num  = |v: Option<f64>| v
        .filter(|n| *n != 0.0 && !n.is_nan())
        .map(|n| n.to_string())
        .unwrap_or_default();

    let screen   = fp.screen.clone().unwrap_or_default();
    let hardware = fp.hardware.clone().unwrap_or_default();

    let mut fonts = fp.fonts.clone().unwrap_or_default();
    fonts.sort();

    [
        text(&fp.user_agent),
        text(&fp.platform),
        text(&fp.language),
        text(&fp.timezone),
        num(screen.width),
        num(screen.height),
        num(screen.device_pixel_ratio),
        num(screen.color_depth),
        num(hardware.cpu_cores),
        num(hardware.memory_gb),
        text(&fp.canvas_fingerprint),
        text(&fp.webgl_fingerprint),
        fonts.join(","),
    ]
    .join(FIELD_SEPARATOR)
}

/// Short lookup key for cheap equality checks. Not an identity proof.
pub fn hash_fingerprint(fp: &DeviceFingerprint) -> String {
    let h = rolling_hash(&canonical_string(fp));
    to_base36((h as i64).unsigned_abs())
}

pub fn rolling_hash(s: &str) -> i32 {
    s.encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(unit as i32))
}

fn to_base36(mut n: u64) -> String {
    if n == 0 {
        return "0".into();
    }
    let mut digits = Vec::new();
    while n > 0 {
        digits.push(BASE36[(n % 36) as usize]);
        n /= 36;
    }
    digits.iter().rev().map(|&d| d as char).collect()
}
