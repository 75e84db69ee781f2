// ringscan/src/fingerprint/similarity.rs
//
// Weighted attribute-by-attribute fingerprint comparison.
//
// An attribute only counts when it is present on BOTH sides: its weight then
// joins the denominator, and joins the numerator on an exact match. A field
// missing on either side is "unknown", never "different". That keeps the
// score symmetric, and a fully-populated fingerprint scores 1.0 against itself.

use crate::model::{present, DeviceFingerprint};

pub const W_USER_AGENT: u32 = 20;
pub const W_PLATFORM:   u32 = 10;
pub const W_LANGUAGE:   u32 = 5;
pub const W_TIMEZONE:   u32 = 10;
pub const W_SCREEN:     u32 = 15;
pub const W_HARDWARE:   u32 = 10;
pub const W_CANVAS:     u32 = 15;
pub const W_WEBGL:      u32 = 15;

/// Score in [0, 1]; 0 when no attribute is comparable on both sides.
pub fn similarity(a: &DeviceFingerprint, b: &DeviceFingerprint) -> f64 {
    let mut total   = 0u32;
    let mut matched = 0u32;

    let mut weigh = |comparable: Option<bool>, weight: u32| {
        if let Some(equal) = comparable {
            total += weight;
            if equal { matched += weight; }
        }
    };

    weigh(both_text(&a.user_agent, &b.user_agent), W_USER_AGENT);
    weigh(both_text(&a.platform, &b.platform), W_PLATFORM);
    weigh(both_text(&a.language, &b.language), W_LANGUAGE);
    weigh(both_text(&a.timezone, &b.timezone), W_TIMEZONE);

    weigh(
        a.screen.as_ref().zip(b.screen.as_ref())
            .map(|(x, y)| x.width == y.width && x.height == y.height),
        W_SCREEN,
    );
    weigh(
        a.hardware.as_ref().zip(b.hardware.as_ref())
            .map(|(x, y)| x.cpu_cores == y.cpu_cores && x.memory_gb == y.memory_gb),
        W_HARDWARE,
    );

    weigh(both_text(&a.canvas_fingerprint, &b.canvas_fingerprint), W_CANVAS);
    weigh(both_text(&a.webgl_fingerprint, &b.webgl_fingerprint), W_WEBGL);

    if total == 0 {
        return 0.0;
    }
    matched as f64 / total as f64
}

fn both_text(a: &Option<String>, b: &Option<String>) -> Option<bool> {
    present(a).zip(present(b)).map(|(x, y)| x == y)
}
