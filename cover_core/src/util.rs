//! Small unit helpers shared by the core and its hosts.

/// Number of milliseconds in one second.
pub const MILLIS_PER_SEC: u64 = 1_000;

/// Milliseconds as fractional seconds, for human-facing output.
#[inline]
pub fn ms_to_secs(ms: u64) -> f32 {
    ms as f32 / MILLIS_PER_SEC as f32
}

/// Position in `[0, 1]` as a whole percentage, rounded to nearest.
#[inline]
pub fn position_percent(position: f32) -> u8 {
    if !position.is_finite() {
        return 0;
    }
    (position.clamp(0.0, 1.0) * 100.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seconds_from_millis() {
        assert_eq!(ms_to_secs(1500), 1.5);
        assert_eq!(ms_to_secs(0), 0.0);
    }

    #[test]
    fn percent_rounds_and_clamps() {
        assert_eq!(position_percent(0.424), 42);
        assert_eq!(position_percent(0.426), 43);
        assert_eq!(position_percent(1.7), 100);
        assert_eq!(position_percent(-0.2), 0);
        assert_eq!(position_percent(f32::NAN), 0);
    }
}
