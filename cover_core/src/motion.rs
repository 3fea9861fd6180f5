//! Motion timer: position estimates from elapsed travel time.
//!
//! Pure computation, no side effects.

/// Direction of travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Open,
    Close,
}

impl Direction {
    #[inline]
    pub fn reversed(self) -> Self {
        match self {
            Direction::Open => Direction::Close,
            Direction::Close => Direction::Open,
        }
    }

    /// Position at the end of travel in this direction.
    #[inline]
    pub fn extreme(self) -> f32 {
        match self {
            Direction::Open => 1.0,
            Direction::Close => 0.0,
        }
    }

    #[inline]
    fn sign(self) -> f32 {
        match self {
            Direction::Open => 1.0,
            Direction::Close => -1.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Open => "open",
            Direction::Close => "close",
        }
    }
}

/// Interpolated position after `elapsed_ms` of travel, clamped to `[0, 1]`.
///
/// A full `duration_ms` always lands exactly on the extreme. A zero duration
/// means instantaneous travel.
#[inline]
pub fn interpolate(start_position: f32, direction: Direction, elapsed_ms: u64, duration_ms: u64) -> f32 {
    if duration_ms == 0 || elapsed_ms >= duration_ms {
        return direction.extreme();
    }
    let frac = elapsed_ms as f32 / duration_ms as f32;
    (start_position + direction.sign() * frac).clamp(0.0, 1.0)
}

/// One stretch of motion. Exists only while the door moves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionOperation {
    pub direction: Direction,
    pub start_ms: u64,
    pub start_position: f32,
}

impl MotionOperation {
    #[inline]
    pub fn elapsed_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.start_ms)
    }

    #[inline]
    pub fn position_at(&self, now_ms: u64, duration_ms: u64) -> f32 {
        interpolate(
            self.start_position,
            self.direction,
            self.elapsed_ms(now_ms),
            duration_ms,
        )
    }

    /// The full travel time has passed without the operation ending.
    #[inline]
    pub fn timed_out(&self, now_ms: u64, duration_ms: u64) -> bool {
        self.elapsed_ms(now_ms) >= duration_ms
    }
}
