//! Endstop monitor: debounced edge detection on the two limit sensors.

use cover_traits::BinaryState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endstop {
    Open,
    Close,
}

impl Endstop {
    pub fn as_str(self) -> &'static str {
        match self {
            Endstop::Open => "open",
            Endstop::Close => "close",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    /// Sensor became active (limit reached).
    Rising,
    /// Sensor became inactive (limit left).
    Falling,
}

/// A verified change of one endstop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndstopEvent {
    pub endstop: Endstop,
    pub edge: Edge,
    pub at_ms: u64,
}

/// Hold-time debouncer.
///
/// A reading that differs from the stable level must persist for `hold_ms`
/// before it is accepted; a reading back at the stable level cancels it.
#[derive(Debug, Clone)]
pub struct Debouncer {
    stable: bool,
    pending_since_ms: Option<u64>,
    hold_ms: u64,
}

impl Debouncer {
    pub fn new(initial: bool, hold_ms: u64) -> Self {
        Self {
            stable: initial,
            pending_since_ms: None,
            hold_ms,
        }
    }

    #[inline]
    pub fn stable(&self) -> bool {
        self.stable
    }

    /// Adopt `level` as stable without reporting an edge.
    pub fn reset(&mut self, level: bool) {
        self.stable = level;
        self.pending_since_ms = None;
    }

    /// Feed one raw reading; returns the edge once a change is verified.
    pub fn update(&mut self, raw: bool, now_ms: u64) -> Option<Edge> {
        if raw == self.stable {
            self.pending_since_ms = None;
            return None;
        }
        let since = *self.pending_since_ms.get_or_insert(now_ms);
        if now_ms.saturating_sub(since) < self.hold_ms {
            return None;
        }
        self.stable = raw;
        self.pending_since_ms = None;
        Some(if raw { Edge::Rising } else { Edge::Falling })
    }
}

/// Owns both endstop sensors and their debouncers.
pub struct EndstopMonitor {
    open: Box<dyn BinaryState>,
    close: Box<dyn BinaryState>,
    open_db: Debouncer,
    close_db: Debouncer,
}

impl core::fmt::Debug for EndstopMonitor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EndstopMonitor")
            .field("open", &self.open_db.stable())
            .field("close", &self.close_db.stable())
            .finish()
    }
}

impl EndstopMonitor {
    pub fn new(open: Box<dyn BinaryState>, close: Box<dyn BinaryState>, debounce_ms: u64) -> Self {
        Self {
            open,
            close,
            open_db: Debouncer::new(false, debounce_ms),
            close_db: Debouncer::new(false, debounce_ms),
        }
    }

    /// Read both sensors and take the readings as stable, without events.
    /// Returns `(open_active, close_active)`.
    pub fn prime(&mut self) -> (bool, bool) {
        let open = self.open.is_active();
        let close = self.close.is_active();
        self.open_db.reset(open);
        self.close_db.reset(close);
        (open, close)
    }

    /// Sample both sensors once; at most one event per sensor.
    pub fn poll(&mut self, now_ms: u64) -> [Option<EndstopEvent>; 2] {
        let open = self
            .open_db
            .update(self.open.is_active(), now_ms)
            .map(|edge| EndstopEvent {
                endstop: Endstop::Open,
                edge,
                at_ms: now_ms,
            });
        let close = self
            .close_db
            .update(self.close.is_active(), now_ms)
            .map(|edge| EndstopEvent {
                endstop: Endstop::Close,
                edge,
                at_ms: now_ms,
            });
        [open, close]
    }

    pub fn debounce_ms(&self) -> u64 {
        self.open_db.hold_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_must_hold_for_window() {
        let mut db = Debouncer::new(false, 50);
        assert_eq!(db.update(true, 0), None);
        assert_eq!(db.update(true, 49), None);
        assert_eq!(db.update(true, 50), Some(Edge::Rising));
        assert!(db.stable());
        assert_eq!(db.update(true, 60), None);
    }

    #[test]
    fn bounce_back_cancels_pending_change() {
        let mut db = Debouncer::new(false, 50);
        assert_eq!(db.update(true, 0), None);
        assert_eq!(db.update(false, 20), None);
        // New change restarts the window
        assert_eq!(db.update(true, 40), None);
        assert_eq!(db.update(true, 80), None);
        assert_eq!(db.update(true, 90), Some(Edge::Rising));
    }

    #[test]
    fn zero_window_accepts_immediately() {
        let mut db = Debouncer::new(true, 0);
        assert_eq!(db.update(false, 7), Some(Edge::Falling));
        assert_eq!(db.update(false, 8), None);
    }

    #[test]
    fn reset_adopts_level_silently() {
        let mut db = Debouncer::new(false, 50);
        db.update(true, 0);
        db.reset(true);
        assert!(db.stable());
        assert_eq!(db.update(true, 100), None);
    }
}
