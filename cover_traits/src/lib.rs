pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

/// Something that can start or stop the door with a single action.
///
/// Implementations must return promptly; physical motion happens after the call.
pub trait Activatable {
    fn activate(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Timed follow-up work (e.g. releasing a pulsed output). Called once per loop iteration.
    fn service(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }
}

/// A boolean sensor such as an endstop.
pub trait BinaryState {
    /// Current logical level, with any active-low inversion already applied.
    fn is_active(&mut self) -> bool;
}

/// A digital output driving a relay or an opener input.
pub trait OutputLine {
    fn set_level(&mut self, high: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn is_set_high(&self) -> bool;
}
