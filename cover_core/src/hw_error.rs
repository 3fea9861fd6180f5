//! Maps `Box<dyn Error>` from trait boundaries to typed `CoverError`.
//!
//! The traits in `cover_traits` use `Box<dyn Error + Send + Sync>` so any device
//! backend can plug in; this module converts those to our typed error enum, with
//! an optional feature-gated path for `cover_hardware::HwError` downcasting.

use crate::error::CoverError;

/// Map a trait-boundary error to a typed `CoverError`.
///
/// Every failure of an activation device is a device fault; the typed paths
/// only sharpen the message.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> CoverError {
    if let Some(ce) = e.downcast_ref::<CoverError>() {
        return ce.clone();
    }

    // Feature-gated: try to downcast to HwError for precise mapping
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<cover_hardware::HwError>() {
            return match hw {
                cover_hardware::HwError::Unavailable(what) => {
                    CoverError::DeviceFault(format!("activation device unavailable: {what}"))
                }
                other => CoverError::DeviceFault(other.to_string()),
            };
        }
    }

    CoverError::DeviceFault(e.to_string())
}
