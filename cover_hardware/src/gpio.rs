use cover_traits::{BinaryState, OutputLine};
use rppal::gpio::{Gpio, InputPin, OutputPin};
use tracing::trace;

use crate::error::{HwError, Result};

fn gpio() -> Result<Gpio> {
    Gpio::new().map_err(|e| HwError::Gpio(format!("open gpio: {e}")))
}

/// Relay or opener input driven from a GPIO output.
pub struct GpioLine {
    pin: OutputPin,
    bcm: u8,
    high: bool,
}

impl GpioLine {
    /// Claim `bcm` as an output, idle low.
    pub fn new(bcm: u8) -> Result<Self> {
        let mut pin = gpio()?
            .get(bcm)
            .map_err(|e| HwError::Gpio(format!("open output pin {bcm}: {e}")))?
            .into_output();
        pin.set_low();
        Ok(Self {
            pin,
            bcm,
            high: false,
        })
    }
}

impl OutputLine for GpioLine {
    fn set_level(&mut self, high: bool) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if high {
            self.pin.set_high();
        } else {
            self.pin.set_low();
        }
        self.high = high;
        trace!(pin = self.bcm, high, "gpio output");
        Ok(())
    }

    fn is_set_high(&self) -> bool {
        self.high
    }
}

/// Endstop switch wired to a GPIO input.
///
/// Active-low inputs use the internal pull-up (switch to ground), active-high
/// inputs the pull-down.
pub struct GpioEndstop {
    pin: InputPin,
    active_low: bool,
}

impl GpioEndstop {
    pub fn new(bcm: u8, active_low: bool) -> Result<Self> {
        let pin = gpio()?
            .get(bcm)
            .map_err(|e| HwError::Gpio(format!("open input pin {bcm}: {e}")))?;
        let pin = if active_low {
            pin.into_input_pullup()
        } else {
            pin.into_input_pulldown()
        };
        Ok(Self { pin, active_low })
    }
}

impl BinaryState for GpioEndstop {
    fn is_active(&mut self) -> bool {
        self.pin.is_high() != self.active_low
    }
}
