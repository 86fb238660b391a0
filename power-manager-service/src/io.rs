//! Monitored IO backed by `embedded-hal` input pins
use embedded_hal::digital::InputPin;
use heapless::Vec;
use power_manager_interface::{DriverError, IoId, IoMonitor, Level};

/// Maps IO numbers to input pins so the sleep gate can sample them
pub struct PinBank<P: InputPin, const N: usize> {
    pins: Vec<(IoId, P), N>,
}

impl<P: InputPin, const N: usize> PinBank<P, N> {
    /// Create an empty bank
    pub const fn new() -> Self {
        Self { pins: Vec::new() }
    }

    /// Attach `pin` as IO `io`, returning the pin back if the bank is full
    pub fn attach(&mut self, io: IoId, pin: P) -> Result<(), P> {
        self.pins.push((io, pin)).map_err(|(_, pin)| pin)
    }

    /// Detach IO `io`
    pub fn detach(&mut self, io: IoId) -> Option<P> {
        let index = self.pins.iter().position(|(id, _)| *id == io)?;
        Some(self.pins.swap_remove(index).1)
    }
}

impl<P: InputPin, const N: usize> Default for PinBank<P, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: InputPin, const N: usize> IoMonitor for PinBank<P, N> {
    fn level(&mut self, io: IoId) -> Result<Level, DriverError> {
        let (_, pin) = self
            .pins
            .iter_mut()
            .find(|(id, _)| *id == io)
            .ok_or(DriverError::Rejected)?;

        match pin.is_high() {
            Ok(true) => Ok(Level::High),
            Ok(false) => Ok(Level::Low),
            Err(_) => Err(DriverError::Timeout),
        }
    }
}
