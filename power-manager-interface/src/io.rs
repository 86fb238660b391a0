//! Monitored IO and link state
use crate::DriverError;

/// MCU IO number
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IoId(pub u8);

/// Logic level of an IO
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Level {
    /// Low
    Low,
    /// High
    High,
}

/// State of the host interface flow-control link to the modem
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkState {
    /// Link idle, sleep allowed
    #[default]
    Down,
    /// Link in use, sleep must be deferred
    Up,
}

/// Reads the level of monitored IOs
pub trait IoMonitor {
    /// Current level of `io`
    fn level(&mut self, io: IoId) -> Result<Level, DriverError>;
}

impl<T: IoMonitor + ?Sized> IoMonitor for &mut T {
    fn level(&mut self, io: IoId) -> Result<Level, DriverError> {
        T::level(self, io)
    }
}

/// IO monitor for boards that never register monitored IO
pub struct NoIo;

impl IoMonitor for NoIo {
    fn level(&mut self, _io: IoId) -> Result<Level, DriverError> {
        Err(DriverError::Rejected)
    }
}
