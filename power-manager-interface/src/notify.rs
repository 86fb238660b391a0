//! Sleep notifications
use crate::PowerMode;

/// Point in the sleep cycle a listener is notified at
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SleepEvent {
    /// About to enter a low power mode
    Suspending,
    /// Back from a low power mode, interrupts restored
    Resuming,
}

/// Sleep notification listener
///
/// Called synchronously from the idle hook. Implementations must be fast, must not block and must
/// not request power mode changes.
pub trait SleepNotify {
    /// Handle `event` for a sleep cycle in `mode`
    fn notify(&self, event: SleepEvent, mode: PowerMode);
}
