//! Platform power driver (`DRV_PM`) contract
use crate::{DriverError, PowerMode, RetentionSections, Statistics, WakeupState};

/// Hardware side of the power manager
///
/// Implementations program the PMP and own the interrupt controller. Every method is called from
/// the idle hook with interrupts disabled at the core, so none may block on the scheduler.
pub trait PlatformPower {
    /// Interrupt mask state saved by [`PlatformPower::mask_interrupts`]
    type MaskState: Copy;

    /// Mask every interrupt except the wake and atomic counter sources, returning the previous mask
    fn mask_interrupts(&mut self) -> Self::MaskState;

    /// Restore the mask saved by [`PlatformPower::mask_interrupts`]
    fn restore_interrupts(&mut self, saved: Self::MaskState);

    /// Platform specific preparation before entering `mode`
    fn pre_sleep_process(&mut self, _mode: PowerMode) {}

    /// Platform specific recovery after waking from `mode`, such as clock gating
    fn post_sleep_process(&mut self, _mode: PowerMode) {}

    /// Enter stop mode for `duration_ms`, 0 meaning until an external wake event
    fn enter_stop_mode(&mut self, duration_ms: u32) -> Result<(), DriverError>;

    /// Enter standby mode keeping `retention` powered
    fn enter_standby_mode(&mut self, duration_ms: u32, retention: RetentionSections) -> Result<(), DriverError>;

    /// Enter shutdown mode
    fn enter_shutdown_mode(&mut self, duration_ms: u32) -> Result<(), DriverError>;

    /// Wake statistics as of the last wake
    fn statistics(&self) -> Statistics;

    /// Reset the wake statistics
    fn clear_statistics(&mut self);

    /// Whether retention memory content survived, as determined at early boot
    fn early_boot_probe(&self) -> WakeupState;
}

impl<T: PlatformPower + ?Sized> PlatformPower for &mut T {
    type MaskState = T::MaskState;

    fn mask_interrupts(&mut self) -> Self::MaskState {
        T::mask_interrupts(self)
    }

    fn restore_interrupts(&mut self, saved: Self::MaskState) {
        T::restore_interrupts(self, saved)
    }

    fn pre_sleep_process(&mut self, mode: PowerMode) {
        T::pre_sleep_process(self, mode)
    }

    fn post_sleep_process(&mut self, mode: PowerMode) {
        T::post_sleep_process(self, mode)
    }

    fn enter_stop_mode(&mut self, duration_ms: u32) -> Result<(), DriverError> {
        T::enter_stop_mode(self, duration_ms)
    }

    fn enter_standby_mode(&mut self, duration_ms: u32, retention: RetentionSections) -> Result<(), DriverError> {
        T::enter_standby_mode(self, duration_ms, retention)
    }

    fn enter_shutdown_mode(&mut self, duration_ms: u32) -> Result<(), DriverError> {
        T::enter_shutdown_mode(self, duration_ms)
    }

    fn statistics(&self) -> Statistics {
        T::statistics(self)
    }

    fn clear_statistics(&mut self) {
        T::clear_statistics(self)
    }

    fn early_boot_probe(&self) -> WakeupState {
        T::early_boot_probe(self)
    }
}
