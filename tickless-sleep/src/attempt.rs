//! Per-cycle sleep attempt
use power_manager_interface::PowerMode;

/// Mode chosen for one idle cycle
///
/// Downgrades only ever change this value. The configured mode stays untouched, so the next
/// cycle starts from the configuration again.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SleepAttempt {
    /// Configured mode
    pub requested: PowerMode,
    /// Mode actually entered this cycle
    pub effective: PowerMode,
    /// Mode the next cycle goes back to when this one was downgraded
    pub restore_on_wake: Option<PowerMode>,
}

impl SleepAttempt {
    /// Attempt at the configured mode
    pub const fn new(requested: PowerMode) -> Self {
        Self {
            requested,
            effective: requested,
            restore_on_wake: None,
        }
    }

    /// Use the shallower mode `to` for this cycle. Never deepens the attempt.
    pub fn downgrade(&mut self, to: PowerMode) {
        if to < self.effective {
            self.effective = to;
            self.restore_on_wake = Some(self.requested);
        }
    }

    /// Returns true if the effective mode differs from the configured one
    pub fn is_downgraded(&self) -> bool {
        self.restore_on_wake.is_some()
    }
}

/// Result of one idle cycle
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Outcome {
    /// The kernel or application cancelled the cycle before any wait
    Aborted,
    /// Plain WFI with the tick suppressed
    OsSleep {
        /// Ticks stepped on wake
        slept_ticks: u32,
    },
    /// Low power mode through the platform driver
    LowPower {
        /// Mode selection for the cycle
        attempt: SleepAttempt,
        /// Duration handed to the driver, 0 for no timeout
        duration_ms: u32,
        /// Ticks stepped on wake
        slept_ticks: u32,
        /// False if the driver refused the entry
        entered: bool,
    },
}
