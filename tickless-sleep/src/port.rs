//! Hardware and kernel seams of the idle hook
use embassy_time::Instant;

/// The core tick timer
pub trait SysTick {
    /// Stop counting without clearing the wrap flag
    fn stop(&mut self);
    /// Start counting from the current value
    fn start(&mut self);
    /// Current down-counter value
    fn current(&self) -> u32;
    /// Value loaded on the next wrap
    fn set_reload(&mut self, reload: u32);
    /// Zero the counter so the next start loads the reload value
    fn clear_current(&mut self);
    /// Read and clear the wrap flag
    fn count_flag(&mut self) -> bool;
    /// Read and clear a pending tick interrupt
    fn take_pending(&mut self) -> bool;
}

/// Core interrupt masking and wait
pub trait Cpu {
    /// Mask every interrupt at the core
    fn disable_interrupts(&mut self);
    /// Unmask interrupts at the core
    fn enable_interrupts(&mut self);
    /// Wait until an interrupt is pending
    fn wait_for_interrupt(&mut self);
}

/// Free running counter that keeps counting in low power modes
pub trait LowPowerCounter {
    /// Make sure the counter runs
    fn activate(&mut self);
    /// Current counter value, wrapping
    fn value(&self) -> u32;
}

/// Kernel answer to whether idle is still possible
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SleepModeStatus {
    /// A task became ready or a context switch is pending
    Abort,
    /// Sleep until the expected idle time elapses
    Standard,
    /// Every task is blocked without timeout
    NoTasksWaitingTimeout,
}

/// Scheduler hooks used around a suppressed tick period
pub trait Kernel {
    /// Called with interrupts disabled to recheck that sleeping is still valid
    fn confirm_sleep_mode_status(&mut self) -> SleepModeStatus;

    /// Account for `ticks` tick interrupts that were suppressed
    fn step_tick(&mut self, ticks: u32);

    /// Time used for CLI inactivity checks
    fn now(&self) -> Instant;

    /// Application hook before sleeping. Setting `ticks` to zero skips the wait.
    fn pre_sleep_processing(&mut self, _ticks: &mut u32) {}

    /// Application hook after waking
    fn post_sleep_processing(&mut self, _ticks: u32) {}
}

/// Tick timer, core and low power counter of one port
pub struct Hardware<S, C, L> {
    /// Core tick timer
    pub systick: S,
    /// Core interrupt control
    pub cpu: C,
    /// Counter that runs in low power modes
    pub lp_counter: L,
}
