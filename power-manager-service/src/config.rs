//! Sleep mode configuration
use power_manager_interface::{PowerMode, RetentionSections, Sku};

/// Configured sleep target
///
/// A copy of this struct is what the idle hook works from, so every field must be consistent with
/// the others as of a single update.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ModeConfig {
    /// Master switch for every low power mode deeper than OS sleep
    pub enable: bool,
    /// Target mode, always one of [`PowerMode::CONFIGURABLE`]
    pub mode: PowerMode,
    /// Requested sleep duration, 0 means no timeout
    pub duration_ms: u32,
    /// Shortest sleep for which shutdown is used, shorter sleeps use standby instead
    pub shutdown_threshold_ms: u32,
    /// SRAM sections kept through standby
    pub retention: RetentionSections,
    /// Seconds without CLI activity before sleep is allowed, 0 disables the check
    pub inactivity_timeout_s: u32,
}

impl ModeConfig {
    /// Built-in defaults, used when nothing else is configured
    pub const DEFAULT: Self = Self {
        enable: false,
        mode: PowerMode::Stop,
        duration_ms: 0,
        shutdown_threshold_ms: 10_000,
        retention: RetentionSections::empty(),
        inactivity_timeout_s: 30,
    };

    /// Returns true if `duration_ms` is the no-timeout sentinel
    pub const fn is_infinite(&self) -> bool {
        self.duration_ms == 0
    }
}

impl Default for ModeConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Power manager configuration, supplied at init
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PowerManagerConfig {
    /// Hardware variant
    pub sku: Sku,
    /// Count prevent-sleep events per device in addition to per category
    pub debug_counters: bool,
    /// Initial sleep configuration
    pub defaults: ModeConfig,
}

/// Platform facts fixed at init
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Platform {
    pub sku: Sku,
    pub debug_counters: bool,
}

impl Platform {
    pub const fn new() -> Self {
        Self {
            sku: Sku::Alt1250,
            debug_counters: false,
        }
    }
}
