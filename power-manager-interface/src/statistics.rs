//! Wake statistics reported by the platform driver

/// How the MCU came out of reset
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BootType {
    /// Power-on or reset pin
    #[default]
    Cold,
    /// Wake from a PMP managed low power mode
    Warm,
}

/// Whether retention memory content survived the last low power period
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WakeupState {
    /// Retention memory content is not valid
    #[default]
    Stateless,
    /// Retention memory content is valid and must be restored before use
    Stateful,
}

/// Last wake cause
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WakeCause {
    /// No wake recorded since the statistics were cleared
    #[default]
    None,
    /// The requested duration expired
    Timeout,
    /// A wake capable IO interrupt fired
    IoIsr,
    /// The modem requested a wake
    Modem,
    /// The PMP could not attribute the wake
    Unknown,
}

/// Wake diagnostics record
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Statistics {
    /// Type of the last boot
    pub boot_type: BootType,
    /// Retention memory state on the last wake
    pub wakeup_state: WakeupState,
    /// Cause of the last wake
    pub last_cause: WakeCause,
    /// Milliseconds of the requested duration left when the last wake was early
    pub last_dur_left_ms: u32,
    /// Cumulative count of stop mode wakes
    pub counter: u32,
}
