//! Power modes
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Power mode of the MCU
///
/// Variants are ordered by depth, so `a > b` means `a` saves more power than `b`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum PowerMode {
    /// Running, never requested for sleep
    Run = 0,
    /// Core clock gated with WFI, handled by the RTOS port without the PMP
    Sleep = 1,
    /// PMP stop mode, RAM and peripherals retained
    Stop = 2,
    /// PMP standby mode, only GPM and the selected retention sections survive
    Standby = 3,
    /// PMP shutdown mode, everything but the wake logic is off
    Shutdown = 4,
}

impl PowerMode {
    /// Modes an application may select as its sleep target
    pub const CONFIGURABLE: [PowerMode; 3] = [PowerMode::Stop, PowerMode::Standby, PowerMode::Shutdown];

    /// Returns true if the mode may be selected through configuration
    pub const fn is_configurable(self) -> bool {
        matches!(self, PowerMode::Stop | PowerMode::Standby | PowerMode::Shutdown)
    }

    /// Returns true if the mode is entered through the PMP rather than a plain WFI
    pub const fn is_deep(self) -> bool {
        self.is_configurable()
    }

    /// Returns true if RAM content is lost and must go through hibernation
    pub const fn requires_hibernation(self) -> bool {
        matches!(self, PowerMode::Standby | PowerMode::Shutdown)
    }

    /// Lowercase name as used by the CLI and the persisted environment
    pub const fn name(self) -> &'static str {
        match self {
            PowerMode::Run => "run",
            PowerMode::Sleep => "sleep",
            PowerMode::Stop => "stop",
            PowerMode::Standby => "standby",
            PowerMode::Shutdown => "shutdown",
        }
    }

    /// Parse a configurable mode from its name, case-insensitively
    pub fn from_name(name: &str) -> Option<Self> {
        Self::CONFIGURABLE
            .into_iter()
            .find(|mode| mode.name().eq_ignore_ascii_case(name.trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("stop", Some(PowerMode::Stop))]
    #[case("Standby", Some(PowerMode::Standby))]
    #[case(" shutdown ", Some(PowerMode::Shutdown))]
    #[case("sleep", None)]
    #[case("run", None)]
    #[case("", None)]
    fn test_from_name(#[case] name: &str, #[case] expected: Option<PowerMode>) {
        assert_eq!(PowerMode::from_name(name), expected);
    }

    #[test]
    fn test_raw_conversion() {
        assert_eq!(PowerMode::try_from(3u8).ok(), Some(PowerMode::Standby));
        assert!(PowerMode::try_from(5u8).is_err());
        assert_eq!(u8::from(PowerMode::Shutdown), 4);
    }

    #[test]
    fn test_depth_order() {
        assert!(PowerMode::Shutdown > PowerMode::Standby);
        assert!(PowerMode::Standby > PowerMode::Stop);
        assert!(PowerMode::Stop > PowerMode::Sleep);
        assert!(!PowerMode::Sleep.is_deep());
        assert!(PowerMode::Stop.is_deep());
        assert!(!PowerMode::Stop.requires_hibernation());
        assert!(PowerMode::Standby.requires_hibernation());
    }
}
