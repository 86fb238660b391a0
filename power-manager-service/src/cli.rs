//! Console commands
//!
//! - `pwrMode {stop|standby|shutdown|show} [duration_ms]`
//! - `hibernate {enable|disable|show}`
//! - `sleepStatistics {show|reset}`
//!
//! Output is human readable only.
use core::fmt::Write;

use power_manager_interface::{Error, PlatformPower, PowerMode};

use crate::PowerManager;

/// Console command error
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CliError {
    /// Malformed command line
    Usage,
    /// The power manager refused the request
    Failed(Error),
    /// Writing to the console failed
    Output,
}

impl CliError {
    /// Console exit code
    pub const fn code(self) -> i32 {
        match self {
            CliError::Usage => -1,
            CliError::Failed(_) | CliError::Output => 1,
        }
    }
}

impl From<Error> for CliError {
    fn from(e: Error) -> Self {
        CliError::Failed(e)
    }
}

impl From<core::fmt::Error> for CliError {
    fn from(_: core::fmt::Error) -> Self {
        CliError::Output
    }
}

/// Exit code of a command result
pub const fn exit_code(result: Result<(), CliError>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => e.code(),
    }
}

/// Run the command in `args`, `args[0]` being the command name
pub async fn execute<D: PlatformPower, W: Write>(
    manager: &PowerManager<'_>,
    driver: &mut D,
    args: &[&str],
    out: &mut W,
) -> Result<(), CliError> {
    match args {
        ["pwrMode", rest @ ..] => pwr_mode(manager, rest, out).await,
        ["hibernate", rest @ ..] => hibernate(manager, rest, out).await,
        ["sleepStatistics", rest @ ..] => sleep_statistics(manager, driver, rest, out),
        _ => Err(CliError::Usage),
    }
}

async fn pwr_mode<W: Write>(manager: &PowerManager<'_>, args: &[&str], out: &mut W) -> Result<(), CliError> {
    match args {
        ["show"] => {
            let settings = manager.get_settings().await?;
            writeln!(out, "mode: {}", settings.mode.name())?;
            if settings.is_infinite() {
                writeln!(out, "duration: infinite")?;
            } else {
                writeln!(out, "duration: {} ms", settings.duration_ms)?;
            }
            writeln!(out, "shutdown threshold: {} ms", settings.shutdown_threshold_ms)?;
            writeln!(out, "retention: {:#x}", settings.retention.bits())?;
            writeln!(out, "inactivity timeout: {} s", settings.inactivity_timeout_s)?;
            Ok(())
        }
        [mode, duration @ ..] => {
            let mode = PowerMode::from_name(mode).ok_or(CliError::Usage)?;
            let duration_ms = match duration {
                [] => manager.get_settings().await?.duration_ms,
                [ms] => ms.parse().map_err(|_| CliError::Usage)?,
                _ => return Err(CliError::Usage),
            };
            manager.set_mode(mode, duration_ms).await?;
            writeln!(out, "mode set to {} ({} ms)", mode.name(), duration_ms)?;
            Ok(())
        }
        [] => Err(CliError::Usage),
    }
}

async fn hibernate<W: Write>(manager: &PowerManager<'_>, args: &[&str], out: &mut W) -> Result<(), CliError> {
    match args {
        ["enable"] => {
            manager.enable_sleep(true).await?;
            Ok(())
        }
        ["disable"] => {
            manager.enable_sleep(false).await?;
            Ok(())
        }
        ["show"] => {
            let enabled = manager.get_settings().await?.enable;
            writeln!(out, "sleep {}", if enabled { "enabled" } else { "disabled" })?;
            Ok(())
        }
        _ => Err(CliError::Usage),
    }
}

fn sleep_statistics<D: PlatformPower, W: Write>(
    manager: &PowerManager<'_>,
    driver: &mut D,
    args: &[&str],
    out: &mut W,
) -> Result<(), CliError> {
    match args {
        ["show"] => {
            let stats = driver.statistics();
            let counters = manager.get_prevent_sleep_cntr()?;
            writeln!(out, "boot type: {:?}", stats.boot_type)?;
            writeln!(out, "wakeup state: {:?}", stats.wakeup_state)?;
            writeln!(out, "last cause: {:?}", stats.last_cause)?;
            writeln!(out, "last duration left: {} ms", stats.last_dur_left_ms)?;
            writeln!(out, "stop wakes: {}", stats.counter)?;
            writeln!(out, "prevented by disable: {}", counters.sleep_disabled)?;
            writeln!(out, "prevented by cli: {}", counters.cli_active)?;
            writeln!(out, "prevented by device: {}", counters.device_busy)?;
            writeln!(out, "prevented by hifc: {}", counters.hifc_busy)?;
            writeln!(out, "prevented by io: {}", counters.io_busy)?;
            for (index, count) in counters.sync_device.iter().enumerate().filter(|(_, c)| **c != 0) {
                writeln!(out, "  device {}: {}", index, count)?;
            }
            if counters.async_busy != 0 {
                writeln!(out, "  async: {}", counters.async_busy)?;
            }
            Ok(())
        }
        ["reset"] => {
            manager.clr_prevent_sleep_cntr()?;
            driver.clear_statistics();
            Ok(())
        }
        _ => Err(CliError::Usage),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ModeConfig, PowerManagerConfig, VoteKind};
    use embassy_time::Instant;
    use heapless::String;
    use power_manager_interface::{NoIo, Statistics, WakeCause};
    use power_manager_interface_mocks::MockPlatform;

    async fn manager() -> PowerManager<'static> {
        let pm = PowerManager::new();
        pm.init(PowerManagerConfig {
            defaults: ModeConfig {
                enable: true,
                inactivity_timeout_s: 0,
                ..ModeConfig::DEFAULT
            },
            ..PowerManagerConfig::default()
        })
        .await
        .unwrap();
        pm
    }

    #[tokio::test]
    async fn test_pwr_mode() {
        let pm = manager().await;
        let mut driver = MockPlatform::new();
        let mut out = String::<512>::new();

        let result = execute(&pm, &mut driver, &["pwrMode", "standby", "10000"], &mut out).await;
        assert_eq!(exit_code(result), 0);
        assert_eq!(pm.get_settings().await.unwrap().mode, PowerMode::Standby);
        assert_eq!(pm.get_settings().await.unwrap().duration_ms, 10_000);

        // Duration is kept when omitted
        let result = execute(&pm, &mut driver, &["pwrMode", "shutdown"], &mut out).await;
        assert_eq!(exit_code(result), 0);
        assert_eq!(pm.get_settings().await.unwrap().duration_ms, 10_000);

        out.clear();
        execute(&pm, &mut driver, &["pwrMode", "show"], &mut out).await.unwrap();
        assert!(out.contains("mode: shutdown"));
        assert!(out.contains("duration: 10000 ms"));
    }

    #[tokio::test]
    async fn test_malformed_arguments() {
        let pm = manager().await;
        let mut driver = MockPlatform::new();
        let mut out = String::<256>::new();

        let cases: [&[&str]; 9] = [
            &["pwrMode"],
            &["pwrMode", "sleep"],
            &["pwrMode", "stop", "ten"],
            &["pwrMode", "stop", "1", "2"],
            &["hibernate"],
            &["hibernate", "on"],
            &["sleepStatistics", "clear"],
            &["reboot"],
            &[],
        ];
        for args in cases {
            let result = execute(&pm, &mut driver, args, &mut out).await;
            assert_eq!(result, Err(CliError::Usage));
            assert_eq!(exit_code(result), -1);
        }

        assert_eq!(pm.get_settings().await.unwrap().mode, ModeConfig::DEFAULT.mode);
    }

    #[tokio::test]
    async fn test_not_initialized_fails() {
        let pm = PowerManager::new();
        let mut driver = MockPlatform::new();
        let mut out = String::<64>::new();

        let result = execute(&pm, &mut driver, &["hibernate", "show"], &mut out).await;
        assert_eq!(result, Err(CliError::Failed(Error::NotInitialized)));
        assert_eq!(exit_code(result), 1);
    }

    #[tokio::test]
    async fn test_hibernate_toggle() {
        let pm = manager().await;
        let mut driver = MockPlatform::new();
        let mut out = String::<64>::new();

        execute(&pm, &mut driver, &["hibernate", "disable"], &mut out).await.unwrap();
        assert!(!pm.get_settings().await.unwrap().enable);
        execute(&pm, &mut driver, &["hibernate", "show"], &mut out).await.unwrap();
        assert_eq!(out.as_str(), "sleep disabled\n");

        execute(&pm, &mut driver, &["hibernate", "enable"], &mut out).await.unwrap();
        assert!(pm.get_settings().await.unwrap().enable);
    }

    #[tokio::test]
    async fn test_statistics_show_and_reset() {
        let pm = manager().await;
        let mut driver = MockPlatform::new();
        driver.set_statistics(Statistics {
            last_cause: WakeCause::Timeout,
            counter: 3,
            ..Statistics::default()
        });
        let device = pm.register_device(VoteKind::Sync).unwrap();
        pm.set_device_busy(device, true).unwrap();
        assert!(!pm.check_allow_to_sleep(&mut NoIo, Instant::from_secs(1)));

        let mut out = String::<1024>::new();
        execute(&pm, &mut driver, &["sleepStatistics", "show"], &mut out)
            .await
            .unwrap();
        assert!(out.contains("last cause: Timeout"));
        assert!(out.contains("stop wakes: 3"));
        assert!(out.contains("prevented by device: 1"));

        execute(&pm, &mut driver, &["sleepStatistics", "reset"], &mut out)
            .await
            .unwrap();
        assert_eq!(driver.statistics(), Statistics::default());
        assert_eq!(pm.get_prevent_sleep_cntr().unwrap().total(), 0);
    }
}
