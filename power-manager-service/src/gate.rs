//! Sleep gate
//!
//! Decides from a configuration snapshot and the current votes whether a low power mode may be
//! entered. Checks run in a fixed priority order and stop at the first one that blocks, so each
//! refusal is attributed to exactly one reason.
use embassy_time::{Duration, Instant};
use embedded_services::warn;
use power_manager_interface::{IoMonitor, LinkState};

use crate::config::ModeConfig;
use crate::registry::{MAX_DEVICES, Votes};

/// Why sleep was refused, in check order
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BlockReason {
    /// Master enable is off
    SleepDisabled,
    /// The CLI was used more recently than the inactivity timeout
    CliActive,
    /// A registered device voted busy
    DeviceBusy,
    /// The HIFC link is up
    HifcBusy,
    /// A monitored IO is at its busy level
    IoBusy,
}

/// Prevent-sleep diagnostic counters
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PreventSleepCounters {
    /// Refusals because sleep is disabled
    pub sleep_disabled: u32,
    /// Refusals because of recent CLI activity
    pub cli_active: u32,
    /// Refusals because a device was busy
    pub device_busy: u32,
    /// Refusals because the HIFC link was up
    pub hifc_busy: u32,
    /// Refusals because of a monitored IO
    pub io_busy: u32,
    /// Per sync device refusals, only counted with debug counters enabled
    pub sync_device: [u32; MAX_DEVICES],
    /// Refusals with any async device busy, only counted with debug counters enabled
    pub async_busy: u32,
}

impl PreventSleepCounters {
    /// Counters with every field zero
    pub const fn new() -> Self {
        Self {
            sleep_disabled: 0,
            cli_active: 0,
            device_busy: 0,
            hifc_busy: 0,
            io_busy: 0,
            sync_device: [0; MAX_DEVICES],
            async_busy: 0,
        }
    }

    /// Sum of the per category counters
    pub fn total(&self) -> u32 {
        self.sleep_disabled
            .saturating_add(self.cli_active)
            .saturating_add(self.device_busy)
            .saturating_add(self.hifc_busy)
            .saturating_add(self.io_busy)
    }

    pub(crate) fn record(&mut self, reason: BlockReason, votes: &Votes, per_device: bool) {
        let counter = match reason {
            BlockReason::SleepDisabled => &mut self.sleep_disabled,
            BlockReason::CliActive => &mut self.cli_active,
            BlockReason::DeviceBusy => &mut self.device_busy,
            BlockReason::HifcBusy => &mut self.hifc_busy,
            BlockReason::IoBusy => &mut self.io_busy,
        };
        *counter = counter.wrapping_add(1);

        if per_device && reason == BlockReason::DeviceBusy {
            for (bit, count) in self.sync_device.iter_mut().enumerate() {
                if votes.sync_busy & (1 << bit) != 0 {
                    *count = count.wrapping_add(1);
                }
            }
            if votes.async_busy != 0 {
                self.async_busy = self.async_busy.wrapping_add(1);
            }
        }
    }
}

fn cli_active(config: &ModeConfig, votes: &Votes, now: Instant) -> bool {
    if config.inactivity_timeout_s == 0 {
        return false;
    }

    let timeout = Duration::from_secs(u64::from(config.inactivity_timeout_s));
    votes
        .cli_activity
        .is_some_and(|last| now.saturating_duration_since(last) < timeout)
}

fn io_busy<IO: IoMonitor>(votes: &Votes, io: &mut IO) -> bool {
    votes.monitored.iter().flatten().any(|monitored| match io.level(monitored.io) {
        Ok(level) => level == monitored.busy_level,
        Err(e) => {
            // Unknown level keeps the MCU awake
            warn!("Failed to read monitored IO {:?}: {:?}", monitored.io, e);
            true
        }
    })
}

/// Evaluate every condition in priority order
pub(crate) fn evaluate<IO: IoMonitor>(
    config: &ModeConfig,
    votes: &Votes,
    io: &mut IO,
    now: Instant,
) -> Result<(), BlockReason> {
    if !config.enable {
        return Err(BlockReason::SleepDisabled);
    }

    if cli_active(config, votes, now) {
        return Err(BlockReason::CliActive);
    }

    if votes.sync_busy != 0 || votes.async_busy != 0 {
        return Err(BlockReason::DeviceBusy);
    }

    if votes.link != LinkState::Down {
        return Err(BlockReason::HifcBusy);
    }

    if io_busy(votes, io) {
        return Err(BlockReason::IoBusy);
    }

    Ok(())
}
