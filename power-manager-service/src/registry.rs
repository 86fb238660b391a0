//! Wake vote registry
//!
//! Bookkeeping of everything that currently forbids sleep. Producers flip their votes from task
//! or interrupt context without coordinating with the sleep gate, which re-reads the votes on
//! every idle cycle.
use embassy_time::Instant;
use embedded_services::SyncCell;
use power_manager_interface::{Error, IoId, Level, LinkState};

/// Number of devices per vote kind
pub const MAX_DEVICES: usize = 32;

/// Number of IOs that can be monitored
pub const MAX_MONITORED_IO: usize = 4;

/// How a device reports its busy state
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum VoteKind {
    /// Set and cleared from task context around synchronous work
    Sync,
    /// Set from one context and cleared from another, typically an ISR completion
    Async,
}

/// Handle to a registered device
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceId {
    kind: VoteKind,
    bit: u8,
}

impl DeviceId {
    /// Vote kind of this device
    pub fn kind(&self) -> VoteKind {
        self.kind
    }

    /// Index of this device within its vote kind
    pub fn index(&self) -> usize {
        usize::from(self.bit)
    }

    fn mask(&self) -> u32 {
        1 << self.bit
    }
}

/// An IO whose level keeps the MCU awake
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MonitoredIo {
    /// IO number
    pub io: IoId,
    /// Level at which the IO is considered busy
    pub busy_level: Level,
}

/// Point-in-time copy of the votes
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Votes {
    /// Busy sync devices
    pub sync_busy: u32,
    /// Busy async devices
    pub async_busy: u32,
    /// HIFC link state
    pub link: LinkState,
    /// Last CLI activity, if any
    pub cli_activity: Option<Instant>,
    /// Monitored IOs
    pub monitored: [Option<MonitoredIo>; MAX_MONITORED_IO],
}

pub(crate) struct Registry {
    sync_registered: SyncCell<u32>,
    async_registered: SyncCell<u32>,
    sync_busy: SyncCell<u32>,
    async_busy: SyncCell<u32>,
    link: SyncCell<LinkState>,
    cli_activity: SyncCell<Option<Instant>>,
    monitored: SyncCell<[Option<MonitoredIo>; MAX_MONITORED_IO]>,
}

impl Registry {
    pub const fn new() -> Self {
        Self {
            sync_registered: SyncCell::new(0),
            async_registered: SyncCell::new(0),
            sync_busy: SyncCell::new(0),
            async_busy: SyncCell::new(0),
            link: SyncCell::new(LinkState::Down),
            cli_activity: SyncCell::new(None),
            monitored: SyncCell::new([None; MAX_MONITORED_IO]),
        }
    }

    fn registered(&self, kind: VoteKind) -> &SyncCell<u32> {
        match kind {
            VoteKind::Sync => &self.sync_registered,
            VoteKind::Async => &self.async_registered,
        }
    }

    fn busy(&self, kind: VoteKind) -> &SyncCell<u32> {
        match kind {
            VoteKind::Sync => &self.sync_busy,
            VoteKind::Async => &self.async_busy,
        }
    }

    pub fn register_device(&self, kind: VoteKind) -> Result<DeviceId, Error> {
        let registered = self.registered(kind);
        let mut slot = None;
        registered.update(|mask| {
            if mask == u32::MAX {
                return mask;
            }
            let bit = mask.trailing_ones();
            slot = Some(bit as u8);
            mask | (1 << bit)
        });

        slot.map(|bit| DeviceId { kind, bit }).ok_or(Error::RegistryFull)
    }

    pub fn set_device_busy(&self, device: DeviceId, busy: bool) -> Result<(), Error> {
        if self.registered(device.kind).get() & device.mask() == 0 {
            return Err(Error::InvalidParameter);
        }

        self.busy(device.kind).update(|mask| {
            if busy {
                mask | device.mask()
            } else {
                mask & !device.mask()
            }
        });
        Ok(())
    }

    pub fn set_link_state(&self, state: LinkState) {
        self.link.set(state);
    }

    pub fn notify_cli_activity(&self, now: Instant) {
        self.cli_activity.set(Some(now));
    }

    pub fn set_monitor_io(&self, io: IoId, busy_level: Level) -> Result<(), Error> {
        let mut result = Err(Error::RegistryFull);
        self.monitored.update(|mut list| {
            let existing = list.iter().position(|entry| entry.is_some_and(|e| e.io == io));
            let target = existing.or_else(|| list.iter().position(Option::is_none));
            if let Some(entry) = target.and_then(|index| list.get_mut(index)) {
                *entry = Some(MonitoredIo { io, busy_level });
                result = Ok(());
            }
            list
        });
        result
    }

    pub fn clear_monitor_io(&self, io: IoId) -> Result<(), Error> {
        let mut result = Err(Error::InvalidParameter);
        self.monitored.update(|mut list| {
            for entry in list.iter_mut() {
                if entry.is_some_and(|e| e.io == io) {
                    *entry = None;
                    result = Ok(());
                }
            }
            list
        });
        result
    }

    pub fn votes(&self) -> Votes {
        Votes {
            sync_busy: self.sync_busy.get(),
            async_busy: self.async_busy.get(),
            link: self.link.get(),
            cli_activity: self.cli_activity.get(),
            monitored: self.monitored.get(),
        }
    }
}
