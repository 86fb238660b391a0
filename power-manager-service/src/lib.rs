//! Power manager service
//!
//! Sleep policy for the ALT125x: collects wake votes from the rest of the firmware, holds the
//! configured sleep target and decides, once per idle cycle, whether the idle hook may go below
//! plain OS sleep.
//!
//! Configuration runs in task context and is serialized by one async mutex. The idle hook never
//! takes that mutex: every mutation republishes the whole configuration into a snapshot cell that
//! the hook copies out with interrupts disabled.
#![no_std]
#![warn(missing_docs)]

pub mod cli;
pub mod config;
pub mod env;
pub mod gate;
pub mod io;
pub mod notify;
pub mod registry;

use embassy_sync::mutex::Mutex;
use embassy_time::Instant;
use embedded_services::{GlobalRawMutex, SyncCell, debug, info, trace};
use power_manager_interface::{
    Error, IoId, IoMonitor, Level, LinkState, PlatformPower, PowerMode, RetentionSections, SleepEvent,
};

pub use config::{ModeConfig, PowerManagerConfig};
pub use gate::{BlockReason, PreventSleepCounters};
pub use notify::{Listener, SleepNotifyBus};
pub use registry::{DeviceId, MonitoredIo, VoteKind};

use config::Platform;
use registry::Registry;

/// Number of sleep listeners
pub const MAX_LISTENERS: usize = 8;

/// Power manager context
///
/// One instance normally lives in a `static` for the lifetime of the firmware. Every operation
/// other than construction returns [`Error::NotInitialized`] until [`PowerManager::init`] ran.
pub struct PowerManager<'a> {
    initialized: SyncCell<bool>,
    platform: SyncCell<Platform>,
    config: Mutex<GlobalRawMutex, ModeConfig>,
    snapshot: SyncCell<ModeConfig>,
    registry: Registry,
    counters: SyncCell<PreventSleepCounters>,
    listeners: SleepNotifyBus<'a, MAX_LISTENERS>,
}

impl<'a> PowerManager<'a> {
    /// Create an uninitialized power manager
    pub const fn new() -> Self {
        Self {
            initialized: SyncCell::new(false),
            platform: SyncCell::new(Platform::new()),
            config: Mutex::new(ModeConfig::DEFAULT),
            snapshot: SyncCell::new(ModeConfig::DEFAULT),
            registry: Registry::new(),
            counters: SyncCell::new(PreventSleepCounters::new()),
            listeners: SleepNotifyBus::new(),
        }
    }

    /// Initialize with `config`
    ///
    /// The CLI inactivity timeout starts counting here, so sleep is held off for that long after
    /// boot even if the console is never used. Calling this again re-applies the supplied defaults,
    /// restarts the timeout and keeps registered devices and listeners.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if the default mode is not configurable or the default
    /// retention sections are not implemented by the SKU.
    pub async fn init(&self, config: PowerManagerConfig) -> Result<(), Error> {
        let defaults = config.defaults;
        if !defaults.mode.is_configurable() || !config.sku.legal_retention().contains(defaults.retention) {
            return Err(Error::InvalidParameter);
        }

        let mut current = self.config.lock().await;
        self.platform.set(Platform {
            sku: config.sku,
            debug_counters: config.debug_counters,
        });
        *current = defaults;
        self.snapshot.set(defaults);
        self.registry.notify_cli_activity(Instant::now());
        self.initialized.set(true);

        info!(
            "Power manager initialized: mode {:?}, duration {} ms, enable {}",
            defaults.mode, defaults.duration_ms, defaults.enable
        );
        Ok(())
    }

    /// Returns true once [`PowerManager::init`] completed
    pub fn is_initialized(&self) -> bool {
        self.initialized.get()
    }

    fn ensure_init(&self) -> Result<(), Error> {
        if self.initialized.get() {
            Ok(())
        } else {
            Err(Error::NotInitialized)
        }
    }

    /// Apply `f` to the configuration under the lock, then publish the result.
    ///
    /// `f` may reject the change, in which case nothing is modified.
    async fn modify(&self, f: impl FnOnce(&mut ModeConfig) -> Result<(), Error>) -> Result<ModeConfig, Error> {
        self.ensure_init()?;

        let mut current = self.config.lock().await;
        let mut updated = *current;
        f(&mut updated)?;
        *current = updated;
        self.snapshot.set(updated);
        Ok(updated)
    }

    /// Select the sleep target, effective from the next sleep cycle
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if `mode` is not one of stop, standby or shutdown.
    pub async fn set_mode(&self, mode: PowerMode, duration_ms: u32) -> Result<(), Error> {
        self.modify(|config| {
            if !mode.is_configurable() {
                return Err(Error::InvalidParameter);
            }
            config.mode = mode;
            config.duration_ms = duration_ms;
            Ok(())
        })
        .await?;

        info!("Sleep mode set to {:?} for {} ms", mode, duration_ms);
        Ok(())
    }

    /// Turn every mode deeper than OS sleep on or off
    pub async fn enable_sleep(&self, enable: bool) -> Result<(), Error> {
        self.modify(|config| {
            config.enable = enable;
            Ok(())
        })
        .await?;

        info!("Sleep {}", if enable { "enabled" } else { "disabled" });
        Ok(())
    }

    /// Set the shortest sleep for which shutdown is used
    pub async fn set_shutdown_threshold(&self, threshold_ms: u32) -> Result<(), Error> {
        self.modify(|config| {
            config.shutdown_threshold_ms = threshold_ms;
            Ok(())
        })
        .await
        .map(|_| ())
    }

    /// Set the CLI inactivity timeout, 0 disables the check
    pub async fn set_inactivity_timeout(&self, timeout_s: u32) -> Result<(), Error> {
        self.modify(|config| {
            config.inactivity_timeout_s = timeout_s;
            Ok(())
        })
        .await
        .map(|_| ())
    }

    /// Keep the sections in `mask` powered through standby
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if `mask` names a section the SKU does not implement.
    pub async fn enable_retention_sec(&self, mask: u32) -> Result<(), Error> {
        let sections = self.retention_mask(mask)?;
        self.modify(|config| {
            config.retention |= sections;
            Ok(())
        })
        .await
        .map(|_| ())
    }

    /// Stop keeping the sections in `mask` powered through standby
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if `mask` names a section the SKU does not implement.
    pub async fn disable_retention_sec(&self, mask: u32) -> Result<(), Error> {
        let sections = self.retention_mask(mask)?;
        self.modify(|config| {
            config.retention.remove(sections);
            Ok(())
        })
        .await
        .map(|_| ())
    }

    fn retention_mask(&self, mask: u32) -> Result<RetentionSections, Error> {
        self.ensure_init()?;
        self.platform
            .get()
            .sku
            .retention_from_bits(mask)
            .ok_or(Error::InvalidParameter)
    }

    /// Copy of the whole configuration as of one lock acquisition
    pub async fn get_settings(&self) -> Result<ModeConfig, Error> {
        self.ensure_init()?;
        Ok(*self.config.lock().await)
    }

    /// Configuration snapshot for the idle hook, never blocks
    ///
    /// Returns `None` before [`PowerManager::init`].
    pub fn idle_settings(&self) -> Option<ModeConfig> {
        self.initialized.get().then(|| self.snapshot.get())
    }

    /// Register a device that votes on sleep
    ///
    /// # Errors
    ///
    /// Returns [`Error::RegistryFull`] once [`registry::MAX_DEVICES`] devices of `kind` exist.
    pub fn register_device(&self, kind: VoteKind) -> Result<DeviceId, Error> {
        self.ensure_init()?;
        let device = self.registry.register_device(kind)?;
        debug!("Registered {:?} device {}", kind, device.index());
        Ok(device)
    }

    /// Set the busy vote of `device`. Callable from interrupt context.
    pub fn set_device_busy(&self, device: DeviceId, busy: bool) -> Result<(), Error> {
        self.ensure_init()?;
        self.registry.set_device_busy(device, busy)
    }

    /// Report the HIFC link state
    pub fn set_link_state(&self, state: LinkState) -> Result<(), Error> {
        self.ensure_init()?;
        self.registry.set_link_state(state);
        Ok(())
    }

    /// Record CLI activity at `now`, restarting the inactivity timeout
    pub fn notify_cli_activity(&self, now: Instant) -> Result<(), Error> {
        self.ensure_init()?;
        self.registry.notify_cli_activity(now);
        Ok(())
    }

    /// Keep the MCU awake while `io` is at `busy_level`
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if `io` does not exist on this SKU.
    ///
    /// Returns [`Error::RegistryFull`] if [`registry::MAX_MONITORED_IO`] other IOs are monitored.
    pub fn set_monitor_io(&self, io: IoId, busy_level: Level) -> Result<(), Error> {
        self.ensure_init()?;
        if io.0 == 0 || io.0 > self.platform.get().sku.io_count() {
            return Err(Error::InvalidParameter);
        }
        self.registry.set_monitor_io(io, busy_level)
    }

    /// Stop monitoring `io`
    pub fn clear_monitor_io(&self, io: IoId) -> Result<(), Error> {
        self.ensure_init()?;
        self.registry.clear_monitor_io(io)
    }

    /// Decide whether a low power mode may be entered now
    ///
    /// Reads only snapshots, so it may run with interrupts disabled. A refusal increments the
    /// counter of the first blocking condition. Always false before init.
    pub fn check_allow_to_sleep<IO: IoMonitor>(&self, io: &mut IO, now: Instant) -> bool {
        let Some(config) = self.idle_settings() else {
            return false;
        };

        let votes = self.registry.votes();
        match gate::evaluate(&config, &votes, io, now) {
            Ok(()) => true,
            Err(reason) => {
                trace!("Sleep blocked: {:?}", reason);
                let per_device = self.platform.get().debug_counters;
                self.counters.update(|mut counters| {
                    counters.record(reason, &votes, per_device);
                    counters
                });
                false
            }
        }
    }

    /// Prevent-sleep counters
    pub fn get_prevent_sleep_cntr(&self) -> Result<PreventSleepCounters, Error> {
        self.ensure_init()?;
        Ok(self.counters.get())
    }

    /// Zero the prevent-sleep counters
    pub fn clr_prevent_sleep_cntr(&self) -> Result<(), Error> {
        self.ensure_init()?;
        self.counters.set(PreventSleepCounters::new());
        Ok(())
    }

    /// Register a sleep listener, returning its index
    pub fn register_listener(&self, listener: Listener<'a>) -> Result<usize, Error> {
        self.listeners.register(listener)
    }

    /// Remove the sleep listener at `index`
    pub fn unregister_listener(&self, index: usize) -> Result<(), Error> {
        self.listeners.unregister(index)
    }

    /// Prepare for `mode`: platform preparation, then [`SleepEvent::Suspending`]
    pub fn pre_sleep_process<D: PlatformPower>(&self, driver: &mut D, mode: PowerMode) {
        driver.pre_sleep_process(mode);
        self.listeners.notify(SleepEvent::Suspending, mode);
    }

    /// Recover from `mode`: platform recovery, restore the interrupt mask saved before sleep,
    /// then [`SleepEvent::Resuming`]
    pub fn post_sleep_process<D: PlatformPower>(&self, driver: &mut D, mode: PowerMode, saved: D::MaskState) {
        driver.post_sleep_process(mode);
        driver.restore_interrupts(saved);
        self.listeners.notify(SleepEvent::Resuming, mode);
    }

    /// Hand `mode` to the platform driver for `duration_ms`
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] for modes not entered through the PMP.
    ///
    /// Returns [`Error::Hardware`] if the driver refused.
    pub fn enter_sleep<D: PlatformPower>(&self, driver: &mut D, mode: PowerMode, duration_ms: u32) -> Result<(), Error> {
        let config = self.idle_settings().ok_or(Error::NotInitialized)?;
        match mode {
            PowerMode::Stop => driver.enter_stop_mode(duration_ms)?,
            PowerMode::Standby => driver.enter_standby_mode(duration_ms, config.retention)?,
            PowerMode::Shutdown => driver.enter_shutdown_mode(duration_ms)?,
            PowerMode::Run | PowerMode::Sleep => return Err(Error::InvalidParameter),
        }
        Ok(())
    }

    /// Persist the current configuration into `store`
    pub async fn save_defaults<S: env::EnvStore>(&self, store: &mut S) -> Result<(), Error> {
        let config = self.get_settings().await?;
        env::save_defaults(store, &config)
    }
}

impl Default for PowerManager<'_> {
    fn default() -> Self {
        Self::new()
    }
}
