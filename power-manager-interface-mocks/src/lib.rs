//! Recording test doubles for the power manager collaborator traits
//!
//! Each mock records every call it receives in order and returns whatever the test scripted.
use power_manager_interface::{
    DriverError, HibernateError, Hibernation, PlatformPower, PowerMode, RetentionSections, Statistics, WakeupState,
};

/// Interrupt mask in effect while the mock is not masked
pub const UNMASKED: u32 = u32::MAX;

/// Interrupt mask applied by [`MockPlatform::mask_interrupts`]
pub const WAKE_SOURCES_ONLY: u32 = 0x0000_0003;

/// Call received by [`MockPlatform`]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Call {
    MaskInterrupts,
    RestoreInterrupts(u32),
    PreSleep(PowerMode),
    PostSleep(PowerMode),
    EnterStop(u32),
    EnterStandby(u32, RetentionSections),
    EnterShutdown(u32),
    ClearStatistics,
}

impl Call {
    /// Returns true for low power entry requests
    pub fn is_entry(&self) -> bool {
        matches!(
            self,
            Call::EnterStop(_) | Call::EnterStandby(..) | Call::EnterShutdown(_)
        )
    }
}

/// Platform power driver double
#[derive(Debug)]
pub struct MockPlatform {
    calls: Vec<Call>,
    mask: u32,
    fail_next: Option<DriverError>,
    statistics: Statistics,
    wake_statistics: Option<Statistics>,
    probe: WakeupState,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            mask: UNMASKED,
            fail_next: None,
            statistics: Statistics::default(),
            wake_statistics: None,
            probe: WakeupState::Stateless,
        }
    }

    /// Every call received so far
    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    /// Low power entry requests received so far
    pub fn entries(&self) -> Vec<Call> {
        self.calls.iter().copied().filter(Call::is_entry).collect()
    }

    /// Current interrupt mask
    pub fn mask(&self) -> u32 {
        self.mask
    }

    /// Make the next entry request fail with `error`. The request is still recorded.
    pub fn fail_next_entry(&mut self, error: DriverError) {
        self.fail_next = Some(error);
    }

    pub fn set_statistics(&mut self, statistics: Statistics) {
        self.statistics = statistics;
    }

    /// Statistics to report after the next successful entry, as the PMP would on wake
    pub fn wake_with(&mut self, statistics: Statistics) {
        self.wake_statistics = Some(statistics);
    }

    pub fn set_probe(&mut self, probe: WakeupState) {
        self.probe = probe;
    }

    fn enter(&mut self, call: Call) -> Result<(), DriverError> {
        self.calls.push(call);
        if let Some(error) = self.fail_next.take() {
            return Err(error);
        }
        if let Some(statistics) = self.wake_statistics.take() {
            self.statistics = statistics;
        }
        Ok(())
    }
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformPower for MockPlatform {
    type MaskState = u32;

    fn mask_interrupts(&mut self) -> u32 {
        self.calls.push(Call::MaskInterrupts);
        core::mem::replace(&mut self.mask, WAKE_SOURCES_ONLY)
    }

    fn restore_interrupts(&mut self, saved: u32) {
        self.calls.push(Call::RestoreInterrupts(saved));
        self.mask = saved;
    }

    fn pre_sleep_process(&mut self, mode: PowerMode) {
        self.calls.push(Call::PreSleep(mode));
    }

    fn post_sleep_process(&mut self, mode: PowerMode) {
        self.calls.push(Call::PostSleep(mode));
    }

    fn enter_stop_mode(&mut self, duration_ms: u32) -> Result<(), DriverError> {
        self.enter(Call::EnterStop(duration_ms))
    }

    fn enter_standby_mode(&mut self, duration_ms: u32, retention: RetentionSections) -> Result<(), DriverError> {
        self.enter(Call::EnterStandby(duration_ms, retention))
    }

    fn enter_shutdown_mode(&mut self, duration_ms: u32) -> Result<(), DriverError> {
        self.enter(Call::EnterShutdown(duration_ms))
    }

    fn statistics(&self) -> Statistics {
        self.statistics
    }

    fn clear_statistics(&mut self) {
        self.calls.push(Call::ClearStatistics);
        self.statistics = Statistics::default();
    }

    fn early_boot_probe(&self) -> WakeupState {
        self.probe
    }
}

/// Call received by [`MockHibernation`]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HibernateCall {
    ToGpm(PowerMode),
    FromGpm,
    ToFlash,
    FromFlash,
    Discard,
}

/// Hibernation double. Every operation succeeds unless scripted otherwise.
#[derive(Debug)]
pub struct MockHibernation {
    calls: Vec<HibernateCall>,
    pub to_gpm: Result<(), HibernateError>,
    pub from_gpm: Result<(), HibernateError>,
    pub to_flash: Result<(), HibernateError>,
    pub from_flash: Result<(), HibernateError>,
}

impl MockHibernation {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            to_gpm: Ok(()),
            from_gpm: Ok(()),
            to_flash: Ok(()),
            from_flash: Ok(()),
        }
    }

    pub fn calls(&self) -> &[HibernateCall] {
        &self.calls
    }
}

impl Default for MockHibernation {
    fn default() -> Self {
        Self::new()
    }
}

impl Hibernation for MockHibernation {
    fn hibernate_to_gpm(&mut self, mode: PowerMode) -> Result<(), HibernateError> {
        self.calls.push(HibernateCall::ToGpm(mode));
        self.to_gpm
    }

    fn hibernate_from_gpm(&mut self) -> Result<(), HibernateError> {
        self.calls.push(HibernateCall::FromGpm);
        self.from_gpm
    }

    fn hibernate_to_flash(&mut self) -> Result<(), HibernateError> {
        self.calls.push(HibernateCall::ToFlash);
        self.to_flash
    }

    fn hibernate_from_flash(&mut self) -> Result<(), HibernateError> {
        self.calls.push(HibernateCall::FromFlash);
        self.from_flash
    }

    fn discard(&mut self) {
        self.calls.push(HibernateCall::Discard);
    }
}
