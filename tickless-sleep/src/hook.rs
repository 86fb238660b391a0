//! Tickless idle hook
use embedded_services::{debug, trace, warn};
use power_manager_interface::{HibernateError, Hibernation, IoMonitor, PlatformPower, PowerMode};
use power_manager_service::PowerManager;

use crate::attempt::{Outcome, SleepAttempt};
use crate::config::TickConfig;
use crate::port::{Cpu, Hardware, Kernel, LowPowerCounter, SleepModeStatus, SysTick};

/// Kernel value for "no timeout"
pub const MAX_DELAY: u32 = u32::MAX;

/// Idle hook that suppresses the tick and enters the configured low power mode
///
/// Called by the kernel idle task with the number of ticks until the next timed wake. Every
/// path leaves interrupts enabled and the tick timer running at the standard period.
pub struct TicklessSleep<'m, 'a, S, C, L, D, H, IO> {
    config: TickConfig,
    manager: &'m PowerManager<'a>,
    hardware: Hardware<S, C, L>,
    driver: D,
    hibernation: H,
    io: IO,
}

/// Snapshot taken before the cycle blocks
#[derive(Copy, Clone)]
struct Armed {
    /// Idle ticks bounded by the SysTick reload range
    expected: u32,
    /// Idle ticks as the kernel asked for them
    idle_ticks: u32,
    reload: u32,
    infinite: bool,
}

impl<'m, 'a, S, C, L, D, H, IO> TicklessSleep<'m, 'a, S, C, L, D, H, IO>
where
    S: SysTick,
    C: Cpu,
    L: LowPowerCounter,
    D: PlatformPower,
    H: Hibernation,
    IO: IoMonitor,
{
    /// Create the hook
    pub fn new(
        config: TickConfig,
        manager: &'m PowerManager<'a>,
        hardware: Hardware<S, C, L>,
        driver: D,
        hibernation: H,
        io: IO,
    ) -> Self {
        Self {
            config,
            manager,
            hardware,
            driver,
            hibernation,
            io,
        }
    }

    /// Tick timing
    pub fn config(&self) -> &TickConfig {
        &self.config
    }

    /// Port hardware
    pub fn hardware(&self) -> &Hardware<S, C, L> {
        &self.hardware
    }

    /// Port hardware, mutably
    pub fn hardware_mut(&mut self) -> &mut Hardware<S, C, L> {
        &mut self.hardware
    }

    /// Platform driver
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Platform driver, mutably
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Hibernation backend
    pub fn hibernation(&self) -> &H {
        &self.hibernation
    }

    /// Hibernation backend, mutably
    pub fn hibernation_mut(&mut self) -> &mut H {
        &mut self.hibernation
    }

    /// Sleep for up to `expected_idle_ticks` ticks
    ///
    /// The ticks actually slept are passed to [`Kernel::step_tick`] before returning.
    pub fn suppress_ticks_and_sleep<K: Kernel>(&mut self, kernel: &mut K, expected_idle_ticks: u32) -> Outcome {
        let counts = self.config.counts_per_tick();
        let expected = expected_idle_ticks.min(self.config.max_suppressed_ticks()).max(1);

        self.hardware.systick.stop();
        let current = self.hardware.systick.current();
        let left = if current == 0 { counts } else { current };
        let mut reload = left.saturating_add(counts.saturating_mul(expected - 1));
        if self.hardware.systick.take_pending() {
            reload = reload.saturating_sub(counts);
        }
        if reload > self.config.stopped_timer_compensation {
            reload -= self.config.stopped_timer_compensation;
        }

        self.hardware.cpu.disable_interrupts();

        let status = kernel.confirm_sleep_mode_status();
        if status == SleepModeStatus::Abort {
            trace!("Idle aborted by kernel");
            self.restart_mid_period();
            self.hardware.cpu.enable_interrupts();
            return Outcome::Aborted;
        }

        let armed = Armed {
            expected,
            idle_ticks: expected_idle_ticks.max(1),
            reload,
            infinite: expected_idle_ticks == MAX_DELAY || status == SleepModeStatus::NoTasksWaitingTimeout,
        };

        let deep = self.manager.check_allow_to_sleep(&mut self.io, kernel.now());
        match self.manager.idle_settings() {
            Some(settings) if deep => self.low_power(kernel, armed, settings.mode),
            _ => self.os_sleep(kernel, armed),
        }
    }

    fn low_power<K: Kernel>(&mut self, kernel: &mut K, armed: Armed, requested: PowerMode) -> Outcome {
        let saved = self.driver.mask_interrupts();

        // SysTick is halted in low power modes, so the reload range does not bound the sleep
        let mut ticks = armed.idle_ticks;
        kernel.pre_sleep_processing(&mut ticks);
        if ticks == 0 {
            debug!("Low power cancelled by application");
            self.driver.restore_interrupts(saved);
            self.restart_mid_period();
            self.hardware.cpu.enable_interrupts();
            return Outcome::Aborted;
        }

        self.hardware.lp_counter.activate();
        let lp_start = self.hardware.lp_counter.value();

        self.manager.pre_sleep_process(&mut self.driver, requested);

        let mut attempt = SleepAttempt::new(requested);
        let mut image_saved = false;
        if requested.requires_hibernation() {
            match self.hibernation.hibernate_to_gpm(requested) {
                Ok(()) => image_saved = true,
                Err(HibernateError::FlashUnavailable) => {
                    image_saved = true;
                    attempt.downgrade(PowerMode::Standby);
                }
                Err(e) => {
                    warn!("Hibernation failed: {:?}", e);
                    attempt.downgrade(PowerMode::Stop);
                }
            }
        }

        self.arm(armed.reload);

        let duration_ms = self.duration_ms(armed, ticks, lp_start);

        if attempt.effective == PowerMode::Shutdown
            && let Some(settings) = self.manager.idle_settings()
            && duration_ms != 0
            && duration_ms < settings.shutdown_threshold_ms
        {
            debug!("{} ms below shutdown threshold", duration_ms);
            attempt.downgrade(PowerMode::Standby);
        }

        if attempt.effective == PowerMode::Shutdown
            && let Err(e) = self.hibernation.hibernate_to_flash()
        {
            warn!("Image not moved to flash: {:?}", e);
            attempt.downgrade(PowerMode::Standby);
        }

        trace!("Entering {:?} for {} ms", attempt.effective, duration_ms);
        let entered = match self.manager.enter_sleep(&mut self.driver, attempt.effective, duration_ms) {
            Ok(()) => true,
            Err(e) => {
                warn!("Low power entry failed: {:?}", e);
                false
            }
        };

        // Execution continued, so volatile memory is intact and the image is stale
        if image_saved {
            self.hibernation.discard();
        }

        kernel.post_sleep_processing(ticks);
        self.manager.post_sleep_process(&mut self.driver, attempt.effective, saved);

        let slept_ms = if entered && duration_ms != 0 {
            duration_ms.saturating_sub(self.driver.statistics().last_dur_left_ms)
        } else {
            self.lp_elapsed_ms(lp_start)
        };
        let window = if armed.infinite { u32::MAX } else { ticks - 1 };
        let slept_ticks = self.config.ms_to_ticks(slept_ms).min(window);

        self.restart_standard(self.config.counts_per_tick().saturating_sub(1));
        kernel.step_tick(slept_ticks);
        self.hardware.cpu.enable_interrupts();

        Outcome::LowPower {
            attempt,
            duration_ms,
            slept_ticks,
            entered,
        }
    }

    fn os_sleep<K: Kernel>(&mut self, kernel: &mut K, armed: Armed) -> Outcome {
        let counts = self.config.counts_per_tick();
        self.arm(armed.reload);

        let mut ticks = armed.expected;
        kernel.pre_sleep_processing(&mut ticks);
        if ticks > 0 {
            self.hardware.cpu.wait_for_interrupt();
        }
        kernel.post_sleep_processing(ticks);

        // Let the waking interrupt run
        self.hardware.cpu.enable_interrupts();
        self.hardware.cpu.disable_interrupts();
        self.hardware.systick.stop();

        let (load, complete) = if self.hardware.systick.count_flag() {
            let calculated = (counts - 1).wrapping_sub(armed.reload.wrapping_sub(self.hardware.systick.current()));
            let load = if calculated <= self.config.stopped_timer_compensation || calculated > counts {
                counts - 1
            } else {
                calculated
            };
            (load, armed.expected - 1)
        } else {
            let current = self.hardware.systick.current();
            let left = if current == 0 { armed.reload } else { current };
            let completed = armed.expected.saturating_mul(counts).saturating_sub(left);
            let complete = completed / counts;
            (((complete + 1) * counts).saturating_sub(completed), complete)
        };

        self.restart_standard(load);
        kernel.step_tick(complete);
        self.hardware.systick.set_reload(counts - 1);
        self.hardware.cpu.enable_interrupts();

        Outcome::OsSleep { slept_ticks: complete }
    }

    /// Remaining idle time for the driver, 0 when there is no timeout
    fn duration_ms(&self, armed: Armed, ticks: u32, lp_start: u32) -> u32 {
        let idle_ms = if armed.infinite {
            0
        } else {
            self.config
                .ticks_to_ms(ticks)
                .saturating_sub(self.lp_elapsed_ms(lp_start))
                .max(1)
        };

        let configured = self.manager.idle_settings().map_or(0, |settings| settings.duration_ms);
        match (idle_ms, configured) {
            (_, 0) => idle_ms,
            (0, configured) => configured,
            (idle, configured) => idle.min(configured),
        }
    }

    fn lp_elapsed_ms(&self, lp_start: u32) -> u32 {
        let elapsed = self.hardware.lp_counter.value().wrapping_sub(lp_start);
        self.config.lp_counts_to_ms(elapsed)
    }

    fn arm(&mut self, reload: u32) {
        let systick = &mut self.hardware.systick;
        systick.set_reload(reload);
        systick.clear_current();
        systick.start();
    }

    /// Finish the interrupted period, then continue at the standard period
    fn restart_mid_period(&mut self) {
        let systick = &mut self.hardware.systick;
        let current = systick.current();
        systick.set_reload(current);
        systick.clear_current();
        systick.start();
        systick.set_reload(self.config.counts_per_tick().saturating_sub(1));
    }

    /// Start a fresh period of `load` counts
    fn restart_standard(&mut self, load: u32) {
        let systick = &mut self.hardware.systick;
        systick.stop();
        systick.set_reload(load);
        systick.clear_current();
        systick.start();
    }
}
