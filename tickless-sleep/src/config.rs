//! Tick timing configuration

/// Largest value the 24-bit SysTick reload register holds
pub const SYSTICK_MAX_RELOAD: u32 = 0x00FF_FFFF;

/// Default cycles lost while SysTick is stopped around sleep
pub const DEFAULT_STOPPED_TIMER_COMPENSATION: u32 = 45;

/// Default frequency of the low power counter
pub const DEFAULT_LP_COUNTER_HZ: u32 = 32_768;

/// Tick timing of the port
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TickConfig {
    /// SysTick input clock
    pub core_clock_hz: u32,
    /// Kernel tick rate
    pub tick_rate_hz: u32,
    /// SysTick counts lost while the timer is stopped to compute a reload
    pub stopped_timer_compensation: u32,
    /// Frequency of the free running low power counter
    pub lp_counter_hz: u32,
}

impl TickConfig {
    /// Configuration with the default compensation and low power counter frequency
    pub const fn new(core_clock_hz: u32, tick_rate_hz: u32) -> Self {
        Self {
            core_clock_hz,
            tick_rate_hz,
            stopped_timer_compensation: DEFAULT_STOPPED_TIMER_COMPENSATION,
            lp_counter_hz: DEFAULT_LP_COUNTER_HZ,
        }
    }

    /// SysTick counts per kernel tick, never zero
    pub const fn counts_per_tick(&self) -> u32 {
        let counts = self.core_clock_hz / if self.tick_rate_hz == 0 { 1 } else { self.tick_rate_hz };
        if counts == 0 { 1 } else { counts }
    }

    /// Most ticks one SysTick reload can cover
    pub const fn max_suppressed_ticks(&self) -> u32 {
        SYSTICK_MAX_RELOAD / self.counts_per_tick()
    }

    /// Whole milliseconds in `ticks` kernel ticks, saturating
    pub fn ticks_to_ms(&self, ticks: u32) -> u32 {
        let ms = u64::from(ticks) * 1000 / u64::from(self.tick_rate_hz.max(1));
        u32::try_from(ms).unwrap_or(u32::MAX)
    }

    /// Whole kernel ticks in `ms` milliseconds, saturating
    pub fn ms_to_ticks(&self, ms: u32) -> u32 {
        let ticks = u64::from(ms) * u64::from(self.tick_rate_hz) / 1000;
        u32::try_from(ticks).unwrap_or(u32::MAX)
    }

    /// Milliseconds in `counts` low power counter periods, rounded to nearest
    pub fn lp_counts_to_ms(&self, counts: u32) -> u32 {
        let hz = u64::from(self.lp_counter_hz.max(1));
        let ms = (u64::from(counts) * 1000 + hz / 2) / hz;
        u32::try_from(ms).unwrap_or(u32::MAX)
    }
}
