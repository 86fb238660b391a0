//! Tickless idle
//!
//! Suppresses the kernel tick while idle and, when the power manager allows it, puts the MCU in
//! its configured low power mode instead of a plain wait. Hibernation, shutdown threshold and
//! flash fallbacks only ever pick a shallower mode for the current cycle.
#![no_std]
#![warn(missing_docs)]

pub mod attempt;
pub mod config;
pub mod hook;
pub mod port;

#[cfg(all(target_arch = "arm", target_os = "none"))]
pub mod cortexm;

pub use attempt::{Outcome, SleepAttempt};
pub use config::TickConfig;
pub use hook::{MAX_DELAY, TicklessSleep};
pub use port::{Cpu, Hardware, Kernel, LowPowerCounter, SleepModeStatus, SysTick};
