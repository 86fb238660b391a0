//! Embedded Services: shared building blocks for the power manager crates.
#![no_std]
#![warn(missing_docs)]

pub mod fmt;
pub mod sync_cell;

pub use sync_cell::SyncCell;

/// Raw mutex used by every service that may be touched from both task and interrupt context
pub type GlobalRawMutex = embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

#[doc(hidden)]
#[cfg(feature = "defmt")]
pub use defmt as _defmt;

#[doc(hidden)]
#[cfg(feature = "log")]
pub use log as _log;
