//! Power manager interface
//!
//! Types shared by every layer of the ALT125x power manager and the traits through which the
//! policy layer reaches its collaborators: the platform power driver (`DRV_PM`), the
//! hibernation engine, monitored IO and sleep notification listeners.
#![no_std]
#![warn(missing_docs)]

pub mod driver;
pub mod error;
pub mod hibernate;
pub mod io;
pub mod mode;
pub mod notify;
pub mod retention;
pub mod statistics;

pub use driver::PlatformPower;
pub use error::{DriverError, Error, HibernateError};
pub use hibernate::Hibernation;
pub use io::{IoId, IoMonitor, Level, LinkState, NoIo};
pub use mode::PowerMode;
pub use notify::{SleepEvent, SleepNotify};
pub use retention::{RetentionSections, Sku};
pub use statistics::{BootType, Statistics, WakeCause, WakeupState};
