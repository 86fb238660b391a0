//! Persisted sleep defaults
//!
//! The defaults live as string key/value pairs in the platform environment store and are read
//! back at warm boot. Values that fail to parse keep whatever the caller supplied as the base
//! configuration.
use core::fmt::Write;

use embedded_services::warn;
use heapless::String;
use power_manager_interface::{Error, PowerMode};

use crate::config::ModeConfig;

/// Sleep mode key
pub const PWR_CONF_SLP_MODE: &str = "PWR_CONF_SLP_MODE";
/// Sleep duration key, decimal milliseconds
pub const PWR_CONF_SLP_DUR: &str = "PWR_CONF_SLP_DUR";
/// CLI inactivity timeout key, decimal seconds
pub const PWR_CONF_INACTT: &str = "PWR_CONF_INACTT";
/// Master enable key
pub const PWR_CONF_SLP_EN: &str = "PWR_CONF_SLP_EN";
/// Shutdown threshold key, decimal milliseconds
pub const PWR_CONF_SHDN_THR: &str = "PWR_CONF_SHDN_THR";

/// Environment store error
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EnvError {
    /// No space left for the value
    Full,
    /// Backing storage failed
    Storage,
}

impl From<EnvError> for Error {
    fn from(_: EnvError) -> Self {
        Error::Hardware
    }
}

/// Key/value environment store
pub trait EnvStore {
    /// Value stored under `key`
    fn get(&self, key: &str) -> Option<&str>;

    /// Store `value` under `key`
    fn set(&mut self, key: &str, value: &str) -> Result<(), EnvError>;
}

impl<T: EnvStore + ?Sized> EnvStore for &mut T {
    fn get(&self, key: &str) -> Option<&str> {
        T::get(self, key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), EnvError> {
        T::set(self, key, value)
    }
}

fn parse_enable(value: &str) -> Option<bool> {
    match value.trim() {
        "1" => Some(true),
        "0" => Some(false),
        v if v.eq_ignore_ascii_case("enable") => Some(true),
        v if v.eq_ignore_ascii_case("disable") => Some(false),
        _ => None,
    }
}

fn parse_u32(value: &str) -> Option<u32> {
    value.trim().parse().ok()
}

fn load<T>(store: &impl EnvStore, key: &str, parse: impl FnOnce(&str) -> Option<T>) -> Option<T> {
    let value = store.get(key)?;
    let parsed = parse(value);
    if parsed.is_none() {
        warn!("Ignoring malformed {}: {}", key, value);
    }
    parsed
}

/// Overlay the persisted defaults in `store` onto `base`
pub fn load_defaults(store: &impl EnvStore, base: ModeConfig) -> ModeConfig {
    let mut config = base;

    if let Some(mode) = load(store, PWR_CONF_SLP_MODE, PowerMode::from_name) {
        config.mode = mode;
    }
    if let Some(duration_ms) = load(store, PWR_CONF_SLP_DUR, parse_u32) {
        config.duration_ms = duration_ms;
    }
    if let Some(timeout_s) = load(store, PWR_CONF_INACTT, parse_u32) {
        config.inactivity_timeout_s = timeout_s;
    }
    if let Some(enable) = load(store, PWR_CONF_SLP_EN, parse_enable) {
        config.enable = enable;
    }
    if let Some(threshold_ms) = load(store, PWR_CONF_SHDN_THR, parse_u32) {
        config.shutdown_threshold_ms = threshold_ms;
    }

    config
}

fn decimal(value: u32) -> String<10> {
    let mut s = String::new();
    // u32::MAX has 10 digits
    let _ = write!(s, "{value}");
    s
}

/// Write `config` into `store`
///
/// # Errors
///
/// Returns [`Error::Hardware`] if the store refused a value. Keys written before the failure stay
/// written.
pub fn save_defaults(store: &mut impl EnvStore, config: &ModeConfig) -> Result<(), Error> {
    store.set(PWR_CONF_SLP_MODE, config.mode.name())?;
    store.set(PWR_CONF_SLP_DUR, &decimal(config.duration_ms))?;
    store.set(PWR_CONF_INACTT, &decimal(config.inactivity_timeout_s))?;
    store.set(PWR_CONF_SLP_EN, if config.enable { "1" } else { "0" })?;
    store.set(PWR_CONF_SHDN_THR, &decimal(config.shutdown_threshold_ms))?;
    Ok(())
}
