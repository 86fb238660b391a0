//! Error types, one per layer

/// Power manager policy error
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The power manager has not been initialized yet
    NotInitialized,
    /// A parameter was out of range, nothing was changed
    InvalidParameter,
    /// A fixed capacity table (devices, monitored IO, listeners) is full
    RegistryFull,
    /// The platform driver reported a failure
    Hardware,
}

/// Platform power driver error
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DriverError {
    /// The PMP is still busy with a previous request
    Busy,
    /// The PMP rejected the request
    Rejected,
    /// No response from the PMP in time
    Timeout,
}

impl From<DriverError> for Error {
    fn from(_: DriverError) -> Self {
        Error::Hardware
    }
}

/// Hibernation error
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HibernateError {
    /// The image is safe in GPM but the flash path cannot be used
    FlashUnavailable,
    /// The image could not be placed into retention memory, retention memory is untouched
    NoRetention,
    /// No valid image found while restoring
    Corrupt,
    /// Unrecoverable storage failure
    Fatal,
}
