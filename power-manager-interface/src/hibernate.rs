//! Hibernation contract
use crate::{HibernateError, PowerMode};

/// Saves volatile state into retention memory before standby or shutdown and brings it back
/// afterwards.
///
/// Retention memory must always be left either holding a complete valid image or untouched.
pub trait Hibernation {
    /// Save volatile state into GPM ahead of entering `mode`.
    ///
    /// # Errors
    ///
    /// Returns [`HibernateError::FlashUnavailable`] if the GPM image is valid but the flash path
    /// needed for shutdown cannot be used.
    ///
    /// Returns [`HibernateError::NoRetention`] if no image could be written; GPM is untouched.
    ///
    /// Returns [`HibernateError::Fatal`] on an unrecoverable storage failure.
    fn hibernate_to_gpm(&mut self, mode: PowerMode) -> Result<(), HibernateError>;

    /// Restore volatile state from GPM. Must only run after a stateful wake.
    ///
    /// # Errors
    ///
    /// Returns [`HibernateError::Corrupt`] if GPM does not hold a valid image.
    fn hibernate_from_gpm(&mut self) -> Result<(), HibernateError>;

    /// Move the GPM image into flash ahead of shutdown
    fn hibernate_to_flash(&mut self) -> Result<(), HibernateError> {
        Err(HibernateError::FlashUnavailable)
    }

    /// Move the flash image back into GPM after a wake from shutdown
    fn hibernate_from_flash(&mut self) -> Result<(), HibernateError> {
        Err(HibernateError::FlashUnavailable)
    }

    /// Drop a saved image after low power entry failed
    fn discard(&mut self);
}

impl<T: Hibernation + ?Sized> Hibernation for &mut T {
    fn hibernate_to_gpm(&mut self, mode: PowerMode) -> Result<(), HibernateError> {
        T::hibernate_to_gpm(self, mode)
    }

    fn hibernate_from_gpm(&mut self) -> Result<(), HibernateError> {
        T::hibernate_from_gpm(self)
    }

    fn hibernate_to_flash(&mut self) -> Result<(), HibernateError> {
        T::hibernate_to_flash(self)
    }

    fn hibernate_from_flash(&mut self) -> Result<(), HibernateError> {
        T::hibernate_from_flash(self)
    }

    fn discard(&mut self) {
        T::discard(self)
    }
}
