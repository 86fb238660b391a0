//! Boot-time restore
use embedded_services::{debug, info, warn};
use power_manager_interface::{HibernateError, Hibernation, PlatformPower, WakeupState};

/// How volatile state was brought up
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BootOutcome {
    /// Nothing restored, retention memory was not consulted
    Cold,
    /// Restored from GPM after standby
    Restored,
    /// Restored through flash after shutdown
    RestoredFromFlash,
}

/// Restore volatile state if the early boot probe says retention memory survived
///
/// This is the only path that restores an image. A stateless probe returns
/// [`BootOutcome::Cold`] without reading GPM or flash. After a stateful wake the GPM image is
/// restored directly; if GPM holds none, the wake was from shutdown and the image is first moved
/// back from flash.
///
/// # Errors
///
/// Returns [`HibernateError::Corrupt`] if neither GPM nor flash holds a valid image, in which
/// case the caller continues as a cold boot.
pub fn restore_on_boot<D: PlatformPower, H: Hibernation>(
    driver: &D,
    engine: &mut H,
) -> Result<BootOutcome, HibernateError> {
    if driver.early_boot_probe() == WakeupState::Stateless {
        debug!("Stateless wake, cold boot");
        return Ok(BootOutcome::Cold);
    }

    match engine.hibernate_from_gpm() {
        Ok(()) => {
            info!("Warm boot from GPM");
            return Ok(BootOutcome::Restored);
        }
        Err(HibernateError::Corrupt) => debug!("No GPM image, trying flash"),
        Err(e) => return Err(e),
    }

    match engine.hibernate_from_flash() {
        Ok(()) => {}
        Err(HibernateError::Fatal) => return Err(HibernateError::Fatal),
        Err(e) => {
            warn!("No image to restore: {:?}", e);
            return Err(HibernateError::Corrupt);
        }
    }

    engine.hibernate_from_gpm()?;
    info!("Warm boot from flash");
    Ok(BootOutcome::RestoredFromFlash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use power_manager_interface_mocks::{HibernateCall, MockHibernation, MockPlatform};

    fn driver(probe: WakeupState) -> MockPlatform {
        let mut driver = MockPlatform::new();
        driver.set_probe(probe);
        driver
    }

    #[test]
    fn test_stateless_never_touches_retention() {
        let mut engine = MockHibernation::new();

        assert_eq!(
            restore_on_boot(&driver(WakeupState::Stateless), &mut engine),
            Ok(BootOutcome::Cold)
        );
        assert!(engine.calls().is_empty());
    }

    #[test]
    fn test_stateful_restores_gpm() {
        let mut engine = MockHibernation::new();

        assert_eq!(
            restore_on_boot(&driver(WakeupState::Stateful), &mut engine),
            Ok(BootOutcome::Restored)
        );
        assert_eq!(engine.calls(), [HibernateCall::FromGpm]);
    }

    #[test]
    fn test_stateful_after_shutdown_goes_through_flash() {
        let mut engine = MockHibernation::new();
        engine.from_gpm = Err(HibernateError::Corrupt);

        // The mock keeps failing from_gpm, so the second attempt fails too
        assert_eq!(
            restore_on_boot(&driver(WakeupState::Stateful), &mut engine),
            Err(HibernateError::Corrupt)
        );
        assert_eq!(
            engine.calls(),
            [HibernateCall::FromGpm, HibernateCall::FromFlash, HibernateCall::FromGpm]
        );
    }

    #[test]
    fn test_no_image_anywhere() {
        let mut engine = MockHibernation::new();
        engine.from_gpm = Err(HibernateError::Corrupt);
        engine.from_flash = Err(HibernateError::FlashUnavailable);

        assert_eq!(
            restore_on_boot(&driver(WakeupState::Stateful), &mut engine),
            Err(HibernateError::Corrupt)
        );
        assert_eq!(engine.calls(), [HibernateCall::FromGpm, HibernateCall::FromFlash]);
    }

    #[cfg(feature = "shutdown")]
    #[test]
    fn test_engine_restores_through_flash() {
        use crate::HibernationEngine;
        use crate::testing::{RamFlash, RamStorage, TestMemory};
        use power_manager_interface::PowerMode;

        let mut memory = TestMemory::new();
        memory.fill_pattern(7);
        let saved = memory.ram;
        let mut engine = HibernationEngine::with_flash(RamStorage::<512>::new(), memory, RamFlash::<1024>::new());
        engine.hibernate_to_gpm(PowerMode::Shutdown).unwrap();
        engine.hibernate_to_flash().unwrap();
        engine.gpm_mut().bytes.fill(0);
        engine.memory_mut().ram.fill(0);

        // A stateless probe leaves the flash image alone
        assert_eq!(
            restore_on_boot(&driver(WakeupState::Stateless), &mut engine),
            Ok(BootOutcome::Cold)
        );
        assert!(engine.memory().ram.iter().all(|b| *b == 0));

        assert_eq!(
            restore_on_boot(&driver(WakeupState::Stateful), &mut engine),
            Ok(BootOutcome::RestoredFromFlash)
        );
        assert_eq!(engine.memory().ram, saved);
    }
}
