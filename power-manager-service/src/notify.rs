//! Sleep notification bus
use embedded_services::SyncCell;
use power_manager_interface::{Error, PowerMode, SleepEvent, SleepNotify};

/// Listener reference as stored by the bus
pub type Listener<'a> = &'a (dyn SleepNotify + Sync);

/// Fixed capacity table of sleep listeners
///
/// Listeners are invoked synchronously in slot order. The table is copied out before any
/// listener runs, so a listener may register or unregister others without deadlocking; the
/// change applies from the next notification.
pub struct SleepNotifyBus<'a, const N: usize> {
    slots: SyncCell<[Option<Listener<'a>>; N]>,
}

impl<'a, const N: usize> SleepNotifyBus<'a, N> {
    /// Create an empty bus
    pub const fn new() -> Self {
        Self {
            slots: SyncCell::new([None; N]),
        }
    }

    /// Register `listener`, returning its slot index
    ///
    /// # Errors
    ///
    /// Returns [`Error::RegistryFull`] if all `N` slots are in use.
    pub fn register(&self, listener: Listener<'a>) -> Result<usize, Error> {
        let mut index = None;
        self.slots.update(|mut slots| {
            if let Some((i, slot)) = slots.iter_mut().enumerate().find(|(_, slot)| slot.is_none()) {
                *slot = Some(listener);
                index = Some(i);
            }
            slots
        });
        index.ok_or(Error::RegistryFull)
    }

    /// Remove the listener at `index`
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if the slot is out of range or empty.
    pub fn unregister(&self, index: usize) -> Result<(), Error> {
        let mut removed = false;
        self.slots.update(|mut slots| {
            if let Some(slot) = slots.get_mut(index) {
                removed = slot.take().is_some();
            }
            slots
        });

        if removed { Ok(()) } else { Err(Error::InvalidParameter) }
    }

    /// Number of registered listeners
    pub fn len(&self) -> usize {
        self.slots.get().iter().flatten().count()
    }

    /// Returns true if no listener is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver `event` to every listener
    pub fn notify(&self, event: SleepEvent, mode: PowerMode) {
        for listener in self.slots.get().into_iter().flatten() {
            listener.notify(event, mode);
        }
    }
}

impl<const N: usize> Default for SleepNotifyBus<'_, N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;
    use critical_section::Mutex;

    struct Recorder {
        events: Mutex<Cell<[Option<(SleepEvent, PowerMode)>; 4]>>,
        count: Mutex<Cell<usize>>,
    }

    impl Recorder {
        const fn new() -> Self {
            Self {
                events: Mutex::new(Cell::new([None; 4])),
                count: Mutex::new(Cell::new(0)),
            }
        }

        fn count(&self) -> usize {
            critical_section::with(|cs| self.count.borrow(cs).get())
        }

        fn event(&self, index: usize) -> Option<(SleepEvent, PowerMode)> {
            critical_section::with(|cs| self.events.borrow(cs).get().get(index).copied().flatten())
        }
    }

    impl SleepNotify for Recorder {
        fn notify(&self, event: SleepEvent, mode: PowerMode) {
            critical_section::with(|cs| {
                let count = self.count.borrow(cs);
                let events = self.events.borrow(cs);
                let mut list = events.get();
                if let Some(slot) = list.get_mut(count.get()) {
                    *slot = Some((event, mode));
                }
                events.set(list);
                count.set(count.get() + 1);
            });
        }
    }

    #[test]
    fn test_notify_in_order() {
        let first = Recorder::new();
        let second = Recorder::new();
        let bus = SleepNotifyBus::<2>::new();

        assert_eq!(bus.register(&first), Ok(0));
        assert_eq!(bus.register(&second), Ok(1));

        bus.notify(SleepEvent::Suspending, PowerMode::Standby);
        bus.notify(SleepEvent::Resuming, PowerMode::Standby);

        for recorder in [&first, &second] {
            assert_eq!(recorder.count(), 2);
            assert_eq!(recorder.event(0), Some((SleepEvent::Suspending, PowerMode::Standby)));
            assert_eq!(recorder.event(1), Some((SleepEvent::Resuming, PowerMode::Standby)));
        }
    }

    #[test]
    fn test_full_and_unregister() {
        let recorder = Recorder::new();
        let bus = SleepNotifyBus::<2>::new();

        bus.register(&recorder).unwrap();
        bus.register(&recorder).unwrap();
        assert_eq!(bus.register(&recorder), Err(Error::RegistryFull));
        assert_eq!(bus.len(), 2);

        bus.unregister(0).unwrap();
        assert_eq!(bus.unregister(0), Err(Error::InvalidParameter));
        assert_eq!(bus.unregister(5), Err(Error::InvalidParameter));

        // Freed slot is reused
        assert_eq!(bus.register(&recorder), Ok(0));

        bus.notify(SleepEvent::Suspending, PowerMode::Stop);
        assert_eq!(recorder.count(), 2);
    }
}
