//! Cortex-M port
use cortex_m::peripheral::{SCB, SYST};

use crate::port::{Cpu, SysTick};

const CSR_ENABLE: u32 = 1 << 0;
const CSR_TICKINT: u32 = 1 << 1;
const CSR_CLKSOURCE: u32 = 1 << 2;

/// SysTick clocked from the core clock
///
/// Start and stop write the control register instead of read-modify-write, since reading it
/// clears the wrap flag.
pub struct CortexMSysTick {
    syst: SYST,
}

impl CortexMSysTick {
    /// Take ownership of the SysTick peripheral
    pub fn new(syst: SYST) -> Self {
        Self { syst }
    }

    /// Release the peripheral
    pub fn free(self) -> SYST {
        self.syst
    }
}

impl SysTick for CortexMSysTick {
    fn stop(&mut self) {
        // SAFETY: only the tick configuration bits are written, the counter keeps its value
        unsafe { self.syst.csr.write(CSR_CLKSOURCE | CSR_TICKINT) }
    }

    fn start(&mut self) {
        // SAFETY: as in `stop`
        unsafe { self.syst.csr.write(CSR_CLKSOURCE | CSR_TICKINT | CSR_ENABLE) }
    }

    fn current(&self) -> u32 {
        SYST::get_current()
    }

    fn set_reload(&mut self, reload: u32) {
        self.syst.set_reload(reload);
    }

    fn clear_current(&mut self) {
        self.syst.clear_current();
    }

    fn count_flag(&mut self) -> bool {
        self.syst.has_wrapped()
    }

    fn take_pending(&mut self) -> bool {
        let pending = SCB::is_pendst_pending();
        if pending {
            SCB::clear_pendst();
        }
        pending
    }
}

/// Core interrupt control through PRIMASK
pub struct CortexMCpu;

impl Cpu for CortexMCpu {
    fn disable_interrupts(&mut self) {
        cortex_m::interrupt::disable();
    }

    fn enable_interrupts(&mut self) {
        // SAFETY: the idle hook is not inside a critical section when it unmasks
        unsafe { cortex_m::interrupt::enable() }
    }

    fn wait_for_interrupt(&mut self) {
        cortex_m::asm::dsb();
        cortex_m::asm::wfi();
        cortex_m::asm::isb();
    }
}
