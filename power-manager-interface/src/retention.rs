//! SRAM retention sections and SKU limits
use bitflags::bitflags;

bitflags! {
    /// SRAM sections kept powered through standby
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct RetentionSections: u32 {
        /// Section 0
        const SEC0 = 1 << 0;
        /// Section 1
        const SEC1 = 1 << 1;
        /// Section 2
        const SEC2 = 1 << 2;
        /// Section 3
        const SEC3 = 1 << 3;
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for RetentionSections {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "RetentionSections({=u32:#x})", self.bits())
    }
}

/// Hardware variant, selects the legal retention sections and IO range
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Sku {
    /// ALT1250
    #[default]
    Alt1250,
    /// ALT1255, fewer retention sections
    Alt1255,
}

impl Sku {
    /// Retention sections this variant implements
    pub const fn legal_retention(self) -> RetentionSections {
        match self {
            Sku::Alt1250 => RetentionSections::all(),
            Sku::Alt1255 => RetentionSections::SEC0.union(RetentionSections::SEC1),
        }
    }

    /// Highest valid MCU IO number, IO numbers start at 1
    pub const fn io_count(self) -> u8 {
        match self {
            Sku::Alt1250 => 48,
            Sku::Alt1255 => 24,
        }
    }

    /// Validates a raw retention mask against this variant
    pub fn retention_from_bits(self, bits: u32) -> Option<RetentionSections> {
        RetentionSections::from_bits(bits).filter(|sections| self.legal_retention().contains(*sections))
    }
}
