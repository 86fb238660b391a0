//! Volatile memory owner
use crate::free_block::FreeBlockList;

/// Address range of volatile memory
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Region {
    /// First address
    pub start: u32,
    /// Length in bytes
    pub len: u32,
}

impl Region {
    /// Create a region
    pub const fn new(start: u32, len: u32) -> Self {
        Self { start, len }
    }

    /// One past the last address
    pub const fn end(&self) -> u32 {
        self.start.saturating_add(self.len)
    }

    /// Returns true if `[start, start + len)` lies inside the region
    pub const fn contains(&self, start: u32, len: u32) -> bool {
        match start.checked_add(len) {
            Some(end) => start >= self.start && end <= self.end(),
            None => false,
        }
    }
}

/// Access outside every region
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OutOfRange;

/// Owner of the RAM whose content is lost in standby and shutdown
pub trait VolatileMemory {
    /// Regions to preserve, ascending and non-overlapping
    fn regions(&self) -> &[Region];

    /// Report the blocks inside [`VolatileMemory::regions`] whose content need not survive,
    /// such as unused heap and the unused part of task stacks
    fn scan_free(&self, free: &mut FreeBlockList);

    /// Copy memory at `addr` into `buf`
    fn read(&self, addr: u32, buf: &mut [u8]) -> Result<(), OutOfRange>;

    /// Copy `data` into memory at `addr`
    fn write(&mut self, addr: u32, data: &[u8]) -> Result<(), OutOfRange>;
}

impl<T: VolatileMemory + ?Sized> VolatileMemory for &mut T {
    fn regions(&self) -> &[Region] {
        T::regions(self)
    }

    fn scan_free(&self, free: &mut FreeBlockList) {
        T::scan_free(self, free)
    }

    fn read(&self, addr: u32, buf: &mut [u8]) -> Result<(), OutOfRange> {
        T::read(self, addr, buf)
    }

    fn write(&mut self, addr: u32, data: &[u8]) -> Result<(), OutOfRange> {
        T::write(self, addr, data)
    }
}
