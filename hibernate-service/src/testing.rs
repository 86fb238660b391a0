//! In-memory storage, flash and volatile memory for tests
use embedded_storage::nor_flash::{ErrorType, NorFlash, NorFlashError, NorFlashErrorKind, ReadNorFlash};
use embedded_storage::{ReadStorage, Storage};

use crate::free_block::{FreeBlock, FreeBlockList};
use crate::memory::{OutOfRange, Region, VolatileMemory};

/// Address of the first byte of [`TestMemory`]
pub const BASE: u32 = 0x2000_0000;

#[derive(Debug)]
pub struct StorageError;

/// Byte array GPM
pub struct RamStorage<const N: usize> {
    pub bytes: [u8; N],
    /// Number of writes that succeed before every further write fails
    pub fail_writes_after: Option<usize>,
    writes: usize,
}

impl<const N: usize> RamStorage<N> {
    pub fn new() -> Self {
        Self {
            bytes: [0; N],
            fail_writes_after: None,
            writes: 0,
        }
    }
}

impl<const N: usize> ReadStorage for RamStorage<N> {
    type Error = StorageError;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), StorageError> {
        let start = offset as usize;
        let src = self.bytes.get(start..start + bytes.len()).ok_or(StorageError)?;
        bytes.copy_from_slice(src);
        Ok(())
    }

    fn capacity(&self) -> usize {
        N
    }
}

impl<const N: usize> Storage for RamStorage<N> {
    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), StorageError> {
        if self.fail_writes_after.is_some_and(|limit| self.writes >= limit) {
            return Err(StorageError);
        }
        self.writes += 1;

        let start = offset as usize;
        let dst = self.bytes.get_mut(start..start + bytes.len()).ok_or(StorageError)?;
        dst.copy_from_slice(bytes);
        Ok(())
    }
}

#[derive(Debug)]
pub struct FlashError(NorFlashErrorKind);

impl NorFlashError for FlashError {
    fn kind(&self) -> NorFlashErrorKind {
        self.0
    }
}

/// NOR flash that only clears bits on write and checks alignment
pub struct RamFlash<const N: usize> {
    pub bytes: [u8; N],
    pub erases: usize,
}

impl<const N: usize> RamFlash<N> {
    pub fn new() -> Self {
        Self {
            bytes: [0xFF; N],
            erases: 0,
        }
    }
}

impl<const N: usize> ErrorType for RamFlash<N> {
    type Error = FlashError;
}

impl<const N: usize> ReadNorFlash for RamFlash<N> {
    const READ_SIZE: usize = 1;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), FlashError> {
        let start = offset as usize;
        let src = self
            .bytes
            .get(start..start + bytes.len())
            .ok_or(FlashError(NorFlashErrorKind::OutOfBounds))?;
        bytes.copy_from_slice(src);
        Ok(())
    }

    fn capacity(&self) -> usize {
        N
    }
}

impl<const N: usize> NorFlash for RamFlash<N> {
    const WRITE_SIZE: usize = 4;
    const ERASE_SIZE: usize = 256;

    fn erase(&mut self, from: u32, to: u32) -> Result<(), FlashError> {
        let (from, to) = (from as usize, to as usize);
        if from % Self::ERASE_SIZE != 0 || to % Self::ERASE_SIZE != 0 {
            return Err(FlashError(NorFlashErrorKind::NotAligned));
        }
        self.bytes
            .get_mut(from..to)
            .ok_or(FlashError(NorFlashErrorKind::OutOfBounds))?
            .fill(0xFF);
        self.erases += 1;
        Ok(())
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), FlashError> {
        let start = offset as usize;
        if start % Self::WRITE_SIZE != 0 || bytes.len() % Self::WRITE_SIZE != 0 {
            return Err(FlashError(NorFlashErrorKind::NotAligned));
        }
        let dst = self
            .bytes
            .get_mut(start..start + bytes.len())
            .ok_or(FlashError(NorFlashErrorKind::OutOfBounds))?;
        for (d, s) in dst.iter_mut().zip(bytes) {
            *d &= *s;
        }
        Ok(())
    }
}

/// 256 bytes of RAM at [`BASE`] split into two regions
pub struct TestMemory {
    pub ram: [u8; 256],
    regions: [Region; 2],
    free: heapless::Vec<FreeBlock, 4>,
}

impl TestMemory {
    pub fn new() -> Self {
        Self {
            ram: [0; 256],
            regions: [Region::new(BASE, 128), Region::new(BASE + 128, 128)],
            free: heapless::Vec::new(),
        }
    }

    pub fn fill_pattern(&mut self, seed: u8) {
        for (i, b) in self.ram.iter_mut().enumerate() {
            *b = seed.wrapping_add(i as u8);
        }
    }

    pub fn add_free(&mut self, block: FreeBlock) {
        self.free.push(block).unwrap();
    }

    fn range(&self, addr: u32, len: usize) -> Result<core::ops::Range<usize>, OutOfRange> {
        let start = addr.checked_sub(BASE).ok_or(OutOfRange)? as usize;
        let end = start + len;
        if end > self.ram.len() {
            return Err(OutOfRange);
        }
        Ok(start..end)
    }
}

impl VolatileMemory for TestMemory {
    fn regions(&self) -> &[Region] {
        &self.regions
    }

    fn scan_free(&self, free: &mut FreeBlockList) {
        for block in &self.free {
            let _ = free.insert(*block);
        }
    }

    fn read(&self, addr: u32, buf: &mut [u8]) -> Result<(), OutOfRange> {
        let range = self.range(addr, buf.len())?;
        buf.copy_from_slice(&self.ram[range]);
        Ok(())
    }

    fn write(&mut self, addr: u32, data: &[u8]) -> Result<(), OutOfRange> {
        let range = self.range(addr, data.len())?;
        self.ram[range].copy_from_slice(data);
        Ok(())
    }
}
