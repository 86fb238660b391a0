//! Hibernation engine
use embedded_services::{debug, error, info, warn};
use embedded_storage::nor_flash::NorFlash;
use embedded_storage::{ReadStorage, Storage};
use power_manager_interface::{HibernateError, Hibernation, PowerMode};
use zerocopy::IntoBytes;

use crate::flash::NoFlash;
use crate::free_block::FreeBlockList;
use crate::image::{CHUNK, CRC, HEADER_LEN, ImageHeader, RECORD_HEADER_LEN, RecordHeader, checksum, for_each_chunk};
use crate::memory::VolatileMemory;

/// Read the image header at the start of GPM
pub(crate) fn read_gpm_header<G: ReadStorage>(gpm: &mut G) -> Result<ImageHeader, HibernateError> {
    let mut raw = [0u8; HEADER_LEN];
    gpm.read(0, &mut raw).map_err(|_| HibernateError::Fatal)?;
    ImageHeader::parse(&raw).ok_or(HibernateError::Fatal)
}

/// Saves the used parts of volatile memory into GPM, skipping free blocks, and brings them back
/// after a stateful wake.
///
/// GPM always holds either a complete image or an invalid header: the header is invalidated
/// before any record is written and written last.
pub struct HibernationEngine<G, M, F = NoFlash> {
    gpm: G,
    memory: M,
    flash: Option<F>,
}

impl<G: Storage, M: VolatileMemory> HibernationEngine<G, M, NoFlash> {
    /// Create an engine without a flash partition; shutdown is then unavailable
    pub fn new(gpm: G, memory: M) -> Self {
        Self {
            gpm,
            memory,
            flash: None,
        }
    }
}

impl<G: Storage, M: VolatileMemory, F: NorFlash> HibernationEngine<G, M, F> {
    /// Create an engine that moves images through `flash` across shutdown
    #[cfg(feature = "shutdown")]
    pub fn with_flash(gpm: G, memory: M, flash: F) -> Self {
        Self {
            gpm,
            memory,
            flash: Some(flash),
        }
    }

    /// Retention memory
    pub fn gpm_mut(&mut self) -> &mut G {
        &mut self.gpm
    }

    /// Volatile memory owner
    pub fn memory(&self) -> &M {
        &self.memory
    }

    /// Volatile memory owner
    pub fn memory_mut(&mut self) -> &mut M {
        &mut self.memory
    }

    /// Flash partition, if any
    pub fn flash_mut(&mut self) -> Option<&mut F> {
        self.flash.as_mut()
    }

    /// Give back the storage and memory owner
    pub fn release(self) -> (G, M, Option<F>) {
        (self.gpm, self.memory, self.flash)
    }

    /// Returns true if GPM holds an image header, without checking the payload
    pub fn has_image(&mut self) -> bool {
        let capacity = self.gpm.capacity();
        read_gpm_header(&mut self.gpm).is_ok_and(|h| h.is_valid(capacity))
    }

    fn flash_available(&self) -> bool {
        cfg!(feature = "shutdown") && self.flash.is_some()
    }

    fn invalidate_gpm(&mut self) -> Result<(), HibernateError> {
        self.gpm
            .write(0, &ImageHeader::INVALID)
            .map_err(|_| HibernateError::Fatal)
    }

    /// Payload bytes needed to save everything outside `free`
    fn payload_len(&self, free: &FreeBlockList) -> Result<u32, HibernateError> {
        let mut total = 0u32;
        for region in self.memory.regions() {
            free.for_each_used(*region, |_, len| {
                total = total
                    .checked_add(RECORD_HEADER_LEN as u32)
                    .and_then(|t| t.checked_add(len))
                    .ok_or(HibernateError::NoRetention)?;
                Ok(())
            })?;
        }
        Ok(total)
    }

    /// Write every used extent as a record after the header, returning the payload CRC
    fn save_records(&mut self, free: &FreeBlockList) -> Result<u32, HibernateError> {
        let Self { gpm, memory, .. } = self;
        let mut digest = CRC.digest();
        let mut offset = HEADER_LEN as u32;
        let mut buf = [0u8; CHUNK];

        for region in memory.regions() {
            free.for_each_used(*region, |addr, len| {
                let record = RecordHeader::new(addr, len);
                gpm.write(offset, record.as_bytes())
                    .map_err(|_| HibernateError::Fatal)?;
                digest.update(record.as_bytes());
                offset += RECORD_HEADER_LEN as u32;

                for_each_chunk(addr, len, |at, n| {
                    let chunk = buf.get_mut(..n).ok_or(HibernateError::Fatal)?;
                    memory.read(at, chunk).map_err(|_| HibernateError::Fatal)?;
                    gpm.write(offset, chunk).map_err(|_| HibernateError::Fatal)?;
                    digest.update(chunk);
                    offset += n as u32;
                    Ok(())
                })
            })?;
        }

        Ok(digest.finalize())
    }

    /// Copy every record of a `len` byte payload back into volatile memory
    fn restore_records(&mut self, len: u32) -> Result<(), HibernateError> {
        let Self { gpm, memory, .. } = self;
        let end = (HEADER_LEN as u32)
            .checked_add(len)
            .ok_or(HibernateError::Corrupt)?;
        let mut offset = HEADER_LEN as u32;
        let mut buf = [0u8; CHUNK];

        while offset < end {
            let mut raw = [0u8; RECORD_HEADER_LEN];
            gpm.read(offset, &mut raw).map_err(|_| HibernateError::Fatal)?;
            let record = RecordHeader::parse(&raw).ok_or(HibernateError::Corrupt)?;
            let (addr, record_len) = (record.addr.get(), record.len.get());

            let data = offset + RECORD_HEADER_LEN as u32;
            let record_end = data
                .checked_add(record_len)
                .filter(|e| *e <= end)
                .ok_or(HibernateError::Corrupt)?;

            for_each_chunk(0, record_len, |done, n| {
                let chunk = buf.get_mut(..n).ok_or(HibernateError::Fatal)?;
                gpm.read(data + done, chunk).map_err(|_| HibernateError::Fatal)?;
                let at = addr.checked_add(done).ok_or(HibernateError::Corrupt)?;
                memory.write(at, chunk).map_err(|_| HibernateError::Corrupt)
            })?;

            offset = record_end;
        }

        Ok(())
    }
}

impl<G: Storage, M: VolatileMemory, F: NorFlash> Hibernation for HibernationEngine<G, M, F> {
    fn hibernate_to_gpm(&mut self, mode: PowerMode) -> Result<(), HibernateError> {
        let mut free = FreeBlockList::new();
        self.memory.scan_free(&mut free);

        let len = self.payload_len(&free)?;
        let fits = (len as usize)
            .checked_add(HEADER_LEN)
            .is_some_and(|total| total <= self.gpm.capacity());
        if !fits {
            warn!("Image of {} bytes does not fit GPM", len);
            return Err(HibernateError::NoRetention);
        }

        self.invalidate_gpm()?;
        let crc = self.save_records(&free)?;
        self.gpm
            .write(0, ImageHeader::new(mode, len, crc).as_bytes())
            .map_err(|_| HibernateError::Fatal)?;
        debug!(
            "Saved {} bytes to GPM for {:?}, skipped {} free bytes",
            len,
            mode,
            free.free_bytes()
        );

        if mode == PowerMode::Shutdown && !self.flash_available() {
            debug!("No flash for shutdown image");
            return Err(HibernateError::FlashUnavailable);
        }
        Ok(())
    }

    fn hibernate_from_gpm(&mut self) -> Result<(), HibernateError> {
        let header = read_gpm_header(&mut self.gpm)?;
        if !header.is_valid(self.gpm.capacity()) {
            return Err(HibernateError::Corrupt);
        }

        let len = header.len.get();
        let gpm = &mut self.gpm;
        let crc = checksum(HEADER_LEN as u32, len, |at, buf| {
            gpm.read(at, buf).map_err(|_| HibernateError::Fatal)
        })?;
        if crc != header.crc.get() {
            error!("GPM image CRC mismatch");
            self.invalidate_gpm()?;
            return Err(HibernateError::Corrupt);
        }

        let restored = self.restore_records(len);
        self.invalidate_gpm()?;
        restored?;

        info!("Restored {} bytes from GPM", len);
        Ok(())
    }

    #[cfg(feature = "shutdown")]
    fn hibernate_to_flash(&mut self) -> Result<(), HibernateError> {
        let Self { gpm, flash, .. } = self;
        let flash = flash.as_mut().ok_or(HibernateError::FlashUnavailable)?;
        crate::flash::save(gpm, flash)
    }

    #[cfg(feature = "shutdown")]
    fn hibernate_from_flash(&mut self) -> Result<(), HibernateError> {
        let Self { gpm, flash, .. } = self;
        let flash = flash.as_mut().ok_or(HibernateError::FlashUnavailable)?;
        crate::flash::restore(gpm, flash)
    }

    fn discard(&mut self) {
        if self.invalidate_gpm().is_err() {
            warn!("Failed to discard GPM image");
        }

        #[cfg(feature = "shutdown")]
        if let Some(flash) = self.flash.as_mut() {
            crate::flash::discard(flash);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::free_block::{BlockKind, FreeBlock};
    use crate::testing::{BASE, RamFlash, RamStorage, TestMemory};

    fn memory() -> TestMemory {
        let mut memory = TestMemory::new();
        memory.fill_pattern(0x10);
        memory
    }

    #[test]
    fn test_round_trip_skips_free_blocks() {
        let mut memory = memory();
        memory.add_free(FreeBlock::new(BlockKind::Heap, BASE + 32, 64));
        let saved = memory.ram;

        let mut engine = HibernationEngine::new(RamStorage::<512>::new(), memory);
        engine.hibernate_to_gpm(PowerMode::Standby).unwrap();
        assert!(engine.has_image());

        engine.memory_mut().ram.fill(0xAA);
        engine.hibernate_from_gpm().unwrap();

        let ram = engine.memory().ram;
        assert_eq!(ram[..32], saved[..32]);
        assert!(ram[32..96].iter().all(|b| *b == 0xAA));
        assert_eq!(ram[96..], saved[96..]);

        // The image is consumed
        assert!(!engine.has_image());
        assert_eq!(engine.hibernate_from_gpm(), Err(HibernateError::Corrupt));
    }

    #[test]
    fn test_no_room_leaves_gpm_untouched() {
        let mut gpm = RamStorage::<128>::new();
        gpm.bytes.fill(0x5A);
        let mut engine = HibernationEngine::new(gpm, memory());

        assert_eq!(
            engine.hibernate_to_gpm(PowerMode::Standby),
            Err(HibernateError::NoRetention)
        );
        assert!(engine.gpm_mut().bytes.iter().all(|b| *b == 0x5A));
    }

    #[test]
    fn test_write_failure_leaves_no_image() {
        let mut gpm = RamStorage::<512>::new();
        // Invalidation and the first record header succeed
        gpm.fail_writes_after = Some(2);
        let mut engine = HibernationEngine::new(gpm, memory());

        assert_eq!(engine.hibernate_to_gpm(PowerMode::Standby), Err(HibernateError::Fatal));
        engine.gpm_mut().fail_writes_after = None;
        assert!(!engine.has_image());
        assert_eq!(engine.hibernate_from_gpm(), Err(HibernateError::Corrupt));
    }

    #[test]
    fn test_corrupt_payload_rejected() {
        let mut engine = HibernationEngine::new(RamStorage::<512>::new(), memory());
        engine.hibernate_to_gpm(PowerMode::Standby).unwrap();

        engine.gpm_mut().bytes[HEADER_LEN + RECORD_HEADER_LEN + 3] ^= 0x01;
        engine.memory_mut().ram.fill(0);

        assert_eq!(engine.hibernate_from_gpm(), Err(HibernateError::Corrupt));
        assert!(engine.memory().ram.iter().all(|b| *b == 0));
    }

    #[test]
    fn test_shutdown_without_flash() {
        let mut engine = HibernationEngine::new(RamStorage::<512>::new(), memory());

        assert_eq!(
            engine.hibernate_to_gpm(PowerMode::Shutdown),
            Err(HibernateError::FlashUnavailable)
        );
        // Image is still good for standby
        assert!(engine.has_image());
        assert_eq!(engine.hibernate_to_flash(), Err(HibernateError::FlashUnavailable));
        assert_eq!(engine.hibernate_from_gpm(), Ok(()));
    }

    #[test]
    fn test_discard() {
        let mut engine = HibernationEngine::new(RamStorage::<512>::new(), memory());
        engine.hibernate_to_gpm(PowerMode::Standby).unwrap();

        engine.discard();
        assert_eq!(engine.hibernate_from_gpm(), Err(HibernateError::Corrupt));
    }

    #[cfg(feature = "shutdown")]
    #[test]
    fn test_flash_round_trip() {
        let memory = memory();
        let saved = memory.ram;
        let mut engine = HibernationEngine::with_flash(RamStorage::<512>::new(), memory, RamFlash::<1024>::new());

        engine.hibernate_to_gpm(PowerMode::Shutdown).unwrap();
        engine.hibernate_to_flash().unwrap();

        // GPM loses power in shutdown
        engine.gpm_mut().bytes.fill(0);
        engine.memory_mut().ram.fill(0);
        assert_eq!(engine.hibernate_from_gpm(), Err(HibernateError::Corrupt));

        engine.hibernate_from_flash().unwrap();
        engine.hibernate_from_gpm().unwrap();
        assert_eq!(engine.memory().ram, saved);

        // Flash image is consumed
        assert_eq!(engine.hibernate_from_flash(), Err(HibernateError::Corrupt));
    }

    #[cfg(feature = "shutdown")]
    #[test]
    fn test_flash_too_small() {
        let mut engine = HibernationEngine::with_flash(RamStorage::<512>::new(), memory(), RamFlash::<256>::new());
        engine.hibernate_to_gpm(PowerMode::Shutdown).unwrap();

        assert_eq!(engine.hibernate_to_flash(), Err(HibernateError::FlashUnavailable));
        assert!(engine.has_image());
    }

    #[cfg(feature = "shutdown")]
    #[test]
    fn test_discard_erases_flash_image() {
        let mut engine = HibernationEngine::with_flash(RamStorage::<512>::new(), memory(), RamFlash::<1024>::new());
        engine.hibernate_to_gpm(PowerMode::Shutdown).unwrap();
        engine.hibernate_to_flash().unwrap();

        engine.discard();
        assert_eq!(engine.hibernate_from_flash(), Err(HibernateError::Corrupt));
        assert_eq!(engine.flash_mut().map(|f| f.erases), Some(2));
    }
}
