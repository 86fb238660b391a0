//! Moving the GPM image through flash across shutdown
//!
//! Flash layout: the image header padded to one [`CHUNK`], then the payload padded to a whole
//! number of chunks. The header chunk is programmed last and erased once the image is consumed.
use embedded_storage::nor_flash::{ErrorType, NorFlash, NorFlashError, NorFlashErrorKind, ReadNorFlash};
#[cfg(feature = "shutdown")]
use embedded_storage::Storage;
#[cfg(feature = "shutdown")]
use embedded_services::{debug, warn};
#[cfg(feature = "shutdown")]
use power_manager_interface::HibernateError;
#[cfg(feature = "shutdown")]
use zerocopy::IntoBytes;

#[cfg(feature = "shutdown")]
use crate::engine::read_gpm_header;
#[cfg(feature = "shutdown")]
use crate::image::{CRC, HEADER_LEN, ImageHeader, for_each_chunk};
use crate::image::CHUNK;

/// Placeholder for platforms without a flash partition for hibernation
#[derive(Copy, Clone, Debug, Default)]
pub struct NoFlash;

/// Error of every [`NoFlash`] operation
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct NoFlashError;

impl NorFlashError for NoFlashError {
    fn kind(&self) -> NorFlashErrorKind {
        NorFlashErrorKind::Other
    }
}

impl ErrorType for NoFlash {
    type Error = NoFlashError;
}

impl ReadNorFlash for NoFlash {
    const READ_SIZE: usize = 1;

    fn read(&mut self, _offset: u32, _bytes: &mut [u8]) -> Result<(), Self::Error> {
        Err(NoFlashError)
    }

    fn capacity(&self) -> usize {
        0
    }
}

impl NorFlash for NoFlash {
    const WRITE_SIZE: usize = 1;
    const ERASE_SIZE: usize = 1;

    fn erase(&mut self, _from: u32, _to: u32) -> Result<(), Self::Error> {
        Err(NoFlashError)
    }

    fn write(&mut self, _offset: u32, _bytes: &[u8]) -> Result<(), Self::Error> {
        Err(NoFlashError)
    }
}

/// Returns true if `F` can be programmed and read one [`CHUNK`] at a time
pub const fn geometry_supported<F: NorFlash>() -> bool {
    F::WRITE_SIZE != 0
        && F::READ_SIZE != 0
        && F::ERASE_SIZE != 0
        && CHUNK % F::WRITE_SIZE == 0
        && CHUNK % F::READ_SIZE == 0
}

#[cfg(feature = "shutdown")]
fn round_up(value: usize, to: usize) -> Option<usize> {
    value.checked_add(to - 1).map(|v| v / to * to)
}

/// Bytes of flash used by an image with a `len` byte payload
#[cfg(feature = "shutdown")]
fn flash_span(len: u32) -> Option<usize> {
    round_up(len as usize, CHUNK)?.checked_add(CHUNK)
}

#[cfg(feature = "shutdown")]
fn flash_checksum<F: NorFlash>(flash: &mut F, len: u32) -> Result<u32, HibernateError> {
    let mut digest = CRC.digest();
    let mut buf = [0u8; CHUNK];
    for_each_chunk(0, len, |done, n| {
        flash
            .read(CHUNK as u32 + done, &mut buf)
            .map_err(|_| HibernateError::FlashUnavailable)?;
        digest.update(buf.get(..n).ok_or(HibernateError::Fatal)?);
        Ok(())
    })?;
    Ok(digest.finalize())
}

/// Copy the GPM image into `flash`
#[cfg(feature = "shutdown")]
pub(crate) fn save<G: Storage, F: NorFlash>(gpm: &mut G, flash: &mut F) -> Result<(), HibernateError> {
    if !geometry_supported::<F>() {
        return Err(HibernateError::FlashUnavailable);
    }

    let header = read_gpm_header(gpm)?;
    if !header.is_valid(gpm.capacity()) {
        return Err(HibernateError::Corrupt);
    }
    let len = header.len.get();

    let erase_to = flash_span(len)
        .and_then(|span| round_up(span, F::ERASE_SIZE))
        .filter(|end| *end <= flash.capacity())
        .ok_or(HibernateError::FlashUnavailable)?;
    flash
        .erase(0, erase_to as u32)
        .map_err(|_| HibernateError::FlashUnavailable)?;

    let mut buf = [0xFFu8; CHUNK];
    for_each_chunk(0, len, |done, n| {
        buf.fill(0xFF);
        let chunk = buf.get_mut(..n).ok_or(HibernateError::Fatal)?;
        gpm.read(HEADER_LEN as u32 + done, chunk)
            .map_err(|_| HibernateError::Fatal)?;
        flash
            .write(CHUNK as u32 + done, &buf)
            .map_err(|_| HibernateError::FlashUnavailable)
    })?;

    if flash_checksum(flash, len)? != header.crc.get() {
        warn!("Flash image verification failed");
        return Err(HibernateError::FlashUnavailable);
    }

    let mut head = [0xFFu8; CHUNK];
    head.get_mut(..HEADER_LEN)
        .ok_or(HibernateError::Fatal)?
        .copy_from_slice(header.as_bytes());
    flash.write(0, &head).map_err(|_| HibernateError::FlashUnavailable)?;

    debug!("Moved {} byte image to flash", len);
    Ok(())
}

/// Copy the flash image back into GPM and consume it
#[cfg(feature = "shutdown")]
pub(crate) fn restore<G: Storage, F: NorFlash>(gpm: &mut G, flash: &mut F) -> Result<(), HibernateError> {
    if !geometry_supported::<F>() {
        return Err(HibernateError::FlashUnavailable);
    }

    let mut head = [0u8; CHUNK];
    flash
        .read(0, &mut head)
        .map_err(|_| HibernateError::FlashUnavailable)?;
    let header = ImageHeader::parse(&head).ok_or(HibernateError::Corrupt)?;
    let fits_flash = flash_span(header.len.get()).is_some_and(|span| span <= flash.capacity());
    if !header.is_valid(gpm.capacity()) || !fits_flash {
        return Err(HibernateError::Corrupt);
    }
    let len = header.len.get();

    if flash_checksum(flash, len)? != header.crc.get() {
        warn!("Flash image CRC mismatch");
        return Err(HibernateError::Corrupt);
    }

    gpm.write(0, &ImageHeader::INVALID)
        .map_err(|_| HibernateError::Fatal)?;
    let mut buf = [0u8; CHUNK];
    for_each_chunk(0, len, |done, n| {
        flash
            .read(CHUNK as u32 + done, &mut buf)
            .map_err(|_| HibernateError::FlashUnavailable)?;
        gpm.write(HEADER_LEN as u32 + done, buf.get(..n).ok_or(HibernateError::Fatal)?)
            .map_err(|_| HibernateError::Fatal)
    })?;
    gpm.write(0, header.as_bytes())
        .map_err(|_| HibernateError::Fatal)?;

    if flash.erase(0, F::ERASE_SIZE as u32).is_err() {
        warn!("Failed to consume flash image");
    }

    debug!("Moved {} byte image back to GPM", len);
    Ok(())
}

/// Erase the flash image header if one is present
#[cfg(feature = "shutdown")]
pub(crate) fn discard<F: NorFlash>(flash: &mut F) {
    if !geometry_supported::<F>() {
        return;
    }

    let mut head = [0u8; CHUNK];
    let present = flash.read(0, &mut head).is_ok()
        && ImageHeader::parse(&head).is_some_and(|h| h.magic.get() == crate::image::MAGIC);
    if present && flash.erase(0, F::ERASE_SIZE as u32).is_err() {
        warn!("Failed to discard flash image");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct OddFlash;

    impl ErrorType for OddFlash {
        type Error = NoFlashError;
    }

    impl ReadNorFlash for OddFlash {
        const READ_SIZE: usize = 1;

        fn read(&mut self, _offset: u32, _bytes: &mut [u8]) -> Result<(), Self::Error> {
            Ok(())
        }

        fn capacity(&self) -> usize {
            4096
        }
    }

    impl NorFlash for OddFlash {
        const WRITE_SIZE: usize = 48;
        const ERASE_SIZE: usize = 4096;

        fn erase(&mut self, _from: u32, _to: u32) -> Result<(), Self::Error> {
            Ok(())
        }

        fn write(&mut self, _offset: u32, _bytes: &[u8]) -> Result<(), Self::Error> {
            Ok(())
        }
    }

    #[test]
    fn test_geometry() {
        assert!(geometry_supported::<NoFlash>());
        assert!(!geometry_supported::<OddFlash>());
    }

    #[cfg(feature = "shutdown")]
    #[test]
    fn test_span() {
        assert_eq!(flash_span(0), Some(CHUNK));
        assert_eq!(flash_span(1), Some(2 * CHUNK));
        assert_eq!(flash_span(CHUNK as u32), Some(2 * CHUNK));
        assert_eq!(round_up(65, 256), Some(256));
    }

    #[cfg(feature = "shutdown")]
    #[test]
    fn test_odd_geometry_unavailable() {
        let mut gpm = crate::testing::RamStorage::<256>::new();
        assert_eq!(save(&mut gpm, &mut OddFlash), Err(HibernateError::FlashUnavailable));
        assert_eq!(restore(&mut gpm, &mut OddFlash), Err(HibernateError::FlashUnavailable));
    }
}
