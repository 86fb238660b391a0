//! Hibernation image layout
//!
//! ```text
//! +-------------+----------------------------------------------+
//! | ImageHeader | RecordHeader | data | RecordHeader | data ... |
//! +-------------+----------------------------------------------+
//! ```
//!
//! Integers are little endian. The CRC covers every byte after the header. A header whose magic
//! does not match means no image.
use crc::{CRC_32_ISO_HDLC, Crc};
use power_manager_interface::{HibernateError, PowerMode};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, LE, U32};

/// Image magic, "HIB1"
pub const MAGIC: u32 = 0x3142_4948;

/// Size of [`ImageHeader`]
pub const HEADER_LEN: usize = core::mem::size_of::<ImageHeader>();

/// Size of [`RecordHeader`]
pub const RECORD_HEADER_LEN: usize = core::mem::size_of::<RecordHeader>();

/// Copy granularity, also the flash programming unit
pub const CHUNK: usize = 64;

pub(crate) const CRC: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// Leading header of a hibernation image
#[derive(PartialEq, Eq, Clone, Copy, Debug, IntoBytes, FromBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct ImageHeader {
    /// [`MAGIC`] when valid
    pub magic: U32<LE>,
    /// Payload length in bytes
    pub len: U32<LE>,
    /// CRC-32 of the payload
    pub crc: U32<LE>,
    /// Mode the image was saved for
    pub mode: u8,
    _reserved: [u8; 3],
}

impl ImageHeader {
    /// Header marking no image
    pub const INVALID: [u8; HEADER_LEN] = [0; HEADER_LEN];

    /// Header of a valid image
    pub fn new(mode: PowerMode, len: u32, crc: u32) -> Self {
        Self {
            magic: MAGIC.into(),
            len: len.into(),
            crc: crc.into(),
            mode: mode.into(),
            _reserved: [0; 3],
        }
    }

    /// Parse the first [`HEADER_LEN`] bytes of `bytes`
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        Self::read_from_prefix(bytes).ok().map(|(header, _)| header)
    }

    /// Returns true if the magic matches and the payload fits in `capacity` bytes of storage
    pub fn is_valid(&self, capacity: usize) -> bool {
        self.magic.get() == MAGIC
            && (self.len.get() as usize)
                .checked_add(HEADER_LEN)
                .is_some_and(|total| total <= capacity)
    }

    /// Mode the image was saved for, if known
    pub fn mode(&self) -> Option<PowerMode> {
        PowerMode::try_from(self.mode).ok()
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ImageHeader {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "ImageHeader {{ magic: {=u32:#x}, len: {}, crc: {=u32:#x}, mode: {} }}",
            self.magic.get(),
            self.len.get(),
            self.crc.get(),
            self.mode,
        );
    }
}

/// Header of one saved memory extent
#[derive(PartialEq, Eq, Clone, Copy, Debug, IntoBytes, FromBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct RecordHeader {
    /// First address of the extent
    pub addr: U32<LE>,
    /// Length of the extent in bytes
    pub len: U32<LE>,
}

impl RecordHeader {
    /// Header of the extent `[addr, addr + len)`
    pub fn new(addr: u32, len: u32) -> Self {
        Self {
            addr: addr.into(),
            len: len.into(),
        }
    }

    /// Parse the first [`RECORD_HEADER_LEN`] bytes of `bytes`
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        Self::read_from_prefix(bytes).ok().map(|(header, _)| header)
    }
}

/// CRC-32 of `len` bytes starting at `offset`, fetched through `read` one [`CHUNK`] at a time
pub(crate) fn checksum(
    offset: u32,
    len: u32,
    mut read: impl FnMut(u32, &mut [u8]) -> Result<(), HibernateError>,
) -> Result<u32, HibernateError> {
    let mut digest = CRC.digest();
    let mut buf = [0u8; CHUNK];
    for_each_chunk(offset, len, |at, n| {
        let chunk = buf.get_mut(..n).ok_or(HibernateError::Fatal)?;
        read(at, chunk)?;
        digest.update(chunk);
        Ok(())
    })?;
    Ok(digest.finalize())
}

/// Call `f` with `(offset, len)` of successive pieces of at most [`CHUNK`] bytes
pub(crate) fn for_each_chunk<E>(
    offset: u32,
    len: u32,
    mut f: impl FnMut(u32, usize) -> Result<(), E>,
) -> Result<(), E> {
    let mut done = 0u32;
    while done < len {
        let n = (len - done).min(CHUNK as u32);
        f(offset + done, n as usize)?;
        done += n;
    }
    Ok(())
}
