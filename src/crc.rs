//! CRC engines shared by all protocols.
//!
//! CRC-16 is the CCITT polynomial 0x1021, MSB first, initial value 0 and no
//! final xor (the XMODEM/ZMODEM flavour). CRC-32 is the reflected 0xEDB88320
//! polynomial with 0xFFFF_FFFF preset and final inversion (PKZIP).

use ::crc::{Crc, Digest, CRC_16_XMODEM, CRC_32_ISO_HDLC};

pub static CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);
pub static CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

pub fn crc16_ccitt(data: &[u8]) -> u16 {
    CRC16.checksum(data)
}

pub fn crc32(data: &[u8]) -> u32 {
    CRC32.checksum(data)
}

/// Incremental CRC-16 for data that arrives in pieces, e.g. a subpacket
/// payload followed by its frame end.
#[derive(Clone)]
pub struct Crc16 {
    digest: Digest<'static, u16>,
}

impl Crc16 {
    pub fn new() -> Self {
        Self { digest: CRC16.digest() }
    }

    pub fn update(&mut self, data: &[u8]) {
        self.digest.update(data);
    }

    pub fn finish(&self) -> u16 {
        self.digest.clone().finalize()
    }
}

impl Default for Crc16 {
    fn default() -> Self {
        Self::new()
    }
}

/// Incremental CRC-32, fed one byte at a time while data streams in.
#[derive(Clone)]
pub struct Crc32 {
    digest: Digest<'static, u32>,
}

impl Crc32 {
    pub fn new() -> Self {
        Self { digest: CRC32.digest() }
    }

    pub fn update_byte(&mut self, b: u8) {
        self.digest.update(&[b]);
    }

    pub fn update(&mut self, data: &[u8]) {
        self.digest.update(data);
    }

    pub fn finish(&self) -> u32 {
        self.digest.clone().finalize()
    }
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new()
    }
}
