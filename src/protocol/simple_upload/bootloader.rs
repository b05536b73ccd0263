use super::SimpleUpload;
use crate::{com::Com, protocol::Protocol, TransferError};

pub const FIRMWARE_BASE: u32 = 0x0000_0000;
pub const MAX_FIRMWARE_SIZE: usize = 256 * 1024;

#[derive(Debug)]
pub enum BootOutcome {
    /// Image verified, continue at this address.
    Jump(u32),
    /// Nothing to run, the device spins.
    Halt(TransferError),
}

/// Device side front end: receives one image into the firmware region and
/// decides whether it may be started.
pub struct Bootloader<'a> {
    image: &'a mut [u8],
    engine: SimpleUpload,
}

impl<'a> Bootloader<'a> {
    pub fn new(image: &'a mut [u8]) -> Self {
        let mut engine = SimpleUpload::new(MAX_FIRMWARE_SIZE.min(image.len()));
        engine.timeout = None;
        Self { image, engine }
    }

    pub fn run<C: Com>(&mut self, com: &mut C) -> BootOutcome {
        log::info!("waiting for upload on {}", com.get_name());
        match self.engine.receive_file(com, &mut *self.image) {
            Ok(file) => {
                log::info!("received {} bytes crc 0x{:08X}, jump to 0x{FIRMWARE_BASE:08X}", file.size, self.engine.crc());
                BootOutcome::Jump(FIRMWARE_BASE)
            }
            Err(err) => {
                log::error!("halt: {err}");
                BootOutcome::Halt(err)
            }
        }
    }

    /// Bytes received by the last run.
    pub fn image_len(&self) -> usize {
        self.engine.get_current_state().bytes_transfered
    }
}
