use std::{thread, time::Duration};

use super::SimpleUpload;
use crate::{
    com::Com,
    protocol::{FileDescriptor, Protocol},
    TransferError, TransferResult,
};

/// Typed into the target shell to start its loader.
pub const UPLOAD_COMMAND: &[u8] = b"upload\r";
pub const MAX_UPLOAD_SIZE: usize = 512 * 1024;

/// Host side firmware upload through the target's shell.
pub struct Uploader {
    /// Time the shell needs to start the loader after the command.
    pub shell_settle: Duration,
    pub read_timeout: Duration,
    pub max_size: usize,
}

impl Default for Uploader {
    fn default() -> Self {
        Self {
            shell_settle: Duration::from_millis(300),
            read_timeout: Duration::from_millis(2000),
            max_size: MAX_UPLOAD_SIZE,
        }
    }
}

impl Uploader {
    /// Returns the crc both sides agreed on.
    pub fn upload<C: Com>(&self, com: &mut C, file: &FileDescriptor) -> TransferResult<u32> {
        if file.data.is_empty() || file.size() > self.max_size {
            return Err(TransferError::SizeError {
                size: file.size(),
                max: self.max_size,
            });
        }
        let mut engine = SimpleUpload::new(self.max_size);
        engine.timeout = Some(self.read_timeout);

        log::info!("uploading {} ({} bytes)", file.file_name, file.size());
        com.send(UPLOAD_COMMAND)?;
        thread::sleep(self.shell_settle);
        // shell echo
        com.flush_input();

        engine.send_file(com, file)?;
        log::info!("upload verified, crc 0x{:08X}", engine.crc());
        Ok(engine.crc())
    }
}
