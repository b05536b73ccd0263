// XMODEM-1K with CRC-16, see http://pauillac.inria.fr/~doligez/zmodem/ymodem.txt
//
// The sender always uses 1024 byte STX blocks, the receiver accepts both
// block sizes.

pub mod constants;
use std::time::Duration;

pub use constants::*;

mod rx;
mod sx;

#[cfg(test)]
mod tests;

use super::{FileDescriptor, Protocol, ReceivedFile, TransferState};
use crate::{com::Com, TransferResult};

#[derive(Debug, Clone, Copy)]
pub struct XmodemTimeouts {
    /// Total time the receiver keeps asking for a sender, split over
    /// [`START_ATTEMPTS`] 'C' requests.
    pub init: Duration,
    /// Waiting for the next block or an ACK/NAK.
    pub block: Duration,
    /// Between bytes inside a block.
    pub character: Duration,
    /// Time the sender waits for the receiver's first 'C'.
    pub start: Duration,
}

impl Default for XmodemTimeouts {
    fn default() -> Self {
        Self {
            init: Duration::from_secs(30 * 60),
            block: Duration::from_secs(30 * 60),
            character: Duration::from_secs(1),
            start: Duration::from_secs(60),
        }
    }
}

pub struct Xmodem {
    pub timeouts: XmodemTimeouts,
    pub max_retries: usize,
    /// Drop trailing CPMEOF pad bytes of the last block.
    pub trim_padding: bool,
    state: TransferState,
}

impl Xmodem {
    pub fn new() -> Self {
        Self {
            timeouts: XmodemTimeouts::default(),
            max_retries: MAX_RETRIES,
            trim_padding: true,
            state: TransferState::new(),
        }
    }

    pub fn cancel<C: Com>(com: &mut C) -> TransferResult<()> {
        com.send(&[CAN, CAN])?;
        Ok(())
    }
}

impl Default for Xmodem {
    fn default() -> Self {
        Self::new()
    }
}

impl Protocol for Xmodem {
    fn get_name(&self) -> &str {
        "Xmodem 1k"
    }

    fn get_current_state(&self) -> &TransferState {
        &self.state
    }

    fn send_file<C: Com>(&mut self, com: &mut C, file: &FileDescriptor) -> TransferResult<()> {
        self.state = TransferState::new();
        self.state.file_name = file.file_name.clone();
        self.state.file_size = file.size();
        let res = self.sx(com, &file.data);
        if let Err(err) = &res {
            log::error!("xmodem send failed: {err}");
        }
        res
    }

    fn receive_file<C: Com>(&mut self, com: &mut C, buffer: &mut [u8]) -> TransferResult<ReceivedFile> {
        self.state = TransferState::new();
        let res = self.rx(com, buffer);
        if let Err(err) = &res {
            log::error!("xmodem receive failed: {err}");
        }
        res
    }
}
