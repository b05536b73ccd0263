use std::time::Duration;

use crate::{TransferError, TransferResult};

pub mod serial_com;
pub use serial_com::*;

pub mod polled_uart;
pub use polled_uart::*;

#[cfg(test)]
pub mod test_com;
#[cfg(test)]
pub use test_com::*;

/// The byte link every protocol engine is written against.
pub trait Com {
    fn get_name(&self) -> &'static str;

    /// Reads a single byte, `Err(TransferError::Timeout)` if none arrives in time.
    fn read_u8(&mut self, timeout: Duration) -> TransferResult<u8>;

    fn send(&mut self, buf: &[u8]) -> TransferResult<usize>;

    /// Monotonic milliseconds.
    fn now_ms(&self) -> u32;

    fn put_u8(&mut self, b: u8) -> TransferResult<()> {
        self.send(&[b])?;
        Ok(())
    }

    /// Waits as long as it takes for the next byte.
    fn read_u8_blocking(&mut self) -> TransferResult<u8> {
        loop {
            match self.read_u8(Duration::from_secs(1)) {
                Err(TransferError::Timeout) => continue,
                res => return res,
            }
        }
    }

    /// Discards everything that is already queued on the line.
    fn flush_input(&mut self) {
        while self.read_u8(Duration::from_millis(10)).is_ok() {}
    }
}
