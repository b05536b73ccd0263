//! Serial file transfer engines for a single UART byte stream.
//!
//! Every protocol is written against the [`com::Com`] byte link and drives it
//! to completion: ZMODEM (hex headers, CRC-16 subpackets), XMODEM-1K,
//! Intel-HEX and the Simple-Upload bootloader protocol.

pub mod auto_file_transfer;
pub mod clock;
pub mod com;
pub mod crc;
pub mod data;
pub mod error;
pub mod protocol;
pub mod util;

pub use error::TransferError;

pub type TransferResult<T> = Result<T, TransferError>;
