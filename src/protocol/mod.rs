use std::{fs, io, path::Path};

pub mod zmodem;
pub use zmodem::Zmodem;

pub mod xmodem;
pub use xmodem::Xmodem;

pub mod intel_hex;
pub use intel_hex::{IntelHex, MemoryAccess, SliceMemory};

pub mod simple_upload;
pub use simple_upload::{BootOutcome, Bootloader, SimpleUpload, Uploader};

use crate::{com::Com, TransferResult};

/// A file queued for sending, held completely in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    pub file_name: String,
    pub data: Vec<u8>,
}

impl FileDescriptor {
    pub fn new(file_name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            data,
        }
    }

    pub fn create(path: &Path) -> io::Result<Self> {
        let data = fs::read(path)?;
        let file_name = path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
        Ok(Self { file_name, data })
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// What a receiver stored into the caller buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReceivedFile {
    pub file_name: String,
    pub size: usize,
}

/// Per session bookkeeping. Reset at the start of every transfer.
#[derive(Debug, Clone, Default)]
pub struct TransferState {
    pub current_state: &'static str,
    pub file_name: String,
    pub file_size: usize,
    pub bytes_transfered: usize,
    pub errors: usize,
}

impl TransferState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_state(&mut self, state: &'static str) {
        log::debug!("{state}");
        self.current_state = state;
    }
}

pub trait Protocol {
    fn get_name(&self) -> &str;

    fn get_current_state(&self) -> &TransferState;

    fn send_file<C: Com>(&mut self, com: &mut C, file: &FileDescriptor) -> TransferResult<()>;

    /// Receives one file into `buffer`. Nothing beyond `buffer.len()` is ever written.
    fn receive_file<C: Com>(&mut self, com: &mut C, buffer: &mut [u8]) -> TransferResult<ReceivedFile>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolType {
    ZModem,
    XModem1k,
    IntelHex,
    SimpleUpload,
}
