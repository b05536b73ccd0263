use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("timed out waiting for data")]
    Timeout,

    #[error("transfer canceled by remote")]
    Cancel,

    #[error("crc mismatch got 0x{got:08X} expected 0x{expected:08X}")]
    CrcError { got: u32, expected: u32 },

    #[error("protocol error: {0}")]
    ProtocolError(String),

    #[error("declared size {size} is invalid, buffer holds {max} bytes")]
    SizeError { size: usize, max: usize },

    #[error("received data exceeds buffer of {0} bytes")]
    BufferOverflow(usize),

    #[error("too many errors")]
    TooManyErrors,

    #[error("lost block synchronization")]
    SyncError,

    #[error("invalid record length {0}")]
    InvalidLength(usize),

    #[error("hex number expected got 0x{0:02X}")]
    InvalidHex(u8),

    #[error("unsupported record type {0:02X}")]
    Unsupported(u8),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TransferError {
    pub fn protocol(msg: impl Into<String>) -> Self {
        TransferError::ProtocolError(msg.into())
    }
}
