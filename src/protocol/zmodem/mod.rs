//
// ZModem protocol specification http://cristal.inria.fr/~doligez/zmodem/zmodem.txt
//
// Single file subset: hex headers only, CRC-16 on headers and data.

pub mod constants;
use std::time::Duration;

pub use constants::*;
mod header;
pub use header::*;
mod zdle;
pub use zdle::*;
mod subpacket;
pub use subpacket::*;

mod rz;
mod sz;


use super::{FileDescriptor, Protocol, ReceivedFile, TransferState};
use crate::{com::Com, TransferError, TransferResult};

#[derive(Debug, Clone, Copy)]
pub struct ZmodemTimeouts {
    /// Waiting for the first byte of a header.
    pub init: Duration,
    /// Between bytes of a data subpacket.
    pub data: Duration,
    /// Between bytes inside a header.
    pub character: Duration,
}

impl Default for ZmodemTimeouts {
    fn default() -> Self {
        Self {
            init: Duration::from_secs(30),
            data: Duration::from_secs(5),
            character: Duration::from_secs(1),
        }
    }
}

pub struct Zmodem {
    pub timeouts: ZmodemTimeouts,
    /// Capabilities announced in our ZRINIT.
    pub flags: u8,
    /// Capabilities of the remote receiver, taken from its ZRINIT.
    receiver_flags: u8,
    state: TransferState,
    out: Vec<u8>,
}

impl Zmodem {
    pub fn new() -> Self {
        Self {
            timeouts: ZmodemTimeouts::default(),
            flags: zrinit_flag::CANFDX | zrinit_flag::CANFC32 | zrinit_flag::ESCCTL,
            receiver_flags: 0,
            state: TransferState::new(),
            out: Vec::with_capacity(2 * ZMAXSPLEN + 8),
        }
    }

    pub fn receiver_flags(&self) -> u8 {
        self.receiver_flags
    }

    /// Aborts whatever the other side is doing.
    pub fn cancel<C: Com>(com: &mut C) -> TransferResult<()> {
        com.send(&ABORT_SEQ)?;
        Ok(())
    }

    /// Sends the ZRQINIT that makes terminals start their receiver.
    pub fn send_autostart<C: Com>(com: &mut C) -> TransferResult<()> {
        Header::empty(FrameType::ZRQINIT).write(com)
    }

    fn read_header<C: Com>(&self, com: &mut C) -> TransferResult<Header> {
        Header::read(com, self.timeouts.init, self.timeouts.character)
    }

    fn expect_header<C: Com>(&self, com: &mut C, frame_type: FrameType) -> TransferResult<Header> {
        let header = self.read_header(com)?;
        if header.frame_type != frame_type {
            return Err(TransferError::protocol(format!("{frame_type:?} expected got {header}")));
        }
        Ok(header)
    }

    fn send_subpacket<C: Com>(&mut self, com: &mut C, frame_end: u8, data: &[u8]) -> TransferResult<()> {
        self.out.clear();
        encode_subpacket(&mut self.out, frame_end, data);
        com.send(&self.out)?;
        Ok(())
    }
}

impl Default for Zmodem {
    fn default() -> Self {
        Self::new()
    }
}

impl Protocol for Zmodem {
    fn get_name(&self) -> &str {
        "Zmodem"
    }

    fn get_current_state(&self) -> &TransferState {
        &self.state
    }

    fn send_file<C: Com>(&mut self, com: &mut C, file: &FileDescriptor) -> TransferResult<()> {
        self.state = TransferState::new();
        self.state.file_name = file.file_name.clone();
        self.state.file_size = file.size();
        let res = self.sz(com, file);
        if let Err(err) = &res {
            self.state.errors += 1;
            log::error!("zmodem send failed: {err}");
        }
        res
    }

    fn receive_file<C: Com>(&mut self, com: &mut C, buffer: &mut [u8]) -> TransferResult<ReceivedFile> {
        self.state = TransferState::new();
        let res = self.rz(com, buffer, None);
        if let Err(err) = &res {
            self.state.errors += 1;
            log::error!("zmodem receive failed: {err}");
        }
        res
    }
}

pub fn get_hex(n: u8) -> u8 {
    if n < 10 {
        b'0' + n
    } else {
        b'a' + (n - 10)
    }
}

pub fn from_hex(n: u8) -> TransferResult<u8> {
    match n {
        b'0'..=b'9' => Ok(n - b'0'),
        b'A'..=b'F' => Ok(10 + n - b'A'),
        b'a'..=b'f' => Ok(10 + n - b'a'),
        _ => Err(TransferError::InvalidHex(n)),
    }
}
