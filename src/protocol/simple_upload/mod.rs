// Simple upload, the bootloader's whole image transfer.
//
//   host                         device
//   'R'                    ->
//                          <-    'A'
//   size u32 le            ->
//                          <-    'B'
//   64 byte chunk          ->
//                          <-    'C', 'D' .. 'Z', 'A' ..
//   'C' crc32 u32 le       ->
//                          <-    next ack letter, crc32 u32 le
//
// The crc covers the payload only. A mismatch is fatal, there are no retries.

use std::time::Duration;

mod bootloader;
pub use bootloader::*;

mod uploader;
pub use uploader::*;


use super::{FileDescriptor, Protocol, ReceivedFile, TransferState};
use crate::{com::Com, crc::Crc32, TransferError, TransferResult};

pub const CHUNK_SIZE: usize = 64;
pub const CMD_READY: u8 = b'R';
pub const CMD_CRC: u8 = b'C';
pub const CTRL_C: u8 = 0x03;
pub const ACK_READY: u8 = b'A';
pub const ACK_SIZE: u8 = b'B';
pub const ACK_FIRST_CHUNK: u8 = b'C';

/// 'A'..'Z' and around again.
pub fn next_ack(ack: u8) -> u8 {
    if ack >= b'Z' {
        b'A'
    } else {
        ack + 1
    }
}

pub struct SimpleUpload {
    /// Largest image the receiver accepts, bounded by the buffer as well.
    pub max_size: usize,
    /// `None` blocks forever like the device does.
    pub timeout: Option<Duration>,
    crc: u32,
    state: TransferState,
}

impl SimpleUpload {
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size,
            timeout: None,
            crc: 0,
            state: TransferState::new(),
        }
    }

    /// CRC-32 this side computed over the last payload.
    pub fn crc(&self) -> u32 {
        self.crc
    }

    fn getc<C: Com>(&self, com: &mut C) -> TransferResult<u8> {
        match self.timeout {
            Some(timeout) => com.read_u8(timeout),
            None => com.read_u8_blocking(),
        }
    }

    fn read_u32<C: Com>(&self, com: &mut C) -> TransferResult<u32> {
        let mut bytes = [0u8; 4];
        for b in &mut bytes {
            *b = self.getc(com)?;
        }
        Ok(u32::from_le_bytes(bytes))
    }

    fn expect_ack<C: Com>(&self, com: &mut C, expected: u8) -> TransferResult<()> {
        let ack = self.getc(com)?;
        if ack == expected {
            return Ok(());
        }
        if ack == CTRL_C {
            return Err(TransferError::Cancel);
        }
        Err(TransferError::protocol(format!(
            "expected ack '{}' got 0x{ack:02X}",
            expected as char
        )))
    }

    fn receive<C: Com>(&mut self, com: &mut C, buffer: &mut [u8]) -> TransferResult<usize> {
        self.state.set_state("await ready");
        loop {
            match self.getc(com)? {
                b'R' | b'r' => break,
                CTRL_C => return Err(TransferError::Cancel),
                _ => {}
            }
        }
        com.put_u8(ACK_READY)?;

        let size = self.read_u32(com)? as usize;
        com.put_u8(ACK_SIZE)?;
        let max = self.max_size.min(buffer.len());
        if size == 0 || size > max {
            return Err(TransferError::SizeError { size, max });
        }
        self.state.file_size = size;

        self.state.set_state("receive chunks");
        let mut crc = Crc32::new();
        let mut ack = ACK_FIRST_CHUNK;
        for chunk in buffer[..size].chunks_mut(CHUNK_SIZE) {
            for b in chunk.iter_mut() {
                *b = self.getc(com)?;
                crc.update_byte(*b);
            }
            com.put_u8(ack)?;
            ack = next_ack(ack);
            self.state.bytes_transfered += chunk.len();
        }
        self.crc = crc.finish();

        self.state.set_state("verify crc");
        let cmd = self.getc(com)?;
        if cmd != CMD_CRC {
            return Err(TransferError::protocol(format!("expected crc command got 0x{cmd:02X}")));
        }
        let expected = self.read_u32(com)?;
        com.put_u8(ack)?;
        com.send(&self.crc.to_le_bytes())?;
        if self.crc != expected {
            return Err(TransferError::CrcError { got: self.crc, expected });
        }
        self.state.set_state("done");
        Ok(size)
    }

    fn send<C: Com>(&mut self, com: &mut C, data: &[u8]) -> TransferResult<()> {
        // the device refuses empty images only after acking the size
        if data.is_empty() || data.len() > self.max_size {
            return Err(TransferError::SizeError {
                size: data.len(),
                max: self.max_size,
            });
        }
        let size = data.len() as u32;
        self.state.set_state("ready handshake");
        com.put_u8(CMD_READY)?;
        self.expect_ack(com, ACK_READY)?;
        com.send(&size.to_le_bytes())?;
        self.expect_ack(com, ACK_SIZE)?;

        self.state.set_state("send chunks");
        let mut crc = Crc32::new();
        let mut ack = ACK_FIRST_CHUNK;
        for (i, chunk) in data.chunks(CHUNK_SIZE).enumerate() {
            com.send(chunk)?;
            crc.update(chunk);
            self.expect_ack(com, ack)?;
            ack = next_ack(ack);
            self.state.bytes_transfered += chunk.len();
            log::debug!("chunk {} acked, {}/{} bytes", i + 1, self.state.bytes_transfered, data.len());
        }
        self.crc = crc.finish();

        self.state.set_state("verify crc");
        let mut trailer = [CMD_CRC, 0, 0, 0, 0];
        trailer[1..].copy_from_slice(&self.crc.to_le_bytes());
        com.send(&trailer)?;
        self.expect_ack(com, ack)?;
        let device_crc = self.read_u32(com)?;
        if device_crc != self.crc {
            return Err(TransferError::CrcError {
                got: device_crc,
                expected: self.crc,
            });
        }
        self.state.set_state("done");
        Ok(())
    }
}

impl Protocol for SimpleUpload {
    fn get_name(&self) -> &str {
        "Simple upload"
    }

    fn get_current_state(&self) -> &TransferState {
        &self.state
    }

    fn send_file<C: Com>(&mut self, com: &mut C, file: &FileDescriptor) -> TransferResult<()> {
        self.state = TransferState::new();
        self.state.file_name = file.file_name.clone();
        self.state.file_size = file.size();
        self.crc = 0;
        let res = self.send(com, &file.data);
        if let Err(err) = &res {
            log::error!("simple upload send failed: {err}");
        }
        res
    }

    /// The wire carries no name, `file_name` stays empty.
    fn receive_file<C: Com>(&mut self, com: &mut C, buffer: &mut [u8]) -> TransferResult<ReceivedFile> {
        self.state = TransferState::new();
        self.crc = 0;
        match self.receive(com, buffer) {
            Ok(size) => Ok(ReceivedFile {
                file_name: String::new(),
                size,
            }),
            Err(err) => {
                log::error!("simple upload receive failed: {err}");
                Err(err)
            }
        }
    }
}
