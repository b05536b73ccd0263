//! Intel HEX records over the byte link.
//!
//! Only data (00), end of file (01) and extended linear address (04)
//! records are understood. Memory is reached through [`MemoryAccess`].

use std::time::Duration;

use super::TransferState;
use crate::{com::Com, TransferError, TransferResult};

pub const RECORD_DATA: u8 = 0x00;
pub const RECORD_EOF: u8 = 0x01;
pub const RECORD_EXT_LINEAR_ADDR: u8 = 0x04;

pub const BYTES_PER_LINE: usize = 16;
/// Longest accepted line, the start code included.
pub const MAX_LINE_LEN: usize = 127;
pub const CTRL_C: u8 = 0x03;

pub const EOF_RECORD: &[u8] = b":00000001FF\r\n";

pub trait MemoryAccess {
    fn write(&mut self, addr: u32, data: &[u8]) -> TransferResult<()>;
    fn read(&mut self, addr: u32, data: &mut [u8]) -> TransferResult<()>;
}

/// A byte slice mapped at `base`.
pub struct SliceMemory<'a> {
    base: u32,
    mem: &'a mut [u8],
    high_water: usize,
}

impl<'a> SliceMemory<'a> {
    pub fn new(base: u32, mem: &'a mut [u8]) -> Self {
        Self { base, mem, high_water: 0 }
    }

    /// Offset one past the highest byte written so far.
    pub fn high_water(&self) -> usize {
        self.high_water
    }

    fn range(&self, addr: u32, len: usize) -> TransferResult<std::ops::Range<usize>> {
        let start = addr.checked_sub(self.base).ok_or(TransferError::BufferOverflow(self.mem.len()))? as usize;
        if start + len > self.mem.len() {
            return Err(TransferError::BufferOverflow(self.mem.len()));
        }
        Ok(start..start + len)
    }
}

impl<'a> MemoryAccess for SliceMemory<'a> {
    fn write(&mut self, addr: u32, data: &[u8]) -> TransferResult<()> {
        let range = self.range(addr, data.len())?;
        self.high_water = self.high_water.max(range.end);
        self.mem[range].copy_from_slice(data);
        Ok(())
    }

    fn read(&mut self, addr: u32, data: &mut [u8]) -> TransferResult<()> {
        let range = self.range(addr, data.len())?;
        data.copy_from_slice(&self.mem[range]);
        Ok(())
    }
}

pub struct IntelHex {
    /// `None` waits forever for the next character.
    pub timeout: Option<Duration>,
    state: TransferState,
}

impl IntelHex {
    pub fn new() -> Self {
        Self {
            timeout: None,
            state: TransferState::new(),
        }
    }

    pub fn get_current_state(&self) -> &TransferState {
        &self.state
    }

    fn getc<C: Com>(&self, com: &mut C) -> TransferResult<u8> {
        match self.timeout {
            Some(timeout) => com.read_u8(timeout),
            None => com.read_u8_blocking(),
        }
    }

    /// Reads records until the end of file record, returns the number of
    /// data bytes written.
    pub fn receive<C: Com, M: MemoryAccess>(&mut self, com: &mut C, mem: &mut M) -> TransferResult<usize> {
        self.state = TransferState::new();
        self.state.set_state("receive records");
        let mut line = [0u8; MAX_LINE_LEN];
        let mut data = [0u8; 255];
        let mut base_addr = 0u32;

        loop {
            loop {
                match self.getc(com)? {
                    b':' => break,
                    CTRL_C => return Err(TransferError::Cancel),
                    _ => {}
                }
            }
            line[0] = b':';
            let mut line_len = 1;
            while line_len < MAX_LINE_LEN {
                let c = self.getc(com)?;
                if c == b'\r' || c == b'\n' {
                    break;
                }
                line[line_len] = c;
                line_len += 1;
            }
            let line = &line[..line_len];

            if line_len < 11 {
                return Err(TransferError::InvalidLength(line_len));
            }
            let byte_count = hex_byte(&line[1..3])?;
            let addr = u16::from_be_bytes([hex_byte(&line[3..5])?, hex_byte(&line[5..7])?]);
            let record_type = hex_byte(&line[7..9])?;
            if line_len != 11 + 2 * byte_count as usize {
                return Err(TransferError::InvalidLength(line_len));
            }
            let data = &mut data[..byte_count as usize];
            for (i, b) in data.iter_mut().enumerate() {
                *b = hex_byte(&line[9 + 2 * i..11 + 2 * i])?;
            }
            let check = hex_byte(&line[line_len - 2..])?;
            let sum = checksum(byte_count, addr, record_type, data);
            if sum != check {
                return Err(TransferError::CrcError {
                    got: check as u32,
                    expected: sum as u32,
                });
            }

            match record_type {
                RECORD_DATA => {
                    if !data.is_empty() {
                        mem.write(base_addr | addr as u32, data)?;
                        self.state.bytes_transfered += data.len();
                    }
                }
                RECORD_EOF => {
                    self.state.set_state("done");
                    return Ok(self.state.bytes_transfered);
                }
                RECORD_EXT_LINEAR_ADDR => {
                    if data.len() != 2 {
                        return Err(TransferError::InvalidLength(line_len));
                    }
                    base_addr = (data[0] as u32) << 24 | (data[1] as u32) << 16;
                    log::debug!("base address 0x{base_addr:08X}");
                }
                _ => return Err(TransferError::Unsupported(record_type)),
            }
        }
    }

    /// Dumps `length` bytes starting at `start_addr` followed by the end of file record.
    pub fn send<C: Com, M: MemoryAccess>(&mut self, com: &mut C, mem: &mut M, start_addr: u32, length: usize) -> TransferResult<()> {
        self.state = TransferState::new();
        self.state.file_size = length;
        self.state.set_state("send records");

        let mut data = [0u8; BYTES_PER_LINE];
        let mut line = Vec::with_capacity(11 + 2 * BYTES_PER_LINE + 2);
        let mut addr = start_addr;
        let mut remaining = length;
        let mut current_base = None;

        while remaining > 0 {
            let base = addr & 0xFFFF_0000;
            if current_base != Some(base) {
                current_base = Some(base);
                encode_record(&mut line, RECORD_EXT_LINEAR_ADDR, 0, &[(base >> 24) as u8, (base >> 16) as u8]);
                com.send(&line)?;
            }
            // a record never crosses a 64k boundary
            let to_boundary = 0x1_0000 - (addr & 0xFFFF) as usize;
            let n = remaining.min(BYTES_PER_LINE).min(to_boundary);
            mem.read(addr, &mut data[..n])?;
            encode_record(&mut line, RECORD_DATA, addr as u16, &data[..n]);
            com.send(&line)?;

            addr = addr.wrapping_add(n as u32);
            remaining -= n;
            self.state.bytes_transfered += n;
        }
        com.send(EOF_RECORD)?;
        self.state.set_state("done");
        Ok(())
    }
}

impl Default for IntelHex {
    fn default() -> Self {
        Self::new()
    }
}

/// Two's complement of the byte sum over count, address, type and data.
pub fn checksum(byte_count: u8, addr: u16, record_type: u8, data: &[u8]) -> u8 {
    let sum = data
        .iter()
        .fold(byte_count.wrapping_add((addr >> 8) as u8).wrapping_add(addr as u8).wrapping_add(record_type), |sum, b| sum.wrapping_add(*b));
    sum.wrapping_neg()
}

/// Replaces `line` with one `:CCAAAATT<data>SS\r\n` record in upper case hex.
pub fn encode_record(line: &mut Vec<u8>, record_type: u8, addr: u16, data: &[u8]) {
    line.clear();
    line.push(b':');
    push_hex(line, data.len() as u8);
    push_hex(line, (addr >> 8) as u8);
    push_hex(line, addr as u8);
    push_hex(line, record_type);
    for b in data {
        push_hex(line, *b);
    }
    push_hex(line, checksum(data.len() as u8, addr, record_type, data));
    line.extend_from_slice(b"\r\n");
}

fn push_hex(line: &mut Vec<u8>, b: u8) {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    line.push(HEX[(b >> 4) as usize]);
    line.push(HEX[(b & 0xF) as usize]);
}

fn hex_nibble(c: u8) -> TransferResult<u8> {
    match c {
        b'0'..=b'9' => Ok(c - b'0'),
        b'A'..=b'F' => Ok(c - b'A' + 10),
        b'a'..=b'f' => Ok(c - b'a' + 10),
        _ => Err(TransferError::InvalidHex(c)),
    }
}

fn hex_byte(pair: &[u8]) -> TransferResult<u8> {
    Ok(hex_nibble(pair[0])? << 4 | hex_nibble(pair[1])?)
}
