use super::{constants::*, Xmodem};
use crate::{com::Com, crc::crc16_ccitt, protocol::ReceivedFile, TransferError, TransferResult};

/// Why a block was refused. Decides the error once retries run out.
#[derive(Debug)]
enum BlockFault {
    Timeout,
    /// block number and its complement disagree
    Sync,
    /// neither the expected nor the previous block
    Sequence,
    Crc { got: u16, expected: u16 },
    /// not a block start marker
    Garbage,
    Link(TransferError),
}

impl From<BlockFault> for TransferError {
    fn from(fault: BlockFault) -> Self {
        match fault {
            BlockFault::Timeout => TransferError::Timeout,
            BlockFault::Sync | BlockFault::Sequence => TransferError::SyncError,
            BlockFault::Crc { got, expected } => TransferError::CrcError {
                got: got as u32,
                expected: expected as u32,
            },
            BlockFault::Garbage => TransferError::TooManyErrors,
            BlockFault::Link(err) => err,
        }
    }
}

enum Block {
    Next,
    Duplicate,
}

impl Xmodem {
    pub(super) fn rx<C: Com>(&mut self, com: &mut C, buffer: &mut [u8]) -> TransferResult<ReceivedFile> {
        self.state.set_state("request CRC mode");
        let attempt_timeout = self.timeouts.init / START_ATTEMPTS;
        let mut first = None;
        for _ in 0..START_ATTEMPTS {
            com.flush_input();
            com.put_u8(CRC_MODE)?;
            match com.read_u8(attempt_timeout) {
                Ok(b @ (SOH | STX)) => {
                    first = Some(b);
                    break;
                }
                Ok(EOT) => {
                    com.put_u8(ACK)?;
                    self.state.set_state("empty file");
                    return Ok(ReceivedFile::default());
                }
                Ok(CAN) => return Err(TransferError::Cancel),
                Ok(_) | Err(TransferError::Timeout) => {}
                Err(err) => return Err(err),
            }
        }
        let Some(mut marker) = first else {
            return Err(TransferError::Timeout);
        };

        self.state.set_state("receive blocks");
        let mut packet = [0u8; EXT_BLOCK_LENGTH + 4];
        let mut expected: u8 = 1;
        let mut offset = 0;
        let mut last_block_len = 0;
        let mut retries = 0;
        loop {
            let res = match marker {
                EOT => {
                    com.put_u8(ACK)?;
                    break;
                }
                CAN => return Err(TransferError::Cancel),
                SOH | STX => {
                    let block_len = if marker == STX { EXT_BLOCK_LENGTH } else { DEFAULT_BLOCK_LENGTH };
                    let packet = &mut packet[..block_len + 4];
                    self.read_block(com, packet, expected).map(|block| (block, block_len))
                }
                b => {
                    log::debug!("block {expected}: no block start, got 0x{b:02X}");
                    Err(BlockFault::Garbage)
                }
            };

            match res {
                Ok((Block::Duplicate, _)) => {
                    log::debug!("duplicate block {}", expected.wrapping_sub(1));
                    com.put_u8(ACK)?;
                }
                Ok((Block::Next, block_len)) => {
                    if offset + block_len > buffer.len() {
                        Xmodem::cancel(com)?;
                        return Err(TransferError::BufferOverflow(buffer.len()));
                    }
                    buffer[offset..offset + block_len].copy_from_slice(&packet[2..2 + block_len]);
                    offset += block_len;
                    last_block_len = block_len;
                    self.state.bytes_transfered = offset;
                    com.put_u8(ACK)?;
                    expected = expected.wrapping_add(1);
                    retries = 0;
                }
                Err(BlockFault::Link(err)) => return Err(err),
                Err(fault) => {
                    log::debug!("block {expected} refused: {fault:?}");
                    if matches!(fault, BlockFault::Sequence) {
                        com.flush_input();
                    }
                    com.put_u8(NAK)?;
                    self.state.errors += 1;
                    retries += 1;
                    if retries > self.max_retries {
                        return Err(fault.into());
                    }
                }
            }
            marker = com.read_u8(self.timeouts.block)?;
        }

        let mut size = offset;
        if self.trim_padding {
            let last_block_start = offset - last_block_len;
            while size > last_block_start && buffer[size - 1] == CPMEOF {
                size -= 1;
            }
        }
        self.state.set_state("done");
        Ok(ReceivedFile {
            file_name: String::new(),
            size,
        })
    }

    /// Reads block number, complement, data and crc behind the marker byte.
    fn read_block<C: Com>(&self, com: &mut C, packet: &mut [u8], expected: u8) -> Result<Block, BlockFault> {
        for b in packet.iter_mut() {
            *b = match com.read_u8(self.timeouts.character) {
                Ok(b) => b,
                Err(TransferError::Timeout) => return Err(BlockFault::Timeout),
                Err(err) => return Err(BlockFault::Link(err)),
            };
        }
        let block_num = packet[0];
        if block_num != !packet[1] {
            return Err(BlockFault::Sync);
        }
        let data_end = packet.len() - 2;
        let got = u16::from_be_bytes([packet[data_end], packet[data_end + 1]]);
        let crc = crc16_ccitt(&packet[2..data_end]);
        if got != crc {
            return Err(BlockFault::Crc { got, expected: crc });
        }
        if block_num == expected.wrapping_sub(1) {
            return Ok(Block::Duplicate);
        }
        if block_num != expected {
            return Err(BlockFault::Sequence);
        }
        Ok(Block::Next)
    }
}
