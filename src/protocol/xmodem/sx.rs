use super::{constants::*, Xmodem};
use crate::{com::Com, crc::crc16_ccitt, TransferError, TransferResult};

impl Xmodem {
    pub(super) fn sx<C: Com>(&mut self, com: &mut C, data: &[u8]) -> TransferResult<()> {
        self.state.set_state("await 'C'");
        self.wait_for_crc_request(com)?;

        self.state.set_state("send blocks");
        let mut packet = [0u8; EXT_BLOCK_LENGTH + 5];
        let mut block_num: u8 = 1;
        for chunk in data.chunks(EXT_BLOCK_LENGTH) {
            build_block(&mut packet, block_num, chunk);
            let mut retries = 0;
            loop {
                com.send(&packet)?;
                match self.read_response(com)? {
                    Some(ACK) => break,
                    Some(CAN) => return Err(TransferError::Cancel),
                    response => {
                        self.state.errors += 1;
                        retries += 1;
                        log::debug!("block {block_num} not acknowledged ({response:?}), retry {retries}");
                        if retries > self.max_retries {
                            return Err(if response.is_none() { TransferError::Timeout } else { TransferError::TooManyErrors });
                        }
                    }
                }
            }
            self.state.bytes_transfered += chunk.len();
            block_num = block_num.wrapping_add(1);
        }

        self.state.set_state("send EOT");
        for _ in 0..self.max_retries {
            com.put_u8(EOT)?;
            if self.read_response(com)? == Some(ACK) {
                self.state.set_state("done");
                return Ok(());
            }
        }
        Err(TransferError::Timeout)
    }

    fn wait_for_crc_request<C: Com>(&self, com: &mut C) -> TransferResult<()> {
        let start = com.now_ms();
        let limit = self.timeouts.start.as_millis() as u32;
        loop {
            match com.read_u8(std::time::Duration::from_secs(1)) {
                Ok(CRC_MODE) => return Ok(()),
                Ok(CAN) => return Err(TransferError::Cancel),
                Ok(_) | Err(TransferError::Timeout) => {}
                Err(err) => return Err(err),
            }
            if com.now_ms().wrapping_sub(start) >= limit {
                return Err(TransferError::Timeout);
            }
        }
    }

    /// Waits for ACK, NAK or CAN. Stray bytes such as a late 'C' are skipped,
    /// `None` means nothing useful arrived in time.
    fn read_response<C: Com>(&self, com: &mut C) -> TransferResult<Option<u8>> {
        let start = com.now_ms();
        let limit = self.timeouts.block.as_millis() as u32;
        loop {
            match com.read_u8(self.timeouts.block) {
                Ok(b @ (ACK | NAK | CAN)) => return Ok(Some(b)),
                Ok(b) => log::trace!("ignored 0x{b:02X}"),
                Err(TransferError::Timeout) => return Ok(None),
                Err(err) => return Err(err),
            }
            if com.now_ms().wrapping_sub(start) >= limit {
                return Ok(None);
            }
        }
    }
}

/// STX, block number, complement, 1024 data bytes padded with CPMEOF, crc.
pub(super) fn build_block(packet: &mut [u8; EXT_BLOCK_LENGTH + 5], block_num: u8, chunk: &[u8]) {
    packet[0] = STX;
    packet[1] = block_num;
    packet[2] = !block_num;
    packet[3..3 + chunk.len()].copy_from_slice(chunk);
    packet[3 + chunk.len()..3 + EXT_BLOCK_LENGTH].fill(CPMEOF);
    let crc = crc16_ccitt(&packet[3..3 + EXT_BLOCK_LENGTH]);
    packet[3 + EXT_BLOCK_LENGTH..].copy_from_slice(&crc.to_be_bytes());
}
