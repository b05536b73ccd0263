use super::{constants::*, read_subpacket, FrameType, Header, Zmodem};
use crate::{com::Com, protocol::ReceivedFile, TransferError, TransferResult};

impl Zmodem {
    /// Receiver entry for a session whose `ZPAD ZPAD ZDLE ZHEX` lead-in was
    /// already swallowed by the auto start detector.
    pub fn receive_autostarted<C: Com>(&mut self, com: &mut C, buffer: &mut [u8]) -> TransferResult<ReceivedFile> {
        self.state = Default::default();
        let res = Header::read_body(com, self.timeouts.character).and_then(|header| self.rz(com, buffer, Some(header)));
        if let Err(err) = &res {
            self.state.errors += 1;
            log::error!("zmodem receive failed: {err}");
        }
        res
    }

    pub(super) fn rz<C: Com>(&mut self, com: &mut C, buffer: &mut [u8], first_header: Option<Header>) -> TransferResult<ReceivedFile> {
        self.state.set_state("await ZRQINIT");
        let rqinit = match first_header {
            Some(header) => header,
            None => self.read_header(com)?,
        };
        if rqinit.frame_type != FrameType::ZRQINIT {
            return Err(TransferError::protocol(format!("ZRQINIT expected got {rqinit}")));
        }
        Header::from_number(FrameType::ZRINIT, self.flags as u32).write(com)?;

        self.state.set_state("await ZFILE");
        self.expect_header(com, FrameType::ZFILE)?;
        let mut block = [0u8; ZMAXSPLEN];
        let (len, _) = read_subpacket(com, &mut block, self.timeouts.data)?;
        let (file_name, declared_size) = parse_file_info(&block[..len]);
        if let Some(size) = declared_size {
            if size > buffer.len() {
                Zmodem::cancel(com)?;
                return Err(TransferError::SizeError { size, max: buffer.len() });
            }
            self.state.file_size = size;
        }
        log::info!("receiving '{file_name}' {} bytes", self.state.file_size);
        self.state.file_name = file_name;

        Header::from_number(FrameType::ZRPOS, 0).write(com)?;
        self.state.set_state("await ZDATA");
        self.expect_header(com, FrameType::ZDATA)?;

        self.state.set_state("receive data");
        let mut file_pos = 0;
        loop {
            let (len, frame_end) = read_subpacket(com, &mut block, self.timeouts.data)?;
            if file_pos + len > buffer.len() {
                return Err(TransferError::BufferOverflow(buffer.len()));
            }
            buffer[file_pos..file_pos + len].copy_from_slice(&block[..len]);
            file_pos += len;
            self.state.bytes_transfered = file_pos;

            match frame_end {
                ZCRCG => continue,
                ZCRCE | ZCRCW => {
                    let header = self.read_header(com)?;
                    match header.frame_type {
                        FrameType::ZEOF => break,
                        FrameType::ZDATA => continue,
                        _ => return Err(TransferError::protocol(format!("ZEOF or ZDATA expected got {header}"))),
                    }
                }
                _ => return Err(TransferError::protocol(format!("unexpected frame end 0x{frame_end:02X}"))),
            }
        }

        Header::from_number(FrameType::ZRINIT, self.flags as u32).write(com)?;
        self.state.set_state("await ZFIN");
        self.expect_header(com, FrameType::ZFIN)?;
        Header::empty(FrameType::ZFIN).write(com)?;

        let o1 = com.read_u8(self.timeouts.character)?;
        let o2 = com.read_u8(self.timeouts.character)?;
        if [o1, o2] != *OVER_AND_OUT {
            return Err(TransferError::protocol(format!("OO expected got 0x{o1:02X} 0x{o2:02X}")));
        }
        self.state.set_state("done");

        Ok(ReceivedFile {
            file_name: self.state.file_name.clone(),
            size: file_pos,
        })
    }
}

/// Splits `name\0size\0...`, the size is optional.
fn parse_file_info(info: &[u8]) -> (String, Option<usize>) {
    let mut parts = info.split(|b| *b == 0);
    let name = parts.next().map(|n| String::from_utf8_lossy(n).to_string()).unwrap_or_default();
    let size = parts.next().and_then(|s| {
        let digits: Vec<u8> = s.iter().copied().take_while(u8::is_ascii_digit).collect();
        std::str::from_utf8(&digits).ok()?.parse::<usize>().ok()
    });
    (name, size)
}
