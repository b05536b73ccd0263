use super::{constants::*, FrameType, Header, Zmodem};
use crate::{com::Com, protocol::FileDescriptor, TransferError, TransferResult};

impl Zmodem {
    pub(super) fn sz<C: Com>(&mut self, com: &mut C, file: &FileDescriptor) -> TransferResult<()> {
        let size = file.size();

        self.state.set_state("send ZRQINIT");
        Zmodem::send_autostart(com)?;

        self.state.set_state("await ZRINIT");
        let rinit = self.expect_header(com, FrameType::ZRINIT)?;
        self.receiver_flags = rinit.number() as u8;

        self.state.set_state("send ZFILE");
        Header::empty(FrameType::ZFILE).write(com)?;
        let info = file_info(&file.file_name, size);
        self.send_subpacket(com, ZCRCW, &info)?;

        let header = self.read_header(com)?;
        let mut file_pos = match header.frame_type {
            FrameType::ZSKIP => {
                log::info!("receiver skipped {}", file.file_name);
                return Ok(());
            }
            FrameType::ZRPOS => header.number() as usize,
            _ => return Err(TransferError::protocol(format!("ZRPOS expected got {header}"))),
        };
        if file_pos > size {
            return Err(TransferError::protocol(format!("resume offset {file_pos} beyond file size {size}")));
        }

        self.state.set_state("send data");
        Header::from_number(FrameType::ZDATA, file_pos as u32).write(com)?;
        if file_pos == size {
            // receiver still expects one subpacket that closes the frame
            self.send_subpacket(com, ZCRCE, &[])?;
        }
        while file_pos < size {
            let end = (file_pos + ZMAXSPLEN).min(size);
            let frame_end = if end >= size { ZCRCE } else { ZCRCG };
            self.send_subpacket(com, frame_end, &file.data[file_pos..end])?;
            file_pos = end;
            self.state.bytes_transfered = file_pos;
        }

        self.state.set_state("send ZEOF");
        Header::from_number(FrameType::ZEOF, size as u32).write(com)?;
        self.expect_header(com, FrameType::ZRINIT)?;

        self.state.set_state("send ZFIN");
        Header::empty(FrameType::ZFIN).write(com)?;
        self.expect_header(com, FrameType::ZFIN)?;
        com.send(OVER_AND_OUT)?;
        self.state.set_state("done");
        Ok(())
    }
}

/// `name\0size\0` as carried by the ZFILE subpacket.
fn file_info(file_name: &str, size: usize) -> Vec<u8> {
    let mut name = file_name.as_bytes();
    if name.len() > ZMAXFILENAME - 20 {
        name = &name[..ZMAXFILENAME - 20];
    }
    let mut info = Vec::with_capacity(name.len() + 12);
    info.extend_from_slice(name);
    info.push(0);
    info.extend_from_slice(size.to_string().as_bytes());
    info.push(0);
    info
}

#[cfg(test)]
mod tests {
    use super::file_info;

    #[test]
    fn test_file_info() {
        assert_eq!(b"test.bin\0100000\0".to_vec(), file_info("test.bin", 100_000));
        assert_eq!(b"\00\0".to_vec(), file_info("", 0));
        assert_eq!(236 + 1 + 1 + 1, file_info(&"x".repeat(400), 1).len());
    }
}
