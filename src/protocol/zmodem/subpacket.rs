use std::time::Duration;

use super::{append_zdle_encoded, constants::*, read_zdle_byte, read_zdle_data, ZdleByte};
use crate::{
    com::Com,
    crc::Crc16,
    TransferError, TransferResult,
};

pub fn subpacket_crc(data: &[u8], frame_end: u8) -> u16 {
    let mut crc = Crc16::new();
    crc.update(data);
    crc.update(&[frame_end]);
    crc.finish()
}

/// Appends `data` as an escaped subpacket terminated by `frame_end`.
/// The crc covers the payload and the frame end byte.
pub fn encode_subpacket(v: &mut Vec<u8>, frame_end: u8, data: &[u8]) {
    let crc = subpacket_crc(data, frame_end);
    append_zdle_encoded(v, data);
    v.extend_from_slice(&[ZDLE, frame_end]);
    append_zdle_encoded(v, &crc.to_be_bytes());
}

/// Reads one subpacket into `buf`, returns the payload length and the frame end.
pub fn read_subpacket<C: Com>(com: &mut C, buf: &mut [u8; ZMAXSPLEN], timeout: Duration) -> TransferResult<(usize, u8)> {
    let mut count = 0;
    let frame_end = loop {
        match read_zdle_byte(com, timeout)? {
            ZdleByte::FrameEnd(fe) => break fe,
            ZdleByte::Data(b) => {
                if count >= ZMAXSPLEN {
                    return Err(TransferError::protocol(format!("frame end expected after {ZMAXSPLEN} bytes got 0x{b:02X}")));
                }
                buf[count] = b;
                count += 1;
            }
        }
    };

    let check_crc = u16::from_be_bytes([read_zdle_data(com, timeout)?, read_zdle_data(com, timeout)?]);
    let crc = subpacket_crc(&buf[..count], frame_end);
    if crc != check_crc {
        log::debug!("subpacket crc mismatch got {check_crc:04X} expected {crc:04X}");
        return Err(TransferError::CrcError {
            got: check_crc as u32,
            expected: crc as u32,
        });
    }
    Ok((count, frame_end))
}
