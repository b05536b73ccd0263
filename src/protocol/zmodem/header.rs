use std::{fmt::Display, time::Duration};

use super::{constants::*, frame_types, from_hex, get_hex};
use crate::{
    com::Com,
    crc::crc16_ccitt,
    TransferError, TransferResult,
};

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum FrameType {
    ZRQINIT, // Request receive init
    ZRINIT, // Receive init
    ZSINIT, // Send init sequence (optional)
    ZACK, // ACK to above
    ZFILE, // File name from sender
    ZSKIP, // To sender: skip this file
    ZNAK, // Last packet was garbled
    ZABORT, // Abort batch transfers
    ZFIN, // Finish session
    ZRPOS, // Resume data trans at this position
    ZDATA, // Data packet(s) follow
    ZEOF, // End of file
    ZFERR, // Fatal Read or Write error Detected
    ZCRC, // Request for file CRC and response
    ZCHALLENGE, // Receiver's Challenge
    ZCOMPL, // Request is complete
    ZCAN, // Other end canned session with CAN*5
    ZFREECNT, // Request for free bytes on filesystem
    ZCOMMAND, // Command from sending program
    /// Any other type byte, left to the state machines to refuse.
    Unknown(u8),
}

impl From<u8> for FrameType {
    fn from(ftype: u8) -> Self {
        match ftype {
            frame_types::ZRQINIT => FrameType::ZRQINIT,
            frame_types::ZRINIT => FrameType::ZRINIT,
            frame_types::ZSINIT => FrameType::ZSINIT,
            frame_types::ZACK => FrameType::ZACK,
            frame_types::ZFILE => FrameType::ZFILE,
            frame_types::ZSKIP => FrameType::ZSKIP,
            frame_types::ZNAK => FrameType::ZNAK,
            frame_types::ZABORT => FrameType::ZABORT,
            frame_types::ZFIN => FrameType::ZFIN,
            frame_types::ZRPOS => FrameType::ZRPOS,
            frame_types::ZDATA => FrameType::ZDATA,
            frame_types::ZEOF => FrameType::ZEOF,
            frame_types::ZFERR => FrameType::ZFERR,
            frame_types::ZCRC => FrameType::ZCRC,
            frame_types::ZCHALLENGE => FrameType::ZCHALLENGE,
            frame_types::ZCOMPL => FrameType::ZCOMPL,
            frame_types::ZCAN => FrameType::ZCAN,
            frame_types::ZFREECNT => FrameType::ZFREECNT,
            frame_types::ZCOMMAND => FrameType::ZCOMMAND,
            _ => FrameType::Unknown(ftype),
        }
    }
}

impl From<FrameType> for u8 {
    fn from(frame_type: FrameType) -> Self {
        match frame_type {
            FrameType::ZRQINIT => frame_types::ZRQINIT,
            FrameType::ZRINIT => frame_types::ZRINIT,
            FrameType::ZSINIT => frame_types::ZSINIT,
            FrameType::ZACK => frame_types::ZACK,
            FrameType::ZFILE => frame_types::ZFILE,
            FrameType::ZSKIP => frame_types::ZSKIP,
            FrameType::ZNAK => frame_types::ZNAK,
            FrameType::ZABORT => frame_types::ZABORT,
            FrameType::ZFIN => frame_types::ZFIN,
            FrameType::ZRPOS => frame_types::ZRPOS,
            FrameType::ZDATA => frame_types::ZDATA,
            FrameType::ZEOF => frame_types::ZEOF,
            FrameType::ZFERR => frame_types::ZFERR,
            FrameType::ZCRC => frame_types::ZCRC,
            FrameType::ZCHALLENGE => frame_types::ZCHALLENGE,
            FrameType::ZCOMPL => frame_types::ZCOMPL,
            FrameType::ZCAN => frame_types::ZCAN,
            FrameType::ZFREECNT => frame_types::ZFREECNT,
            FrameType::ZCOMMAND => frame_types::ZCOMMAND,
            FrameType::Unknown(ftype) => ftype,
        }
    }
}

/// A hex header: frame type plus four argument bytes, little endian when
/// read as a number.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct Header {
    pub frame_type: FrameType,
    pub data: [u8; 4],
}

impl Display for Header {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.frame_type {
            FrameType::ZRPOS | FrameType::ZEOF | FrameType::ZDATA => {
                write!(f, "[{:?} number = {}]", self.frame_type, self.number())
            }
            _ => write!(f, "[{:?} flags = x{:02X}, x{:02X}, x{:02X}, x{:02X}]", self.frame_type, self.f3(), self.f2(), self.f1(), self.f0()),
        }
    }
}

impl Header {
    pub fn empty(frame_type: FrameType) -> Self {
        Self { frame_type, data: [0, 0, 0, 0] }
    }

    pub fn from_flags(frame_type: FrameType, f3: u8, f2: u8, f1: u8, f0: u8) -> Self {
        Self {
            frame_type,
            data: [f3, f2, f1, f0],
        }
    }

    pub fn from_number(frame_type: FrameType, number: u32) -> Self {
        Self {
            frame_type,
            data: u32::to_le_bytes(number),
        }
    }

    pub fn f0(&self) -> u8 {
        self.data[3]
    }

    pub fn f1(&self) -> u8 {
        self.data[2]
    }

    pub fn f2(&self) -> u8 {
        self.data[1]
    }

    pub fn f3(&self) -> u8 {
        self.data[0]
    }

    pub fn number(&self) -> u32 {
        u32::from_le_bytes(self.data)
    }

    pub fn build(&self) -> Vec<u8> {
        let mut res = Vec::with_capacity(21);
        res.extend_from_slice(&[ZPAD, ZPAD, ZDLE, ZHEX]);
        let ft = u8::from(self.frame_type);
        res.push(get_hex(ft >> 4));
        res.push(get_hex(ft & 0xF));
        for f in self.data {
            res.push(get_hex(f >> 4));
            res.push(get_hex(f & 0xF));
        }

        let crc16 = crc16_ccitt(&[ft, self.data[0], self.data[1], self.data[2], self.data[3]]);
        for b in crc16.to_be_bytes() {
            res.push(get_hex(b >> 4));
            res.push(get_hex(b & 0xF));
        }
        res.extend_from_slice(b"\r\n");
        if self.frame_type != FrameType::ZACK && self.frame_type != FrameType::ZFIN {
            res.push(XON);
        }
        res
    }

    pub fn write<C: Com>(&self, com: &mut C) -> TransferResult<()> {
        log::debug!("send header {self}");
        com.send(&self.build())?;
        Ok(())
    }

    /// Hunts for `ZPAD ZPAD ZDLE ZHEX` and decodes the header behind it.
    ///
    /// Line noise before the first ZPAD is skipped for up to `init_timeout`;
    /// a run of CAN bytes while hunting is the remote cancel sequence.
    pub fn read<C: Com>(com: &mut C, init_timeout: Duration, char_timeout: Duration) -> TransferResult<Header> {
        let start = com.now_ms();
        let limit = init_timeout.as_millis() as u32;
        let mut can_count = 0;
        loop {
            let c = com.read_u8(init_timeout)?;
            if c == ZPAD {
                break;
            }
            if c == CAN {
                can_count += 1;
                if can_count >= CANCEL_RUN {
                    return Err(TransferError::Cancel);
                }
            } else {
                can_count = 0;
            }
            if com.now_ms().wrapping_sub(start) > limit {
                return Err(TransferError::Timeout);
            }
        }

        let next = com.read_u8(char_timeout)?;
        if next != ZPAD {
            return Err(TransferError::protocol(format!("second ZPAD expected got 0x{next:02X}")));
        }
        let next = com.read_u8(char_timeout)?;
        if next != ZDLE {
            return Err(TransferError::protocol(format!("ZDLE expected got 0x{next:02X}")));
        }
        let format = com.read_u8(char_timeout)?;
        if format != ZHEX {
            return Err(TransferError::protocol(format!("unsupported header format 0x{format:02X}")));
        }
        Header::read_body(com, char_timeout)
    }

    /// Decodes what follows `ZHEX`: type, argument, crc and line end.
    pub fn read_body<C: Com>(com: &mut C, char_timeout: Duration) -> TransferResult<Header> {
        let mut data = [0u8; 5];
        for b in data.iter_mut() {
            *b = read_hex_byte(com, char_timeout)?;
        }
        let check_crc16 = u16::from_be_bytes([read_hex_byte(com, char_timeout)?, read_hex_byte(com, char_timeout)?]);
        let crc16 = crc16_ccitt(&data);
        if crc16 != check_crc16 {
            return Err(TransferError::CrcError {
                got: check_crc16 as u32,
                expected: crc16 as u32,
            });
        }

        let eol = com.read_u8(char_timeout)?;
        if eol == b'\r' {
            com.read_u8(char_timeout)?;
        }
        if data[0] != frame_types::ZACK && data[0] != frame_types::ZFIN {
            match com.read_u8(char_timeout) {
                Ok(XON) => {}
                Ok(b) => log::warn!("XON expected got 0x{b:02X}"),
                Err(TransferError::Timeout) => log::warn!("XON expected got nothing"),
                Err(err) => return Err(err),
            }
        }

        let header = Header {
            frame_type: FrameType::from(data[0]),
            data: [data[1], data[2], data[3], data[4]],
        };
        log::debug!("recv header {header}");
        Ok(header)
    }
}

fn read_hex_byte<C: Com>(com: &mut C, timeout: Duration) -> TransferResult<u8> {
    let hi = from_hex(com.read_u8(timeout)?)?;
    let lo = from_hex(com.read_u8(timeout)?)?;
    Ok(hi << 4 | lo)
}
