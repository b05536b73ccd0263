use std::time::Duration;

use super::constants::*;
use crate::{com::Com, TransferError, TransferResult};

/// One de-escaped symbol of a ZMODEM byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZdleByte {
    Data(u8),
    /// ZDLE followed by one of ZCRCE/ZCRCG/ZCRCQ/ZCRCW.
    FrameEnd(u8),
}

pub fn needs_escape(b: u8) -> bool {
    matches!(b, ZDLE | ZCRCE | ZCRCG | ZCRCQ | ZCRCW | XON | XOFF | XON_0X80 | XOFF_0X80) || b < 0x20
}

pub fn append_zdle_encoded(v: &mut Vec<u8>, data: &[u8]) {
    for b in data {
        if needs_escape(*b) {
            v.extend_from_slice(&[ZDLE, *b ^ 0x40]);
        } else {
            v.push(*b);
        }
    }
}

pub fn send_escaped<C: Com>(com: &mut C, b: u8) -> TransferResult<()> {
    if needs_escape(b) {
        log::trace!("escape 0x{b:02X}");
        com.send(&[ZDLE, b ^ 0x40])?;
    } else {
        com.put_u8(b)?;
    }
    Ok(())
}

/// Reads one symbol, undoing the ZDLE escape.
///
/// ZDLE is CAN on the wire, a run of [`CANCEL_RUN`] of them is the remote
/// abort sequence and yields `TransferError::Cancel`.
pub fn read_zdle_byte<C: Com>(com: &mut C, timeout: Duration) -> TransferResult<ZdleByte> {
    let c = com.read_u8(timeout)?;
    if c != ZDLE {
        return Ok(ZdleByte::Data(c));
    }

    let mut cans = 1;
    let c = loop {
        let c = com.read_u8(timeout)?;
        if c != CAN {
            break c;
        }
        cans += 1;
        if cans >= CANCEL_RUN {
            log::debug!("received {cans} CAN, session canceled");
            return Err(TransferError::Cancel);
        }
    };

    Ok(match c {
        ZCRCE | ZCRCG | ZCRCQ | ZCRCW => ZdleByte::FrameEnd(c),
        ZRUB0 => ZdleByte::Data(0x7F),
        ZRUB1 => ZdleByte::Data(0xFF),
        c => ZdleByte::Data(c ^ 0x40),
    })
}

/// Like [`read_zdle_byte`] but a frame end marker is a protocol error.
pub fn read_zdle_data<C: Com>(com: &mut C, timeout: Duration) -> TransferResult<u8> {
    match read_zdle_byte(com, timeout)? {
        ZdleByte::Data(b) => Ok(b),
        ZdleByte::FrameEnd(fe) => Err(TransferError::protocol(format!("unexpected frame end 0x{fe:02X}"))),
    }
}
