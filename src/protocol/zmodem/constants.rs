#![allow(dead_code)]

// Constants follow the ZMODEM.H manifest of Omen Technology (Chuck Forsberg).

pub const ZPAD: u8 = b'*'; // 052 Padding character begins frames
pub const ZDLE: u8 = 0x18; // Ctrl-X Zmodem escape - `ala BISYNC DLE
pub const ZDLEE: u8 = ZDLE ^ 0x40; // Escaped ZDLE as transmitted
pub const ZBIN: u8 = b'A'; // Binary frame indicator (CRC-16)
pub const ZHEX: u8 = b'B'; // HEX frame indicator
pub const ZBIN32: u8 = b'C'; // Binary frame with 32 bit FCS
pub const ZMAXSPLEN: usize = 1024; // Max subpacket length  NEVER CHANGE
pub const ZMAXFILENAME: usize = 256;

pub const CAN: u8 = 0x18;
pub const BS: u8 = 0x08;
pub const XON: u8 = 0x11;
pub const XOFF: u8 = 0x13;
pub const XON_0X80: u8 = XON | 0x80;
pub const XOFF_0X80: u8 = XOFF | 0x80;

/* ZDLE sequences */
/// CRC next, frame ends, header packet follows
pub const ZCRCE: u8 = b'h';
/// CRC next, frame continues nonstop
pub const ZCRCG: u8 = b'i';
/// CRC next, frame continues, ZACK expected
pub const ZCRCQ: u8 = b'j';
/// CRC next, ZACK expected, end of frame
pub const ZCRCW: u8 = b'k';
pub const ZRUB0: u8 = b'l'; /* Translate to rubout 0177 */
pub const ZRUB1: u8 = b'm'; /* Translate to rubout 0377 */

/// Consecutive CAN bytes that abort a session.
pub const CANCEL_RUN: usize = 5;

pub const ABORT_SEQ: [u8; 16] = [
    CAN, CAN, CAN, CAN, CAN, CAN, CAN, CAN, /* 8 CAN */
    BS, BS, BS, BS, BS, BS, BS, BS, /* 8 BS */
];

/// Closes a session after the final ZFIN exchange.
pub const OVER_AND_OUT: &[u8; 2] = b"OO";

pub mod zrinit_flag {
    // Bit Masks for ZRINIT flags byte ZF0
    pub const CANFDX: u8 = 0x01; // Rx can send and receive true full duplex
    pub const CANOVIO: u8 = 0x02; // Rx can receive data during disk I/O
    pub const CANBRK: u8 = 0x04; // Rx can send a break signal
    pub const CANCRY: u8 = 0x08; // Receiver can decode RLE
    pub const CANLZW: u8 = 0x10; // Receiver can uncompress
    pub const CANFC32: u8 = 0x20; // Receiver can use 32 bit Frame Check
    pub const ESCCTL: u8 = 0x40; // Receiver expects ctl chars to be escaped
    pub const ESC8: u8 = 0x80; // Receiver expects 8th bit to be escaped
}

pub mod frame_types {
    pub const ZRQINIT: u8 = 0; // Request receive init
    pub const ZRINIT: u8 = 1; // Receive init
    pub const ZSINIT: u8 = 2; // Send init sequence (optional)
    pub const ZACK: u8 = 3; // ACK to above
    pub const ZFILE: u8 = 4; // File name from sender
    pub const ZSKIP: u8 = 5; // To sender: skip this file
    pub const ZNAK: u8 = 6; // Last packet was garbled
    pub const ZABORT: u8 = 7; // Abort batch transfers
    pub const ZFIN: u8 = 8; // Finish session
    pub const ZRPOS: u8 = 9; // Resume data trans at this position
    pub const ZDATA: u8 = 10; // Data packet(s) follow
    pub const ZEOF: u8 = 11; // End of file
    pub const ZFERR: u8 = 12; // Fatal Read or Write error Detected
    pub const ZCRC: u8 = 13; // Request for file CRC and response
    pub const ZCHALLENGE: u8 = 14; // Receiver's Challenge
    pub const ZCOMPL: u8 = 15; // Request is complete
    pub const ZCAN: u8 = 16; // Other end canned session with CAN*5
    pub const ZFREECNT: u8 = 17; // Request for free bytes on filesystem
    pub const ZCOMMAND: u8 = 18; // Command from sending program
}
