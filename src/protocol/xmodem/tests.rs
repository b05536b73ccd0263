use std::{thread, time::Duration};

use super::{sx::build_block, *};
use crate::{
    com::{Com, TestChannel, TestCom},
    crc::crc16_ccitt,
    protocol::{FileDescriptor, Protocol},
    util::Rng,
    TransferError,
};

fn quick_xmodem() -> Xmodem {
    let mut xmodem = Xmodem::new();
    xmodem.timeouts = XmodemTimeouts {
        init: Duration::from_secs(2),
        block: Duration::from_secs(2),
        character: Duration::from_millis(500),
        start: Duration::from_secs(5),
    };
    xmodem
}

fn read_n(com: &mut TestCom, n: usize) -> Vec<u8> {
    (0..n).map(|_| com.read_u8(Duration::from_secs(2)).unwrap()).collect()
}

fn expect_byte(com: &mut TestCom, expected: u8) {
    // the receiver may repeat its 'C' before the first block arrives
    loop {
        let b = com.read_u8(Duration::from_secs(2)).unwrap();
        if b != CRC_MODE || expected == CRC_MODE {
            assert_eq!(expected, b);
            return;
        }
    }
}

/// Next answer of the receiver, skipping repeated 'C' requests.
fn answer(com: &mut TestCom) -> u8 {
    loop {
        let b = com.read_u8(Duration::from_secs(2)).unwrap();
        if b != CRC_MODE {
            return b;
        }
    }
}

fn block(block_num: u8, chunk: &[u8]) -> Vec<u8> {
    let mut packet = [0u8; EXT_BLOCK_LENGTH + 5];
    build_block(&mut packet, block_num, chunk);
    packet.to_vec()
}

#[test]
fn test_build_block() {
    let packet = block(1, b"abc");
    assert_eq!(EXT_BLOCK_LENGTH + 5, packet.len());
    assert_eq!(&[STX, 1, 0xFE, b'a', b'b', b'c', CPMEOF], &packet[..7]);
    assert!(packet[6..3 + EXT_BLOCK_LENGTH].iter().all(|b| *b == CPMEOF));
    let crc = crc16_ccitt(&packet[3..3 + EXT_BLOCK_LENGTH]);
    assert_eq!(crc.to_be_bytes(), packet[3 + EXT_BLOCK_LENGTH..]);
}

#[test]
fn test_xmodem_end_to_end() {
    let mut rng = Rng::new(1234);
    let mut data = rng.bytes(100_000);
    data[99_999] = 0x42;

    let TestChannel { mut sender, mut receiver } = TestChannel::new();
    let file = FileDescriptor::new("test.bin", data.clone());
    let handle = thread::spawn(move || quick_xmodem().send_file(&mut sender, &file));

    let mut buffer = vec![0; 100 * 1024];
    let mut xmodem = quick_xmodem();
    let received = xmodem.receive_file(&mut receiver, &mut buffer).unwrap();
    handle.join().unwrap().unwrap();

    // no name on the wire
    assert_eq!("", received.file_name);
    assert_eq!(100_000, received.size);
    assert_eq!(data, buffer[..received.size]);
    assert_eq!(0, xmodem.get_current_state().errors);
}

#[test]
fn test_flipped_bit_is_refused_once() {
    let TestChannel { mut sender, mut receiver } = TestChannel::new();
    let data: Vec<u8> = (0..EXT_BLOCK_LENGTH).map(|i| (i % 251) as u8 + 1).collect();
    let good = block(1, &data);
    let handle = thread::spawn(move || {
        let mut answers = Vec::new();
        expect_byte(&mut sender, CRC_MODE);

        let mut bad = good.clone();
        bad[100] ^= 0x08;
        sender.send(&bad).unwrap();
        answers.push(answer(&mut sender));

        sender.send(&good).unwrap();
        answers.push(answer(&mut sender));

        // ACK got lost, the same block comes again
        sender.send(&good).unwrap();
        answers.push(answer(&mut sender));

        sender.put_u8(EOT).unwrap();
        answers.push(answer(&mut sender));
        answers
    });

    let mut buffer = vec![0; 4 * EXT_BLOCK_LENGTH];
    let mut xmodem = quick_xmodem();
    let received = xmodem.receive_file(&mut receiver, &mut buffer).unwrap();
    assert_eq!(vec![NAK, ACK, ACK, ACK], handle.join().unwrap());
    assert_eq!(EXT_BLOCK_LENGTH, received.size);
    assert_eq!(data, buffer[..EXT_BLOCK_LENGTH]);
    assert!(buffer[EXT_BLOCK_LENGTH..].iter().all(|b| *b == 0));
    assert_eq!(1, xmodem.get_current_state().errors);
}

#[test]
fn test_short_blocks_accepted() {
    let TestChannel { mut sender, mut receiver } = TestChannel::new();
    thread::spawn(move || {
        expect_byte(&mut sender, CRC_MODE);
        let data = [0x33u8; DEFAULT_BLOCK_LENGTH];
        let mut packet = vec![SOH, 1, 0xFE];
        packet.extend_from_slice(&data);
        packet.extend_from_slice(&crc16_ccitt(&data).to_be_bytes());
        sender.send(&packet).unwrap();
        expect_byte(&mut sender, ACK);
        sender.put_u8(EOT).unwrap();
    });
    let mut buffer = vec![0; 1000];
    let received = quick_xmodem().receive_file(&mut receiver, &mut buffer).unwrap();
    assert_eq!(DEFAULT_BLOCK_LENGTH, received.size);
    assert!(buffer[..DEFAULT_BLOCK_LENGTH].iter().all(|b| *b == 0x33));
}

#[test]
fn test_sequence_error() {
    let TestChannel { mut sender, mut receiver } = TestChannel::new();
    thread::spawn(move || {
        expect_byte(&mut sender, CRC_MODE);
        let wrong = block(3, b"out of order");
        for _ in 0..3 {
            sender.send(&wrong).unwrap();
            if !matches!(sender.read_u8(Duration::from_secs(2)), Ok(NAK)) {
                return;
            }
        }
    });
    let mut xmodem = quick_xmodem();
    xmodem.max_retries = 2;
    let mut buffer = vec![0; 4096];
    let res = xmodem.receive_file(&mut receiver, &mut buffer);
    assert!(matches!(res, Err(TransferError::SyncError)), "{res:?}");
}

#[test]
fn test_buffer_overflow() {
    let TestChannel { mut sender, mut receiver } = TestChannel::new();
    thread::spawn(move || {
        expect_byte(&mut sender, CRC_MODE);
        sender.send(&block(1, &[1; 300])).unwrap();
    });
    let mut buffer = vec![0; 1000];
    let res = quick_xmodem().receive_file(&mut receiver, &mut buffer);
    assert!(matches!(res, Err(TransferError::BufferOverflow(1000))), "{res:?}");
}

#[test]
fn test_sender_cancel() {
    let TestChannel { mut sender, mut receiver } = TestChannel::new();
    thread::spawn(move || {
        expect_byte(&mut sender, CRC_MODE);
        Xmodem::cancel(&mut sender).unwrap();
    });
    let mut buffer = vec![0; 1000];
    let res = quick_xmodem().receive_file(&mut receiver, &mut buffer);
    assert!(matches!(res, Err(TransferError::Cancel)), "{res:?}");
}

#[test]
fn test_empty_file() {
    let TestChannel { mut sender, mut receiver } = TestChannel::new();
    let handle = thread::spawn(move || quick_xmodem().send_file(&mut sender, &FileDescriptor::new("empty", Vec::new())));
    let mut buffer = vec![0; 16];
    let received = quick_xmodem().receive_file(&mut receiver, &mut buffer).unwrap();
    handle.join().unwrap().unwrap();
    assert_eq!(0, received.size);
}

fn receive_with_padding(data: Vec<u8>, trim_padding: bool) -> (usize, Vec<u8>) {
    let TestChannel { mut sender, mut receiver } = TestChannel::new();
    let handle = thread::spawn(move || quick_xmodem().send_file(&mut sender, &FileDescriptor::new("pad", data)));
    let mut xmodem = quick_xmodem();
    xmodem.trim_padding = trim_padding;
    let mut buffer = vec![0; 8 * EXT_BLOCK_LENGTH];
    let received = xmodem.receive_file(&mut receiver, &mut buffer).unwrap();
    handle.join().unwrap().unwrap();
    (received.size, buffer)
}

fn receive_padded(data: Vec<u8>, trim_padding: bool) -> usize {
    receive_with_padding(data, trim_padding).0
}

#[test]
fn test_trim_padding() {
    assert_eq!(1000, receive_padded(vec![0x41; 1000], true));
    assert_eq!(EXT_BLOCK_LENGTH, receive_padded(vec![0x41; 1000], false));

    // pad bytes inside earlier blocks are data
    let mut data = vec![CPMEOF; EXT_BLOCK_LENGTH];
    data.extend_from_slice(&[0x41; 10]);
    assert_eq!(EXT_BLOCK_LENGTH + 10, receive_padded(data, true));

    // a file that really ends in CPMEOF loses it
    let mut data = vec![0x41; 10];
    data.extend_from_slice(&[CPMEOF; 2]);
    assert_eq!(10, receive_padded(data, true));
}

#[test]
fn test_trailing_cpmeof_with_and_without_trim() {
    let mut data = vec![0x55; 1500];
    data[1499] = CPMEOF;

    // trimming can't tell the last data byte from padding
    let (size, buffer) = receive_with_padding(data.clone(), true);
    assert_eq!(1499, size);
    assert_eq!(data[..1499], buffer[..size]);

    // untrimmed, the file comes back whole followed by the padding
    let (size, buffer) = receive_with_padding(data.clone(), false);
    assert_eq!(2 * EXT_BLOCK_LENGTH, size);
    assert_eq!(data, buffer[..1500]);
    assert!(buffer[1500..size].iter().all(|b| *b == CPMEOF));
}

#[test]
fn test_garbage_markers_exhaust_retries() {
    let TestChannel { mut sender, mut receiver } = TestChannel::new();
    thread::spawn(move || {
        expect_byte(&mut sender, CRC_MODE);
        sender.send(&block(1, b"first")).unwrap();
        expect_byte(&mut sender, ACK);
        for _ in 0..3 {
            sender.put_u8(b'x').unwrap();
            if !matches!(sender.read_u8(Duration::from_secs(2)), Ok(NAK)) {
                return;
            }
        }
    });
    let mut xmodem = quick_xmodem();
    xmodem.max_retries = 2;
    let mut buffer = vec![0; 4096];
    let res = xmodem.receive_file(&mut receiver, &mut buffer);
    assert!(matches!(res, Err(TransferError::TooManyErrors)), "{res:?}");
    assert_eq!(3, xmodem.get_current_state().errors);
    assert_eq!(b"first", &buffer[..5]);
}

#[test]
fn test_sender_retransmits_on_nak() {
    let TestChannel { mut sender, mut receiver } = TestChannel::new();
    let data = b"retransmit me".to_vec();
    let expected = block(1, &data);
    let handle = thread::spawn(move || quick_xmodem().send_file(&mut sender, &FileDescriptor::new("r", data)));

    receiver.put_u8(CRC_MODE).unwrap();
    assert_eq!(expected, read_n(&mut receiver, EXT_BLOCK_LENGTH + 5));
    receiver.put_u8(NAK).unwrap();
    assert_eq!(expected, read_n(&mut receiver, EXT_BLOCK_LENGTH + 5));
    // a stale 'C' is not an answer
    receiver.send(&[CRC_MODE, ACK]).unwrap();
    assert_eq!(vec![EOT], read_n(&mut receiver, 1));
    receiver.put_u8(ACK).unwrap();
    handle.join().unwrap().unwrap();
}

#[test]
fn test_sender_gives_up() {
    let TestChannel { mut sender, mut receiver } = TestChannel::new();
    let handle = thread::spawn(move || {
        let mut xmodem = quick_xmodem();
        xmodem.max_retries = 2;
        let res = xmodem.send_file(&mut sender, &FileDescriptor::new("x", vec![1; 10]));
        (res, xmodem.get_current_state().errors)
    });
    receiver.put_u8(CRC_MODE).unwrap();
    for _ in 0..3 {
        read_n(&mut receiver, EXT_BLOCK_LENGTH + 5);
        receiver.put_u8(NAK).unwrap();
    }
    let (res, errors) = handle.join().unwrap();
    assert!(matches!(res, Err(TransferError::TooManyErrors)), "{res:?}");
    assert_eq!(3, errors);
}
