use std::{
    collections::VecDeque,
    sync::{Arc, Condvar, Mutex},
    time::{Duration, Instant},
};

use super::Com;
use crate::{TransferError, TransferResult};

type Pipe = Arc<(Mutex<VecDeque<u8>>, Condvar)>;

#[derive(Debug, Clone)]
pub struct TestCom {
    name: &'static str,
    read_buf: Pipe,
    write_buf: Pipe,
    start: Instant,
}

impl TestCom {
    /// Bytes written by this end that the other side has not read yet.
    pub fn pending_output(&self) -> usize {
        self.write_buf.0.lock().map(|q| q.len()).unwrap_or(0)
    }
}

impl Com for TestCom {
    fn get_name(&self) -> &'static str {
        self.name
    }

    fn read_u8(&mut self, timeout: Duration) -> TransferResult<u8> {
        let (lock, cvar) = &*self.read_buf;
        let Ok(queue) = lock.lock() else {
            return Err(TransferError::protocol("test pipe poisoned"));
        };
        let Ok((mut queue, _)) = cvar.wait_timeout_while(queue, timeout, |q| q.is_empty()) else {
            return Err(TransferError::protocol("test pipe poisoned"));
        };
        queue.pop_front().ok_or(TransferError::Timeout)
    }

    fn send(&mut self, buf: &[u8]) -> TransferResult<usize> {
        let (lock, cvar) = &*self.write_buf;
        let Ok(mut queue) = lock.lock() else {
            return Err(TransferError::protocol("test pipe poisoned"));
        };
        queue.extend(buf.iter());
        cvar.notify_all();
        Ok(buf.len())
    }

    fn now_ms(&self) -> u32 {
        self.start.elapsed().as_millis() as u32
    }
}

/// Two cross wired in memory ends, whatever one side sends the other reads.
pub struct TestChannel {
    pub sender: TestCom,
    pub receiver: TestCom,
}

impl TestChannel {
    pub fn new() -> Self {
        let b1: Pipe = Arc::new((Mutex::new(VecDeque::new()), Condvar::new()));
        let b2: Pipe = Arc::new((Mutex::new(VecDeque::new()), Condvar::new()));
        let start = Instant::now();
        Self {
            sender: TestCom {
                name: "sender",
                read_buf: b1.clone(),
                write_buf: b2.clone(),
                start,
            },
            receiver: TestCom {
                name: "receiver",
                read_buf: b2,
                write_buf: b1,
                start,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple() {
        let mut test = TestChannel::new();
        let t = b"Hello World";
        test.sender.send(t).unwrap();
        assert_eq!(t.len(), test.sender.pending_output());
        let mut got = Vec::new();
        for _ in 0..t.len() {
            got.push(test.receiver.read_u8(Duration::from_secs(1)).unwrap());
        }
        assert_eq!(t.to_vec(), got);
        assert!(matches!(
            test.receiver.read_u8(Duration::from_millis(10)),
            Err(TransferError::Timeout)
        ));
    }

    #[test]
    fn test_cross_thread_wakeup() {
        let TestChannel { mut sender, mut receiver } = TestChannel::new();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            sender.put_u8(0x42).unwrap();
        });
        assert_eq!(0x42, receiver.read_u8(Duration::from_secs(5)).unwrap());
        handle.join().unwrap();
    }
}
