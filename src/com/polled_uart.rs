use std::time::Duration;

use super::Com;
use crate::{clock::Clock, TransferError, TransferResult};

/// Status and data registers of a memory mapped UART.
pub trait UartPort {
    fn rx_ready(&self) -> bool;
    fn read_rx(&mut self) -> u8;
    fn tx_busy(&self) -> bool;
    fn write_tx(&mut self, b: u8);
}

/// Device side link: busy polls the receive flag until the deadline taken
/// from the shared millisecond [`Clock`] expires.
pub struct PolledUart<'a, P: UartPort> {
    port: P,
    clock: &'a Clock,
}

impl<'a, P: UartPort> PolledUart<'a, P> {
    pub fn new(port: P, clock: &'a Clock) -> Self {
        Self { port, clock }
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }
}

impl<'a, P: UartPort> Com for PolledUart<'a, P> {
    fn get_name(&self) -> &'static str {
        "UART"
    }

    fn read_u8(&mut self, timeout: Duration) -> TransferResult<u8> {
        let start = self.clock.now_ms();
        let timeout = timeout.as_millis() as u32;
        loop {
            if self.port.rx_ready() {
                return Ok(self.port.read_rx());
            }
            if self.clock.elapsed_since(start) >= timeout {
                return Err(TransferError::Timeout);
            }
            std::hint::spin_loop();
        }
    }

    fn send(&mut self, buf: &[u8]) -> TransferResult<usize> {
        for b in buf {
            while self.port.tx_busy() {
                std::hint::spin_loop();
            }
            self.port.write_tx(*b);
        }
        Ok(buf.len())
    }

    fn now_ms(&self) -> u32 {
        self.clock.now_ms()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;

    /// Every status poll costs one timer tick.
    struct FakePort<'a> {
        clock: &'a Clock,
        rx: VecDeque<u8>,
        tx: Vec<u8>,
    }

    impl<'a> UartPort for FakePort<'a> {
        fn rx_ready(&self) -> bool {
            self.clock.on_timer_interrupt();
            !self.rx.is_empty()
        }

        fn read_rx(&mut self) -> u8 {
            self.rx.pop_front().unwrap_or(0)
        }

        fn tx_busy(&self) -> bool {
            false
        }

        fn write_tx(&mut self, b: u8) {
            self.tx.push(b);
        }
    }

    #[test]
    fn test_polled_read_and_timeout() {
        let clock = Clock::new();
        let port = FakePort {
            clock: &clock,
            rx: VecDeque::from(vec![b'R', b'x']),
            tx: Vec::new(),
        };
        let mut uart = PolledUart::new(port, &clock);

        assert_eq!(b'R', uart.read_u8(Duration::from_millis(5)).unwrap());
        assert_eq!(b'x', uart.read_u8(Duration::from_millis(5)).unwrap());

        let before = clock.now_ms();
        assert!(matches!(uart.read_u8(Duration::from_millis(50)), Err(TransferError::Timeout)));
        assert!(clock.elapsed_since(before) >= 50);

        uart.send(b"OO").unwrap();
        uart.put_u8(b'!').unwrap();
        assert_eq!(b"OO!", &uart.port().tx[..]);
    }
}
