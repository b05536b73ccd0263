use std::{
    io::{self, ErrorKind, Read, Write},
    time::{Duration, Instant},
};

use serial::prelude::*;

use super::Com;
use crate::{TransferError, TransferResult};

/// Host side link over a local serial port, 8N1 without flow control.
pub struct SerialCom {
    device: String,
    port: Box<dyn serial::SerialPort>,
    timeout: Duration,
    start: Instant,
}

impl SerialCom {
    pub fn open(device: &str, baud_rate: usize) -> TransferResult<Self> {
        let mut port = serial::open(device).map_err(io::Error::from)?;
        port.reconfigure(&|settings| {
            settings.set_baud_rate(serial::BaudRate::from_speed(baud_rate))?;
            settings.set_char_size(serial::Bits8);
            settings.set_parity(serial::ParityNone);
            settings.set_stop_bits(serial::Stop1);
            settings.set_flow_control(serial::FlowNone);
            Ok(())
        })
        .map_err(io::Error::from)?;

        let timeout = Duration::from_secs(1);
        port.set_timeout(timeout).map_err(io::Error::from)?;
        log::info!("opened {device} at {baud_rate} baud");

        Ok(Self {
            device: device.to_string(),
            port: Box::new(port),
            timeout,
            start: Instant::now(),
        })
    }

    pub fn device(&self) -> &str {
        &self.device
    }
}

impl Com for SerialCom {
    fn get_name(&self) -> &'static str {
        "Serial"
    }

    fn read_u8(&mut self, timeout: Duration) -> TransferResult<u8> {
        if timeout != self.timeout {
            self.port.set_timeout(timeout).map_err(io::Error::from)?;
            self.timeout = timeout;
        }
        let mut b = [0];
        match self.port.read(&mut b) {
            Ok(1) => Ok(b[0]),
            Ok(_) => Err(TransferError::Timeout),
            Err(err) if err.kind() == ErrorKind::TimedOut || err.kind() == ErrorKind::WouldBlock => Err(TransferError::Timeout),
            Err(err) => Err(err.into()),
        }
    }

    fn send(&mut self, buf: &[u8]) -> TransferResult<usize> {
        self.port.write_all(buf)?;
        self.port.flush()?;
        Ok(buf.len())
    }

    fn now_ms(&self) -> u32 {
        self.start.elapsed().as_millis() as u32
    }
}
