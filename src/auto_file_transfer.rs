use crate::{protocol::ProtocolType, util::PatternRecognizer};

/// `ZPAD ZPAD ZDLE ZHEX`, the lead-in of the ZRQINIT an unsolicited sender emits.
pub const ZMODEM_AUTOSTART: [u8; 4] = [0x2A, 0x2A, 0x18, 0x42];

/// Watches the live input for a remote starting a transfer on its own.
pub struct AutoFileTransfer {
    zmodem_dl: PatternRecognizer,
}

impl AutoFileTransfer {
    pub fn new() -> Self {
        Self {
            zmodem_dl: PatternRecognizer::from(&ZMODEM_AUTOSTART),
        }
    }

    pub fn reset(&mut self) {
        self.zmodem_dl.reset();
    }

    /// Feeds one byte; once the signature completes the caller should start
    /// the ZMODEM receiver with the header body that follows.
    pub fn try_transfer(&mut self, ch: u8) -> Option<ProtocolType> {
        if self.zmodem_dl.push_ch(ch) {
            log::info!("zmodem auto start detected");
            return Some(ProtocolType::ZModem);
        }
        None
    }
}

impl Default for AutoFileTransfer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_after_noise() {
        let mut auto = AutoFileTransfer::new();
        let hits: Vec<usize> = [0x41, 0x2A, 0x2A, 0x18, 0x42]
            .iter()
            .enumerate()
            .filter_map(|(i, b)| auto.try_transfer(*b).map(|_| i))
            .collect();
        assert_eq!(vec![4], hits);
    }

    #[test]
    fn test_partial_signature() {
        let mut auto = AutoFileTransfer::new();
        for b in [0x2A, 0x2A, 0x18] {
            assert_eq!(None, auto.try_transfer(b));
        }
        auto.reset();
        assert_eq!(None, auto.try_transfer(0x42));
    }

    #[test]
    fn test_restart_on_prefix() {
        let mut auto = AutoFileTransfer::new();
        let mut found = 0;
        for b in b"**x**\x18B*\x18**\x18B" {
            if auto.try_transfer(*b).is_some() {
                found += 1;
            }
        }
        assert_eq!(2, found);
    }
}
