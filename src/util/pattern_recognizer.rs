/// Sliding matcher that reports every complete occurrence of a byte pattern
/// in a stream fed one byte at a time.
pub struct PatternRecognizer {
    pattern: Vec<u8>,
    cur_idx: usize,
}

impl PatternRecognizer {
    pub fn from(data: &[u8]) -> Self {
        Self {
            pattern: data.to_vec(),
            cur_idx: 0,
        }
    }

    pub fn reset(&mut self) {
        self.cur_idx = 0;
    }

    pub fn matched_len(&self) -> usize {
        self.cur_idx
    }

    pub fn push_ch(&mut self, ch: u8) -> bool {
        if self.pattern.is_empty() {
            return false;
        }
        if self.pattern[self.cur_idx] == ch {
            self.cur_idx += 1;
            if self.cur_idx >= self.pattern.len() {
                self.cur_idx = 0;
                return true;
            }
        } else if self.cur_idx > 0 {
            // a mismatch may still start a new match
            self.cur_idx = 0;
            return self.push_ch(ch);
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::PatternRecognizer;

    #[test]
    fn test_pattern_recognizer() {
        let mut test = PatternRecognizer::from(b"Name");

        let mut result = false;
        for b in b"Name" {
            result = test.push_ch(*b);
        }
        assert!(result);

        let mut result = false;
        for b in b"name" {
            result = test.push_ch(*b);
        }
        assert!(!result);
    }

    #[test]
    fn test_pattern_recognizer_recovery() {
        let mut test = PatternRecognizer::from(b"name");

        let mut result = false;
        for b in b"namname" {
            result = test.push_ch(*b);
        }
        assert!(result);

        let mut test = PatternRecognizer::from(b"**\x18B");
        let hits = b"**\x18**\x18B".iter().filter(|b| test.push_ch(**b)).count();
        assert_eq!(1, hits);
    }

    #[test]
    fn test_pattern_recognizer_invalid() {
        let mut test = PatternRecognizer::from(b"name");

        let mut result = false;
        for b in b"n_a_m_e" {
            result = test.push_ch(*b);
        }
        assert!(!result);
        assert_eq!(0, test.matched_len());
    }
}
