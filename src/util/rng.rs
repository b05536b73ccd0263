use std::{
    ops::{Bound, RangeBounds},
    time::{SystemTime, UNIX_EPOCH},
};

/// Lehmer (Park-Miller) generator, good enough for test payloads.
pub struct Rng {
    state: u32,
}

impl Rng {
    pub fn new(seed: u32) -> Self {
        let state = seed % 0x7fff_ffff;
        Self {
            state: if state == 0 { 1 } else { state },
        }
    }

    pub fn next(&mut self) -> u32 {
        self.state = ((self.state as u64 * 48271) % 0x7fff_ffff) as u32;
        self.state
    }

    pub fn next_u8(&mut self) -> u8 {
        (self.next() >> 7) as u8
    }

    pub fn gen_range<R: RangeBounds<usize>>(&mut self, arg: R) -> usize {
        let (a, b) = match (arg.start_bound(), arg.end_bound()) {
            (Bound::Included(a), Bound::Included(b)) => (*a, *b + 1),
            (Bound::Included(a), Bound::Excluded(b)) => (*a, *b),
            (Bound::Unbounded, Bound::Excluded(b)) => (0, *b),
            _ => return self.next() as usize,
        };
        if b <= a {
            return a;
        }
        a + self.next() as usize % (b - a)
    }

    pub fn fill_bytes(&mut self, buf: &mut [u8]) {
        for b in buf {
            *b = self.next_u8();
        }
    }

    pub fn bytes(&mut self, len: usize) -> Vec<u8> {
        let mut res = vec![0; len];
        self.fill_bytes(&mut res);
        res
    }
}

impl Default for Rng {
    fn default() -> Self {
        let nanos = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.subsec_nanos()).unwrap_or(1);
        Self::new(nanos)
    }
}

#[cfg(test)]
mod tests {
    use super::Rng;

    #[test]
    fn test_same_seed_same_sequence() {
        let a = Rng::new(42).bytes(1000);
        let b = Rng::new(42).bytes(1000);
        assert_eq!(a, b);
        assert_ne!(a, Rng::new(43).bytes(1000));
        // every value shows up in a long enough run
        let mut seen = [false; 256];
        for b in Rng::new(7).bytes(100_000) {
            seen[b as usize] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn test_gen_range() {
        let mut rng = Rng::new(1);
        for _ in 0..1000 {
            let v = rng.gen_range(10..20);
            assert!((10..20).contains(&v));
            let v = rng.gen_range(0..=3);
            assert!(v <= 3);
        }
        assert_eq!(5, rng.gen_range(5..5));
    }
}
