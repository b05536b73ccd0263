pub mod rng;
pub use rng::*;

pub mod pattern_recognizer;
pub use pattern_recognizer::*;
