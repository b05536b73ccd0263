//! Time keeping shared between the timer interrupt and the protocol engines.
//!
//! The timer interrupt is the only writer; everything else reads. A single
//! aligned 32 bit word needs no further locking, so plain relaxed atomics are
//! enough here.

use std::{
    fmt::Display,
    sync::atomic::{AtomicU32, Ordering},
};

/// Monotonic millisecond counter, wraps after ~49 days.
#[derive(Debug, Default)]
pub struct Clock {
    millis: AtomicU32,
}

impl Clock {
    pub const fn new() -> Self {
        Self { millis: AtomicU32::new(0) }
    }

    /// Entry point for the 1 kHz timer interrupt.
    pub fn on_timer_interrupt(&self) {
        self.advance(1);
    }

    pub fn advance(&self, ms: u32) {
        // fetch_add wraps on overflow
        self.millis.fetch_add(ms, Ordering::Relaxed);
    }

    pub fn now_ms(&self) -> u32 {
        self.millis.load(Ordering::Relaxed)
    }

    pub fn elapsed_since(&self, start: u32) -> u32 {
        self.now_ms().wrapping_sub(start)
    }
}

/// Wall clock style counters driven by a 60 Hz frame interrupt.
#[derive(Debug, Default)]
pub struct FrameClock {
    frames: AtomicU32,
    seconds: AtomicU32,
    minutes: AtomicU32,
    hours: AtomicU32,
}

impl FrameClock {
    pub const FRAMES_PER_SECOND: u32 = 60;

    pub const fn new() -> Self {
        Self {
            frames: AtomicU32::new(0),
            seconds: AtomicU32::new(0),
            minutes: AtomicU32::new(0),
            hours: AtomicU32::new(0),
        }
    }

    pub fn on_frame_interrupt(&self) {
        if !roll(&self.frames, Self::FRAMES_PER_SECOND) {
            return;
        }
        if !roll(&self.seconds, 60) {
            return;
        }
        if !roll(&self.minutes, 60) {
            return;
        }
        roll(&self.hours, 24);
    }

    pub fn frames(&self) -> u32 {
        self.frames.load(Ordering::Relaxed)
    }

    pub fn seconds(&self) -> u32 {
        self.seconds.load(Ordering::Relaxed)
    }

    pub fn minutes(&self) -> u32 {
        self.minutes.load(Ordering::Relaxed)
    }

    pub fn hours(&self) -> u32 {
        self.hours.load(Ordering::Relaxed)
    }
}

/// Increments `counter`, returns true when it wrapped back to zero.
fn roll(counter: &AtomicU32, limit: u32) -> bool {
    let next = counter.load(Ordering::Relaxed) + 1;
    if next >= limit {
        counter.store(0, Ordering::Relaxed);
        true
    } else {
        counter.store(next, Ordering::Relaxed);
        false
    }
}

impl Display for FrameClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}:{:02}:{:02}", self.hours(), self.minutes(), self.seconds(), self.frames())
    }
}

/// Previous interrupt mask, handed back by [`InterruptController::save_and_disable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IrqToken(pub u32);

pub trait InterruptController {
    fn enable(&self);
    fn disable(&self);
    fn save_and_disable(&self) -> IrqToken;
    fn restore(&self, token: IrqToken);
}

/// Mask word semantics of the PicoRV32 `maskirq` instruction: a set bit masks
/// the interrupt line, writing returns the previous mask.
#[derive(Debug, Default)]
pub struct MaskRegister {
    mask: AtomicU32,
}

impl MaskRegister {
    pub const MASK_ALL: u32 = 0xFFFF_FFFF;

    pub fn new() -> Self {
        Self { mask: AtomicU32::new(Self::MASK_ALL) }
    }

    pub fn maskirq(&self, new_mask: u32) -> u32 {
        self.mask.swap(new_mask, Ordering::SeqCst)
    }

    pub fn mask(&self) -> u32 {
        self.mask.load(Ordering::SeqCst)
    }

    pub fn is_enabled(&self, irq: u32) -> bool {
        self.mask() & (1 << irq) == 0
    }
}

impl InterruptController for MaskRegister {
    fn enable(&self) {
        self.maskirq(0);
    }

    fn disable(&self) {
        self.maskirq(Self::MASK_ALL);
    }

    fn save_and_disable(&self) -> IrqToken {
        IrqToken(self.maskirq(Self::MASK_ALL))
    }

    fn restore(&self, token: IrqToken) {
        self.maskirq(token.0);
    }
}

pub fn critical_section<C: InterruptController, R>(ctrl: &C, f: impl FnOnce() -> R) -> R {
    let token = ctrl.save_and_disable();
    let res = f();
    ctrl.restore(token);
    res
}
