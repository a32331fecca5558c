//! FIFO monitor (C3): polls a single hardware register and classifies the
//! RX DDC DMA FIFO's fill level.
//!
//! The register's exact bit layout is hardware-specific and is not given
//! by the spec; the layout below is this crate's documented choice for a
//! 32-bit packed status word, consistent with "single 32-bit read returns
//! a packed {depth_words, overflow, over_threshold, underflow,
//! current_level}" (§6). A deployment targeting different hardware swaps
//! this module's bit masks, or the whole `FifoChannel` impl, without the
//! rest of the pipeline noticing.

use crate::control::{FifoChannel, FifoStatus};
use crate::error::Result;

/// Bits [15:0]: FIFO depth in 8-byte words.
const DEPTH_MASK: u32 = 0x0000_FFFF;
/// Bit 16: overflow latched.
const OVERFLOW_BIT: u32 = 1 << 16;
/// Bit 17: over threshold.
const OVER_THRESHOLD_BIT: u32 = 1 << 17;
/// Bit 18: underflow.
const UNDERFLOW_BIT: u32 = 1 << 18;
/// Bits [31:19]: current fill level (hardware units, monitor-specific).
const CURRENT_LEVEL_SHIFT: u32 = 19;

fn unpack(register: u32) -> FifoStatus {
    FifoStatus {
        depth_words: register & DEPTH_MASK,
        overflow: register & OVERFLOW_BIT != 0,
        over_threshold: register & OVER_THRESHOLD_BIT != 0,
        underflow: register & UNDERFLOW_BIT != 0,
        current_level: register >> CURRENT_LEVEL_SHIFT,
    }
}

/// A FIFO monitor channel backed by a single memory-mapped register.
///
/// `read_register` is injected so the unpacking logic above can be tested
/// without a real mmap'd device; the production path supplies a closure
/// reading a volatile register from an mmap'd BAR.
pub struct RegisterFifoChannel<F: FnMut() -> u32 + Send> {
    read_register: F,
}

impl<F: FnMut() -> u32 + Send> RegisterFifoChannel<F> {
    pub fn new(read_register: F) -> Self {
        Self { read_register }
    }
}

impl<F: FnMut() -> u32 + Send> FifoChannel for RegisterFifoChannel<F> {
    fn poll(&mut self) -> Result<FifoStatus> {
        Ok(unpack((self.read_register)()))
    }
}
