//! Process-wide state shared between the pipeline driver and external
//! actors (command thread, microphone thread), per the redesign note in
//! §9: a value passed around rather than true process globals.

use std::net::SocketAddrV4;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

/// Bit 0 of the legacy `GlobalFIFOOverflows` bitset: RX DDC overflow latched.
pub const FIFO_OVERFLOW_RX_DDC: u32 = 0b0000_0001;

/// Shared, cross-thread pipeline state.
///
/// Cloning is cheap (it's a bundle of `Arc`s) so both the driver and any
/// external command/mic threads can hold their own handle.
#[derive(Clone)]
pub struct SharedContext {
    /// Set by an external actor to start/stop streaming.
    pub sdr_active: Arc<AtomicBool>,
    /// Gates debug `eprintln!` calls, mirroring the source's `UseDebug`.
    pub use_debug: Arc<AtomicBool>,
    /// Latched overflow bitset (`GlobalFIFOOverflows`).
    pub fifo_overflows: Arc<AtomicU32>,
    /// Reply address snapshotted into per-DDC destinations on stream start.
    pub reply_addr: Arc<RwLock<Option<SocketAddrV4>>>,
}

impl SharedContext {
    pub fn new() -> Self {
        Self {
            sdr_active: Arc::new(AtomicBool::new(false)),
            use_debug: Arc::new(AtomicBool::new(false)),
            fifo_overflows: Arc::new(AtomicU32::new(0)),
            reply_addr: Arc::new(RwLock::new(None)),
        }
    }

    pub fn is_active(&self) -> bool {
        self.sdr_active.load(Ordering::Relaxed)
    }

    pub fn debug_enabled(&self) -> bool {
        self.use_debug.load(Ordering::Relaxed)
    }

    /// Record a post-startup FIFO over-threshold observation (§4.3, P6).
    pub fn latch_overflow(&self) {
        self.fifo_overflows
            .fetch_or(FIFO_OVERFLOW_RX_DDC, Ordering::Relaxed);
    }

    pub fn overflow_bits(&self) -> u32 {
        self.fifo_overflows.load(Ordering::Relaxed)
    }

    pub fn debug_log(&self, msg: &str) {
        if self.debug_enabled() {
            eprintln!("{msg}");
        }
    }
}

impl Default for SharedContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-DDC out-of-band command cell, written by an external command thread
/// and read (then cleared) by the driver only while Idle. Mirrors the
/// source's `Cmdid`/`VBITCHANGEPORT` bit.
#[derive(Default)]
pub struct DdcCommand {
    pub change_port: AtomicBool,
    pub requested_port: AtomicU16,
}

impl DdcCommand {
    pub fn request_port_change(&self, port: u16) {
        self.requested_port.store(port, Ordering::Relaxed);
        self.change_port.store(true, Ordering::Release);
    }

    /// Atomically take a pending port-change request, if any.
    pub fn take_port_change(&self) -> Option<u16> {
        if self.change_port.swap(false, Ordering::AcqRel) {
            Some(self.requested_port.load(Ordering::Relaxed))
        } else {
            None
        }
    }
}
