//! Fatal error taxonomy for the egress pipeline (§7).
//!
//! Every variant here is fatal to the stream (or to startup); recoverable
//! conditions such as FIFO over-threshold or underflow never produce one of
//! these and are handled in place by the driver.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("failed to allocate pipeline buffers: {0}")]
    Alloc(String),

    #[error("failed to open DMA device {path}: {source}")]
    DmaOpen {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("DMA read failed: {0}")]
    DmaRead(#[source] std::io::Error),

    #[error("lost frame sync: no 0x80 marker found in the current burst")]
    SyncLost,

    #[error("framing lost: expected sync byte 0x80 was not present at the parse position")]
    FramingLost,

    #[error("ring buffer overrun: head+{requested} exceeds capacity {capacity}")]
    RingOverrun { requested: usize, capacity: usize },

    #[error("DDC {ddc} has no destination address configured")]
    NoDestination { ddc: usize },

    #[error("UDP send failed on DDC {ddc}: {source}")]
    SendFailed {
        ddc: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to bind UDP socket for DDC {ddc}: {source}")]
    SocketBind {
        ddc: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("FIFO monitor read failed: {0}")]
    FifoRead(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
