//! DMA-to-UDP demultiplexer for an FPGA DDC I/Q egress pipeline.
//!
//! A single cooperative driver (`driver::PipelineDriver`) pulls bursts off
//! a DMA character device, splits the FPGA's self-describing frame format
//! into per-DDC sample slices, and packetizes each channel into sequenced
//! HPSDR Protocol-2 high-priority-IQ UDP datagrams.

pub mod config;
pub mod context;
pub mod control;
pub mod ddc;
pub mod dma;
pub mod driver;
pub mod error;
pub mod fifo;
pub mod frame;
pub mod packet;
pub mod ring;

pub use config::PipelineConfig;
pub use context::SharedContext;
#[cfg(unix)]
pub use control::CharDeviceDma;
pub use control::{DdcControl, DmaDevice, FifoChannel, FifoStatus, PackedNibbleDecoder, RateWordDecoder};
pub use driver::{PipelineDriver, PipelineState};
pub use error::{PipelineError, Result};
pub use fifo::RegisterFifoChannel;
pub use ring::RingBuffer;
