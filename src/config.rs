//! Compile-time layout constants and the small set of runtime knobs a host
//! must supply to construct a pipeline.

use std::net::{Ipv4Addr, SocketAddrV4};
use std::path::PathBuf;

/// Number of DDC channels the frame format can interleave.
pub const NUM_DDC: usize = 10;

/// Capacity of the DMA ring and of each per-DDC ring, in bytes.
pub const DMA_BUFFER_SIZE: usize = 131_072;

/// DMA alignment required by the FPGA's DMA engine.
pub const ALIGNMENT: usize = 4096;

/// Byte offset of logical zero within a ring (the pre-base slack region).
pub const RING_BASE: usize = 0x1000;

/// Smallest DMA burst the source will ever issue.
pub const MIN_DMA_TRANSFER: usize = 4096;

/// Fixed size of every emitted UDP datagram.
pub const PACKET_SIZE: usize = 1444;

/// Number of I/Q samples carried by one UDP datagram.
pub const SAMPLES_PER_FRAME: usize = 238;

/// Sample payload bytes per UDP datagram (`SAMPLES_PER_FRAME * 6`).
pub const BYTES_PER_FRAME: usize = SAMPLES_PER_FRAME * 6;

/// Useful bytes per 8-byte wire sample slot (3-byte I + 3-byte Q).
pub const SAMPLE_BYTES: usize = 6;

/// Byte width of one wire sample slot (6 useful + 2 padding).
pub const SLOT_BYTES: usize = 8;

/// Sync marker expected at byte 7 of every header word.
pub const HEADER_SYNC_BYTE: u8 = 0x80;

/// Number of packets sent (not frames parsed) before FIFO over-threshold
/// reports start being latched.
pub const STARTUP_DELAY: u32 = 100;

/// FIFO depth polling interval while waiting for a burst's worth of data.
pub const FIFO_POLL_INTERVAL_US: u64 = 500;

/// Idle-loop polling interval while `sdr_active` is false.
pub const IDLE_POLL_INTERVAL_US: u64 = 100;

/// Runtime parameters a host must supply to build a pipeline.
///
/// Everything else the core needs (buffer sizes, packet layout) is a
/// compile-time constant above; this struct is just the handful of values
/// that differ between deployments.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Path to the DMA character device the FPGA streams I/Q data through.
    pub dma_device_path: PathBuf,
    /// FPGA-side address token passed through to the DMA read primitive.
    pub fpga_stream_addr: u64,
    /// Initial UDP destination for each DDC, used until a stream restart
    /// captures a fresh reply address.
    pub initial_dest: SocketAddrV4,
    /// Local UDP port each DDC's socket binds to (0 lets the OS choose).
    pub local_port: u16,
    /// Gates debug logging, mirroring the source's `UseDebug` flag.
    pub use_debug: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            dma_device_path: PathBuf::from("/dev/xdma0_c2h_0"),
            fpga_stream_addr: 0,
            initial_dest: SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0),
            local_port: 0,
            use_debug: false,
        }
    }
}
