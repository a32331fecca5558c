//! Traits describing the pipeline's external collaborators (§6).
//!
//! The core only needs to know the *shape* of these calls: how the FPGA's
//! DMA engine is read, how the FIFO depth register is polled, how a rate
//! word becomes per-DDC sample counts, and which control calls accompany a
//! state transition. Their actual implementations are hardware- and
//! deployment-specific and live outside this crate's concerns; a minimal,
//! real Linux backing is provided for the DMA and control traits so the
//! crate is runnable end to end against a character device.

#[cfg(unix)]
use std::fs::{File, OpenOptions};
#[cfg(unix)]
use std::io::Read;
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;
#[cfg(unix)]
use std::path::Path;

use crate::config::NUM_DDC;
#[cfg(unix)]
use crate::error::PipelineError;
use crate::error::Result;

/// Blocking DMA read primitive (`dma_read(fd, dst, size, fpga_addr)`, §6).
///
/// `size` is always a multiple of 8 and `dst` always covers exactly `size`
/// bytes of the ring's writable span; alignment of `dst` is the caller's
/// responsibility (the ring buffer is allocated once, contiguous, and
/// large enough that slices handed here land on the expected boundaries).
pub trait DmaDevice: Send {
    fn read_burst(&mut self, dst: &mut [u8], fpga_addr: u64) -> Result<()>;
}

/// A `DmaDevice` backed by a Linux DMA character device (e.g. an XDMA
/// `c2h` node), read with a plain blocking `read_exact`. Linux-only, like
/// the teacher's own `libc`-using code paths (e.g. `bass-srt`'s
/// `#[cfg(unix)]`-gated `libc::signal` call sites).
#[cfg(unix)]
pub struct CharDeviceDma {
    file: File,
}

#[cfg(unix)]
impl CharDeviceDma {
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_SYNC)
            .open(path)
            .map_err(|source| PipelineError::DmaOpen {
                path: path.display().to_string(),
                source,
            })?;
        Ok(Self { file })
    }
}

#[cfg(unix)]
impl DmaDevice for CharDeviceDma {
    fn read_burst(&mut self, dst: &mut [u8], _fpga_addr: u64) -> Result<()> {
        self.file.read_exact(dst).map_err(PipelineError::DmaRead)
    }
}

/// Flags read back from a single FIFO-depth register poll (§4.3, §6).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FifoStatus {
    pub depth_words: u32,
    pub over_threshold: bool,
    pub overflow: bool,
    pub underflow: bool,
    pub current_level: u32,
}

/// A single 32-bit FIFO monitor register (`RX_DDC_DMA` channel, §6).
pub trait FifoChannel: Send {
    fn poll(&mut self) -> Result<FifoStatus>;
}

/// DDC control calls invoked by the driver on state transitions (§6).
/// No-ops inside the core's own state machine; real effect lives on the
/// FPGA side of the implementation the host plugs in.
pub trait DdcControl: Send {
    fn set_rx_ddc_enabled(&mut self, enabled: bool);
    fn setup_fifo_monitor_channel(&mut self, enabled: bool);
    fn reset_dma_stream_fifo(&mut self);
}

/// Maps a 32-bit rate word to per-DDC sample-slot counts (`analyse_ddc_header`, §6).
/// Returns the total frame length in 8-byte words (excluding the header word).
pub trait RateWordDecoder: Send {
    fn decode(&mut self, rate_word: u32, out_counts: &mut [u32; NUM_DDC]) -> u32;
}

/// A decoder that treats the low byte of each of `NUM_DDC` nibble-ish
/// fields packed into the rate word as a direct slot count. This is a
/// stand-in default: real deployments supply their own decoder matching
/// their FPGA's rate-word bit layout, which is opaque to this crate.
#[derive(Default)]
pub struct PackedNibbleDecoder;

impl RateWordDecoder for PackedNibbleDecoder {
    fn decode(&mut self, rate_word: u32, out_counts: &mut [u32; NUM_DDC]) -> u32 {
        let mut total = 0u32;
        for (d, count) in out_counts.iter_mut().enumerate().take(NUM_DDC) {
            let nibble = if d < 8 {
                (rate_word >> (d * 4)) & 0xF
            } else {
                0
            };
            *count = nibble;
            total += nibble;
        }
        total
    }
}
