//! DMA source (C2): sizes and issues bursts from the FPGA DMA device into
//! the DMA ring, waiting on FIFO depth as needed.

use std::thread;
use std::time::Duration;

use crate::config::FIFO_POLL_INTERVAL_US;
use crate::control::{DmaDevice, FifoChannel, FifoStatus};
use crate::error::Result;
use crate::ring::RingBuffer;

/// Chooses a burst size (bytes, always a multiple of 8) from the current
/// FIFO depth in 8-byte words (§4.2).
pub fn choose_burst_size(depth_words: u32) -> usize {
    if depth_words > 4096 {
        32768
    } else if depth_words > 2048 {
        16384
    } else if depth_words > 1024 {
        8192
    } else {
        4096
    }
}

pub struct DmaSource<D: DmaDevice> {
    device: D,
    fpga_addr: u64,
}

impl<D: DmaDevice> DmaSource<D> {
    pub fn new(device: D, fpga_addr: u64) -> Self {
        Self { device, fpga_addr }
    }

    /// Read one burst into `ring`, sized from `depth_words`, waiting on
    /// the FIFO to fill if it hasn't yet reached the chosen size. Returns
    /// the burst size issued and the last FIFO status observed while
    /// waiting (if any polls were needed).
    pub fn read_burst(
        &mut self,
        fifo: &mut dyn FifoChannel,
        ring: &mut RingBuffer,
        depth_words: u32,
    ) -> Result<(usize, Option<FifoStatus>)> {
        let burst = choose_burst_size(depth_words);
        let mut depth = depth_words;
        let mut last_status = None;
        while (depth as usize) < burst / 8 {
            thread::sleep(Duration::from_micros(FIFO_POLL_INTERVAL_US));
            let status = fifo.poll()?;
            depth = status.depth_words;
            last_status = Some(status);
        }

        self.device
            .read_burst(&mut ring.writable_span()[..burst], self.fpga_addr)?;
        ring.advance_head(burst)?;
        Ok((burst, last_status))
    }
}
