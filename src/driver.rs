//! Pipeline driver (C7): the single cooperative state machine that owns
//! every buffer and orchestrates C2–C6 each iteration.

use std::net::SocketAddrV4;
use std::thread;
use std::time::Duration;

use crate::config::{
    NUM_DDC, RING_BASE, DMA_BUFFER_SIZE, IDLE_POLL_INTERVAL_US, PipelineConfig, STARTUP_DELAY,
};
use crate::context::{DdcCommand, SharedContext};
use crate::control::{DdcControl, DmaDevice, FifoChannel, RateWordDecoder};
use crate::ddc::{DdcChannel, DdcSocket};
use crate::dma::DmaSource;
use crate::error::Result;
use crate::frame::FrameParser;
use crate::packet;
use crate::ring::RingBuffer;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Arming,
    Streaming,
    Draining,
    Terminate,
}

/// Bundles every buffer and collaborator the driver needs for one pipeline
/// instance. Construction allocates all buffers once (§5); nothing grows
/// after `new`.
pub struct PipelineDriver<D: DmaDevice, F: FifoChannel, C: DdcControl, R: RateWordDecoder> {
    state: PipelineState,
    dma_ring: RingBuffer,
    ddcs: [DdcChannel; NUM_DDC],
    parser: FrameParser,
    dma_source: DmaSource<D>,
    fifo: F,
    control: C,
    decoder: R,
    ctx: SharedContext,
    commands: [DdcCommand; NUM_DDC],
    startup_count: u32,
    local_port: u16,
}

impl<D: DmaDevice, F: FifoChannel, C: DdcControl, R: RateWordDecoder> PipelineDriver<D, F, C, R> {
    pub fn new(
        config: &PipelineConfig,
        device: D,
        fifo: F,
        control: C,
        decoder: R,
        ctx: SharedContext,
    ) -> Result<Self> {
        let mut ddc_slots: [Option<DdcChannel>; NUM_DDC] = std::array::from_fn(|_| None);
        for (index, slot) in ddc_slots.iter_mut().enumerate() {
            *slot = Some(DdcChannel::new(index)?);
        }
        let ddcs = ddc_slots.map(|slot| slot.expect("every slot filled above"));
        ctx.use_debug
            .store(config.use_debug, std::sync::atomic::Ordering::Relaxed);
        Ok(Self {
            state: PipelineState::Idle,
            dma_ring: RingBuffer::new(DMA_BUFFER_SIZE, RING_BASE)?,
            ddcs,
            parser: FrameParser::new(),
            dma_source: DmaSource::new(device, config.fpga_stream_addr),
            fifo,
            control,
            decoder,
            ctx,
            commands: std::array::from_fn(|_| DdcCommand::default()),
            startup_count: 0,
            local_port: config.local_port,
        })
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn command(&self, ddc: usize) -> &DdcCommand {
        &self.commands[ddc]
    }

    /// Run one step of the cooperative loop, advancing `state` as needed.
    /// Returns after whatever work that state does for one pass; the caller
    /// is expected to call this in a loop (see `run`).
    ///
    /// A fatal `Err` from any state's step tears the pipeline down per §7:
    /// every DDC is marked inactive and `state` becomes `Terminate` before
    /// the error is re-raised, so a caller inspecting `state()` after a
    /// failed `step()` never sees a stale `Streaming`/`Arming`/etc.
    pub fn step(&mut self) -> Result<()> {
        let result = match self.state {
            PipelineState::Idle => self.step_idle(),
            PipelineState::Arming => self.step_arming(),
            PipelineState::Streaming => self.step_streaming(),
            PipelineState::Draining => self.step_draining(),
            PipelineState::Terminate => Ok(()),
        };
        if result.is_err() {
            self.teardown_to_terminate();
        }
        result
    }

    /// Fatal-path teardown (§7): mark every DDC inactive and move the state
    /// machine to `Terminate`. Sockets and buffers are released when the
    /// driver value itself is dropped; this only covers the core-state
    /// mutations §3/§7 assign to C7 (`active` flags, `state`).
    fn teardown_to_terminate(&mut self) {
        for ddc in self.ddcs.iter_mut() {
            ddc.disarm();
        }
        self.state = PipelineState::Terminate;
    }

    /// Drive the pipeline until it reaches `Terminate`. Sleeps between Idle
    /// iterations per §5's suspension points; the caller typically runs
    /// this on its own dedicated thread.
    pub fn run(&mut self) -> Result<()> {
        loop {
            if self.state == PipelineState::Terminate {
                return Ok(());
            }
            let was_idle = self.state == PipelineState::Idle;
            self.step()?;
            if was_idle && self.state == PipelineState::Idle {
                thread::sleep(Duration::from_micros(IDLE_POLL_INTERVAL_US));
            }
        }
    }

    fn step_idle(&mut self) -> Result<()> {
        for (index, cmd) in self.commands.iter().enumerate() {
            if let Some(new_port) = cmd.take_port_change() {
                match &mut self.ddcs[index].socket {
                    Some(socket) => socket.rebind(new_port)?,
                    None => self.ddcs[index].socket = Some(DdcSocket::bind(index, new_port)?),
                }
            }
        }
        if self.ctx.is_active() {
            self.state = PipelineState::Arming;
        }
        Ok(())
    }

    fn step_arming(&mut self) -> Result<()> {
        let reply = *self.ctx.reply_addr.read();
        let dest = reply.unwrap_or(SocketAddrV4::new(std::net::Ipv4Addr::UNSPECIFIED, 0));
        for (index, ddc) in self.ddcs.iter_mut().enumerate() {
            if ddc.socket.is_none() {
                ddc.socket = Some(DdcSocket::bind(index, self.local_port)?);
            }
            ddc.arm(dest);
        }
        self.startup_count = STARTUP_DELAY;
        self.control.set_rx_ddc_enabled(true);
        self.parser.reset();
        self.ctx.debug_log("arming: sequences reset, DDC enabled, startup suppression armed");
        self.state = PipelineState::Streaming;
        Ok(())
    }

    fn step_streaming(&mut self) -> Result<()> {
        for ddc in self.ddcs.iter_mut() {
            let sent = packet::drain(ddc)?;
            for _ in 0..sent {
                if self.startup_count > 0 {
                    self.startup_count -= 1;
                }
            }
            ddc.ring.compact();
        }

        let status = self.fifo.poll()?;
        if status.over_threshold && self.startup_count == 0 {
            self.ctx.latch_overflow();
            self.ctx.debug_log("RX DDC FIFO over threshold");
        }

        let (_burst, _last_status) =
            self.dma_source
                .read_burst(&mut self.fifo, &mut self.dma_ring, status.depth_words)?;

        if !self.parser.header_found() {
            self.parser.acquire_sync(&mut self.dma_ring)?;
        }
        self.parser
            .parse_available(&mut self.dma_ring, &mut self.decoder, &mut self.ddcs)?;
        self.dma_ring.compact();

        if !self.ctx.is_active() {
            self.state = PipelineState::Draining;
        }
        Ok(())
    }

    fn step_draining(&mut self) -> Result<()> {
        for ddc in self.ddcs.iter_mut() {
            packet::drain(ddc).ok();
            ddc.ring.compact();
            ddc.disarm();
        }
        self.control.set_rx_ddc_enabled(false);
        self.state = PipelineState::Idle;
        Ok(())
    }
}
