//! Per-DDC channel state (C5): a ring buffer plus the sequence counter,
//! destination address, active flag and UDP socket associated with one
//! DDC index.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};

use socket2::{Domain, Protocol, Socket, Type};

use crate::config::{DMA_BUFFER_SIZE, RING_BASE};
use crate::error::{PipelineError, Result};
use crate::ring::RingBuffer;

/// A non-blocking UDP transmit socket bound to a local port, rebindable on
/// a port-change command while the driver is Idle.
pub struct DdcSocket {
    ddc: usize,
    socket: UdpSocket,
    local_port: u16,
}

impl DdcSocket {
    pub fn bind(ddc: usize, local_port: u16) -> Result<Self> {
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))
            .map_err(|source| PipelineError::SocketBind { ddc, source })?;
        socket
            .set_reuse_address(true)
            .map_err(|source| PipelineError::SocketBind { ddc, source })?;
        let addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, local_port);
        socket
            .bind(&addr.into())
            .map_err(|source| PipelineError::SocketBind { ddc, source })?;
        socket
            .set_nonblocking(true)
            .map_err(|source| PipelineError::SocketBind { ddc, source })?;
        let socket: UdpSocket = socket.into();
        let bound_port = match socket.local_addr() {
            Ok(SocketAddr::V4(v4)) => v4.port(),
            _ => local_port,
        };
        Ok(Self {
            ddc,
            socket,
            local_port: bound_port,
        })
    }

    /// Close the current socket and rebind to a new local port, per the
    /// Idle-state `cmd.change_port` transition (§4.7).
    pub fn rebind(&mut self, new_port: u16) -> Result<()> {
        let rebound = Self::bind(self.ddc, new_port)?;
        *self = rebound;
        Ok(())
    }

    pub fn local_port(&self) -> u16 {
        self.local_port
    }

    pub fn send_to(&self, buf: &[u8], dest: SocketAddrV4) -> Result<()> {
        self.socket
            .send_to(buf, dest)
            .map(|_| ())
            .map_err(|source| PipelineError::SendFailed {
                ddc: self.ddc,
                source,
            })
    }
}

/// All state owned by one DDC channel.
pub struct DdcChannel {
    pub index: usize,
    pub ring: RingBuffer,
    pub sequence: u32,
    pub dest_addr: Option<SocketAddrV4>,
    pub active: bool,
    pub socket: Option<DdcSocket>,
}

impl DdcChannel {
    pub fn new(index: usize) -> Result<Self> {
        Ok(Self {
            index,
            ring: RingBuffer::new(DMA_BUFFER_SIZE, RING_BASE)?,
            sequence: 0,
            dest_addr: None,
            active: false,
            socket: None,
        })
    }

    /// Write one 6-byte I/Q sample to the head of this channel's ring.
    pub fn write_sample(&mut self, sample: &[u8; 6]) -> Result<()> {
        self.ring.push(sample)
    }

    /// Reset per-stream state on entry to Arming (§4.7): sequence restarts
    /// at 0 and the destination is refreshed from the reply address.
    pub fn arm(&mut self, dest: SocketAddrV4) {
        self.sequence = 0;
        self.dest_addr = Some(dest);
        self.active = true;
    }

    pub fn disarm(&mut self) {
        self.active = false;
    }
}
