//! Packetizer (C6): drains a per-DDC ring into fixed-size UDP datagrams.

use crate::config::{BYTES_PER_FRAME, PACKET_SIZE, SAMPLES_PER_FRAME};
use crate::ddc::DdcChannel;
use crate::error::{PipelineError, Result};

/// Header bytes preceding the sample payload in every datagram.
const HEADER_BYTES: usize = PACKET_SIZE - BYTES_PER_FRAME;

/// Drain as many complete packets as are currently buffered on `channel`,
/// sending each over its socket to its configured destination. A channel
/// with no destination or socket yet is left untouched rather than erroring,
/// since Arming hasn't completed for it (§4.7).
///
/// Returns the number of packets sent.
pub fn drain(channel: &mut DdcChannel) -> Result<u32> {
    let mut sent = 0u32;
    while channel.ring.readable_len() > BYTES_PER_FRAME {
        let (dest, socket) = match (channel.dest_addr, channel.socket.as_ref()) {
            (Some(dest), Some(socket)) => (dest, socket),
            _ => return Err(PipelineError::NoDestination { ddc: channel.index }),
        };

        let mut packet = [0u8; PACKET_SIZE];
        packet[0..4].copy_from_slice(&channel.sequence.to_be_bytes());
        // bytes 4..12 are reserved/zero (§4.6)
        packet[12..14].copy_from_slice(&24u16.to_be_bytes());
        packet[14..16].copy_from_slice(&(SAMPLES_PER_FRAME as u16).to_be_bytes());
        packet[HEADER_BYTES..].copy_from_slice(channel.ring.peek(0, BYTES_PER_FRAME));

        socket.send_to(&packet, dest)?;

        channel.sequence = channel.sequence.wrapping_add(1);
        channel.ring.consume(BYTES_PER_FRAME);
        sent += 1;
    }
    Ok(sent)
}
