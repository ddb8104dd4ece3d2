#![forbid(unsafe_code)]

use super::{Error, Packet};

use bytes::{Buf, BytesMut};

/// Reassembles packets out of an arbitrarily chunked byte stream.
///
/// Bytes are appended as the transport delivers them, complete packets are
/// taken out with [`ReaderBuffered::next_packet`] and incomplete trailing
/// bytes stay buffered until more data arrives.
#[derive(Debug)]
pub struct ReaderBuffered {
    /// Use `BytesMut` here to avoid frequent copy when consuming.
    ///
    /// Consuming is simply bumping the start counter, and `split_to`
    /// hands out the packet body without copying it.
    buffer: BytesMut,

    /// Length of the packet being assembled, once its prefix is consumed.
    pending_len: Option<u32>,

    max_packet_len: u32,
}

impl ReaderBuffered {
    pub fn new(capacity: usize, max_packet_len: u32) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
            pending_len: None,
            max_packet_len,
        }
    }

    /// Append bytes delivered by the transport.
    pub fn extend_from_slice(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Number of bytes buffered but not yet returned as a packet.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Length of the partially received packet, if its prefix has been read.
    pub fn pending_len(&self) -> Option<u32> {
        self.pending_len
    }

    /// Drop everything buffered, e.g. before reusing the reader for a new
    /// channel.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.pending_len = None;
    }

    /// Return the next complete packet, or `Ok(None)` if more data is needed.
    ///
    /// Call it in a loop until it returns `Ok(None)` to drain every complete
    /// packet currently buffered.
    pub fn next_packet(&mut self) -> Result<Option<Packet>, Error> {
        let len = match self.pending_len {
            Some(len) => len,
            None => {
                if self.buffer.len() < 4 {
                    return Ok(None);
                }

                let len = self.buffer.get_u32();
                if len > self.max_packet_len {
                    return Err(Error::PacketTooLong {
                        len,
                        max: self.max_packet_len,
                    });
                }

                self.pending_len = Some(len);
                len
            }
        };

        let len = len as usize;
        if self.buffer.len() < len {
            return Ok(None);
        }

        let frame = self.buffer.split_to(len).freeze();
        self.pending_len = None;

        Packet::from_frame(frame).map(Some)
    }
}
