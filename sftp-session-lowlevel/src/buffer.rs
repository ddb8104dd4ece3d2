#![forbid(unsafe_code)]

use super::Error;

use std::convert::TryFrom;

use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Cursor over the payload of one packet.
///
/// All integers are big-endian, strings are prefixed with their length
/// as `u32`. Reading past the end returns [`Error::PacketTruncated`]
/// instead of truncating silently.
#[derive(Debug, Clone, Default)]
pub struct WireReader(Bytes);

impl WireReader {
    pub fn new(bytes: Bytes) -> Self {
        Self(bytes)
    }

    /// Number of bytes not consumed yet.
    pub fn remaining(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn ensure(&self, needed: usize) -> Result<(), Error> {
        if self.0.len() < needed {
            Err(Error::PacketTruncated {
                needed,
                remaining: self.0.len(),
            })
        } else {
            Ok(())
        }
    }

    pub fn read_u8(&mut self) -> Result<u8, Error> {
        self.ensure(1)?;
        Ok(self.0.get_u8())
    }

    pub fn read_bool(&mut self) -> Result<bool, Error> {
        self.read_u8().map(|byte| byte != 0)
    }

    pub fn read_u32(&mut self) -> Result<u32, Error> {
        self.ensure(4)?;
        Ok(self.0.get_u32())
    }

    pub fn read_u64(&mut self) -> Result<u64, Error> {
        self.ensure(8)?;
        Ok(self.0.get_u64())
    }

    pub fn read_i64(&mut self) -> Result<i64, Error> {
        self.ensure(8)?;
        Ok(self.0.get_i64())
    }

    /// Split off exactly `len` bytes without copying.
    pub fn read_bytes(&mut self, len: usize) -> Result<Bytes, Error> {
        self.ensure(len)?;
        Ok(self.0.split_to(len))
    }

    /// Read a length-prefixed byte string.
    pub fn read_string(&mut self) -> Result<Bytes, Error> {
        let len = self.read_u32()?;
        self.read_bytes(len as usize)
    }

    /// Read a length-prefixed string that must be valid UTF-8.
    pub fn read_str(&mut self) -> Result<Box<str>, Error> {
        let bytes = self.read_string()?;
        std::str::from_utf8(&bytes)
            .map(Box::from)
            .map_err(|_| Error::InvalidResponse(&"String is not valid utf-8"))
    }

    /// Consume and return everything left.
    pub fn read_remaining(&mut self) -> Bytes {
        self.0.split_off(0)
    }
}

/// Big-endian writer used to produce requests.
///
/// When created with [`WireWriter::packet`], the first 4 bytes are reserved
/// for the frame length and are filled in by [`WireWriter::finish`].
#[derive(Debug, Default)]
pub struct WireWriter(BytesMut);

impl WireWriter {
    pub fn new() -> Self {
        Self(BytesMut::new())
    }

    /// Start a frame of type `packet_type`.
    pub fn packet(packet_type: u8) -> Self {
        let mut bytes = BytesMut::with_capacity(256);
        bytes.put_u32(0);
        bytes.put_u8(packet_type);
        Self(bytes)
    }

    /// Start a frame of type `packet_type` carrying request id `id`.
    pub fn request(packet_type: u8, id: u32) -> Self {
        let mut writer = Self::packet(packet_type);
        writer.put_u32(id);
        writer
    }

    pub fn put_u8(&mut self, value: u8) -> &mut Self {
        self.0.put_u8(value);
        self
    }

    pub fn put_bool(&mut self, value: bool) -> &mut Self {
        self.put_u8(value as u8)
    }

    pub fn put_u32(&mut self, value: u32) -> &mut Self {
        self.0.put_u32(value);
        self
    }

    pub fn put_u64(&mut self, value: u64) -> &mut Self {
        self.0.put_u64(value);
        self
    }

    pub fn put_i64(&mut self, value: i64) -> &mut Self {
        self.0.put_i64(value);
        self
    }

    /// Append `bytes` without a length prefix.
    pub fn put_raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.0.put_slice(bytes);
        self
    }

    /// Append a length-prefixed byte string.
    pub fn put_string(&mut self, bytes: &[u8]) -> Result<&mut Self, Error> {
        let len = u32::try_from(bytes.len())?;
        self.put_u32(len);
        Ok(self.put_raw(bytes))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Return the bytes written so far.
    pub fn into_bytes(self) -> Bytes {
        self.0.freeze()
    }

    /// Write the frame length into the reserved header and return the frame.
    pub fn finish(mut self) -> Result<Bytes, Error> {
        let len = u32::try_from(self.0.len() - 4)?;
        self.0[..4].copy_from_slice(&len.to_be_bytes());
        Ok(self.0.freeze())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_rejects_short_reads() {
        let mut reader = WireReader::new(Bytes::from_static(&[0, 0, 0, 5, b'a']));

        assert!(matches!(
            reader.read_string(),
            Err(Error::PacketTruncated {
                needed: 5,
                remaining: 1
            })
        ));
    }

    #[test]
    fn test_reader_reads_in_order() {
        let mut reader = WireReader::new(Bytes::from_static(&[
            0, 0, 0, 7, // u32
            0, 0, 0, 0, 0, 0, 1, 0, // u64
            0, 0, 0, 2, b'h', b'i', // string
            1, // bool
        ]));

        assert_eq!(reader.read_u32().unwrap(), 7);
        assert_eq!(reader.read_u64().unwrap(), 256);
        assert_eq!(&*reader.read_str().unwrap(), "hi");
        assert!(reader.read_bool().unwrap());
        assert!(reader.is_empty());
        assert!(reader.read_u8().is_err());
    }

    #[test]
    fn test_writer_fills_in_frame_length() {
        let mut writer = WireWriter::request(4, 9);
        writer.put_string(b"abc").unwrap();

        let frame = writer.finish().unwrap();

        assert_eq!(
            &*frame,
            &[0, 0, 0, 12, 4, 0, 0, 0, 9, 0, 0, 0, 3, b'a', b'b', b'c']
        );
    }
}
