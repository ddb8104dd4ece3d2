//! Request encoders and response parsers, one implementation per protocol
//! version.
//!
//! The provided methods of [`Protocol`] implement protocol 3, every
//! version overrides what differs from it.

#![forbid(unsafe_code)]

use super::{
    constants::*, AttrsLayout, Error, FileAttrs, Handle, NameEntry, OpenFlags, OpenOptions,
    PacketType, RenameFlags, Response, ResponsePayload, Status, StatusCode, WireReader, WireWriter,
};

use std::fmt::Debug;

use bytes::Bytes;

mod v1;
mod v2;
mod v3;
mod v4;
mod v5;
mod v6;

pub use v1::ProtocolV1;
pub use v2::ProtocolV2;
pub use v3::ProtocolV3;
pub use v4::ProtocolV4;
pub use v5::ProtocolV5;
pub use v6::ProtocolV6;

/// Return the implementation of protocol `version`.
pub fn for_version(version: u32) -> Result<Box<dyn Protocol>, Error> {
    Ok(match version {
        1 => Box::new(ProtocolV1),
        2 => Box::new(ProtocolV2),
        3 => Box::new(ProtocolV3),
        4 => Box::new(ProtocolV4),
        5 => Box::new(ProtocolV5),
        6 => Box::new(ProtocolV6),
        version => return Err(Error::UnsupportedSftpProtocol { version }),
    })
}

/// Encode requests and parse responses of one protocol version.
///
/// Every `encode_*` method returns a complete frame, length prefix
/// included, ready to be written to the channel.
pub trait Protocol: Debug + Send + Sync {
    fn version(&self) -> u32;

    fn attrs_layout(&self) -> AttrsLayout {
        AttrsLayout::for_version(self.version())
    }

    fn encode_open(
        &self,
        id: u32,
        path: &[u8],
        options: OpenOptions,
        attrs: &FileAttrs,
    ) -> Result<Bytes, Error> {
        let mut pflags = options.pflags();
        if self.version() < 4 {
            pflags.remove(OpenFlags::TEXT);
        }

        let mut writer = WireWriter::request(SSH_FXP_OPEN, id);
        writer.put_string(path)?.put_u32(pflags.bits());
        self.attrs_layout().encode(attrs, &mut writer)?;
        writer.finish()
    }

    fn encode_close(&self, id: u32, handle: &Handle) -> Result<Bytes, Error> {
        handle_request(SSH_FXP_CLOSE, id, handle)
    }

    fn encode_read(&self, id: u32, handle: &Handle, offset: u64, len: u32) -> Result<Bytes, Error> {
        let mut writer = WireWriter::request(SSH_FXP_READ, id);
        writer
            .put_string(handle.as_bytes())?
            .put_u64(offset)
            .put_u32(len);
        writer.finish()
    }

    fn encode_write(
        &self,
        id: u32,
        handle: &Handle,
        offset: u64,
        data: &[u8],
    ) -> Result<Bytes, Error> {
        let mut writer = WireWriter::request(SSH_FXP_WRITE, id);
        writer
            .put_string(handle.as_bytes())?
            .put_u64(offset)
            .put_string(data)?;
        writer.finish()
    }

    /// Does not follow symlink.
    fn encode_lstat(&self, id: u32, path: &[u8]) -> Result<Bytes, Error> {
        path_request(SSH_FXP_LSTAT, id, path)
    }

    fn encode_fstat(&self, id: u32, handle: &Handle) -> Result<Bytes, Error> {
        handle_request(SSH_FXP_FSTAT, id, handle)
    }

    /// Follows symlink.
    fn encode_stat(&self, id: u32, path: &[u8]) -> Result<Bytes, Error> {
        path_request(SSH_FXP_STAT, id, path)
    }

    fn encode_setstat(&self, id: u32, path: &[u8], attrs: &FileAttrs) -> Result<Bytes, Error> {
        let mut writer = WireWriter::request(SSH_FXP_SETSTAT, id);
        writer.put_string(path)?;
        self.attrs_layout().encode(attrs, &mut writer)?;
        writer.finish()
    }

    fn encode_fsetstat(&self, id: u32, handle: &Handle, attrs: &FileAttrs) -> Result<Bytes, Error> {
        let mut writer = WireWriter::request(SSH_FXP_FSETSTAT, id);
        writer.put_string(handle.as_bytes())?;
        self.attrs_layout().encode(attrs, &mut writer)?;
        writer.finish()
    }

    fn encode_opendir(&self, id: u32, path: &[u8]) -> Result<Bytes, Error> {
        path_request(SSH_FXP_OPENDIR, id, path)
    }

    fn encode_readdir(&self, id: u32, handle: &Handle) -> Result<Bytes, Error> {
        handle_request(SSH_FXP_READDIR, id, handle)
    }

    fn encode_remove(&self, id: u32, path: &[u8]) -> Result<Bytes, Error> {
        path_request(SSH_FXP_REMOVE, id, path)
    }

    fn encode_mkdir(&self, id: u32, path: &[u8], attrs: &FileAttrs) -> Result<Bytes, Error> {
        let mut writer = WireWriter::request(SSH_FXP_MKDIR, id);
        writer.put_string(path)?;
        self.attrs_layout().encode(attrs, &mut writer)?;
        writer.finish()
    }

    fn encode_rmdir(&self, id: u32, path: &[u8]) -> Result<Bytes, Error> {
        path_request(SSH_FXP_RMDIR, id, path)
    }

    fn encode_realpath(&self, id: u32, path: &[u8]) -> Result<Bytes, Error> {
        path_request(SSH_FXP_REALPATH, id, path)
    }

    /// `flags` can only be transmitted from protocol 5 on and are ignored
    /// before that.
    fn encode_rename(
        &self,
        id: u32,
        old_path: &[u8],
        new_path: &[u8],
        _flags: RenameFlags,
    ) -> Result<Bytes, Error> {
        let mut writer = WireWriter::request(SSH_FXP_RENAME, id);
        writer.put_string(old_path)?.put_string(new_path)?;
        writer.finish()
    }

    fn encode_readlink(&self, id: u32, path: &[u8]) -> Result<Bytes, Error> {
        path_request(SSH_FXP_READLINK, id, path)
    }

    /// Create a symlink at `link_path` pointing to `target_path`.
    ///
    /// NOTE that openssh's sftp-server reads the two paths in the opposite
    /// order.
    fn encode_symlink(&self, id: u32, link_path: &[u8], target_path: &[u8]) -> Result<Bytes, Error> {
        let mut writer = WireWriter::request(SSH_FXP_SYMLINK, id);
        writer.put_string(link_path)?.put_string(target_path)?;
        writer.finish()
    }

    /// * `data` - the request specific data, appended as is after the
    ///   extension name.
    fn encode_extended(&self, id: u32, request: &str, data: &[u8]) -> Result<Bytes, Error> {
        let mut writer = WireWriter::request(SSH_FXP_EXTENDED, id);
        writer.put_string(request.as_bytes())?.put_raw(data);
        writer.finish()
    }

    /// * `reader` - positioned right after the request id, same for
    ///   every `parse_*` method.
    fn parse_status(&self, reader: &mut WireReader) -> Result<Status, Error> {
        let code = StatusCode::from_code(reader.read_u32()?);

        // Some servers leave out the message even though they should not.
        let (message, language_tag) = if reader.is_empty() {
            (None, None)
        } else {
            (Some(reader.read_str()?), Some(reader.read_str()?))
        };

        Ok(Status {
            code,
            message,
            language_tag,
        })
    }

    fn parse_handle(&self, reader: &mut WireReader) -> Result<Handle, Error> {
        Handle::new(reader.read_string()?)
    }

    fn parse_data(&self, reader: &mut WireReader) -> Result<ResponsePayload, Error> {
        Ok(ResponsePayload::Data {
            data: reader.read_string()?,
            end_of_file: None,
        })
    }

    fn parse_name(&self, reader: &mut WireReader) -> Result<ResponsePayload, Error> {
        let layout = self.attrs_layout();
        let has_longname = self.version() <= 3;

        let count = reader.read_u32()?;
        let mut entries = Vec::with_capacity(count.min(64) as usize);

        for _ in 0..count {
            let filename = reader.read_string()?;
            let longname = if has_longname {
                Some(reader.read_string()?)
            } else {
                None
            };
            let attrs = layout.decode(reader)?;

            entries.push(NameEntry {
                filename,
                longname,
                attrs,
            });
        }

        Ok(ResponsePayload::Name {
            entries,
            end_of_list: None,
        })
    }

    fn parse_attrs(&self, reader: &mut WireReader) -> Result<FileAttrs, Error> {
        self.attrs_layout().decode(reader)
    }

    fn parse_extended_reply(&self, reader: &mut WireReader) -> Result<Bytes, Error> {
        Ok(reader.read_remaining())
    }

    /// Parse the response `id` of type `packet_type`.
    ///
    /// `packet_type` has to be one of the response types, anything else
    /// is [`Error::UnhandledPacketType`].
    fn parse_response(
        &self,
        packet_type: PacketType,
        id: u32,
        reader: &mut WireReader,
    ) -> Result<Response, Error> {
        let payload = match packet_type {
            PacketType::Status => return Ok(Response::from_status(id, self.parse_status(reader)?)),
            PacketType::Handle => ResponsePayload::Handle(self.parse_handle(reader)?),
            PacketType::Data => self.parse_data(reader)?,
            PacketType::Name => self.parse_name(reader)?,
            PacketType::Attrs => ResponsePayload::Attrs(self.parse_attrs(reader)?),
            PacketType::ExtendedReply => {
                ResponsePayload::ExtendedReply(self.parse_extended_reply(reader)?)
            }
            packet_type => {
                return Err(Error::UnhandledPacketType {
                    packet_type: packet_type.tag(),
                })
            }
        };

        Ok(Response::with_payload(id, payload))
    }
}

fn path_request(packet_type: u8, id: u32, path: &[u8]) -> Result<Bytes, Error> {
    let mut writer = WireWriter::request(packet_type, id);
    writer.put_string(path)?;
    writer.finish()
}

fn handle_request(packet_type: u8, id: u32, handle: &Handle) -> Result<Bytes, Error> {
    path_request(packet_type, id, handle.as_bytes())
}

/// STAT, LSTAT and FSTAT of protocol 4 and later ask for specific
/// attributes.
fn stat_request(
    packet_type: u8,
    id: u32,
    path_or_handle: &[u8],
    layout: AttrsLayout,
) -> Result<Bytes, Error> {
    let mut writer = WireWriter::request(packet_type, id);
    writer
        .put_string(path_or_handle)?
        .put_u32(layout.supported_flags());
    writer.finish()
}

/// Read the optional boolean protocol 6 appends to DATA and NAME.
fn read_trailing_bool(reader: &mut WireReader) -> Result<Option<bool>, Error> {
    if reader.is_empty() {
        Ok(None)
    } else {
        reader.read_bool().map(Some)
    }
}

fn unsupported(operation: &'static str, version: u32) -> Error {
    Error::UnsupportedOperation { operation, version }
}
