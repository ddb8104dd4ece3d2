#![forbid(unsafe_code)]

use super::{constants::*, Error, WireReader};

use std::convert::TryFrom;

use bytes::Bytes;

macro_rules! def_packet_types {
    ( $( $variant:ident = $constant:ident ),* $(,)? ) => {
        /// Every message type defined by sftp protocol 1 to 6.
        #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
        pub enum PacketType {
            $( $variant, )*
        }

        impl PacketType {
            /// The type tag on the wire.
            pub const fn tag(self) -> u8 {
                match self {
                    $( PacketType::$variant => $constant, )*
                }
            }
        }

        impl TryFrom<u8> for PacketType {
            type Error = Error;

            fn try_from(tag: u8) -> Result<Self, Error> {
                match tag {
                    $( $constant => Ok(PacketType::$variant), )*
                    packet_type => Err(Error::UnhandledPacketType { packet_type }),
                }
            }
        }
    };
}

def_packet_types!(
    Init = SSH_FXP_INIT,
    Version = SSH_FXP_VERSION,
    Open = SSH_FXP_OPEN,
    Close = SSH_FXP_CLOSE,
    Read = SSH_FXP_READ,
    Write = SSH_FXP_WRITE,
    Lstat = SSH_FXP_LSTAT,
    Fstat = SSH_FXP_FSTAT,
    Setstat = SSH_FXP_SETSTAT,
    Fsetstat = SSH_FXP_FSETSTAT,
    Opendir = SSH_FXP_OPENDIR,
    Readdir = SSH_FXP_READDIR,
    Remove = SSH_FXP_REMOVE,
    Mkdir = SSH_FXP_MKDIR,
    Rmdir = SSH_FXP_RMDIR,
    Realpath = SSH_FXP_REALPATH,
    Stat = SSH_FXP_STAT,
    Rename = SSH_FXP_RENAME,
    Readlink = SSH_FXP_READLINK,
    Symlink = SSH_FXP_SYMLINK,
    Link = SSH_FXP_LINK,
    Block = SSH_FXP_BLOCK,
    Unblock = SSH_FXP_UNBLOCK,
    Status = SSH_FXP_STATUS,
    Handle = SSH_FXP_HANDLE,
    Data = SSH_FXP_DATA,
    Name = SSH_FXP_NAME,
    Attrs = SSH_FXP_ATTRS,
    Extended = SSH_FXP_EXTENDED,
    ExtendedReply = SSH_FXP_EXTENDED_REPLY,
);

/// One decoded sftp message.
#[derive(Debug, Clone)]
pub struct Packet {
    packet_type: PacketType,
    payload: WireReader,
}

impl Packet {
    /// * `frame` - exactly the bytes following the length prefix,
    ///   i.e. the type tag and the payload.
    pub fn from_frame(mut frame: Bytes) -> Result<Self, Error> {
        if frame.is_empty() {
            return Err(Error::PacketTruncated {
                needed: 1,
                remaining: 0,
            });
        }

        let tag = frame.split_to(1)[0];

        Ok(Self {
            packet_type: PacketType::try_from(tag)?,
            payload: WireReader::new(frame),
        })
    }

    pub fn packet_type(&self) -> PacketType {
        self.packet_type
    }

    /// The payload, positioned right after the type tag.
    pub fn payload(&mut self) -> &mut WireReader {
        &mut self.payload
    }

    pub fn into_payload(self) -> WireReader {
        self.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_type_tags() {
        for tag in [1_u8, 2, 3, 20, 21, 101, 105, 200, 201] {
            assert_eq!(PacketType::try_from(tag).unwrap().tag(), tag);
        }

        assert!(matches!(
            PacketType::try_from(99),
            Err(Error::UnhandledPacketType { packet_type: 99 })
        ));
    }

    #[test]
    fn test_empty_frame_is_rejected() {
        assert!(matches!(
            Packet::from_frame(Bytes::new()),
            Err(Error::PacketTruncated { .. })
        ));
    }

    #[test]
    fn test_payload_starts_after_tag() {
        let mut packet =
            Packet::from_frame(Bytes::from_static(&[102, 0, 0, 0, 1, 0, 0, 0, 0])).unwrap();

        assert_eq!(packet.packet_type(), PacketType::Handle);
        assert_eq!(packet.payload().read_u32().unwrap(), 1);
        assert_eq!(packet.payload().remaining(), 4);
    }
}
