#![forbid(unsafe_code)]

use std::{fmt, io, num::TryFromIntError};

use thiserror::Error as ThisError;

/// Error returned by `sftp-session-lowlevel` and `sftp-session`.
#[non_exhaustive]
#[derive(Debug, ThisError)]
pub enum Error {
    /// The transport reported that the sftp subsystem could not be started.
    ///
    /// This is fatal, no version negotiation is attempted afterwards.
    #[error("Failed to start subsystem {subsystem} on the channel.")]
    SubsystemFailure {
        /// Name of the subsystem requested.
        subsystem: &'static str,
    },

    /// Server reported a version that this crate cannot speak.
    #[error("Server speaks sftp protocol {version}, which is not supported.")]
    UnsupportedSftpProtocol {
        /// The version reported by the server.
        version: u32,
    },

    /// The operation does not exist in the negotiated protocol version.
    #[error("Operation {operation} is not available in sftp protocol {version}.")]
    UnsupportedOperation {
        /// Name of the operation.
        operation: &'static str,
        /// The negotiated version.
        version: u32,
    },

    /// Server sent a packet whose type is not a known response type.
    ///
    /// The session cannot continue after this.
    #[error("Received unhandled packet type {packet_type}.")]
    UnhandledPacketType {
        /// The packet type tag.
        packet_type: u8,
    },

    /// The response id is not in the pending request table: it was never
    /// issued, it was already answered or it belongs to a previous session.
    #[error("The response id {response_id} is invalid.")]
    InvalidResponseId {
        /// The invalid response id
        response_id: u32,
    },

    /// Invalid response from the sftp-server
    #[error("Response from sftp server is invalid: {0}")]
    InvalidResponse(
        // Use `&&str` since `&str` takes 16 bytes while `&&str` only takes 8 bytes.
        &'static &'static str,
    ),

    /// Attempt to read past the end of a packet.
    #[error("Packet is truncated: needed {needed} bytes but only {remaining} remain.")]
    PacketTruncated {
        /// Number of bytes the read required.
        needed: usize,
        /// Number of bytes left in the packet.
        remaining: usize,
    },

    /// Declared packet length is larger than the configured maximum.
    #[error("Packet of length {len} exceeds the limit {max}.")]
    PacketTooLong {
        /// Declared length.
        len: u32,
        /// Configured maximum.
        max: u32,
    },

    /// Handle returned by server is longer than the limit 256 bytes specified in sftp v3.
    #[error("Handle returned by server is longer than the limit 256 bytes specified in sftp v3")]
    HandleTooLong,

    /// The attributes cannot be represented in the requested layout.
    #[error("Invalid file attributes: {0}")]
    InvalidAttrs(&'static &'static str),

    /// Owner name could not be resolved to an uid, or the other way round.
    #[error("Unknown owner {0}.")]
    UnknownOwner(Box<str>),

    /// Group name could not be resolved to a gid, or the other way round.
    #[error("Unknown group {0}.")]
    UnknownGroup(Box<str>),

    /// Sftp server error
    #[error("Sftp server reported error kind {0:#?}, msg: {1}")]
    SftpError(SftpErrorKind, SftpErrMsg),

    /// IO Error (Excluding [`io::ErrorKind::WouldBlock`]): {0}.
    #[error("IO Error (Excluding `io::ErrorKind::WouldBlock`): {0}.")]
    IOError(#[from] io::Error),

    /// Sftp protocol can only send and receive at most [`u32::MAX`] data in one request.
    #[error("Sftp protocol can only send and receive at most u32::MAX data in one request.")]
    BufferTooLong(#[from] TryFromIntError),

    /// Requests can only be sent after version negotiation completed.
    #[error("The sftp session is not open yet.")]
    SessionNotOpen,

    /// A previous fatal error left the session in an undefined state.
    #[error("The sftp session has failed earlier and cannot be used anymore.")]
    SessionPoisoned,

    /// The channel closed before the response arrived.
    #[error("The channel is closed.")]
    ChannelClosed,

    #[cfg(feature = "openssh")]
    #[error("Failed to create sftp from session: {0}")]
    RemoteChildSpawnError(#[from] openssh::Error),
}

impl Error {
    /// Return true if the session that returned this error must be discarded.
    ///
    /// This only describes errors returned by the session itself, by its
    /// drive loop or by a request. The same variants produced when a caller
    /// converts a response, such as [`Error::InvalidResponse`] or
    /// [`Error::HandleTooLong`], leave the session usable. The session
    /// reports whether it is poisoned on its own.
    ///
    /// [`Error::SftpError`] is the only error reported by the server itself
    /// and it never affects the session.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Error::SftpError(..)
                | Error::UnsupportedOperation { .. }
                | Error::SessionNotOpen
                | Error::InvalidAttrs(_)
                | Error::UnknownOwner(_)
                | Error::UnknownGroup(_)
                | Error::BufferTooLong(_)
        )
    }
}

/// Message attached to a status response.
///
/// Servers speaking protocol 1 or 2 never send one, in which case both
/// fields are empty.
#[derive(Debug, Clone, Default, Eq, PartialEq, Hash)]
pub struct SftpErrMsg {
    /// ISO-10646 UTF-8 [RFC-2279]
    pub message: Box<str>,

    /// [RFC-1766]
    pub language_tag: Box<str>,
}

impl fmt::Display for SftpErrMsg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            f.write_str("(no message)")
        } else {
            f.write_str(&self.message)
        }
    }
}

macro_rules! def_error_kinds {
    ( $( $(#[$meta:meta])* $variant:ident = $code:literal, )* ) => {
        /// Failure code of a status response.
        #[non_exhaustive]
        #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
        pub enum SftpErrorKind {
            $( $(#[$meta])* $variant, )*

            /// Code not known to this crate.
            Unknown(u32),
        }

        impl SftpErrorKind {
            /// Map a non-zero status code onto its kind.
            pub fn from_code(code: u32) -> Self {
                match code {
                    $( $code => SftpErrorKind::$variant, )*
                    code => SftpErrorKind::Unknown(code),
                }
            }

            /// The status code on the wire.
            pub fn code(self) -> u32 {
                match self {
                    $( SftpErrorKind::$variant => $code, )*
                    SftpErrorKind::Unknown(code) => code,
                }
            }
        }
    };
}

def_error_kinds! {
    /// Indicates end-of-file condition.
    ///
    /// For SSH_FX_READ it means that no more data is available in the file,
    /// and for SSH_FX_READDIR it indicates that no more files are contained
    /// in the directory.
    Eof = 1,

    /// is returned when a reference is made to a file which should exist
    /// but doesn't.
    NoSuchFile = 2,

    /// Returned when the authenticated user does not have sufficient
    /// permissions to perform the operation.
    PermDenied = 3,

    /// A generic catch-all error message.
    Failure = 4,

    /// May be returned if a badly formatted packet or protocol
    /// incompatibility is detected.
    BadMessage = 5,

    /// A pseudo-error which indicates that the client has no
    /// connection to the server.
    NoConnection = 6,

    /// A pseudo-error which indicates that the connection to the
    /// server has been lost.
    ConnectionLost = 7,

    /// Indicates that an attempt was made to perform an operation which
    /// is not supported for the server.
    OpUnsupported = 8,

    InvalidHandle = 9,
    NoSuchPath = 10,
    FileAlreadyExists = 11,
    WriteProtect = 12,
    NoMedia = 13,
    NoSpaceOnFilesystem = 14,
    QuotaExceeded = 15,
    UnknownPrincipal = 16,
    LockConflict = 17,
    DirNotEmpty = 18,
    NotADirectory = 19,
    InvalidFilename = 20,
    LinkLoop = 21,
    CannotDelete = 22,
    InvalidParameter = 23,
    FileIsADirectory = 24,
    ByteRangeLockConflict = 25,
    ByteRangeLockRefused = 26,
    DeletePending = 27,
    FileCorrupt = 28,
    OwnerInvalid = 29,
    GroupInvalid = 30,
    NoMatchingByteRangeLock = 31,
}
