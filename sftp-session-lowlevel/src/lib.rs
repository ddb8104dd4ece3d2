//! This crate provides the building blocks of an sftp client session,
//! without doing any io itself.
//!
//! It contains:
//!  - [`ReaderBuffered`], which reassembles packets from the byte stream
//!    received from the server,
//!  - [`Protocol`], the request encoders and response parsers of
//!    sftp protocol 1 to 6, obtained with [`protocol::for_version`] once the
//!    version is negotiated,
//!  - [`FileAttrs`] and [`AttrsLayout`], the attributes of a file and their
//!    encoding in each protocol version,
//!  - [`AwaitableResponses`], the table of requests waiting for their
//!    response.
//!
//! The io and the state machine tying them together live in the
//! `sftp-session` crate.

#![forbid(unsafe_code)]

pub use sftp_session_error::{Error, SftpErrMsg, SftpErrorKind};

/// Max length of a packet accepted by openssh-portable's sftp-server.
pub const OPENSSH_PORTABLE_MAX_MSG_LENGTH: u32 = 256 * 1024;

/// Default size of buffer for up/download in openssh-portable
pub const OPENSSH_PORTABLE_DEFAULT_COPY_BUFLEN: usize = 32768;

#[cfg(doc)]
/// Changelog for this crate.
pub mod changelog;

pub mod constants;

mod awaitable_responses;
pub use awaitable_responses::{AwaitableResponses, PendingResponse};

mod awaitables;
pub use awaitables::AwaitableResponse;

mod buffer;
pub use buffer::{WireReader, WireWriter};

mod file_attrs;
pub use file_attrs::{
    Ace, Acl, AttrsLayout, FileAttrs, FileAttrsBuilder, FileTime, FileType, Permissions,
};

mod open_options;
pub use open_options::{OpenFlags, OpenOptions, RenameFlags};

mod packet;
pub use packet::{Packet, PacketType};

pub mod protocol;
pub use protocol::Protocol;

mod reader_buffered;
pub use reader_buffered::ReaderBuffered;

mod resolver;
pub use resolver::{IdResolver, NoopResolver, SystemIdResolver};

mod response;
pub use response::{
    negotiate_version, Extensions, Handle, NameEntry, Response, ResponsePayload, ServerVersion,
    Status, StatusCode,
};
