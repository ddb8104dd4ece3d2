//! An sftp client session engine.
//!
//! [`Session`] turns a byte-oriented channel into typed, asynchronous sftp
//! requests: it opens the channel over a [`Transport`], starts the `sftp`
//! subsystem, negotiates the protocol version (1 to 6) and correlates every
//! response with the request that caused it.
//!
//! [`PipeTransport`] runs a session over any tokio reader/writer pair that
//! is already connected to an sftp server, e.g. the stdio of
//! `ssh -s host sftp`.
//!
//! ```no_run
//! use sftp_session::{FileAttrs, OpenOptions, PipeTransport, Session, SessionOptions};
//! use tokio::io::{AsyncRead, AsyncWrite};
//!
//! # async fn example<R, W>(stdout: R, stdin: W) -> Result<(), sftp_session::Error>
//! # where
//! #     R: AsyncRead + Unpin,
//! #     W: AsyncWrite + Unpin,
//! # {
//! let transport = PipeTransport::new(stdout, stdin);
//! let mut session = Session::connect(transport, SessionOptions::new()).await?;
//!
//! let awaitable = session.open("/tmp/x", OpenOptions::new().read(true), &FileAttrs::new())?;
//! let handle = session.wait(awaitable).await?.into_handle()?;
//!
//! let awaitable = session.close(&handle)?;
//! session.wait(awaitable).await?.into_status()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Feature flags
//!
//!  - `openssh`: `Session::from_openssh` spawns the subsystem on an
//!    `openssh::Session`.

#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub use sftp_session_error::{Error, SftpErrMsg, SftpErrorKind};

pub use sftp_session_lowlevel as lowlevel;

pub use lowlevel::{
    AwaitableResponse, Extensions, FileAttrs, FileAttrsBuilder, FileTime, FileType, Handle,
    IdResolver, NameEntry, NoopResolver, OpenOptions, Permissions, RenameFlags, Response,
    ResponsePayload, StatusCode, SystemIdResolver,
};
pub use lowlevel::{OPENSSH_PORTABLE_DEFAULT_COPY_BUFLEN, OPENSSH_PORTABLE_MAX_MSG_LENGTH};

#[cfg(doc)]
/// Changelog for this crate.
pub mod changelog;

mod options;
pub use options::{SessionOptions, DEFAULT_MAX_PACKET_LEN, MAX_SFTP_VERSION};

mod pipe_transport;
pub use pipe_transport::PipeTransport;

mod session;
pub use session::{Session, SessionState};

mod transport;
pub use transport::{ChannelEvent, Transport};

#[cfg(feature = "openssh")]
mod openssh_session;
#[cfg(feature = "openssh")]
pub use openssh_session::{OpensshSession, OpensshSftpSession};
