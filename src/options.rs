use super::{
    lowlevel::constants::SSH2_FILEXFER_MAX_VERSION, OPENSSH_PORTABLE_DEFAULT_COPY_BUFLEN,
    OPENSSH_PORTABLE_MAX_MSG_LENGTH,
};

use std::num::{NonZeroU32, NonZeroUsize};

use tracing::Span;

/// Highest sftp protocol version this crate speaks.
pub const MAX_SFTP_VERSION: u32 = SSH2_FILEXFER_MAX_VERSION;

/// Room for the type, id and length fields around a payload of
/// [`OPENSSH_PORTABLE_MAX_MSG_LENGTH`] bytes.
const PACKET_HEADER_SLACK: u32 = 1024;

/// Default value of [`SessionOptions::max_packet_len`].
pub const DEFAULT_MAX_PACKET_LEN: u32 = OPENSSH_PORTABLE_MAX_MSG_LENGTH + PACKET_HEADER_SLACK;

/// Options when creating [`super::Session`].
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    max_version: Option<u32>,
    max_packet_len: Option<NonZeroU32>,
    read_buffer_len: Option<NonZeroUsize>,
    span: Option<Span>,
}

impl SessionOptions {
    /// Create a new [`SessionOptions`].
    pub const fn new() -> Self {
        Self {
            max_version: None,
            max_packet_len: None,
            read_buffer_len: None,
            span: None,
        }
    }

    /// Set `max_version`, the version sent in `INIT`.
    ///
    /// It must be between 1 and [`MAX_SFTP_VERSION`], otherwise
    /// [`super::Session::new`] fails.
    ///
    /// The default value is [`MAX_SFTP_VERSION`].
    #[must_use]
    pub const fn max_version(mut self, max_version: u32) -> Self {
        self.max_version = Some(max_version);
        self
    }

    /// Set `max_packet_len`, packets received from the server announcing
    /// a larger length are rejected.
    ///
    /// The default value is [`DEFAULT_MAX_PACKET_LEN`], large enough for
    /// a `DATA` response to a read of [`OPENSSH_PORTABLE_MAX_MSG_LENGTH`]
    /// bytes.
    #[must_use]
    pub const fn max_packet_len(mut self, max_packet_len: NonZeroU32) -> Self {
        self.max_packet_len = Some(max_packet_len);
        self
    }

    /// Set `read_buffer_len`, the initial capacity of the buffer in which
    /// packets are reassembled.
    ///
    /// The default value is [`OPENSSH_PORTABLE_DEFAULT_COPY_BUFLEN`].
    #[must_use]
    pub const fn read_buffer_len(mut self, read_buffer_len: NonZeroUsize) -> Self {
        self.read_buffer_len = Some(read_buffer_len);
        self
    }

    /// Set the span every event of the session is recorded under.
    ///
    /// The default is [`Span::none`], which records nothing.
    #[must_use]
    pub fn span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }
}

impl SessionOptions {
    pub(super) fn get_max_version(&self) -> u32 {
        self.max_version.unwrap_or(MAX_SFTP_VERSION)
    }

    pub(super) fn get_max_packet_len(&self) -> u32 {
        self.max_packet_len
            .map(NonZeroU32::get)
            .unwrap_or(DEFAULT_MAX_PACKET_LEN)
    }

    pub(super) fn get_read_buffer_len(&self) -> usize {
        self.read_buffer_len
            .map(NonZeroUsize::get)
            .unwrap_or(OPENSSH_PORTABLE_DEFAULT_COPY_BUFLEN)
    }

    pub(super) fn get_span(&self) -> Span {
        self.span.clone().unwrap_or_else(Span::none)
    }
}
