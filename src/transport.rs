use std::io;
use std::task::{Context, Poll};

use bytes::Bytes;

/// Notification from the transport about the sftp channel.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ChannelEvent {
    /// The channel requested with [`Transport::open_channel`] is open.
    OpenConfirmed,

    /// Answer to [`Transport::request_subsystem`].
    SubsystemResult { success: bool },

    /// Bytes of the channel's data stream.
    ///
    /// Packet boundaries are not preserved: one event may contain several
    /// packets and a packet may span several events.
    Data(Bytes),

    /// Bytes of the extended data stream, i.e. stderr of the server.
    ExtendedData(Bytes),

    /// The channel is closed, no further event will be delivered for it.
    Closed,
}

/// The secure transport carrying the sftp channel.
///
/// Requests are non-blocking: their outcome is reported later through
/// [`Transport::poll_event`], which the session polls from its drive loop.
/// Implementations are expected to make progress on queued writes while
/// being polled.
pub trait Transport {
    /// Identifies an open channel.
    type Channel;

    fn open_channel(&mut self) -> io::Result<Self::Channel>;

    fn request_subsystem(&mut self, channel: &Self::Channel, name: &str) -> io::Result<()>;

    /// Queue `data` to be written to the channel.
    fn send(&mut self, channel: &Self::Channel, data: Bytes) -> io::Result<()>;

    /// Ask the transport to close the channel, [`ChannelEvent::Closed`]
    /// is delivered once it is done.
    fn close_channel(&mut self, channel: &Self::Channel) -> io::Result<()>;

    fn poll_event(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<ChannelEvent>>;
}
