//! Scripted transport and server side frame builders for the tests of
//! `sftp-session`.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll, Waker};

use bytes::{Buf, BufMut, Bytes, BytesMut};

pub use sftp_session::{ChannelEvent, Transport};

#[derive(Debug, Default)]
struct Shared {
    events: VecDeque<ChannelEvent>,
    waker: Option<Waker>,

    sent: VecDeque<Bytes>,
    subsystems: Vec<String>,
    opened_channels: u32,
    closed_channels: Vec<u32>,

    fail_sends: bool,
}

/// The test side of a [`MockTransport`]: feeds events to the session and
/// inspects what it sent.
#[derive(Debug, Clone, Default)]
pub struct MockServer(Arc<Mutex<Shared>>);

/// [`Transport`] delivering the events pushed through its [`MockServer`].
///
/// Polling it with no event queued returns [`Poll::Pending`] until the
/// next push.
#[derive(Debug)]
pub struct MockTransport(MockServer);

pub fn mock() -> (MockTransport, MockServer) {
    let server = MockServer::default();
    (MockTransport(server.clone()), server)
}

impl MockServer {
    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.0.lock().unwrap()
    }

    pub fn push(&self, event: ChannelEvent) {
        let mut shared = self.lock();
        shared.events.push_back(event);
        if let Some(waker) = shared.waker.take() {
            waker.wake();
        }
    }

    pub fn push_data(&self, data: impl Into<Bytes>) {
        self.push(ChannelEvent::Data(data.into()))
    }

    /// Confirm the channel and the subsystem request.
    pub fn accept_sftp(&self) {
        self.push(ChannelEvent::OpenConfirmed);
        self.push(ChannelEvent::SubsystemResult { success: true });
    }

    /// [`MockServer::accept_sftp`] followed by a VERSION packet.
    pub fn accept_version(&self, version: u32, extensions: &[(&str, &str)]) {
        self.accept_sftp();
        self.push_data(frames::version(version, extensions));
    }

    /// Take the next frame sent by the session.
    pub fn next_sent(&self) -> Option<SentPacket> {
        self.lock().sent.pop_front().map(SentPacket::parse)
    }

    /// Take every frame sent by the session.
    pub fn take_sent(&self) -> Vec<SentPacket> {
        self.lock().sent.drain(..).map(SentPacket::parse).collect()
    }

    pub fn subsystems(&self) -> Vec<String> {
        self.lock().subsystems.clone()
    }

    pub fn opened_channels(&self) -> u32 {
        self.lock().opened_channels
    }

    pub fn closed_channels(&self) -> Vec<u32> {
        self.lock().closed_channels.clone()
    }

    /// Make every following [`Transport::send`] fail.
    pub fn fail_sends(&self, fail: bool) {
        self.lock().fail_sends = fail;
    }
}

impl Transport for MockTransport {
    type Channel = u32;

    fn open_channel(&mut self) -> io::Result<u32> {
        let mut shared = self.0.lock();
        shared.opened_channels += 1;
        Ok(shared.opened_channels)
    }

    fn request_subsystem(&mut self, _channel: &u32, name: &str) -> io::Result<()> {
        self.0.lock().subsystems.push(name.to_owned());
        Ok(())
    }

    fn send(&mut self, _channel: &u32, data: Bytes) -> io::Result<()> {
        let mut shared = self.0.lock();
        if shared.fail_sends {
            return Err(io::ErrorKind::BrokenPipe.into());
        }
        shared.sent.push_back(data);
        Ok(())
    }

    /// The close is confirmed right away.
    fn close_channel(&mut self, channel: &u32) -> io::Result<()> {
        self.0.lock().closed_channels.push(*channel);
        self.0.push(ChannelEvent::Closed);
        Ok(())
    }

    fn poll_event(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<ChannelEvent>> {
        let mut shared = self.0.lock();
        match shared.events.pop_front() {
            Some(event) => Poll::Ready(Ok(event)),
            None => {
                shared.waker = Some(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}

/// A frame sent by the session.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SentPacket {
    pub packet_type: u8,
    /// `None` for INIT, which has no request id.
    pub id: Option<u32>,
    /// What follows the id.
    pub body: Bytes,
}

impl SentPacket {
    /// Panic unless `frame` is exactly one length prefixed packet.
    pub fn parse(mut frame: Bytes) -> Self {
        let len = frame.get_u32() as usize;
        assert_eq!(len, frame.len(), "length prefix does not match the frame");

        let packet_type = frame.get_u8();
        let id = (packet_type != frames::SSH_FXP_INIT).then(|| frame.get_u32());

        Self {
            packet_type,
            id,
            body: frame,
        }
    }

    pub fn id(&self) -> u32 {
        self.id.expect("INIT has no id")
    }
}

/// Builders for the packets of the server, independent of the encoders
/// of `sftp-session-lowlevel`.
pub mod frames {
    use super::*;

    pub const SSH_FXP_INIT: u8 = 1;
    pub const SSH_FXP_VERSION: u8 = 2;
    pub const SSH_FXP_OPEN: u8 = 3;
    pub const SSH_FXP_READ: u8 = 5;
    pub const SSH_FXP_WRITE: u8 = 6;
    pub const SSH_FXP_MKDIR: u8 = 14;
    pub const SSH_FXP_STAT: u8 = 17;
    pub const SSH_FXP_STATUS: u8 = 101;
    pub const SSH_FXP_HANDLE: u8 = 102;
    pub const SSH_FXP_DATA: u8 = 103;
    pub const SSH_FXP_NAME: u8 = 104;
    pub const SSH_FXP_ATTRS: u8 = 105;
    pub const SSH_FXP_EXTENDED_REPLY: u8 = 201;

    pub const SSH_FX_OK: u32 = 0;
    pub const SSH_FX_EOF: u32 = 1;
    pub const SSH_FX_NO_SUCH_FILE: u32 = 2;
    pub const SSH_FX_OP_UNSUPPORTED: u32 = 8;

    /// Prefix `body` with its length.
    pub fn frame(body: &[u8]) -> Bytes {
        let mut buffer = BytesMut::with_capacity(4 + body.len());
        buffer.put_u32(body.len() as u32);
        buffer.put_slice(body);
        buffer.freeze()
    }

    pub fn put_string(buffer: &mut BytesMut, bytes: &[u8]) {
        buffer.put_u32(bytes.len() as u32);
        buffer.put_slice(bytes);
    }

    fn response(packet_type: u8, id: u32, build: impl FnOnce(&mut BytesMut)) -> Bytes {
        let mut body = BytesMut::new();
        body.put_u8(packet_type);
        body.put_u32(id);
        build(&mut body);
        frame(&body)
    }

    pub fn version(version: u32, extensions: &[(&str, &str)]) -> Bytes {
        let mut body = BytesMut::new();
        body.put_u8(SSH_FXP_VERSION);
        body.put_u32(version);
        for (name, data) in extensions {
            put_string(&mut body, name.as_bytes());
            put_string(&mut body, data.as_bytes());
        }
        frame(&body)
    }

    /// STATUS as sent from protocol 3 on.
    pub fn status(id: u32, code: u32, message: &str) -> Bytes {
        response(SSH_FXP_STATUS, id, |body| {
            body.put_u32(code);
            put_string(body, message.as_bytes());
            put_string(body, b"en");
        })
    }

    pub fn handle(id: u32, handle: &[u8]) -> Bytes {
        response(SSH_FXP_HANDLE, id, |body| put_string(body, handle))
    }

    pub fn data(id: u32, data: &[u8]) -> Bytes {
        response(SSH_FXP_DATA, id, |body| put_string(body, data))
    }

    /// NAME as sent by protocol 3: filename, longname and empty attrs.
    pub fn name(id: u32, filenames: &[&str]) -> Bytes {
        response(SSH_FXP_NAME, id, |body| {
            body.put_u32(filenames.len() as u32);
            for filename in filenames {
                put_string(body, filename.as_bytes());
                put_string(body, filename.as_bytes());
                body.put_u32(0);
            }
        })
    }

    /// ATTRS of protocol 1 to 3 carrying only a size.
    pub fn attrs_with_size(id: u32, size: u64) -> Bytes {
        response(SSH_FXP_ATTRS, id, |body| {
            body.put_u32(0x00000001);
            body.put_u64(size);
        })
    }

    pub fn extended_reply(id: u32, data: &[u8]) -> Bytes {
        response(SSH_FXP_EXTENDED_REPLY, id, |body| body.put_slice(data))
    }
}
