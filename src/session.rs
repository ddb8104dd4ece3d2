use super::{
    lowlevel::{
        constants::SSH_FXP_INIT, negotiate_version, protocol, AwaitableResponse,
        AwaitableResponses, Extensions, FileAttrs, Handle, OpenOptions, Packet, PacketType,
        Protocol, ReaderBuffered, RenameFlags, Response, ServerVersion, WireReader, WireWriter,
    },
    options::MAX_SFTP_VERSION,
    ChannelEvent, Error, SessionOptions, Transport,
};

use std::fmt;
use std::future::poll_fn;
use std::path::Path;

use bytes::Bytes;
use tracing::{debug, error, trace, Span};

const SUBSYSTEM: &str = "sftp";

/// Where the session is in its connect sequence.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum SessionState {
    /// No channel, either closed by the transport or never opened.
    Closed,
    /// Waiting for the transport to confirm the channel.
    Opening,
    /// Waiting for the answer to the `sftp` subsystem request.
    SubsystemRequested,
    /// `INIT` is sent, waiting for `VERSION`.
    VersionNegotiating,
    /// Requests can be sent.
    Open,
}

/// Everything that only exists once the version is negotiated.
#[derive(Debug)]
struct Negotiated {
    protocol: Box<dyn Protocol>,
    requests: AwaitableResponses,
    server_version: u32,
    extensions: Extensions,
}

/// An sftp client session running over a [`Transport`].
///
/// Nothing happens in the background: the session only processes events
/// while it is driven by [`Session::run_until`], [`Session::run`],
/// [`Session::wait`] or [`Session::wait_ready`].
///
/// Every operation registers the request and sends it right away, then
/// returns an [`AwaitableResponse`] that is completed once the matching
/// response is processed. Failures reported by the server are delivered as
/// regular [`Response`]s.
///
/// Protocol violations such as a response to an unknown request id are
/// fatal: they are returned once, after which the session is poisoned and
/// every call fails with [`Error::SessionPoisoned`].
pub struct Session<T: Transport> {
    transport: T,
    channel: Option<T::Channel>,
    state: SessionState,
    reader: ReaderBuffered,
    negotiated: Option<Negotiated>,
    failed: bool,
    /// Set by [`Session::close_channel`] until the transport reports the close.
    closing: bool,
    max_version: u32,
    span: Span,
}

impl<T: Transport> fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("version", &self.version())
            .field("pending_requests", &self.pending_requests())
            .field("failed", &self.failed)
            .finish_non_exhaustive()
    }
}

impl<T: Transport> Session<T> {
    /// Create a session and ask `transport` to open its channel.
    ///
    /// The session is ready once [`Session::wait_ready`] returns.
    pub fn new(transport: T, options: SessionOptions) -> Result<Self, Error> {
        let max_version = options.get_max_version();
        if !(1..=MAX_SFTP_VERSION).contains(&max_version) {
            return Err(Error::UnsupportedSftpProtocol {
                version: max_version,
            });
        }

        let mut session = Self {
            transport,
            channel: None,
            state: SessionState::Closed,
            reader: ReaderBuffered::new(
                options.get_read_buffer_len(),
                options.get_max_packet_len(),
            ),
            negotiated: None,
            failed: false,
            closing: false,
            max_version,
            span: options.get_span(),
        };
        session.open_channel()?;

        Ok(session)
    }

    /// [`Session::new`] followed by [`Session::wait_ready`].
    pub async fn connect(transport: T, options: SessionOptions) -> Result<Self, Error> {
        let mut session = Self::new(transport, options)?;
        session.wait_ready().await?;
        Ok(session)
    }

    /// Start a new connect sequence on the same transport.
    ///
    /// Return `false` without doing anything unless the session is
    /// [`SessionState::Closed`].
    pub fn reconnect(&mut self) -> Result<bool, Error> {
        self.check_poisoned()?;

        if self.state != SessionState::Closed {
            return Ok(false);
        }

        self.reader.clear();
        self.open_channel()?;

        Ok(true)
    }

    /// Ask the transport to close the channel.
    ///
    /// The session becomes [`SessionState::Closed`] once the transport
    /// reports it, so it still needs to be driven. New requests fail with
    /// [`Error::ChannelClosed`] right away.
    pub fn close_channel(&mut self) -> Result<(), Error> {
        if let Some(channel) = &self.channel {
            debug!(parent: &self.span, "Closing the sftp channel");
            self.transport.close_channel(channel)?;
            self.closing = true;
        }
        Ok(())
    }

    fn open_channel(&mut self) -> Result<(), Error> {
        let channel = self.transport.open_channel()?;
        self.channel = Some(channel);
        self.set_state(SessionState::Opening);
        Ok(())
    }

    fn set_state(&mut self, state: SessionState) {
        debug!(parent: &self.span, from = ?self.state, to = ?state, "Session state changed");
        self.state = state;
    }
}

/// Getters
impl<T: Transport> Session<T> {
    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == SessionState::Open
    }

    /// Return true if a fatal error occurred.
    pub fn is_poisoned(&self) -> bool {
        self.failed
    }

    /// The negotiated protocol version.
    pub fn version(&self) -> Option<u32> {
        self.negotiated
            .as_ref()
            .map(|negotiated| negotiated.protocol.version())
    }

    /// The version announced by the server, which may be higher than
    /// [`Session::version`].
    pub fn server_version(&self) -> Option<u32> {
        self.negotiated
            .as_ref()
            .map(|negotiated| negotiated.server_version)
    }

    /// Extensions announced by the server.
    pub fn extensions(&self) -> Option<&Extensions> {
        self.negotiated
            .as_ref()
            .map(|negotiated| &negotiated.extensions)
    }

    /// Number of requests still waiting for their response.
    pub fn pending_requests(&self) -> usize {
        self.negotiated
            .as_ref()
            .map_or(0, |negotiated| negotiated.requests.len())
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }
}

/// Drive loop
impl<T: Transport> Session<T> {
    /// Process events until the version is negotiated.
    pub async fn wait_ready(&mut self) -> Result<(), Error> {
        self.run_until(|session| session.state == SessionState::Open)
            .await
    }

    /// Process events until no request is pending.
    pub async fn run(&mut self) -> Result<(), Error> {
        self.run_until(|session| session.pending_requests() == 0)
            .await
    }

    /// Process events until `done` returns true.
    ///
    /// `done` is checked before every event. Return [`Error::ChannelClosed`]
    /// if the channel is closed before `done` is satisfied.
    pub async fn run_until<F>(&mut self, mut done: F) -> Result<(), Error>
    where
        F: FnMut(&Self) -> bool,
    {
        loop {
            self.check_poisoned()?;
            if done(self) {
                break Ok(());
            }
            self.process_next_event().await?;
        }
    }

    /// Process events until the response of `awaitable` arrives.
    pub async fn wait(&mut self, mut awaitable: AwaitableResponse) -> Result<Response, Error> {
        loop {
            match awaitable.try_take() {
                Ok(Some(response)) => break Ok(response),
                Ok(None) => self.process_next_event().await?,
                Err(err) => {
                    self.check_poisoned()?;
                    break Err(err);
                }
            }
        }
    }

    fn check_poisoned(&self) -> Result<(), Error> {
        if self.failed {
            Err(Error::SessionPoisoned)
        } else {
            Ok(())
        }
    }

    /// Mark the session as failed and drop every pending request.
    fn poison(&mut self, err: Error) -> Error {
        error!(parent: &self.span, error = %err, "Sftp session failed");

        self.failed = true;
        if let Some(negotiated) = &mut self.negotiated {
            negotiated.requests.clear();
        }

        err
    }

    async fn process_next_event(&mut self) -> Result<(), Error> {
        self.check_poisoned()?;
        if self.state == SessionState::Closed {
            return Err(Error::ChannelClosed);
        }

        let transport = &mut self.transport;
        let event = poll_fn(|cx| transport.poll_event(cx)).await;

        let res = match event {
            Ok(event) => self.handle_event(event),
            Err(err) => Err(err.into()),
        };

        res.map_err(|err| self.poison(err))
    }

    fn handle_event(&mut self, event: ChannelEvent) -> Result<(), Error> {
        match event {
            ChannelEvent::OpenConfirmed => self.on_open_confirmed(),
            ChannelEvent::SubsystemResult { success } => self.on_subsystem_result(success),
            ChannelEvent::Data(data) => self.on_data(&data),
            ChannelEvent::ExtendedData(data) => {
                debug!(
                    parent: &self.span,
                    stderr = %String::from_utf8_lossy(&data).trim_end(),
                    "Sftp server diagnostics"
                );
                Ok(())
            }
            ChannelEvent::Closed => {
                self.on_closed();
                Ok(())
            }
        }
    }

    fn on_open_confirmed(&mut self) -> Result<(), Error> {
        let (SessionState::Opening, Some(channel)) = (self.state, &self.channel) else {
            return Err(Error::InvalidResponse(&"Unexpected channel open confirmation"));
        };

        self.transport.request_subsystem(channel, SUBSYSTEM)?;
        self.set_state(SessionState::SubsystemRequested);

        Ok(())
    }

    fn on_subsystem_result(&mut self, success: bool) -> Result<(), Error> {
        let (SessionState::SubsystemRequested, Some(channel)) = (self.state, &self.channel) else {
            return Err(Error::InvalidResponse(&"Unexpected subsystem request result"));
        };

        if !success {
            return Err(Error::SubsystemFailure {
                subsystem: SUBSYSTEM,
            });
        }

        let mut writer = WireWriter::packet(SSH_FXP_INIT);
        writer.put_u32(self.max_version);
        self.transport.send(channel, writer.finish()?)?;

        trace!(parent: &self.span, version = self.max_version, "Sent INIT");
        self.set_state(SessionState::VersionNegotiating);

        Ok(())
    }

    /// Feed `data` to the reader and dispatch every complete packet.
    fn on_data(&mut self, data: &[u8]) -> Result<(), Error> {
        self.reader.extend_from_slice(data);

        while let Some(packet) = self.reader.next_packet()? {
            self.handle_packet(packet)?;
        }

        Ok(())
    }

    fn handle_packet(&mut self, mut packet: Packet) -> Result<(), Error> {
        match packet.packet_type() {
            PacketType::Version => self.on_version(packet.payload()),
            packet_type @ (PacketType::Status
            | PacketType::Handle
            | PacketType::Data
            | PacketType::Name
            | PacketType::Attrs
            | PacketType::ExtendedReply) => self.on_response(packet_type, packet.payload()),
            packet_type => Err(Error::UnhandledPacketType {
                packet_type: packet_type.tag(),
            }),
        }
    }

    fn on_version(&mut self, reader: &mut WireReader) -> Result<(), Error> {
        if self.state != SessionState::VersionNegotiating {
            return Err(Error::InvalidResponse(&"Unexpected VERSION packet"));
        }

        let ServerVersion {
            version: server_version,
            extensions,
        } = ServerVersion::parse(reader)?;

        let version = negotiate_version(server_version, self.max_version)?;
        let protocol = protocol::for_version(version)?;

        debug!(
            parent: &self.span,
            server_version,
            version,
            extensions = extensions.len(),
            "Sftp version negotiated"
        );
        for (name, data) in extensions.iter() {
            trace!(
                parent: &self.span,
                name = %String::from_utf8_lossy(name),
                data = %String::from_utf8_lossy(data),
                "Server extension"
            );
        }

        self.negotiated = Some(Negotiated {
            protocol,
            requests: AwaitableResponses::new(),
            server_version,
            extensions,
        });
        self.set_state(SessionState::Open);

        Ok(())
    }

    fn on_response(&mut self, packet_type: PacketType, reader: &mut WireReader) -> Result<(), Error> {
        let id = reader.read_u32()?;

        // Nothing can be pending before the version is negotiated.
        let negotiated = self
            .negotiated
            .as_mut()
            .ok_or(Error::InvalidResponseId { response_id: id })?;

        let pending = negotiated.requests.remove(id)?;
        let response = negotiated.protocol.parse_response(packet_type, id, reader)?;

        trace!(parent: &self.span, id, ?packet_type, status = ?response.status, "Received response");

        if !pending.do_callback(response) {
            trace!(parent: &self.span, id, "Request was dropped, response discarded");
        }

        Ok(())
    }

    fn on_closed(&mut self) {
        debug!(
            parent: &self.span,
            dropped_requests = self.pending_requests(),
            "Sftp channel closed"
        );

        self.channel = None;
        self.negotiated = None;
        self.closing = false;
        self.reader.clear();
        self.set_state(SessionState::Closed);
    }
}

fn as_bytes(path: &Path) -> &[u8] {
    path.as_os_str().as_encoded_bytes()
}

/// Requests
impl<T: Transport> Session<T> {
    /// Register a request and send the frame `encode` produces for it.
    fn send_request<F>(&mut self, encode: F) -> Result<AwaitableResponse, Error>
    where
        F: FnOnce(&dyn Protocol, u32) -> Result<Bytes, Error>,
    {
        self.check_poisoned()?;
        if self.closing {
            return Err(Error::ChannelClosed);
        }

        let span = &self.span;
        let (Some(channel), Some(negotiated)) = (&self.channel, &mut self.negotiated) else {
            return Err(if self.state == SessionState::Closed {
                Error::ChannelClosed
            } else {
                Error::SessionNotOpen
            });
        };

        let awaitable = negotiated.requests.insert();
        let id = awaitable.id();

        let frame = match encode(&*negotiated.protocol, id) {
            Ok(frame) => frame,
            Err(err) => {
                negotiated.requests.cancel(id);
                return Err(err);
            }
        };

        trace!(parent: span, id, len = frame.len(), "Sending request");

        if let Err(err) = self.transport.send(channel, frame) {
            negotiated.requests.cancel(id);
            return Err(self.poison(err.into()));
        }

        Ok(awaitable)
    }

    /// Open the file at `path`, `attrs` only matter if it gets created.
    ///
    /// The response carries a [`Handle`].
    pub fn open(
        &mut self,
        path: impl AsRef<Path>,
        options: OpenOptions,
        attrs: &FileAttrs,
    ) -> Result<AwaitableResponse, Error> {
        let path = path.as_ref();
        self.send_request(|protocol, id| protocol.encode_open(id, as_bytes(path), options, attrs))
    }

    /// Close a handle returned by [`Session::open`] or [`Session::opendir`].
    pub fn close(&mut self, handle: &Handle) -> Result<AwaitableResponse, Error> {
        self.send_request(|protocol, id| protocol.encode_close(id, handle))
    }

    /// Read at most `len` bytes at `offset`.
    ///
    /// The server may return less, end of file is reported as an `Eof`
    /// status.
    pub fn read(
        &mut self,
        handle: &Handle,
        offset: u64,
        len: u32,
    ) -> Result<AwaitableResponse, Error> {
        self.send_request(|protocol, id| protocol.encode_read(id, handle, offset, len))
    }

    pub fn write(
        &mut self,
        handle: &Handle,
        offset: u64,
        data: &[u8],
    ) -> Result<AwaitableResponse, Error> {
        self.send_request(|protocol, id| protocol.encode_write(id, handle, offset, data))
    }

    /// Attributes of `path`, without following symlinks.
    pub fn lstat(&mut self, path: impl AsRef<Path>) -> Result<AwaitableResponse, Error> {
        let path = path.as_ref();
        self.send_request(|protocol, id| protocol.encode_lstat(id, as_bytes(path)))
    }

    pub fn fstat(&mut self, handle: &Handle) -> Result<AwaitableResponse, Error> {
        self.send_request(|protocol, id| protocol.encode_fstat(id, handle))
    }

    pub fn stat(&mut self, path: impl AsRef<Path>) -> Result<AwaitableResponse, Error> {
        let path = path.as_ref();
        self.send_request(|protocol, id| protocol.encode_stat(id, as_bytes(path)))
    }

    pub fn setstat(
        &mut self,
        path: impl AsRef<Path>,
        attrs: &FileAttrs,
    ) -> Result<AwaitableResponse, Error> {
        let path = path.as_ref();
        self.send_request(|protocol, id| protocol.encode_setstat(id, as_bytes(path), attrs))
    }

    pub fn fsetstat(
        &mut self,
        handle: &Handle,
        attrs: &FileAttrs,
    ) -> Result<AwaitableResponse, Error> {
        self.send_request(|protocol, id| protocol.encode_fsetstat(id, handle, attrs))
    }

    pub fn opendir(&mut self, path: impl AsRef<Path>) -> Result<AwaitableResponse, Error> {
        let path = path.as_ref();
        self.send_request(|protocol, id| protocol.encode_opendir(id, as_bytes(path)))
    }

    /// Read the next batch of entries, the last one is followed by an
    /// `Eof` status.
    pub fn readdir(&mut self, handle: &Handle) -> Result<AwaitableResponse, Error> {
        self.send_request(|protocol, id| protocol.encode_readdir(id, handle))
    }

    pub fn remove(&mut self, path: impl AsRef<Path>) -> Result<AwaitableResponse, Error> {
        let path = path.as_ref();
        self.send_request(|protocol, id| protocol.encode_remove(id, as_bytes(path)))
    }

    pub fn mkdir(
        &mut self,
        path: impl AsRef<Path>,
        attrs: &FileAttrs,
    ) -> Result<AwaitableResponse, Error> {
        let path = path.as_ref();
        self.send_request(|protocol, id| protocol.encode_mkdir(id, as_bytes(path), attrs))
    }

    pub fn rmdir(&mut self, path: impl AsRef<Path>) -> Result<AwaitableResponse, Error> {
        let path = path.as_ref();
        self.send_request(|protocol, id| protocol.encode_rmdir(id, as_bytes(path)))
    }

    /// Canonicalize `path` on the server.
    pub fn realpath(&mut self, path: impl AsRef<Path>) -> Result<AwaitableResponse, Error> {
        let path = path.as_ref();
        self.send_request(|protocol, id| protocol.encode_realpath(id, as_bytes(path)))
    }

    /// Fail with [`Error::UnsupportedOperation`] on protocol 1.
    ///
    /// `flags` are only sent from protocol 5 on.
    pub fn rename(
        &mut self,
        old_path: impl AsRef<Path>,
        new_path: impl AsRef<Path>,
        flags: RenameFlags,
    ) -> Result<AwaitableResponse, Error> {
        let (old_path, new_path) = (old_path.as_ref(), new_path.as_ref());
        self.send_request(|protocol, id| {
            protocol.encode_rename(id, as_bytes(old_path), as_bytes(new_path), flags)
        })
    }

    /// Fail with [`Error::UnsupportedOperation`] before protocol 3.
    pub fn readlink(&mut self, path: impl AsRef<Path>) -> Result<AwaitableResponse, Error> {
        let path = path.as_ref();
        self.send_request(|protocol, id| protocol.encode_readlink(id, as_bytes(path)))
    }

    /// Create a symlink at `link_path` pointing to `target_path`.
    ///
    /// Fail with [`Error::UnsupportedOperation`] before protocol 3.
    pub fn symlink(
        &mut self,
        link_path: impl AsRef<Path>,
        target_path: impl AsRef<Path>,
    ) -> Result<AwaitableResponse, Error> {
        let (link_path, target_path) = (link_path.as_ref(), target_path.as_ref());
        self.send_request(|protocol, id| {
            protocol.encode_symlink(id, as_bytes(link_path), as_bytes(target_path))
        })
    }

    /// Send the extended request `request`, e.g. `posix-rename@openssh.com`.
    ///
    /// `data` is appended as is, it must already be encoded the way the
    /// extension expects.
    pub fn extended(&mut self, request: &str, data: &[u8]) -> Result<AwaitableResponse, Error> {
        self.send_request(|protocol, id| protocol.encode_extended(id, request, data))
    }
}
