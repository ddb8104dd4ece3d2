use super::{ChannelEvent, Transport};

use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use bytes::{Buf, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::io::poll_read_buf;

/// [`Transport`] over a reader/writer pair that is already connected to
/// an sftp server.
///
/// It is meant for the stdout/stdin of `ssh -s host sftp`, of a local
/// `sftp-server`, or of a subsystem spawned with `openssh`. Since the
/// subsystem is already running, opening the channel and requesting the
/// subsystem succeed immediately.
///
/// Writes are queued by [`Transport::send`] and flushed while
/// [`Transport::poll_event`] is polled.
#[derive(Debug)]
pub struct PipeTransport<R, W> {
    reader: R,
    writer: W,

    read_buffer: BytesMut,
    read_buffer_len: usize,

    write_queue: VecDeque<Bytes>,
    need_flush: bool,

    events: VecDeque<ChannelEvent>,
    shutdown_requested: bool,
    closed: bool,
}

impl<R, W> PipeTransport<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self::with_read_buffer_len(reader, writer, super::OPENSSH_PORTABLE_DEFAULT_COPY_BUFLEN)
    }

    /// * `read_buffer_len` - number of bytes reserved before each read.
    pub fn with_read_buffer_len(reader: R, writer: W, read_buffer_len: usize) -> Self {
        let read_buffer_len = read_buffer_len.max(1);

        Self {
            reader,
            writer,
            read_buffer: BytesMut::with_capacity(read_buffer_len),
            read_buffer_len,
            write_queue: VecDeque::new(),
            need_flush: false,
            events: VecDeque::new(),
            shutdown_requested: false,
            closed: false,
        }
    }

    /// Number of bytes queued but not yet written.
    pub fn queued_bytes(&self) -> usize {
        self.write_queue.iter().map(Bytes::len).sum()
    }

    pub fn into_inner(self) -> (R, W) {
        (self.reader, self.writer)
    }

    fn check_open(&self) -> io::Result<()> {
        if self.closed {
            Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "The pipe to the sftp server is closed",
            ))
        } else {
            Ok(())
        }
    }

    fn poll_write_queue(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        while let Some(front) = self.write_queue.front_mut() {
            let n = ready!(Pin::new(&mut self.writer).poll_write(cx, front))?;
            if n == 0 {
                return Poll::Ready(Err(io::ErrorKind::WriteZero.into()));
            }

            front.advance(n);
            if front.is_empty() {
                self.write_queue.pop_front();
            }
            self.need_flush = true;
        }

        if self.need_flush {
            ready!(Pin::new(&mut self.writer).poll_flush(cx))?;
            self.need_flush = false;
        }

        Poll::Ready(Ok(()))
    }
}

impl<R, W> Transport for PipeTransport<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// There is only one channel: the pipe itself.
    type Channel = ();

    fn open_channel(&mut self) -> io::Result<()> {
        self.check_open()?;
        self.events.push_back(ChannelEvent::OpenConfirmed);
        Ok(())
    }

    fn request_subsystem(&mut self, _channel: &(), _name: &str) -> io::Result<()> {
        self.check_open()?;
        self.events
            .push_back(ChannelEvent::SubsystemResult { success: true });
        Ok(())
    }

    fn send(&mut self, _channel: &(), data: Bytes) -> io::Result<()> {
        self.check_open()?;
        if self.shutdown_requested {
            return Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "The pipe to the sftp server is shutting down",
            ));
        }
        self.write_queue.push_back(data);
        Ok(())
    }

    /// Flush whatever is queued, then shut the writer down.
    fn close_channel(&mut self, _channel: &()) -> io::Result<()> {
        self.shutdown_requested = true;
        Ok(())
    }

    fn poll_event(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<ChannelEvent>> {
        if let Some(event) = self.events.pop_front() {
            return Poll::Ready(Ok(event));
        }
        if self.closed {
            return Poll::Pending;
        }

        // Pending writes must not prevent responses already sent by the
        // server from being read.
        let flushed = match self.poll_write_queue(cx) {
            Poll::Ready(res) => {
                res?;
                true
            }
            Poll::Pending => false,
        };

        if flushed && self.shutdown_requested {
            ready!(Pin::new(&mut self.writer).poll_shutdown(cx))?;
            self.closed = true;
            return Poll::Ready(Ok(ChannelEvent::Closed));
        }

        if self.read_buffer.capacity() == self.read_buffer.len() {
            self.read_buffer.reserve(self.read_buffer_len);
        }

        match ready!(poll_read_buf(
            Pin::new(&mut self.reader),
            cx,
            &mut self.read_buffer
        ))? {
            0 => {
                self.closed = true;
                Poll::Ready(Ok(ChannelEvent::Closed))
            }
            _ => Poll::Ready(Ok(ChannelEvent::Data(self.read_buffer.split().freeze()))),
        }
    }
}
