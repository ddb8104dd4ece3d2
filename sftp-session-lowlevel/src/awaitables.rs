#![forbid(unsafe_code)]

use super::{Error, Response};

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot::{self, error::TryRecvError};

/// The response to one request, once it arrives.
///
/// Resolves to [`Error::ChannelClosed`] if the session dropped the request
/// first, e.g. because the channel closed.
///
/// The session only makes progress while it is driven, so awaiting this
/// alone never completes unless something else runs the session. Prefer
/// `Session::wait`.
///
/// # Cancel Safety
///
/// It is perfectly safe to cancel the future, the response is discarded
/// when it arrives.
#[derive(Debug)]
pub struct AwaitableResponse {
    id: u32,
    receiver: oneshot::Receiver<Response>,
}

impl AwaitableResponse {
    pub(crate) fn new(id: u32, receiver: oneshot::Receiver<Response>) -> Self {
        Self { id, receiver }
    }

    /// The request id, for bookkeeping.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Return the response if it has already arrived.
    pub fn try_take(&mut self) -> Result<Option<Response>, Error> {
        match self.receiver.try_recv() {
            Ok(response) => Ok(Some(response)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Closed) => Err(Error::ChannelClosed),
        }
    }
}

impl Future for AwaitableResponse {
    type Output = Result<Response, Error>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|res| res.map_err(|_| Error::ChannelClosed))
    }
}
