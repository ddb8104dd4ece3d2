#![forbid(unsafe_code)]

use super::{AwaitableResponse, Error, Response};

use std::collections::HashMap;

use tokio::sync::oneshot;

/// The pending request table: request id to the completion of the caller
/// waiting for its response.
///
/// Every id is handed out by [`AwaitableResponses::insert`] and removed
/// exactly once, either by [`AwaitableResponses::remove`] when the response
/// arrives or by [`AwaitableResponses::cancel`] when the request could not
/// be sent.
#[derive(Debug, Default)]
pub struct AwaitableResponses {
    pending: HashMap<u32, oneshot::Sender<Response>>,
    next_id: u32,
}

impl AwaitableResponses {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start allocating ids from `id`, mostly useful for testing wrap
    /// around.
    pub fn with_first_id(id: u32) -> Self {
        Self {
            pending: HashMap::new(),
            next_id: id,
        }
    }

    /// Ids are allocated sequentially, skipping those still pending once
    /// the counter wraps around.
    fn allocate_id(&mut self) -> u32 {
        loop {
            let id = self.next_id;
            self.next_id = self.next_id.wrapping_add(1);

            if !self.pending.contains_key(&id) {
                break id;
            }
        }
    }

    /// Allocate a fresh id and register a completion for it.
    pub fn insert(&mut self) -> AwaitableResponse {
        let id = self.allocate_id();
        let (sender, receiver) = oneshot::channel();

        self.pending.insert(id, sender);

        AwaitableResponse::new(id, receiver)
    }

    /// Remove the completion of `id`.
    ///
    /// Return [`Error::InvalidResponseId`] if it was never issued or has
    /// already been removed.
    pub fn remove(&mut self, id: u32) -> Result<PendingResponse, Error> {
        self.pending
            .remove(&id)
            .map(|sender| PendingResponse { id, sender })
            .ok_or(Error::InvalidResponseId { response_id: id })
    }

    /// Forget about `id` without completing it, the awaiting side observes
    /// [`Error::ChannelClosed`].
    pub fn cancel(&mut self, id: u32) -> bool {
        self.pending.remove(&id).is_some()
    }

    /// Drop every pending completion.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn contains(&self, id: u32) -> bool {
        self.pending.contains_key(&id)
    }

    /// Number of requests waiting for their response.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// A completion taken out of the table, about to receive its response.
#[derive(Debug)]
pub struct PendingResponse {
    id: u32,
    sender: oneshot::Sender<Response>,
}

impl PendingResponse {
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Deliver `response`.
    ///
    /// Return false if the caller has dropped its [`AwaitableResponse`],
    /// in which case the response is discarded.
    pub fn do_callback(self, response: Response) -> bool {
        self.sender.send(response).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ResponsePayload, StatusCode};

    use pretty_assertions::assert_eq;

    fn response(id: u32) -> Response {
        Response::with_payload(id, ResponsePayload::None)
    }

    #[test]
    fn test_ids_are_unique_across_wrap_around() {
        let mut responses = AwaitableResponses::with_first_id(u32::MAX - 1);

        let first = responses.insert();
        let second = responses.insert();
        let third = responses.insert();
        assert_eq!(
            [first.id(), second.id(), third.id()],
            [u32::MAX - 1, u32::MAX, 0]
        );

        // 1 is skipped since it is still pending.
        let mut responses = AwaitableResponses::with_first_id(1);
        let pending = responses.insert();
        responses.next_id = 1;
        assert_eq!(responses.insert().id(), 2);
        assert_eq!(pending.id(), 1);
    }

    #[tokio::test]
    async fn test_remove_exactly_once() {
        let mut responses = AwaitableResponses::new();
        let awaitable = responses.insert();
        let id = awaitable.id();

        let pending = responses.remove(id).unwrap();
        assert!(matches!(
            responses.remove(id),
            Err(Error::InvalidResponseId { response_id }) if response_id == id
        ));

        assert!(pending.do_callback(response(id)));
        let response = awaitable.await.unwrap();
        assert_eq!(response.id, id);
        assert_eq!(response.status, StatusCode::Success);
        assert!(responses.is_empty());
    }

    #[tokio::test]
    async fn test_clear_closes_awaitables() {
        let mut responses = AwaitableResponses::new();
        let awaitable = responses.insert();
        assert_eq!(responses.len(), 1);

        responses.clear();

        assert!(matches!(awaitable.await, Err(Error::ChannelClosed)));
    }

    #[test]
    fn test_dropped_awaitable() {
        let mut responses = AwaitableResponses::new();
        let id = responses.insert().id();

        assert!(!responses.remove(id).unwrap().do_callback(response(id)));
    }
}
