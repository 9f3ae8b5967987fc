use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::channel::oneshot;
use futures::FutureExt;

use super::registry::Reply;
use crate::error::CacheError;
use crate::view::Page;

/// Outcome of a read: a future that may already be resolved.
///
/// Cache hits and immediate failures (such as a missing getter) resolve
/// without suspending. Misses resolve when the pending fetch they were
/// attached to settles.
///
/// ```ignore
/// // Synchronous style: only succeeds if the result is already known.
/// let page = cache.get(&options).now().expect("range is cached")?;
///
/// // Asynchronous style.
/// let page = cache.get_with(&options, getter).await?;
/// ```
#[must_use = "a Fetch does nothing unless polled or checked with `now`"]
pub struct Fetch {
    state: State,
}

enum State {
    Ready(Option<Reply>),
    Waiting(oneshot::Receiver<Reply>),
}

impl Fetch {
    pub(crate) fn ready(reply: Reply) -> Self {
        Self {
            state: State::Ready(Some(reply)),
        }
    }

    pub(crate) fn waiting(receiver: oneshot::Receiver<Reply>) -> Self {
        Self {
            state: State::Waiting(receiver),
        }
    }

    /// Take the result if it is already known, without waiting.
    ///
    /// Returns `None` while the underlying fetch is still pending.
    pub fn now(self) -> Option<Result<Page, CacheError>> {
        self.now_or_never()
    }
}

impl Future for Fetch {
    type Output = Result<Page, CacheError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().state {
            State::Ready(reply) => {
                Poll::Ready(reply.take().unwrap_or(Err(CacheError::Abandoned)))
            }
            State::Waiting(receiver) => receiver
                .poll_unpin(cx)
                .map(|reply| reply.unwrap_or(Err(CacheError::Abandoned))),
        }
    }
}
