//! # Ordered aggregation for collection requests.
//!
//! [`Collector`] accumulates items from every handler of one dispatch and
//! returns them grouped by handler invocation order.
//!
//! ## Ordering
//! The dispatcher assigns each handler a bucket index before invoking it;
//! inline contributions and detached [`Contributor`] tokens inherit the
//! bucket active at their creation. The final take performs a stable sort
//! by bucket, so items keep handler order across handlers and insertion
//! order within one handler, even when deferred work from several handlers
//! finishes interleaved.
//!
//! ## Rules
//! - A collector belongs to exactly one send; cloning shares the same
//!   accumulator.
//! - Sealing is terminal: contributions after the seal fail with
//!   [`ReplyError::Closed`] and the already-taken result is unaffected.
//! - [`PendingCollection`] resolves once every outstanding [`Contributor`]
//!   has dropped (an all-complete join over the handlers' deferred work).

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};

use futures::task::AtomicWaker;

use crate::error::{ReplyError, SendError};
use crate::sync::lock;

struct Inner<T> {
    /// (bucket, item) pairs; sealed_and_taken sorts stably by bucket.
    items: Vec<(usize, T)>,
    sealed: bool,
}

struct Shared<T> {
    inner: Mutex<Inner<T>>,
    /// Bucket index of the handler currently being invoked.
    bucket: AtomicUsize,
    /// Outstanding contributor tokens; zero means all deferred work done.
    contributors: AtomicUsize,
    waker: AtomicWaker,
}

impl<T> Shared<T> {
    fn push_into(&self, bucket: usize, item: T) -> Result<(), ReplyError> {
        let mut inner = lock(&self.inner);
        if inner.sealed {
            return Err(ReplyError::Closed);
        }
        inner.items.push((bucket, item));
        Ok(())
    }
}

/// Ordered accumulator for a collection request's items.
///
/// Embed one in a message struct and implement
/// [`Collect`](crate::Collect) to make the message collection-shaped.
pub struct Collector<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Collector<T> {
    /// Creates an empty, unsealed accumulator.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    items: Vec::new(),
                    sealed: false,
                }),
                bucket: AtomicUsize::new(0),
                contributors: AtomicUsize::new(0),
                waker: AtomicWaker::new(),
            }),
        }
    }

    /// Appends an item under the currently dispatched handler's bucket.
    pub fn push(&self, item: T) -> Result<(), ReplyError> {
        let bucket = self.shared.bucket.load(Ordering::Acquire);
        self.shared.push_into(bucket, item)
    }

    /// Detaches a token bound to the currently dispatched handler's bucket.
    pub fn contributor(&self) -> Contributor<T> {
        self.shared.contributors.fetch_add(1, Ordering::AcqRel);
        Contributor {
            bucket: self.shared.bucket.load(Ordering::Acquire),
            shared: self.shared.clone(),
        }
    }

    /// Selects the bucket for the next handler invocation.
    pub(crate) fn set_bucket(&self, index: usize) {
        self.shared.bucket.store(index, Ordering::Release);
    }

    pub(crate) fn outstanding(&self) -> usize {
        self.shared.contributors.load(Ordering::Acquire)
    }

    pub(crate) fn register_waker(&self, waker: &Waker) {
        self.shared.waker.register(waker);
    }

    /// Seals the accumulator and returns the items in handler order.
    pub(crate) fn seal_and_take(&self) -> Vec<T> {
        let mut items = {
            let mut inner = lock(&self.shared.inner);
            inner.sealed = true;
            std::mem::take(&mut inner.items)
        };
        items.sort_by_key(|(bucket, _)| *bucket);
        items.into_iter().map(|(_, item)| item).collect()
    }
}

impl<T> Clone for Collector<T> {
    /// Clones share the same accumulator.
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T> Default for Collector<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Collector<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = lock(&self.shared.inner);
        write!(
            f,
            "Collector(items: {}, sealed: {}, outstanding: {})",
            inner.items.len(),
            inner.sealed,
            self.outstanding()
        )
    }
}

/// Outstanding-contribution token for appending after a handler returns.
///
/// Items pushed through the token land in the bucket of the handler that
/// detached it, so deferred work cannot scramble the result order.
pub struct Contributor<T> {
    shared: Arc<Shared<T>>,
    bucket: usize,
}

impl<T> Contributor<T> {
    /// Appends an item under the originating handler's bucket.
    pub fn push(&self, item: T) -> Result<(), ReplyError> {
        self.shared.push_into(self.bucket, item)
    }
}

impl<T> Clone for Contributor<T> {
    fn clone(&self) -> Self {
        self.shared.contributors.fetch_add(1, Ordering::AcqRel);
        Self {
            shared: self.shared.clone(),
            bucket: self.bucket,
        }
    }
}

impl<T> Drop for Contributor<T> {
    fn drop(&mut self) {
        if self.shared.contributors.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.shared.waker.wake();
        }
    }
}

impl<T> fmt::Debug for Contributor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Contributor(bucket: {})", self.bucket)
    }
}

enum CollectState<T> {
    /// Dispatch already failed; the error is surfaced on first poll.
    Failed(Option<SendError>),
    Waiting(Collector<T>),
}

/// Future returned by asynchronous collection sends.
///
/// Resolves with the ordered items once every outstanding [`Contributor`]
/// has dropped; handlers that detached no token cost nothing to wait for.
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct PendingCollection<T> {
    state: CollectState<T>,
}

impl<T> PendingCollection<T> {
    pub(crate) fn waiting(collector: Collector<T>) -> Self {
        Self {
            state: CollectState::Waiting(collector),
        }
    }

    pub(crate) fn failed(err: SendError) -> Self {
        Self {
            state: CollectState::Failed(Some(err)),
        }
    }
}

impl<T: Send> Future for PendingCollection<T> {
    type Output = Result<Vec<T>, SendError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let me = self.get_mut();
        match &mut me.state {
            CollectState::Failed(err) => {
                Poll::Ready(Err(err.take().unwrap_or(SendError::NoHandler)))
            }
            CollectState::Waiting(collector) => {
                if collector.outstanding() == 0 {
                    return Poll::Ready(Ok(collector.seal_and_take()));
                }
                collector.register_waker(cx.waker());
                if collector.outstanding() == 0 {
                    return Poll::Ready(Ok(collector.seal_and_take()));
                }
                Poll::Pending
            }
        }
    }
}

impl<T> fmt::Debug for PendingCollection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.state {
            CollectState::Failed(_) => f.write_str("PendingCollection(failed)"),
            CollectState::Waiting(collector) => write!(f, "PendingCollection({collector:?})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_inline_pushes_keep_bucket_order() {
        let collector = Collector::new();
        collector.set_bucket(1);
        collector.push("b1").expect("unsealed");
        collector.set_bucket(0);
        collector.push("a").expect("unsealed");
        collector.set_bucket(1);
        collector.push("b2").expect("unsealed");

        assert_eq!(collector.seal_and_take(), vec!["a", "b1", "b2"]);
    }

    #[test]
    fn test_push_after_seal_is_rejected() {
        let collector = Collector::new();
        collector.push(1).expect("unsealed");
        assert_eq!(collector.seal_and_take(), vec![1]);
        assert_eq!(collector.push(2), Err(ReplyError::Closed));
    }

    #[test]
    fn test_contributor_inherits_bucket() {
        let collector = Collector::new();
        collector.set_bucket(0);
        let early = collector.contributor();
        collector.set_bucket(1);
        collector.push("later").expect("unsealed");
        // Deferred item from the first handler still sorts first.
        early.push("earlier").expect("unsealed");
        drop(early);

        assert_eq!(collector.seal_and_take(), vec!["earlier", "later"]);
    }

    #[test]
    fn test_outstanding_tracks_tokens() {
        let collector: Collector<u8> = Collector::new();
        assert_eq!(collector.outstanding(), 0);

        let token = collector.contributor();
        let clone = token.clone();
        assert_eq!(collector.outstanding(), 2);

        drop(token);
        drop(clone);
        assert_eq!(collector.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_pending_collection_joins_deferred_work() {
        let collector = Collector::new();
        collector.set_bucket(0);
        let token = collector.contributor();
        let pending = PendingCollection::waiting(collector);

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.push(10).expect("unsealed");
        });

        assert_eq!(pending.await.ok(), Some(vec![10]));
    }

    #[tokio::test]
    async fn test_pending_collection_with_no_tokens_resolves_immediately() {
        let collector = Collector::new();
        collector.push(1).expect("unsealed");
        let pending = PendingCollection::waiting(collector);
        assert_eq!(pending.await.ok(), Some(vec![1]));
    }
}
