//! # Single-assignment reply slot.
//!
//! [`ReplySlot`] is the synchronization primitive behind request/response
//! sends: a container that transitions out of `Pending` exactly once.
//!
//! ## State machine
//! ```text
//! Pending ──reply()────────────────► Replied(value)     (terminal)
//!    │
//!    └──last Responder dropped────► Failed              (terminal)
//! ```
//! The exit from `Pending` is guarded by an atomic compare-and-set, so the
//! `AlreadyReplied` contract holds without a lock even when two handlers
//! race from different threads. There is no cancelled state: once a request
//! is sent it resolves to `Replied` or fails as unanswered.
//!
//! ## Rules
//! - Cloning a [`ReplySlot`] shares the same slot; all clones observe one
//!   state.
//! - A [`Responder`] is an outstanding-producer token. When the last one
//!   drops while the slot is still pending, the slot fails, which is how an
//!   unanswered request resolves instead of hanging.
//! - A bare slot clone is **not** a producer token: deferred replies must
//!   detach a [`Responder`] before the handler returns.
//! - Waiters come in two shapes: a blocking wait used by the synchronous
//!   request path (condvar) and [`PendingReply`], a future used by the
//!   asynchronous path (atomic waker). Both observe the same transition.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::task::{Context, Poll};

use futures::task::AtomicWaker;

use crate::error::{ReplyError, SendError};
use crate::sync::lock;

const PENDING: u8 = 0;
const CLAIMED: u8 = 1;
const REPLIED: u8 = 2;
const FAILED: u8 = 3;

struct Shared<T> {
    /// PENDING -> CLAIMED -> (REPLIED | FAILED); CLAIMED is the brief
    /// window in which the winning writer stores the value.
    state: AtomicU8,
    /// Outstanding producer tokens; zero while pending means unanswered.
    responders: AtomicUsize,
    value: Mutex<Option<T>>,
    waker: AtomicWaker,
    wait_lock: Mutex<()>,
    wait_cv: Condvar,
}

impl<T> Shared<T> {
    fn new() -> Self {
        Self {
            state: AtomicU8::new(PENDING),
            responders: AtomicUsize::new(0),
            value: Mutex::new(None),
            waker: AtomicWaker::new(),
            wait_lock: Mutex::new(()),
            wait_cv: Condvar::new(),
        }
    }

    #[inline]
    fn is_done(&self) -> bool {
        self.state.load(Ordering::Acquire) >= REPLIED
    }

    fn complete(&self, value: T) -> Result<(), ReplyError> {
        match self
            .state
            .compare_exchange(PENDING, CLAIMED, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => {
                *lock(&self.value) = Some(value);
                self.state.store(REPLIED, Ordering::Release);
                self.wake();
                Ok(())
            }
            Err(_) => Err(ReplyError::AlreadyReplied),
        }
    }

    fn fail_if_pending(&self) {
        if self
            .state
            .compare_exchange(PENDING, CLAIMED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.state.store(FAILED, Ordering::Release);
            self.wake();
        }
    }

    fn wake(&self) {
        self.waker.wake();
        // Taking the wait lock orders this wake after any waiter's
        // check-then-wait, closing the lost-wakeup window.
        drop(lock(&self.wait_lock));
        self.wait_cv.notify_all();
    }

    fn take_result(&self) -> Result<T, SendError> {
        if self.state.load(Ordering::Acquire) == REPLIED {
            lock(&self.value).take().ok_or(SendError::NoHandler)
        } else {
            Err(SendError::NoHandler)
        }
    }

    fn state_name(&self) -> &'static str {
        match self.state.load(Ordering::Acquire) {
            PENDING => "pending",
            CLAIMED => "claimed",
            REPLIED => "replied",
            _ => "failed",
        }
    }
}

/// Single-assignment container for a request's response.
///
/// Embed one in a message struct and implement
/// [`Request`](crate::Request) to make the message request-shaped.
pub struct ReplySlot<T> {
    shared: Arc<Shared<T>>,
}

impl<T> ReplySlot<T> {
    /// Creates a pending slot.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared::new()),
        }
    }

    /// Writes the response; the first writer wins.
    ///
    /// # Example
    /// ```
    /// use switchboard::{ReplyError, ReplySlot};
    ///
    /// let slot = ReplySlot::new();
    /// assert_eq!(slot.reply(7), Ok(()));
    /// assert_eq!(slot.reply(8), Err(ReplyError::AlreadyReplied));
    /// ```
    pub fn reply(&self, value: T) -> Result<(), ReplyError> {
        self.shared.complete(value)
    }

    /// True while no reply has been written and the slot has not failed.
    pub fn is_pending(&self) -> bool {
        self.shared.state.load(Ordering::Acquire) == PENDING
    }

    /// Detaches an outstanding-producer token for deferred replies.
    pub fn responder(&self) -> Responder<T> {
        self.shared.responders.fetch_add(1, Ordering::AcqRel);
        Responder {
            shared: self.shared.clone(),
        }
    }

    /// Blocks the calling thread until the slot resolves.
    pub(crate) fn wait_blocking(&self) -> Result<T, SendError> {
        {
            let mut guard = lock(&self.shared.wait_lock);
            while !self.shared.is_done() {
                guard = self
                    .shared
                    .wait_cv
                    .wait(guard)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        }
        self.shared.take_result()
    }

    /// Future-style wait; register-then-recheck avoids a lost wakeup.
    pub(crate) fn poll_take(&self, cx: &mut Context<'_>) -> Poll<Result<T, SendError>> {
        if self.shared.is_done() {
            return Poll::Ready(self.shared.take_result());
        }
        self.shared.waker.register(cx.waker());
        if self.shared.is_done() {
            return Poll::Ready(self.shared.take_result());
        }
        Poll::Pending
    }
}

impl<T> Clone for ReplySlot<T> {
    /// Clones share the same slot.
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T> Default for ReplySlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ReplySlot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ReplySlot({})", self.shared.state_name())
    }
}

/// Outstanding-producer token for replying after a handler returns.
///
/// Hand one to a spawned task (or another thread) to reply later; the
/// request resolves as unanswered only after every token has dropped with
/// the slot still pending.
pub struct Responder<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Responder<T> {
    /// Writes the response; the first writer wins.
    pub fn reply(&self, value: T) -> Result<(), ReplyError> {
        self.shared.complete(value)
    }

    /// True while no reply has been written and the slot has not failed.
    pub fn is_pending(&self) -> bool {
        self.shared.state.load(Ordering::Acquire) == PENDING
    }
}

impl<T> Clone for Responder<T> {
    fn clone(&self) -> Self {
        self.shared.responders.fetch_add(1, Ordering::AcqRel);
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T> Drop for Responder<T> {
    fn drop(&mut self) {
        if self.shared.responders.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.shared.fail_if_pending();
        }
    }
}

impl<T> fmt::Debug for Responder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Responder({})", self.shared.state_name())
    }
}

enum ReplyState<T> {
    /// Dispatch already failed; the error is surfaced on first poll.
    Failed(Option<SendError>),
    Waiting(ReplySlot<T>),
}

/// Future returned by asynchronous request sends.
///
/// Resolves once the reply slot is written, even when the write happens
/// long after the responding handler returned, or fails with
/// [`SendError::NoHandler`] once the last outstanding [`Responder`] drops
/// with the slot still pending. Dropping the future abandons the request
/// without notifying in-flight handler work.
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct PendingReply<T> {
    state: ReplyState<T>,
}

impl<T> PendingReply<T> {
    pub(crate) fn waiting(slot: ReplySlot<T>) -> Self {
        Self {
            state: ReplyState::Waiting(slot),
        }
    }

    pub(crate) fn failed(err: SendError) -> Self {
        Self {
            state: ReplyState::Failed(Some(err)),
        }
    }
}

impl<T: Send> Future for PendingReply<T> {
    type Output = Result<T, SendError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let me = self.get_mut();
        match &mut me.state {
            ReplyState::Failed(err) => Poll::Ready(Err(err.take().unwrap_or(SendError::NoHandler))),
            ReplyState::Waiting(slot) => slot.poll_take(cx),
        }
    }
}

impl<T> fmt::Debug for PendingReply<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.state {
            ReplyState::Failed(_) => f.write_str("PendingReply(failed)"),
            ReplyState::Waiting(slot) => write!(f, "PendingReply({})", slot.shared.state_name()),
        }
    }
}
