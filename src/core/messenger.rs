//! # Messenger: registration surface and dispatch engine.
//!
//! The [`Messenger`] owns one registration store and dispatches messages
//! over it. It owns no threads and no queues: every send executes on the
//! calling thread, and asynchrony only ever comes from a handler's own
//! spawned work writing a reply slot or collector later.
//!
//! ## High-level architecture
//! ```text
//! register(recipient, handler)               send / request / collect
//!        │                                            │
//!        ▼                                            ▼
//! ┌───────────────────────────────┐   snapshot  ┌─────────────────────────────┐
//! │ Registry                      │ ──────────► │ dispatch loop               │
//! │  (TypeId, Channel) → entries  │  (ordered   │  - invoke handlers in       │
//! │  one mutex per instance       │   copy, no  │    registration order       │
//! │  dead weak entries purged     │   lock held)│  - catch handler panics     │
//! └───────────────────────────────┘             │  - stop early once a reply  │
//!                                               │    slot is written          │
//!                                               └──────────────┬──────────────┘
//!                                                              │
//!                                              handler(&recipient, &message)
//!                                                              │
//!                                          ┌───────────────────┴───────┐
//!                                          ▼                           ▼
//!                                   ReplySlot / Responder     Collector / Contributor
//!                                   (request sends)           (collection sends)
//! ```
//!
//! ## Reentrancy
//! The dispatch loop runs on a snapshot copied out of the registry before
//! the first handler is invoked, so handlers may freely register,
//! unregister (including themselves), or send on the same messenger during
//! their own invocation. The in-flight send keeps delivering to its
//! snapshot; the next send observes the mutation.
//!
//! ## Concurrency
//! Registry operations may be called concurrently from independent
//! threads; the store's mutex serializes them. Handler invocation is never
//! under that mutex, so two concurrent sends of the same message type may
//! invoke the same handler concurrently from different threads. Within one
//! send, handlers observe strict registration order; across concurrent
//! sends, no ordering is guaranteed, and a registration racing a send
//! lands before or after that send's snapshot, never half-way.

use std::any::{Any, TypeId};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};

use crate::channel::Channel;
use crate::core::config::{MessengerConfig, Retention};
use crate::error::{HandlerFailure, RegisterError, SendError};
use crate::messages::{Collect, Message, PendingCollection, PendingReply, Request};
use crate::recipients::{Erased, Receive, RecipientHandle, RecipientId};
use crate::registry::{DispatchEntry, Entry, ErasedHandler, Registry};

/// In-process typed publish/subscribe messenger.
///
/// Each instance is fully isolated: its registrations are invisible to
/// every other instance, including the process-wide [`Messenger::global`].
///
/// ## Example
/// ```
/// use std::sync::Arc;
/// use switchboard::Messenger;
///
/// struct Display;
/// struct Tick(u64);
///
/// let bus = Messenger::strong();
/// let display = Arc::new(Display);
///
/// bus.register(&display, |_display: &Display, tick: &Tick| {
///     assert_eq!(tick.0, 3);
/// })
/// .unwrap();
///
/// bus.send(Tick(3)).unwrap();
/// ```
pub struct Messenger {
    registry: Registry,
    config: MessengerConfig,
}

impl Messenger {
    /// Creates an instance that owns its recipients ([`Retention::Strong`]).
    pub fn strong() -> Self {
        Self::with_config(MessengerConfig {
            retention: Retention::Strong,
            ..MessengerConfig::default()
        })
    }

    /// Creates an instance that never keeps recipients alive
    /// ([`Retention::Weak`]).
    pub fn weak() -> Self {
        Self::with_config(MessengerConfig {
            retention: Retention::Weak,
            ..MessengerConfig::default()
        })
    }

    /// Creates an instance with explicit configuration.
    pub fn with_config(config: MessengerConfig) -> Self {
        Self {
            registry: Registry::new(),
            config,
        }
    }

    /// The process-wide default instance (weak retention).
    ///
    /// Lazily constructed on first use and never torn down; it lives for
    /// the process duration. It is the same machinery as an explicitly
    /// constructed instance, only shared.
    pub fn global() -> &'static Messenger {
        static GLOBAL: OnceLock<Messenger> = OnceLock::new();
        GLOBAL.get_or_init(Messenger::weak)
    }

    /// Recipient lifecycle policy of this instance.
    #[inline]
    pub fn retention(&self) -> Retention {
        self.config.retention
    }

    // ---- Registration ----

    /// Registers a handler for `M` on the default channel.
    pub fn register<R, M, F>(&self, recipient: &Arc<R>, handler: F) -> Result<(), RegisterError>
    where
        R: Send + Sync + 'static,
        M: Message,
        F: Fn(&R, &M) + Send + Sync + 'static,
    {
        self.register_on(recipient, Channel::default(), handler)
    }

    /// Registers a handler for `M` on the given channel.
    ///
    /// Fails with [`RegisterError::DuplicateRegistration`] when the same
    /// recipient already has a live handler for the same (message type,
    /// channel); replacing a handler is unregister-then-register.
    ///
    /// The handler is invoked on the sender's thread with the recipient
    /// and the message. Under weak retention the closure must not capture
    /// its own recipient `Arc`, or the capture itself keeps the recipient
    /// alive; the recipient is passed in instead.
    pub fn register_on<R, M, F>(
        &self,
        recipient: &Arc<R>,
        channel: Channel,
        handler: F,
    ) -> Result<(), RegisterError>
    where
        R: Send + Sync + 'static,
        M: Message,
        F: Fn(&R, &M) + Send + Sync + 'static,
    {
        let erased: ErasedHandler = Arc::new(move |recipient: &Erased, message: &Erased| {
            // Unreachable mismatch: the entry is only ever resolved through
            // its own (TypeId, Channel) key.
            let (Some(recipient), Some(message)) =
                (recipient.downcast_ref::<R>(), message.downcast_ref::<M>())
            else {
                return;
            };
            handler(recipient, message);
        });

        let handle = match self.config.retention {
            Retention::Strong => RecipientHandle::strong(recipient),
            Retention::Weak => RecipientHandle::weak(recipient),
        };

        self.registry.register(
            TypeId::of::<M>(),
            std::any::type_name::<M>(),
            channel,
            Entry {
                recipient: handle,
                handler: erased,
                recipient_type: std::any::type_name::<R>(),
            },
        )
    }

    /// Registers a [`Receive`] implementor for `M` on the default channel.
    pub fn register_receiver<R, M>(&self, recipient: &Arc<R>) -> Result<(), RegisterError>
    where
        R: Receive<M>,
        M: Message,
    {
        self.register_receiver_on(recipient, Channel::default())
    }

    /// Registers a [`Receive`] implementor for `M` on the given channel.
    pub fn register_receiver_on<R, M>(
        &self,
        recipient: &Arc<R>,
        channel: Channel,
    ) -> Result<(), RegisterError>
    where
        R: Receive<M>,
        M: Message,
    {
        self.register_on(recipient, channel, <R as Receive<M>>::receive)
    }

    // ---- Unregistration ----

    /// Removes the recipient's handler for `M` on the default channel.
    ///
    /// All unregister variants are idempotent: removing what is not there
    /// is a no-op.
    pub fn unregister<M, R>(&self, recipient: &Arc<R>)
    where
        M: Message,
        R: Send + Sync + 'static,
    {
        self.unregister_on::<M, R>(recipient, &Channel::default());
    }

    /// Removes the recipient's handler for `M` on the given channel.
    pub fn unregister_on<M, R>(&self, recipient: &Arc<R>, channel: &Channel)
    where
        M: Message,
        R: Send + Sync + 'static,
    {
        self.registry.unregister(
            RecipientId::of(recipient),
            Some(TypeId::of::<M>()),
            Some(channel),
        );
    }

    /// Removes every handler the recipient has on the given channel.
    pub fn unregister_channel<R>(&self, recipient: &Arc<R>, channel: &Channel)
    where
        R: Send + Sync + 'static,
    {
        self.registry
            .unregister(RecipientId::of(recipient), None, Some(channel));
    }

    /// Removes every handler the recipient has in this instance.
    pub fn unregister_all<R>(&self, recipient: &Arc<R>)
    where
        R: Send + Sync + 'static,
    {
        self.registry
            .unregister(RecipientId::of(recipient), None, None);
    }

    // ---- Queries ----

    /// True if the recipient has a live handler for `M` on the default
    /// channel.
    pub fn is_registered<M, R>(&self, recipient: &Arc<R>) -> bool
    where
        M: Message,
        R: Send + Sync + 'static,
    {
        self.is_registered_on::<M, R>(recipient, &Channel::default())
    }

    /// True if the recipient has a live handler for `M` on the given
    /// channel.
    pub fn is_registered_on<M, R>(&self, recipient: &Arc<R>, channel: &Channel) -> bool
    where
        M: Message,
        R: Send + Sync + 'static,
    {
        self.registry
            .is_registered(RecipientId::of(recipient), TypeId::of::<M>(), channel)
    }

    // ---- Sending ----

    /// Broadcasts a message on the default channel.
    pub fn send<M: Message>(&self, message: M) -> Result<(), SendError> {
        self.send_on(message, Channel::default())
    }

    /// Broadcasts a message on the given channel.
    ///
    /// Every live handler registered for (`M`, channel) is invoked in
    /// registration order on the calling thread. Zero registrants is valid
    /// and silent. A panicking handler surfaces as
    /// [`SendError::HandlerPanicked`]; see [`ErrorPolicy`] for whether the
    /// rest of the snapshot still runs.
    ///
    /// [`ErrorPolicy`]: crate::ErrorPolicy
    pub fn send_on<M: Message>(&self, message: M, channel: Channel) -> Result<(), SendError> {
        self.dispatch(&message, &channel, |_| true)
    }

    /// Sends a request on the default channel and blocks for the reply.
    pub fn request<M: Request>(&self, message: M) -> Result<M::Reply, SendError> {
        self.request_on(message, Channel::default())
    }

    /// Sends a request on the given channel and blocks for the reply.
    ///
    /// Handlers run in registration order until one writes the reply slot;
    /// the remaining handlers are then skipped. A handler may instead
    /// detach a [`Responder`](crate::Responder) and reply from another
    /// thread, in which case this call blocks until the reply lands. The
    /// send fails with [`SendError::NoHandler`] once every handler has
    /// returned and every detached responder has dropped with the slot
    /// still pending.
    ///
    /// ## Example
    /// ```
    /// use std::sync::Arc;
    /// use switchboard::{Messenger, ReplySlot, Request};
    ///
    /// struct Store;
    /// struct Lookup {
    ///     key: &'static str,
    ///     reply: ReplySlot<Option<u32>>,
    /// }
    ///
    /// impl Request for Lookup {
    ///     type Reply = Option<u32>;
    ///     fn reply_slot(&self) -> &ReplySlot<Self::Reply> {
    ///         &self.reply
    ///     }
    /// }
    ///
    /// let bus = Messenger::strong();
    /// let store = Arc::new(Store);
    /// bus.register(&store, |_: &Store, lookup: &Lookup| {
    ///     let found = (lookup.key == "answer").then_some(42);
    ///     let _ = lookup.reply(found);
    /// })
    /// .unwrap();
    ///
    /// let value = bus
    ///     .request(Lookup { key: "answer", reply: ReplySlot::new() })
    ///     .unwrap();
    /// assert_eq!(value, Some(42));
    /// ```
    pub fn request_on<M: Request>(&self, message: M, channel: Channel) -> Result<M::Reply, SendError> {
        let slot = message.reply_slot().clone();
        let guard = slot.responder();
        let outcome = self.dispatch(&message, &channel, |_| slot.is_pending());
        drop(guard);
        drop(message);
        outcome?;
        slot.wait_blocking()
    }

    /// Sends a request on the default channel, returning a future for the
    /// reply.
    pub fn request_async<M: Request>(&self, message: M) -> PendingReply<M::Reply> {
        self.request_async_on(message, Channel::default())
    }

    /// Sends a request on the given channel, returning a future for the
    /// reply.
    ///
    /// Handlers are invoked synchronously before this returns; the future
    /// resolves once the reply slot is written, even when the write happens
    /// after the responding handler's own spawned work completes. Dropping
    /// the future abandons the request without cancelling that work.
    pub fn request_async_on<M: Request>(&self, message: M, channel: Channel) -> PendingReply<M::Reply> {
        let slot = message.reply_slot().clone();
        let guard = slot.responder();
        let outcome = self.dispatch(&message, &channel, |_| slot.is_pending());
        drop(guard);
        drop(message);
        match outcome {
            Ok(()) => PendingReply::waiting(slot),
            Err(err) => PendingReply::failed(err),
        }
    }

    /// Sends a collection request on the default channel.
    pub fn collect<M: Collect>(&self, message: M) -> Result<Vec<M::Item>, SendError> {
        self.collect_on(message, Channel::default())
    }

    /// Sends a collection request on the given channel.
    ///
    /// Every handler in the snapshot runs and may contribute any number of
    /// items; the result preserves handler invocation order. Zero handlers
    /// yields an empty sequence, not an error. The collection seals when
    /// the last snapshot handler returns, so deferred contributions need
    /// [`collect_async_on`](Self::collect_async_on).
    pub fn collect_on<M: Collect>(&self, message: M, channel: Channel) -> Result<Vec<M::Item>, SendError> {
        let collector = message.collector().clone();
        let outcome = self.dispatch(&message, &channel, |index| {
            collector.set_bucket(index);
            true
        });
        drop(message);
        outcome?;
        Ok(collector.seal_and_take())
    }

    /// Sends a collection request on the default channel, returning a
    /// future for the items.
    pub fn collect_async<M: Collect>(&self, message: M) -> PendingCollection<M::Item> {
        self.collect_async_on(message, Channel::default())
    }

    /// Sends a collection request on the given channel, returning a future
    /// for the items.
    ///
    /// Handlers are invoked synchronously before this returns; the future
    /// resolves once every [`Contributor`](crate::Contributor) token they
    /// detached has dropped, joining all deferred work. Items keep handler
    /// invocation order regardless of completion order.
    pub fn collect_async_on<M: Collect>(&self, message: M, channel: Channel) -> PendingCollection<M::Item> {
        let collector = message.collector().clone();
        let outcome = self.dispatch(&message, &channel, |index| {
            collector.set_bucket(index);
            true
        });
        drop(message);
        match outcome {
            Ok(()) => PendingCollection::waiting(collector),
            Err(err) => PendingCollection::failed(err),
        }
    }

    // ---- Maintenance ----

    /// Purges every dead weak registration in the instance.
    ///
    /// Purely an eager form of the pruning that registration, snapshot,
    /// and unregister passes already perform on the buckets they touch.
    pub fn cleanup(&self) {
        self.registry.cleanup();
    }

    /// Drops every registration in the instance.
    pub fn reset(&self) {
        self.registry.clear();
    }

    // ---- Dispatch core ----

    /// Snapshots the registry for (`M`, channel) and invokes the handlers
    /// in registration order. `proceed` runs before each handler with its
    /// snapshot index; returning false stops the loop (used by request
    /// sends once the reply slot is written, and by collection sends to
    /// stamp bucket indices).
    fn dispatch<M: Message>(
        &self,
        message: &M,
        channel: &Channel,
        mut proceed: impl FnMut(usize) -> bool,
    ) -> Result<(), SendError> {
        let snapshot = self.registry.snapshot(TypeId::of::<M>(), channel);
        tracing::trace!(
            message_type = std::any::type_name::<M>(),
            handlers = snapshot.len(),
            channel = ?channel,
            "dispatching"
        );

        let message_ref: &Erased = message;
        let mut failures = Vec::new();
        for (index, entry) in snapshot.iter().enumerate() {
            if !proceed(index) {
                break;
            }
            if let Err(failure) = invoke(entry, message_ref) {
                tracing::debug!(
                    recipient = failure.recipient,
                    reason = %failure.reason,
                    "handler panicked during dispatch"
                );
                failures.push(failure);
                if self.config.errors.fail_fast() {
                    break;
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(SendError::HandlerPanicked { failures })
        }
    }
}

/// Invokes one handler, converting a panic into a captured failure.
fn invoke(entry: &DispatchEntry, message: &Erased) -> Result<(), HandlerFailure> {
    let call = AssertUnwindSafe(|| (entry.handler)(entry.recipient.as_ref(), message));
    catch_unwind(call).map_err(|payload| HandlerFailure {
        recipient: entry.recipient_type,
        reason: panic_reason(payload.as_ref()),
    })
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
