//! # switchboard
//!
//! **Switchboard** is an in-process typed publish/subscribe messenger for Rust.
//!
//! Components register interest in message types, optionally scoped to a
//! channel, and a sender broadcasts a message instance to every matching
//! registrant without either side holding a direct reference to the other.
//! Request-shaped messages additionally carry a single-assignment reply slot
//! (exactly one response, synchronous or future-based) or an ordered
//! collector (zero or more values aggregated from zero or more handlers).
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │  recipient   │   │  recipient   │   │  recipient   │
//!     │(subscriber 1)│   │(subscriber 2)│   │(subscriber N)│
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            │ register(handler)│                  │
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Messenger (isolated instance; `Messenger::global()` for shared)  │
//! │  - Registry: (message type, channel) → ordered handler entries    │
//! │  - Retention: strong (owning) vs weak (dead entries pruned lazy)  │
//! │  - dispatch: snapshot under the mutex, invoke outside it          │
//! └────────────────────────────────┬──────────────────────────────────┘
//!                                  │ send / request / collect
//!                                  ▼
//!                 handlers invoked in registration order,
//!                 on the calling thread, never under a lock
//!                                  │
//!                 ┌────────────────┴────────────────┐
//!                 ▼                                 ▼
//!        ReplySlot / Responder            Collector / Contributor
//!        (request: one response)          (collection: ordered items)
//! ```
//!
//! ### Send lifecycle
//! ```text
//! send(message, channel)
//!
//! ├─► snapshot = registry.snapshot(type_of(message), channel)
//! │     (ordered copy taken under the instance mutex; dead weak
//! │      entries purged; mutex released before any handler runs)
//! │
//! ├─► for (recipient, handler) in snapshot:
//! │       ├─ request already replied? ──► stop (rest of snapshot skipped)
//! │       ├─ invoke handler(recipient, message) on the calling thread
//! │       └─ panic? ──► capture
//! │             ├─ ErrorPolicy::FailFast        ─► stop
//! │             └─ ErrorPolicy::ContinueOnError ─► next handler
//! │
//! └─► resolve:
//!       ├─ broadcast: Ok, or HandlerPanicked with the captured failures
//!       ├─ request:   first reply-slot write wins; nobody wrote ─► NoHandler
//!       └─ collect:   items in handler order (async variant: once every
//!                     outstanding Contributor token has dropped)
//! ```
//!
//! ## Features
//! | Area                 | Description                                                          | Key types / traits                              |
//! |----------------------|----------------------------------------------------------------------|-------------------------------------------------|
//! | **Broadcast**        | Typed fan-out to every registrant of a (message type, channel).      | [`Messenger`], [`Channel`], [`Receive`]         |
//! | **Request/response** | Exactly one response through a single-assignment slot.               | [`Request`], [`ReplySlot`], [`Responder`]       |
//! | **Collection**       | Ordered aggregation of values from many handlers.                    | [`Collect`], [`Collector`], [`Contributor`]     |
//! | **Async waiting**    | Futures over deferred replies and all-complete joins.                | [`PendingReply`], [`PendingCollection`]         |
//! | **Lifecycle**        | Strong vs weak recipient retention, fixed per instance.              | [`Retention`]                                   |
//! | **Errors**           | Typed errors for registration, dispatch, and replies.                | [`RegisterError`], [`SendError`], [`ReplyError`]|
//! | **Configuration**    | Centralize per-instance settings.                                    | [`MessengerConfig`], [`ErrorPolicy`]            |
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use switchboard::{Channel, Messenger, ReplySlot, Request};
//!
//! struct Gauge;
//! struct Reading {
//!     celsius: f64,
//! }
//! struct Convert {
//!     celsius: f64,
//!     reply: ReplySlot<f64>,
//! }
//!
//! impl Request for Convert {
//!     type Reply = f64;
//!     fn reply_slot(&self) -> &ReplySlot<f64> {
//!         &self.reply
//!     }
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bus = Messenger::strong();
//!     let gauge = Arc::new(Gauge);
//!
//!     // Broadcast: every registrant for (Reading, "boiler") observes it.
//!     bus.register_on(&gauge, Channel::of("boiler"), |_: &Gauge, r: &Reading| {
//!         assert!(r.celsius < 100.0);
//!     })?;
//!     bus.send_on(Reading { celsius: 96.5 }, Channel::of("boiler"))?;
//!
//!     // Request: exactly one handler computes the response.
//!     bus.register(&gauge, |_: &Gauge, convert: &Convert| {
//!         let _ = convert.reply(convert.celsius * 9.0 / 5.0 + 32.0);
//!     })?;
//!     let fahrenheit = bus.request(Convert {
//!         celsius: 100.0,
//!         reply: ReplySlot::new(),
//!     })?;
//!     assert_eq!(fahrenheit, 212.0);
//!     Ok(())
//! }
//! ```
mod channel;
mod core;
mod error;
mod messages;
mod recipients;
mod registry;
mod sync;

// ---- Public re-exports ----

pub use channel::{Channel, ChannelToken};
pub use self::core::{ErrorPolicy, Messenger, MessengerConfig, Retention};
pub use error::{HandlerFailure, RegisterError, ReplyError, SendError};
pub use messages::{
    Collect, Collector, Contributor, Message, PendingCollection, PendingReply, ReplySlot, Request,
    Responder,
};
pub use recipients::{Receive, RecipientId};
