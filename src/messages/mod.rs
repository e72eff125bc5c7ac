//! # Message shapes and response primitives.
//!
//! ## Contents
//! - [`Message`] marker for anything that can be broadcast
//! - [`Request`], [`Collect`] traits tying a message type to its response
//!   container
//! - [`ReplySlot`], [`Responder`], [`PendingReply`] the single-assignment
//!   reply primitive
//! - [`Collector`], [`Contributor`], [`PendingCollection`] the ordered
//!   aggregation primitive
//!
//! ## Quick reference
//! A broadcast message is plain data. A request message additionally embeds
//! a [`ReplySlot`]; a collection request embeds a [`Collector`]. Handlers
//! write responses through those containers, either inline during their own
//! invocation or later through a detached [`Responder`]/[`Contributor`]
//! token.

mod collect;
mod message;
mod reply;
mod request;

pub use collect::{Collector, Contributor, PendingCollection};
pub use message::Message;
pub use reply::{PendingReply, ReplySlot, Responder};
pub use request::{Collect, Request};
