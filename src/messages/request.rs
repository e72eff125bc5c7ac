//! # Request and collection-request message traits.
//!
//! A request message is an ordinary message that additionally carries its
//! response container. Implementing [`Request`] (or [`Collect`]) is what
//! makes a message eligible for `Messenger::request` / `Messenger::collect`
//! instead of plain broadcast.

use crate::error::ReplyError;
use crate::messages::collect::{Collector, Contributor};
use crate::messages::message::Message;
use crate::messages::reply::{ReplySlot, Responder};

/// A message expecting exactly one response.
///
/// The message owns a [`ReplySlot`]; the first handler to write it
/// determines the response, and every later write fails with
/// [`ReplyError::AlreadyReplied`].
///
/// ## Example
/// ```
/// use switchboard::{ReplySlot, Request};
///
/// struct Resolve {
///     host: String,
///     reply: ReplySlot<std::net::Ipv4Addr>,
/// }
///
/// impl Request for Resolve {
///     type Reply = std::net::Ipv4Addr;
///
///     fn reply_slot(&self) -> &ReplySlot<Self::Reply> {
///         &self.reply
///     }
/// }
/// ```
pub trait Request: Message {
    /// Type of the single response value.
    type Reply: Send + 'static;

    /// The slot this request's response is written into.
    fn reply_slot(&self) -> &ReplySlot<Self::Reply>;

    /// Writes the response inline during handler invocation.
    fn reply(&self, value: Self::Reply) -> Result<(), ReplyError> {
        self.reply_slot().reply(value)
    }

    /// Detaches a token for replying after the handler has returned.
    ///
    /// Required for deferred replies: a bare [`ReplySlot`] clone does not
    /// count as an outstanding producer, so a request whose handlers all
    /// return holding only slot clones resolves as unanswered.
    fn responder(&self) -> Responder<Self::Reply> {
        self.reply_slot().responder()
    }
}

/// A message aggregating zero or more values from zero or more handlers.
///
/// The message owns a [`Collector`]; every handler may contribute any
/// number of items, and the final sequence preserves handler invocation
/// order.
pub trait Collect: Message {
    /// Type of the aggregated items.
    type Item: Send + 'static;

    /// The accumulator this request's items are written into.
    fn collector(&self) -> &Collector<Self::Item>;

    /// Appends one item inline during handler invocation.
    fn contribute(&self, item: Self::Item) -> Result<(), ReplyError> {
        self.collector().push(item)
    }

    /// Detaches a token for contributing after the handler has returned.
    ///
    /// Only meaningful with the asynchronous collection send, which waits
    /// for every outstanding token before sealing the result.
    fn contributor(&self) -> Contributor<Self::Item> {
        self.collector().contributor()
    }
}
