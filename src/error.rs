//! Error types used by the messenger registry and dispatch paths.
//!
//! This module defines three main error enums:
//!
//! - [`RegisterError`] — errors raised while adding a registration.
//! - [`SendError`] — errors raised while dispatching a message.
//! - [`ReplyError`] — errors raised while writing a reply slot or a
//!   collection accumulator.
//!
//! All types provide helper methods (`as_label`, `as_message`) for
//! logging/metrics. Nothing here is retried internally: every failure is
//! reported to the caller of the operation that triggered it.

use thiserror::Error;

use crate::channel::Channel;

/// # Errors produced while registering a handler.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RegisterError {
    /// The (message type, channel, recipient) triple already has a live entry.
    ///
    /// Replacing a handler requires an explicit unregister first; entries are
    /// never mutated in place.
    #[error("recipient {recipient} already registered for {message_type} on {channel:?}")]
    DuplicateRegistration {
        /// Type name of the recipient that attempted the second registration.
        recipient: &'static str,
        /// Type name of the message the registration targeted.
        message_type: &'static str,
        /// Channel the registration targeted.
        channel: Channel,
    },
}

impl RegisterError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use switchboard::{Channel, RegisterError};
    ///
    /// let err = RegisterError::DuplicateRegistration {
    ///     recipient: "Sensor",
    ///     message_type: "Reading",
    ///     channel: Channel::default(),
    /// };
    /// assert_eq!(err.as_label(), "duplicate_registration");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RegisterError::DuplicateRegistration { .. } => "duplicate_registration",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RegisterError::DuplicateRegistration {
                recipient,
                message_type,
                channel,
            } => {
                format!("duplicate registration: recipient={recipient} message={message_type} channel={channel:?}")
            }
        }
    }
}

/// A single handler panic captured during dispatch.
///
/// The panic payload text is extracted when it is a `&str` or `String`;
/// anything else is reported as an unknown panic.
#[derive(Debug, Clone)]
pub struct HandlerFailure {
    /// Type name of the recipient whose handler panicked.
    pub recipient: &'static str,
    /// Text extracted from the panic payload.
    pub reason: String,
}

/// # Errors produced while sending a message.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SendError {
    /// A request completed dispatch without any handler writing the reply slot.
    ///
    /// Raised when the snapshot was empty, or when every handler (and every
    /// outstanding deferred responder) finished without replying. A request
    /// without exactly one producer is a programming error, not a silent
    /// default.
    #[error("no registered handler produced a reply")]
    NoHandler,

    /// One or more handlers panicked during dispatch.
    ///
    /// Under the default fail-fast policy this carries exactly one failure and
    /// the remaining handlers in the snapshot were skipped; under
    /// `ErrorPolicy::ContinueOnError` it aggregates every failure observed.
    #[error("{} handler panic(s) during dispatch", .failures.len())]
    HandlerPanicked {
        /// The captured panics, in handler invocation order.
        failures: Vec<HandlerFailure>,
    },
}

impl SendError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use switchboard::SendError;
    ///
    /// assert_eq!(SendError::NoHandler.as_label(), "no_handler");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            SendError::NoHandler => "no_handler",
            SendError::HandlerPanicked { .. } => "handler_panicked",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            SendError::NoHandler => "no registered handler produced a reply".to_string(),
            SendError::HandlerPanicked { failures } => {
                let details: Vec<String> = failures
                    .iter()
                    .map(|f| format!("{}: {}", f.recipient, f.reason))
                    .collect();
                format!("handler panic(s): {}", details.join("; "))
            }
        }
    }
}

/// # Errors produced while writing a response.
#[non_exhaustive]
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ReplyError {
    /// The reply slot was already written by an earlier handler.
    ///
    /// A request has exactly one response; the first writer wins.
    #[error("reply slot already written")]
    AlreadyReplied,

    /// The collection accumulator was sealed before this contribution arrived.
    ///
    /// A synchronous collection seals once every handler in the snapshot has
    /// returned; deferred contributions require the asynchronous variant.
    #[error("collection already sealed")]
    Closed,
}

impl ReplyError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use switchboard::ReplyError;
    ///
    /// assert_eq!(ReplyError::AlreadyReplied.as_label(), "already_replied");
    /// assert_eq!(ReplyError::Closed.as_label(), "collection_closed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ReplyError::AlreadyReplied => "already_replied",
            ReplyError::Closed => "collection_closed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            ReplyError::AlreadyReplied => "reply slot already written".to_string(),
            ReplyError::Closed => "collection already sealed".to_string(),
        }
    }
}
