//! # Recipient identity and lifecycle.
//!
//! This module wraps subscribers so the registry can track them either by
//! strong ownership (kept alive until explicitly unregistered) or by weak
//! ownership (invalid once the last external `Arc` drops, pruned lazily).
//!
//! ## Contents
//! - [`RecipientId`] stable identity derived from the `Arc` allocation
//! - [`Receive`] the trait form of a message handler
//! - `RecipientHandle` (crate-internal) strong/weak retention and the
//!   liveness probe used by the registry

mod handle;
mod receive;

pub use handle::RecipientId;
pub use receive::Receive;

pub(crate) use handle::{Erased, RecipientHandle};
