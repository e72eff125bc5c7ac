//! Type-erased registration entries.

use std::sync::Arc;

use crate::recipients::{Erased, RecipientHandle};

/// Erased handler: (recipient, message), both as `dyn Any`.
///
/// Built during registration from a typed `Fn(&R, &M)` closure; the
/// downcasts inside cannot fail for entries reached through the matching
/// (TypeId, Channel) key.
pub(crate) type ErasedHandler = Arc<dyn Fn(&Erased, &Erased) + Send + Sync>;

/// One registration as stored in the registry.
///
/// Immutable after creation: replacing a handler is remove-then-add.
pub(crate) struct Entry {
    pub(crate) recipient: RecipientHandle,
    pub(crate) handler: ErasedHandler,
    /// Recipient type name, kept for panic reports and logs.
    pub(crate) recipient_type: &'static str,
}

/// One registration as handed to the dispatcher: the recipient upgraded to
/// an owning reference for the duration of the send.
pub(crate) struct DispatchEntry {
    pub(crate) recipient: Arc<Erased>,
    pub(crate) handler: ErasedHandler,
    pub(crate) recipient_type: &'static str,
}
