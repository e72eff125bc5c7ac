//! # Recipient retention: strong vs weak, plus stable identity.
//!
//! The registry never stores a concrete recipient type; it stores a
//! [`RecipientHandle`] holding the recipient erased to `dyn Any`, either
//! owned (`Arc`) or non-owning (`Weak`).
//!
//! ## Rules
//! - A strong handle keeps the recipient alive until explicitly
//!   unregistered.
//! - A weak handle never keeps the recipient alive; once the last external
//!   `Arc` drops, the handle reports dead and the registry prunes the entry
//!   on its next mutation or snapshot pass.
//! - The liveness probe is callable at any time and never panics, even
//!   after the underlying recipient is gone.
//! - Identity is the `Arc` allocation address. The address cannot be reused
//!   while the registry still holds a `Weak` to it, so a dead entry can
//!   never alias a newly allocated recipient.

use std::any::Any;
use std::sync::{Arc, Weak};

/// Type-erased value behind every recipient and message reference.
pub(crate) type Erased = dyn Any + Send + Sync;

/// Stable, opaque identity of a registered recipient.
///
/// Derived from the `Arc` allocation address, so two clones of the same
/// `Arc` map to the same identity while distinct allocations never collide.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct RecipientId(usize);

impl RecipientId {
    /// Returns the identity of a recipient.
    pub fn of<R>(recipient: &Arc<R>) -> Self
    where
        R: Send + Sync + 'static,
    {
        Self(Arc::as_ptr(recipient) as *const () as usize)
    }
}

/// Retention wrapper stored in every registry entry.
#[derive(Clone)]
pub(crate) enum RecipientHandle {
    /// Owned: the registry keeps the recipient alive.
    Strong(Arc<Erased>),
    /// Non-owning: dead once the last external `Arc` drops.
    Weak(Weak<Erased>),
}

impl RecipientHandle {
    /// Creates an owning handle.
    pub(crate) fn strong<R>(recipient: &Arc<R>) -> Self
    where
        R: Send + Sync + 'static,
    {
        Self::Strong(recipient.clone())
    }

    /// Creates a non-owning handle.
    pub(crate) fn weak<R>(recipient: &Arc<R>) -> Self
    where
        R: Send + Sync + 'static,
    {
        let erased: Arc<Erased> = recipient.clone();
        Self::Weak(Arc::downgrade(&erased))
    }

    /// Returns the identity of the wrapped recipient.
    ///
    /// Valid for dead weak handles too: the allocation outlives the `Weak`.
    pub(crate) fn id(&self) -> RecipientId {
        match self {
            Self::Strong(strong) => RecipientId(Arc::as_ptr(strong) as *const () as usize),
            Self::Weak(weak) => RecipientId(Weak::as_ptr(weak) as *const () as usize),
        }
    }

    /// Liveness probe; never panics.
    pub(crate) fn is_alive(&self) -> bool {
        match self {
            Self::Strong(_) => true,
            Self::Weak(weak) => weak.strong_count() > 0,
        }
    }

    /// Returns an owning reference for the duration of a dispatch, or
    /// `None` when the recipient is dead.
    pub(crate) fn upgrade(&self) -> Option<Arc<Erased>> {
        match self {
            Self::Strong(strong) => Some(strong.clone()),
            Self::Weak(weak) => weak.upgrade(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Probe;

    #[test]
    fn test_id_stable_across_clones() {
        let recipient = Arc::new(Probe);
        let clone = recipient.clone();
        assert_eq!(RecipientId::of(&recipient), RecipientId::of(&clone));
    }

    #[test]
    fn test_distinct_allocations_distinct_ids() {
        let a = Arc::new(Probe);
        let b = Arc::new(Probe);
        assert_ne!(RecipientId::of(&a), RecipientId::of(&b));
    }

    #[test]
    fn test_handle_id_matches_recipient_id() {
        let recipient = Arc::new(Probe);
        assert_eq!(
            RecipientHandle::strong(&recipient).id(),
            RecipientId::of(&recipient)
        );
        assert_eq!(
            RecipientHandle::weak(&recipient).id(),
            RecipientId::of(&recipient)
        );
    }

    #[test]
    fn test_strong_handle_keeps_recipient_alive() {
        let recipient = Arc::new(Probe);
        let handle = RecipientHandle::strong(&recipient);
        drop(recipient);

        assert!(handle.is_alive());
        assert!(handle.upgrade().is_some());
    }

    #[test]
    fn test_weak_handle_dies_with_last_external_arc() {
        let recipient = Arc::new(Probe);
        let handle = RecipientHandle::weak(&recipient);
        assert!(handle.is_alive());

        drop(recipient);
        assert!(!handle.is_alive());
        assert!(handle.upgrade().is_none());
        // The probe stays callable after death.
        let _ = handle.id();
    }

    #[test]
    fn test_upgrade_yields_downcastable_recipient() {
        let recipient = Arc::new(Probe);
        let handle = RecipientHandle::weak(&recipient);

        let upgraded = handle.upgrade().expect("recipient is alive");
        assert!(upgraded.downcast_ref::<Probe>().is_some());
    }
}
