//! # The exclusive-region registration store.
//!
//! One mutex per messenger instance serializes every structure mutation
//! and every snapshot read. The mutex scope is pure data-structure work:
//! user handler code never runs while it is held.
//!
//! ## Architecture
//! ```text
//! register ──┐
//! unregister ┼──► Mutex<HashMap<(TypeId, Channel), Vec<Entry>>> ──► snapshot
//! cleanup ───┘         │                                              │
//!                      └── dead weak entries purged on every ─────────┘
//!                          mutation or snapshot that touches them
//! ```
//!
//! ## Rules
//! - Entries within one bucket keep registration order; `snapshot` returns
//!   them in that order.
//! - `snapshot` copies the matching entries (recipients upgraded, handlers
//!   cloned) and releases the mutex before any handler runs; this is what
//!   lets handlers re-enter the registry during their own invocation.
//! - The (message type, channel, recipient) triple is unique among live
//!   entries; a dead weak entry does not block re-registration.
//! - Unregistering something absent is a no-op, not an error.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::channel::Channel;
use crate::error::RegisterError;
use crate::recipients::RecipientId;
use crate::registry::entry::{DispatchEntry, Entry};
use crate::sync::lock;

type Key = (TypeId, Channel);

/// Mutex-guarded map from (message type, channel) to ordered entries.
pub(crate) struct Registry {
    slots: Mutex<HashMap<Key, Vec<Entry>>>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Adds an entry, enforcing triple uniqueness among live entries.
    ///
    /// Dead weak entries in the touched bucket are purged first, so a
    /// recipient whose previous registration died can register again.
    pub(crate) fn register(
        &self,
        message_type: TypeId,
        message_name: &'static str,
        channel: Channel,
        entry: Entry,
    ) -> Result<(), RegisterError> {
        let mut slots = lock(&self.slots);
        let bucket = slots.entry((message_type, channel.clone())).or_default();
        bucket.retain(|existing| existing.recipient.is_alive());

        let id = entry.recipient.id();
        if bucket.iter().any(|existing| existing.recipient.id() == id) {
            return Err(RegisterError::DuplicateRegistration {
                recipient: entry.recipient_type,
                message_type: message_name,
                channel,
            });
        }

        tracing::trace!(
            message_type = message_name,
            recipient = entry.recipient_type,
            channel = ?channel,
            "registered handler"
        );
        bucket.push(entry);
        Ok(())
    }

    /// Removes entries matching the recipient and the given filters;
    /// `None` filters mean "all". Dead entries in visited buckets are
    /// purged along the way.
    pub(crate) fn unregister(
        &self,
        id: RecipientId,
        message_type: Option<TypeId>,
        channel: Option<&Channel>,
    ) {
        let mut slots = lock(&self.slots);
        slots.retain(|(entry_type, entry_channel), bucket| {
            let selected = message_type.map_or(true, |ty| *entry_type == ty)
                && channel.map_or(true, |ch| entry_channel == ch);
            if selected {
                bucket.retain(|entry| entry.recipient.is_alive() && entry.recipient.id() != id);
            }
            !bucket.is_empty()
        });
    }

    /// True only if a live entry exists for the exact triple.
    pub(crate) fn is_registered(
        &self,
        id: RecipientId,
        message_type: TypeId,
        channel: &Channel,
    ) -> bool {
        let slots = lock(&self.slots);
        slots
            .get(&(message_type, channel.clone()))
            .map_or(false, |bucket| {
                bucket
                    .iter()
                    .any(|entry| entry.recipient.id() == id && entry.recipient.is_alive())
            })
    }

    /// Point-in-time copy of the live entries for one (type, channel), in
    /// registration order. Dead weak entries encountered are physically
    /// purged as a side effect.
    pub(crate) fn snapshot(&self, message_type: TypeId, channel: &Channel) -> Vec<DispatchEntry> {
        let mut slots = lock(&self.slots);
        let key = (message_type, channel.clone());

        let (out, now_empty) = match slots.get_mut(&key) {
            None => return Vec::new(),
            Some(bucket) => {
                let before = bucket.len();
                let mut out = Vec::with_capacity(before);
                bucket.retain(|entry| match entry.recipient.upgrade() {
                    Some(recipient) => {
                        out.push(DispatchEntry {
                            recipient,
                            handler: entry.handler.clone(),
                            recipient_type: entry.recipient_type,
                        });
                        true
                    }
                    None => false,
                });
                let purged = before - bucket.len();
                if purged > 0 {
                    tracing::trace!(purged, "purged dead recipients during snapshot");
                }
                (out, bucket.is_empty())
            }
        };

        if now_empty {
            slots.remove(&key);
        }
        out
    }

    /// Purges every dead weak entry in the instance.
    pub(crate) fn cleanup(&self) {
        let mut slots = lock(&self.slots);
        slots.retain(|_, bucket| {
            bucket.retain(|entry| entry.recipient.is_alive());
            !bucket.is_empty()
        });
    }

    /// Drops every registration in the instance.
    pub(crate) fn clear(&self) {
        lock(&self.slots).clear();
    }

    /// Total stored entries, live or dead. Test hook.
    #[cfg(test)]
    pub(crate) fn entry_count(&self) -> usize {
        lock(&self.slots).values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::recipients::RecipientHandle;

    struct Probe;

    fn noop_entry(recipient: &Arc<Probe>, strong: bool) -> Entry {
        Entry {
            recipient: if strong {
                RecipientHandle::strong(recipient)
            } else {
                RecipientHandle::weak(recipient)
            },
            handler: Arc::new(|_, _| {}),
            recipient_type: "Probe",
        }
    }

    fn key_of<M: 'static>() -> TypeId {
        TypeId::of::<M>()
    }

    struct Ping;
    struct Pong;

    #[test]
    fn test_register_then_query() {
        let registry = Registry::new();
        let recipient = Arc::new(Probe);
        let id = RecipientId::of(&recipient);
        let channel = Channel::default();

        registry
            .register(key_of::<Ping>(), "Ping", channel.clone(), noop_entry(&recipient, true))
            .expect("first registration succeeds");

        assert!(registry.is_registered(id, key_of::<Ping>(), &channel));
        assert!(!registry.is_registered(id, key_of::<Pong>(), &channel));
        assert!(!registry.is_registered(id, key_of::<Ping>(), &Channel::of("other")));
    }

    #[test]
    fn test_duplicate_triple_rejected_and_state_unchanged() {
        let registry = Registry::new();
        let recipient = Arc::new(Probe);
        let channel = Channel::default();

        registry
            .register(key_of::<Ping>(), "Ping", channel.clone(), noop_entry(&recipient, true))
            .expect("first registration succeeds");
        let err = registry
            .register(key_of::<Ping>(), "Ping", channel.clone(), noop_entry(&recipient, true))
            .expect_err("duplicate triple is rejected");

        assert_eq!(err.as_label(), "duplicate_registration");
        assert_eq!(registry.entry_count(), 1);
    }

    #[test]
    fn test_same_recipient_different_channel_or_type_is_fine() {
        let registry = Registry::new();
        let recipient = Arc::new(Probe);

        registry
            .register(key_of::<Ping>(), "Ping", Channel::default(), noop_entry(&recipient, true))
            .expect("default channel");
        registry
            .register(key_of::<Ping>(), "Ping", Channel::of("a"), noop_entry(&recipient, true))
            .expect("distinct channel");
        registry
            .register(key_of::<Pong>(), "Pong", Channel::default(), noop_entry(&recipient, true))
            .expect("distinct message type");

        assert_eq!(registry.entry_count(), 3);
    }

    #[test]
    fn test_unregister_filters() {
        let registry = Registry::new();
        let recipient = Arc::new(Probe);
        let id = RecipientId::of(&recipient);

        for (ty, name, channel) in [
            (key_of::<Ping>(), "Ping", Channel::default()),
            (key_of::<Ping>(), "Ping", Channel::of("a")),
            (key_of::<Pong>(), "Pong", Channel::of("a")),
        ] {
            registry
                .register(ty, name, channel, noop_entry(&recipient, true))
                .expect("registration succeeds");
        }

        // Exact (type, channel).
        registry.unregister(id, Some(key_of::<Ping>()), Some(&Channel::of("a")));
        assert_eq!(registry.entry_count(), 2);

        // All types on one channel.
        registry.unregister(id, None, Some(&Channel::of("a")));
        assert_eq!(registry.entry_count(), 1);

        // Everything for the recipient.
        registry.unregister(id, None, None);
        assert_eq!(registry.entry_count(), 0);
    }

    #[test]
    fn test_unregister_absent_is_noop() {
        let registry = Registry::new();
        let recipient = Arc::new(Probe);
        registry.unregister(RecipientId::of(&recipient), None, None);
        assert_eq!(registry.entry_count(), 0);
    }

    #[test]
    fn test_snapshot_preserves_registration_order() {
        let registry = Registry::new();
        let first = Arc::new(Probe);
        let second = Arc::new(Probe);
        let channel = Channel::default();

        registry
            .register(key_of::<Ping>(), "Ping", channel.clone(), noop_entry(&first, true))
            .expect("first");
        registry
            .register(key_of::<Ping>(), "Ping", channel.clone(), noop_entry(&second, true))
            .expect("second");

        let snapshot = registry.snapshot(key_of::<Ping>(), &channel);
        let first_erased = RecipientHandle::strong(&first);
        let second_erased = RecipientHandle::strong(&second);
        assert_eq!(snapshot.len(), 2);
        assert!(Arc::ptr_eq(
            &snapshot[0].recipient,
            &first_erased.upgrade().expect("alive")
        ));
        assert!(Arc::ptr_eq(
            &snapshot[1].recipient,
            &second_erased.upgrade().expect("alive")
        ));
    }

    #[test]
    fn test_snapshot_purges_dead_weak_entries() {
        let registry = Registry::new();
        let survivor = Arc::new(Probe);
        let doomed = Arc::new(Probe);
        let channel = Channel::default();

        registry
            .register(key_of::<Ping>(), "Ping", channel.clone(), noop_entry(&doomed, false))
            .expect("weak registration");
        registry
            .register(key_of::<Ping>(), "Ping", channel.clone(), noop_entry(&survivor, false))
            .expect("weak registration");
        drop(doomed);

        let snapshot = registry.snapshot(key_of::<Ping>(), &channel);
        assert_eq!(snapshot.len(), 1, "dead recipient excluded from dispatch");
        assert_eq!(registry.entry_count(), 1, "dead entry physically purged");
    }

    #[test]
    fn test_dead_entry_does_not_block_reregistration() {
        let registry = Registry::new();
        let channel = Channel::default();

        let doomed = Arc::new(Probe);
        registry
            .register(key_of::<Ping>(), "Ping", channel.clone(), noop_entry(&doomed, false))
            .expect("weak registration");
        let id = RecipientId::of(&doomed);
        drop(doomed);

        assert!(!registry.is_registered(id, key_of::<Ping>(), &channel));

        let fresh = Arc::new(Probe);
        registry
            .register(key_of::<Ping>(), "Ping", channel.clone(), noop_entry(&fresh, false))
            .expect("dead entries never collide with new ones");
    }

    #[test]
    fn test_cleanup_purges_every_bucket() {
        let registry = Registry::new();
        let doomed = Arc::new(Probe);

        registry
            .register(key_of::<Ping>(), "Ping", Channel::default(), noop_entry(&doomed, false))
            .expect("weak registration");
        registry
            .register(key_of::<Pong>(), "Pong", Channel::of("a"), noop_entry(&doomed, false))
            .expect("weak registration");
        drop(doomed);

        assert_eq!(registry.entry_count(), 2);
        registry.cleanup();
        assert_eq!(registry.entry_count(), 0);
    }

    #[test]
    fn test_clear_empties_the_store() {
        let registry = Registry::new();
        let recipient = Arc::new(Probe);
        registry
            .register(key_of::<Ping>(), "Ping", Channel::default(), noop_entry(&recipient, true))
            .expect("registration succeeds");

        registry.clear();
        assert_eq!(registry.entry_count(), 0);
    }
}
