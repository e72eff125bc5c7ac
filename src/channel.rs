//! # Channel tokens for scoping registrations.
//!
//! A [`Channel`] is an optional, equality-comparable discriminator attached
//! to every registration and every send. Two registrations for the same
//! message type but different channels are independent and never
//! cross-deliver.
//!
//! ## Rules
//! - The absence of a token ([`Channel::default`]) is itself a distinct
//!   channel identity, not a wildcard.
//! - Any `Eq + Hash + Debug + Send + Sync + 'static` value can act as a
//!   token; tokens of different types never compare equal.
//! - Channels are cheap to clone (the token is shared behind an `Arc`).
//!
//! ## Example
//! ```
//! use switchboard::Channel;
//!
//! let ui = Channel::of("ui");
//! assert_eq!(ui, Channel::of("ui"));
//! assert_ne!(ui, Channel::default());
//! assert_ne!(Channel::of(1u32), Channel::of(1u64));
//! ```

use std::any::{Any, TypeId};
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A type-erased channel token.
///
/// Implemented automatically for every `Eq + Hash + Debug + Send + Sync +
/// 'static` type; there is normally no reason to implement it by hand.
pub trait ChannelToken: Any + fmt::Debug + Send + Sync {
    /// Compares against another erased token; false across token types.
    fn eq_token(&self, other: &dyn ChannelToken) -> bool;

    /// Hashes the token together with its type so values of different
    /// types land in different buckets.
    fn hash_token(&self) -> u64;

    /// Upcast used by [`ChannelToken::eq_token`] implementations.
    fn as_any(&self) -> &dyn Any;
}

impl<T> ChannelToken for T
where
    T: Eq + Hash + fmt::Debug + Send + Sync + 'static,
{
    fn eq_token(&self, other: &dyn ChannelToken) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .map_or(false, |other| self == other)
    }

    fn hash_token(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        TypeId::of::<T>().hash(&mut hasher);
        self.hash(&mut hasher);
        hasher.finish()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Channel identity for a registration or a send.
///
/// `Channel::default()` is the token-less default channel. [`Channel::of`]
/// wraps any equality-comparable value into a named channel.
#[derive(Clone, Default)]
pub struct Channel(Option<Arc<dyn ChannelToken>>);

impl Channel {
    /// Wraps a token value into a channel.
    pub fn of(token: impl ChannelToken) -> Self {
        Self(Some(Arc::new(token)))
    }

    /// Returns true for the token-less default channel.
    #[inline]
    pub fn is_default(&self) -> bool {
        self.0.is_none()
    }
}

impl PartialEq for Channel {
    fn eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (None, None) => true,
            (Some(a), Some(b)) => a.eq_token(b.as_ref()),
            _ => false,
        }
    }
}

impl Eq for Channel {}

impl Hash for Channel {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match &self.0 {
            None => state.write_u8(0),
            Some(token) => {
                state.write_u8(1);
                state.write_u64(token.hash_token());
            }
        }
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            None => f.write_str("Channel(default)"),
            Some(token) => write!(f, "Channel({token:?})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_channel_equals_itself() {
        assert_eq!(Channel::default(), Channel::default());
    }

    #[test]
    fn test_token_channel_equality() {
        assert_eq!(Channel::of("sensors"), Channel::of("sensors"));
        assert_ne!(Channel::of("sensors"), Channel::of("actuators"));
    }

    #[test]
    fn test_default_differs_from_any_token() {
        assert_ne!(Channel::default(), Channel::of("sensors"));
        assert_ne!(Channel::default(), Channel::of(0u32));
    }

    #[test]
    fn test_tokens_of_different_types_never_equal() {
        assert_ne!(Channel::of(7u32), Channel::of(7u64));
        assert_ne!(Channel::of(7u32), Channel::of("7"));
    }

    #[test]
    fn test_custom_token_type() {
        #[derive(Debug, PartialEq, Eq, Hash)]
        enum Scope {
            Local,
            Remote,
        }

        assert_eq!(Channel::of(Scope::Local), Channel::of(Scope::Local));
        assert_ne!(Channel::of(Scope::Local), Channel::of(Scope::Remote));
    }

    #[test]
    fn test_usable_as_map_key() {
        let mut map = HashMap::new();
        map.insert(Channel::of("a"), 1);
        map.insert(Channel::of("b"), 2);
        map.insert(Channel::default(), 3);

        assert_eq!(map.get(&Channel::of("a")), Some(&1));
        assert_eq!(map.get(&Channel::of("b")), Some(&2));
        assert_eq!(map.get(&Channel::default()), Some(&3));
        assert_eq!(map.get(&Channel::of("c")), None);
    }

    #[test]
    fn test_clone_preserves_identity() {
        let channel = Channel::of(42u32);
        let cloned = channel.clone();
        assert_eq!(channel, cloned);
    }
}
