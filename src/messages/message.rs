//! Marker for broadcastable values.

/// Anything that can travel through a messenger.
///
/// Implemented automatically for every `Send + Sync + 'static` type; the
/// concrete type is the primary dispatch key, so two distinct message types
/// never share handlers even when structurally identical.
pub trait Message: Send + Sync + 'static {}

impl<T: Send + Sync + 'static> Message for T {}
