//! # Trait form of a message handler.

use crate::messages::Message;

/// Handler trait for recipients that process a message type themselves.
///
/// Implementing `Receive<M>` lets a recipient be registered with
/// `Messenger::register_receiver`, which binds `Self::receive` as the
/// handler instead of a standalone closure.
///
/// Dispatch calls `receive` on the sender's thread; two concurrent sends
/// may invoke it concurrently, so shared state inside the recipient needs
/// its own synchronization.
///
/// ## Example
/// ```
/// use std::sync::Arc;
/// use switchboard::{Messenger, Receive};
///
/// struct Thermostat;
/// struct Reading(f64);
///
/// impl Receive<Reading> for Thermostat {
///     fn receive(&self, reading: &Reading) {
///         let _ = reading.0;
///     }
/// }
///
/// let bus = Messenger::strong();
/// let thermostat = Arc::new(Thermostat);
/// bus.register_receiver::<Thermostat, Reading>(&thermostat).unwrap();
/// bus.send(Reading(21.5)).unwrap();
/// ```
pub trait Receive<M: Message>: Send + Sync + 'static {
    /// Processes a single message.
    fn receive(&self, message: &M);
}
