//! # Registration store: (message type, channel) to ordered handler entries.
//!
//! The only public API from this module is crate-internal: [`Registry`] is
//! owned by a messenger instance and reached exclusively through it.
//!
//! Internal modules:
//! - [`entry`]: the type-erased registration entry and its dispatch form;
//! - [`store`]: the mutex-guarded map with register/unregister/snapshot.

mod entry;
mod store;

pub(crate) use entry::{DispatchEntry, Entry, ErasedHandler};
pub(crate) use store::Registry;
