//! Shared infrastructure for `resilient-dispatcher`.
//!
//! Currently this is just the event system used for observability: a
//! [`ResilienceEvent`] trait, an [`EventListener`] trait, and an
//! [`EventListeners`] collection that fans a single event out to every
//! registered listener without letting one misbehaving listener take down
//! the rest.

pub mod events;

pub use events::{EventListener, EventListeners, FnListener, ResilienceEvent};
