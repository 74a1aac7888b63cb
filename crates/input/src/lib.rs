//! Activation controller: validates input against a user's binds, elements,
//! permissions and cooldowns, and starts ability instances.
//!
//! # Invariants
//! - The controller sees triggers, never raw input events.
//! - A failed activation leaves no instance and no world mutation behind.

pub mod controller;

pub use controller::ActivationController;
