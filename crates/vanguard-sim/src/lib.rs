//! Vanguard Sim - headless harness for the combat engine.
//!
//! Drives a scripted duel through the attack state machines with a fixed
//! simulation step, and reports what happened through the event bus.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod app;
pub mod combat_events;
pub mod config;
pub mod timing;
