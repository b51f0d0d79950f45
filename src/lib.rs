//! Keeps track of remote grafts reachable over TCP, sends them commands in
//! the background and remembers what they answered.
//!
//! A [`Registry`] hands out a [`GraftHandle`] per connected graft. Commands
//! are fire-and-forget; their responses show up later in
//! [`Registry::list_responses`].

pub mod graft;
mod hex;

pub use graft::*;
