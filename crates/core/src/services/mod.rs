//! Domain services of the watch-party engine.

pub mod chat;
pub mod poll;
pub mod reaction;
pub mod registry;
