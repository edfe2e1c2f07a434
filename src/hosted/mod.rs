//! Hosted tasks shipped with the crate
//!
//! [`EventLoop`] stands in for an interactive viewer loop; [`Console`] feeds it
//! command lines from a second, independent worker.

mod console;
mod event_loop;

pub use console::Console;
pub use event_loop::{Action, ActionParseError, EventLoop, LoopCommand, LoopSnapshot};
