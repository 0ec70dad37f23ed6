//! Terminal host for the start page.
//!
//! # Module Structure
//!
//! - `loop_runner` - Main event loop, widget lifecycle and terminal management
//! - `input` - Keyboard input dispatch
//! - `events` - Widget background event processing
//! - `render` - Layout and overlay dispatch
//! - `feeds` - Feed panel
//! - `player` - Now-playing panel
//! - `status` - Status bar
//! - `help` - Keybinding overlay

mod events;
mod feeds;
mod help;
mod input;
mod loop_runner;
mod player;
mod render;
mod status;

pub use loop_runner::{run, Action};
