//! homedeck: a terminal start page with an RSS reader and a Spotify
//! "now playing" controller.
//!
//! The binary in `main.rs` only parses arguments and wires capabilities; the
//! widgets, the session layer and the terminal host all live here so
//! integration tests can drive them directly.

pub mod app;
pub mod capability;
pub mod config;
pub mod feed;
pub mod http;
pub mod keybindings;
pub mod music;
pub mod storage;
pub mod theme;
pub mod ui;
pub mod util;
pub mod widget;
