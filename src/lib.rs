//! Wallpaper Shell library
//!
//! Configuration, library scanning and renderer process management behind
//! the egui front end.

pub mod app;
pub mod backend;
pub mod config;
pub mod constant;
pub mod messages;
pub mod style;
pub mod ui;
