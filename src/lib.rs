// src/lib.rs

//! Torrent Index Library
//!
//! Keeps a category index of top torrents that is rebuilt on a timer and
//! served read-only over HTTP. Readers always see either nothing or one
//! complete index; a failed rebuild leaves the last good index in place.

pub mod error;
pub mod models;
pub mod query;
pub mod scheduler;
pub mod server;
pub mod services;
pub mod store;
pub mod utils;
