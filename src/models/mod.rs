// src/models/mod.rs

//! Domain models for the torrent index.

mod config;
mod index;
mod torrent;

pub use config::{
    CategorySource, Config, ListingSelectors, RefreshConfig, ScraperConfig, ServerConfig,
};
pub use index::{CategoryIndex, CategoryIndexBuilder};
pub use torrent::Torrent;
