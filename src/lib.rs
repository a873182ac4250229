//! Client core for browsing a remote media file server: filter state,
//! query composition, local search, thumbnail generation and slideshow
//! navigation.

pub mod backends;
pub mod config;
pub mod core;
pub mod models;
pub mod services;
pub mod state;
pub mod utils;
pub mod workers;

#[cfg(test)]
mod test_utils;
