pub mod api;
pub mod client;

pub use client::{create_http_client, HttpWatchlistStore};
