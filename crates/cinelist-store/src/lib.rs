pub mod error;
pub mod http;
pub mod memory;
pub mod traits;

pub use error::StoreError;
pub use http::HttpWatchlistStore;
pub use memory::{InMemoryStore, StoreCall};
pub use traits::{AddOutcome, RemoveOutcome, StoreOp, WatchlistStore};
