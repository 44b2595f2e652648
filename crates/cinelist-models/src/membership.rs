use serde::{Deserialize, Serialize};

/// Last-known membership of a movie in the user's watchlist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Membership {
    /// No successful synchronization yet
    Unknown,
    /// Not on the watchlist
    Absent,
    /// On the watchlist
    Present,
}

/// Request currently in flight for an item (at most one at a time)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PendingOperation {
    None,
    Checking,
    Adding,
    Removing,
}

impl PendingOperation {
    pub fn is_pending(&self) -> bool {
        !matches!(self, PendingOperation::None)
    }
}
