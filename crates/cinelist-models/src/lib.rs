pub mod credential;
pub mod membership;
pub mod movie;
pub mod watchlist;

pub use credential::SessionCredential;
pub use membership::{Membership, PendingOperation};
pub use movie::{MovieId, MovieRef, ParseMovieIdError};
pub use watchlist::WatchlistEntry;
