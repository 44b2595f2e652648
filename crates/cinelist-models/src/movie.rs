use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of a movie in the store's catalog numbering
///
/// The web client historically passed these around as strings; parsing through
/// `FromStr` coerces them to the integer form the store keys on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MovieId(u64);

impl MovieId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl From<u64> for MovieId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for MovieId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseMovieIdError {
    input: String,
}

impl fmt::Display for ParseMovieIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid movie id: {:?} (expected a non-negative integer)", self.input)
    }
}

impl std::error::Error for ParseMovieIdError {}

impl FromStr for MovieId {
    type Err = ParseMovieIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(MovieId)
            .map_err(|_| ParseMovieIdError { input: s.to_string() })
    }
}

/// A movie as the presentation layer knows it: id plus a display title
///
/// The title is supplied by the caller and never checked against the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieRef {
    pub movie_id: MovieId,
    pub title: String,
}

impl MovieRef {
    pub fn new(movie_id: impl Into<MovieId>, title: impl Into<String>) -> Self {
        Self {
            movie_id: movie_id.into(),
            title: title.into(),
        }
    }

    /// A reference with no known title; displays as `#<id>`
    pub fn untitled(movie_id: impl Into<MovieId>) -> Self {
        let movie_id = movie_id.into();
        Self {
            movie_id,
            title: format!("#{}", movie_id),
        }
    }
}
