use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};
use crate::movie::MovieId;

/// One row of the user's watchlist as listed by the store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatchlistEntry {
    pub id: MovieId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imdb_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_added_date", skip_serializing_if = "Option::is_none")]
    pub added_date: Option<NaiveDateTime>,
}

/// The store formats dates as `YYYY-MM-DD HH:MM:SS`; anything else is dropped
/// rather than failing the whole listing.
fn deserialize_added_date<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| {
        NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S")
            .or_else(|_| NaiveDateTime::parse_from_str(&s, "%Y-%m-%dT%H:%M:%S"))
            .ok()
    }))
}
