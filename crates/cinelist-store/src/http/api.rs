use cinelist_models::{MovieId, SessionCredential, WatchlistEntry};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};
use crate::error::StoreError;
use crate::traits::{AddOutcome, RemoveOutcome};

#[derive(Debug, Deserialize)]
struct CheckResponse {
    #[serde(rename = "isInWatchlist")]
    is_in_watchlist: bool,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

fn authorized(builder: RequestBuilder, credential: &SessionCredential) -> RequestBuilder {
    builder
        .header("Authorization", format!("Bearer {}", credential.bearer_token()))
        .header("Accept", "application/json")
}

/// Send a request and hand back the status and the raw body text
async fn send(builder: RequestBuilder) -> Result<(StatusCode, String), StoreError> {
    let response = builder.send().await?;
    let status = response.status();
    let body = response.text().await?;
    Ok((status, body))
}

/// Pull a human-readable reason out of an error body
///
/// The store answers `{"error": "..."}` on failure; some endpoints use
/// `{"message": "..."}`. Falls back to the canonical status text.
pub(crate) fn error_reason(status: StatusCode, body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if let Some(reason) = parsed.error.or(parsed.message) {
            if !reason.trim().is_empty() {
                return reason;
            }
        }
    }
    status
        .canonical_reason()
        .map(|s| s.to_string())
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
}

fn unexpected(status: StatusCode, body: &str) -> StoreError {
    StoreError::rejected(status.as_u16(), error_reason(status, body))
}

pub(crate) fn interpret_check(status: StatusCode, body: &str) -> Result<bool, StoreError> {
    match status {
        s if s.is_success() => serde_json::from_str::<CheckResponse>(body)
            .map(|r| r.is_in_watchlist)
            .map_err(|e| StoreError::MalformedResponse(e.to_string())),
        StatusCode::NOT_FOUND => Err(StoreError::NotFound),
        StatusCode::UNAUTHORIZED => Err(StoreError::Unauthorized),
        s => Err(unexpected(s, body)),
    }
}

/// Success bodies are ignored; some store versions send `{message}`, some nothing.
pub(crate) fn interpret_add(status: StatusCode, body: &str) -> Result<AddOutcome, StoreError> {
    match status {
        s if s.is_success() => Ok(AddOutcome::Added),
        StatusCode::CONFLICT => Ok(AddOutcome::AlreadyPresent),
        StatusCode::NOT_FOUND => Err(StoreError::NotFound),
        StatusCode::UNAUTHORIZED => Err(StoreError::Unauthorized),
        s => Err(unexpected(s, body)),
    }
}

pub(crate) fn interpret_remove(status: StatusCode, body: &str) -> Result<RemoveOutcome, StoreError> {
    match status {
        s if s.is_success() => Ok(RemoveOutcome::Removed),
        StatusCode::NOT_FOUND => Ok(RemoveOutcome::AlreadyAbsent),
        StatusCode::UNAUTHORIZED => Err(StoreError::Unauthorized),
        s => Err(unexpected(s, body)),
    }
}

pub(crate) fn interpret_list(status: StatusCode, body: &str) -> Result<Vec<WatchlistEntry>, StoreError> {
    match status {
        s if s.is_success() => serde_json::from_str::<Vec<WatchlistEntry>>(body)
            .map_err(|e| StoreError::MalformedResponse(e.to_string())),
        StatusCode::UNAUTHORIZED => Err(StoreError::Unauthorized),
        s => Err(unexpected(s, body)),
    }
}

/// GET /watchlist/check/{movieId}
pub async fn check_membership(
    client: &Client,
    base_url: &str,
    credential: &SessionCredential,
    movie_id: MovieId,
) -> Result<bool, StoreError> {
    let url = format!("{}/watchlist/check/{}", base_url, movie_id);
    debug!(%movie_id, %url, "Checking watchlist membership");

    let (status, body) = send(authorized(client.get(&url), credential)).await?;
    let result = interpret_check(status, &body);
    if let Err(e) = &result {
        warn!(%movie_id, status = status.as_u16(), error = %e, "Membership check failed");
    }
    result
}

/// POST /watchlist/{movieId}
pub async fn add_to_watchlist(
    client: &Client,
    base_url: &str,
    credential: &SessionCredential,
    movie_id: MovieId,
    movie_title: &str,
) -> Result<AddOutcome, StoreError> {
    let url = format!("{}/watchlist/{}", base_url, movie_id);
    debug!(%movie_id, title = movie_title, "Adding movie to watchlist");

    let payload = serde_json::json!({
        "movieId": movie_id,
        "movieTitle": movie_title,
    });
    let (status, body) = send(authorized(client.post(&url), credential).json(&payload)).await?;
    let result = interpret_add(status, &body);
    match &result {
        Ok(AddOutcome::AlreadyPresent) => debug!(%movie_id, "Movie was already in watchlist"),
        Ok(AddOutcome::Added) => {}
        Err(e) => warn!(%movie_id, status = status.as_u16(), error = %e, "Add to watchlist failed"),
    }
    result
}

/// DELETE /watchlist/{movieId}
pub async fn remove_from_watchlist(
    client: &Client,
    base_url: &str,
    credential: &SessionCredential,
    movie_id: MovieId,
) -> Result<RemoveOutcome, StoreError> {
    let url = format!("{}/watchlist/{}", base_url, movie_id);
    debug!(%movie_id, "Removing movie from watchlist");

    let (status, body) = send(authorized(client.delete(&url), credential)).await?;
    let result = interpret_remove(status, &body);
    if let Err(e) = &result {
        warn!(%movie_id, status = status.as_u16(), error = %e, "Remove from watchlist failed");
    }
    result
}

/// GET /watchlist
pub async fn get_watchlist(
    client: &Client,
    base_url: &str,
    credential: &SessionCredential,
) -> Result<Vec<WatchlistEntry>, StoreError> {
    let url = format!("{}/watchlist", base_url);
    let (status, body) = send(authorized(client.get(&url), credential)).await?;
    let entries = interpret_list(status, &body)?;
    debug!(count = entries.len(), "Fetched watchlist");
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_reads_is_in_watchlist() {
        assert_eq!(interpret_check(StatusCode::OK, r#"{"isInWatchlist": true, "exists": true}"#), Ok(true));
        assert_eq!(interpret_check(StatusCode::OK, r#"{"isInWatchlist": false}"#), Ok(false));
    }

    #[test]
    fn test_check_404_is_catalog_miss() {
        assert_eq!(
            interpret_check(StatusCode::NOT_FOUND, r#"{"exists": false}"#),
            Err(StoreError::NotFound)
        );
    }

    #[test]
    fn test_check_unparseable_body_is_malformed() {
        assert!(matches!(
            interpret_check(StatusCode::OK, "<html>oops</html>"),
            Err(StoreError::MalformedResponse(_))
        ));
        assert!(matches!(
            interpret_check(StatusCode::OK, "{}"),
            Err(StoreError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_add_tolerates_any_success_body() {
        assert_eq!(interpret_add(StatusCode::CREATED, r#"{"message": "Movie added to watchlist"}"#), Ok(AddOutcome::Added));
        assert_eq!(interpret_add(StatusCode::OK, ""), Ok(AddOutcome::Added));
    }

    #[test]
    fn test_add_conflict_is_already_present() {
        assert_eq!(
            interpret_add(StatusCode::CONFLICT, r#"{"error": "Movie already in watchlist"}"#),
            Ok(AddOutcome::AlreadyPresent)
        );
    }

    #[test]
    fn test_add_failures() {
        assert_eq!(
            interpret_add(StatusCode::NOT_FOUND, r#"{"error": "Movie not found with ID: 999"}"#),
            Err(StoreError::NotFound)
        );
        assert_eq!(
            interpret_add(StatusCode::UNAUTHORIZED, r#"{"error": "Invalid token"}"#),
            Err(StoreError::Unauthorized)
        );
        assert_eq!(
            interpret_add(StatusCode::INTERNAL_SERVER_ERROR, r#"{"error": "database is locked"}"#),
            Err(StoreError::rejected(500, "database is locked"))
        );
    }

    #[test]
    fn test_remove_of_absent_item_is_ok() {
        assert_eq!(interpret_remove(StatusCode::OK, ""), Ok(RemoveOutcome::Removed));
        assert_eq!(interpret_remove(StatusCode::NOT_FOUND, ""), Ok(RemoveOutcome::AlreadyAbsent));
    }

    #[test]
    fn test_remove_server_error_is_rejected() {
        assert_eq!(
            interpret_remove(StatusCode::BAD_GATEWAY, ""),
            Err(StoreError::rejected(502, "Bad Gateway"))
        );
    }

    #[test]
    fn test_error_reason_prefers_error_then_message() {
        assert_eq!(error_reason(StatusCode::BAD_REQUEST, r#"{"error": "bad id"}"#), "bad id");
        assert_eq!(error_reason(StatusCode::BAD_REQUEST, r#"{"message": "nope"}"#), "nope");
        assert_eq!(error_reason(StatusCode::BAD_REQUEST, "not json"), "Bad Request");
        assert_eq!(error_reason(StatusCode::BAD_REQUEST, r#"{"error": "  "}"#), "Bad Request");
    }

    #[test]
    fn test_list_parses_entries() {
        let body = r#"[{"id": 1, "title": "Test Movie", "added_date": "2024-03-20 10:00:00", "imdb_id": "tt1234567"}]"#;
        let entries = interpret_list(StatusCode::OK, body).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "Test Movie");

        assert_eq!(interpret_list(StatusCode::UNAUTHORIZED, ""), Err(StoreError::Unauthorized));
    }
}
