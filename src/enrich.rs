use std::future::Future;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use serde_json::Value;
use tracing::warn;

use crate::cache::http::CachedHttpClient;
use crate::config::{Config, BECHDEL_TTL_SECS};
use crate::error::Result;
use crate::types::{BechdelRating, Movie};

/// Resolve supplementary ratings for one movie and merge them in.
///
/// Every lookup future is dispatched before any is awaited (today there is
/// one, Bechdel; the join is where new providers slot in), and each is
/// downgraded to `None` at its own boundary, so a broken provider can
/// neither fail the movie nor cancel its siblings.
pub async fn enrich_movie(http: &CachedHttpClient, cfg: &Config, movie: Movie) -> Movie {
    let (bechdel,) = tokio::join!(best_effort(
        "bechdel",
        &movie.id,
        fetch_bechdel(http, cfg, &movie.id),
    ));

    let mut movie = movie;
    movie.ratings.bechdel = bechdel;
    movie
}

/// Await a lookup, trading its error for `None`.
async fn best_effort<T>(
    what: &str,
    id: &str,
    lookup: impl Future<Output = Result<Option<T>>>,
) -> Option<T> {
    match lookup.await {
        Ok(found) => found,
        Err(e) => {
            warn!("{what} lookup for {id} failed: {e}");
            None
        }
    }
}

/// Look up a movie's Bechdel rating. The API is keyed by the numeric part
/// of the IMDB id, and its answers are stable enough to cache for a month,
/// including the not-found bodies it reports as `{"status": ...}` inside a
/// 200 response.
pub async fn fetch_bechdel(
    http: &CachedHttpClient,
    cfg: &Config,
    imdb_id: &str,
) -> Result<Option<BechdelRating>> {
    let numeric_id = imdb_id.strip_prefix("tt").unwrap_or(imdb_id);
    let url = format!("{}/getMovieByImdbId?imdbid={}", cfg.bechdel_api_url, numeric_id);

    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/plain, */*"));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let response = http.get_json(&url, headers, BECHDEL_TTL_SECS).await?;
    Ok(parse_bechdel_response(&response))
}

/// A `status` field marks an unknown title. Otherwise `rating` is a
/// string-encoded 0-3 score (a bare number is accepted too) and `dubious`
/// is "0"/"1".
pub fn parse_bechdel_response(response: &Value) -> Option<BechdelRating> {
    if response.get("status").is_some() {
        return None;
    }
    let rating = response.get("rating").and_then(|rating| match rating {
        Value::String(s) => s.parse().ok(),
        other => other.as_u64().and_then(|n| u8::try_from(n).ok()),
    })?;
    let dubious = response.get("dubious").and_then(Value::as_str) == Some("1");
    Some(BechdelRating { rating, dubious })
}
