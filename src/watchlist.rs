use std::sync::OnceLock;

use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE};
use serde_json::Value;
use tracing::info;

use crate::cache::http::CachedHttpClient;
use crate::config::{Config, IMDB_BASE_URL, TITLE_DATA_TTL_SECS};
use crate::error::{AppError, Result};
use crate::types::{Movie, MovieRatings, ViewingOptions, Watchlist};

/// Fetch a user's watchlist: the list page, then one batched metadata GET
/// covering every title on it, normalized in list order. Any upstream
/// failure or shape mismatch fails the whole request; no partial list is
/// ever returned.
pub async fn fetch_watchlist(http: &CachedHttpClient, cfg: &Config, user_id: &str) -> Result<Watchlist> {
    let page_url = format!("{}/user/{}/watchlist?view=detail", cfg.imdb_base_url, user_id);
    let html = http.get_text(&page_url).await?;

    let state = extract_initial_state(&html)?;
    let (list_id, list_name, title_ids) = read_list(&state)?;
    info!("watchlist {list_id}: {} titles", title_ids.len());

    let data_url = format!("{}/title/data?ids={}", cfg.imdb_base_url, title_ids.join(","));
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en"));
    let batch = http.get_json(&data_url, headers, TITLE_DATA_TTL_SECS).await?;

    let movies = title_ids
        .iter()
        .map(|id| {
            // Each map entry wraps the actual record in a `title` field.
            let record = batch
                .get(id)
                .and_then(|entry| entry.get("title"))
                .ok_or_else(|| AppError::Parse(format!("no metadata for title {id}")))?;
            to_movie(id, record)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Watchlist { id: list_id, name: list_name, movies })
}

fn initial_state_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"IMDbReactInitialState\.push\((\{.+\})\);").expect("valid literal pattern")
    })
}

/// The page embeds its data as a single `IMDbReactInitialState.push({...});`
/// call; the capture group is the JSON object. A page without the marker
/// (layout change, login wall) is a hard parse error.
fn extract_initial_state(html: &str) -> Result<Value> {
    let captures = initial_state_re().captures(html).ok_or_else(|| {
        AppError::Parse("watchlist page is missing the IMDbReactInitialState marker".to_string())
    })?;
    serde_json::from_str(&captures[1])
        .map_err(|e| AppError::Parse(format!("watchlist initial state is not valid JSON: {e}")))
}

/// Pull `(list id, list name, ordered title ids)` out of the page state.
fn read_list(state: &Value) -> Result<(String, String, Vec<String>)> {
    let list = state
        .get("list")
        .ok_or_else(|| AppError::Parse("initial state has no list".to_string()))?;
    let id = list.get("id").and_then(Value::as_str).unwrap_or_default().to_string();
    let name = list.get("name").and_then(Value::as_str).unwrap_or_default().to_string();

    let items = list
        .get("items")
        .and_then(Value::as_array)
        .ok_or_else(|| AppError::Parse("watchlist has no items array".to_string()))?;
    let title_ids = items
        .iter()
        .map(|item| {
            item.get("const")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| AppError::Parse("watchlist item has no const id".to_string()))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok((id, name, title_ids))
}

/// Map one upstream metadata record onto the normalized [`Movie`] shape.
/// Absent optional fields become explicit `None`s; the ratings and
/// viewing-options objects are always constructed.
pub fn to_movie(id: &str, record: &Value) -> Result<Movie> {
    let primary = record
        .get("primary")
        .ok_or_else(|| AppError::Parse(format!("title {id} has no primary block")))?;
    let title = primary
        .get("title")
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::Parse(format!("title {id} has no primary.title")))?
        .to_string();
    let href = primary.get("href").and_then(Value::as_str).unwrap_or_default();

    let metadata = record.get("metadata");
    let ratings = record.get("ratings");

    let release_date = metadata
        .and_then(|m| m.get("release"))
        .and_then(Value::as_str)
        .map(str::to_string);
    let genres = metadata
        .and_then(|m| m.get("genres"))
        .and_then(Value::as_array)
        .map(|genres| genres.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default();

    let metascore = ratings
        .and_then(|r| r.get("metascore"))
        .and_then(Value::as_u64)
        .map(|m| m as u32);
    // Upstream rates 0-10; the UI works on a 0-100 scale.
    let imdb = ratings
        .and_then(|r| r.get("rating"))
        .and_then(Value::as_f64)
        .map(|rating| rating * 10.0);

    Ok(Movie {
        id: id.to_string(),
        title,
        imdb_url: format!("{IMDB_BASE_URL}{href}"),
        kind: record.get("type").and_then(Value::as_str).unwrap_or_default().to_string(),
        release_date,
        run_time: run_time_minutes(metadata),
        genres,
        ratings: MovieRatings { metascore, rotten_tomatoes_meter: None, imdb, bechdel: None },
        viewing_options: ViewingOptions::default(),
    })
}

/// Runtime arrives as per-episode seconds; total minutes scale by the
/// episode count, which defaults to 1 for films.
fn run_time_minutes(metadata: Option<&Value>) -> Option<f64> {
    let metadata = metadata?;
    let runtime_seconds = metadata.get("runtime").and_then(Value::as_f64)?;
    let episodes = metadata
        .get("numberOfEpisodes")
        .and_then(Value::as_f64)
        .unwrap_or(1.0);
    Some(runtime_seconds * episodes / 60.0)
}
