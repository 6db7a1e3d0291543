use crate::error::{AppError, Result};

pub const IMDB_BASE_URL: &str = "https://www.imdb.com";
pub const BECHDEL_API_URL: &str = "https://bechdeltest.com/api/v1";

/// CACHE_URL value that selects the in-process store instead of SQLite.
pub const MEMORY_CACHE_URL: &str = "memory";

/// Client-wide timeout for upstream HTTP calls (seconds).
pub const HTTP_TIMEOUT_SECS: u64 = 30;

/// Batched title metadata barely moves within an hour; the watchlist page
/// itself is never cached, so list edits still show up immediately.
pub const TITLE_DATA_TTL_SECS: u64 = 60 * 60;

/// Bechdel ratings essentially never change once published.
pub const BECHDEL_TTL_SECS: u64 = 30 * 24 * 60 * 60;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// SQLite file backing the cache, or "memory" for the in-process store (CACHE_URL).
    pub cache_url: String,
    /// Skip cache reads but keep writing (DISABLE_CACHE). Used for cache
    /// warming: every request hits upstream and refreshes the store.
    pub cache_write_only: bool,
    pub log_level: String,
    pub imdb_base_url: String,
    pub bechdel_api_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("PORT must be a valid port number".to_string()))?,
            cache_url: std::env::var("CACHE_URL").unwrap_or_else(|_| "watchboard-cache.db".to_string()),
            cache_write_only: std::env::var("DISABLE_CACHE")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            imdb_base_url: std::env::var("IMDB_BASE_URL")
                .unwrap_or_else(|_| IMDB_BASE_URL.to_string()),
            bechdel_api_url: std::env::var("BECHDEL_API_URL")
                .unwrap_or_else(|_| BECHDEL_API_URL.to_string()),
        })
    }

    pub fn cache_backend(&self) -> &'static str {
        if self.cache_url == MEMORY_CACHE_URL {
            "memory"
        } else {
            "sqlite"
        }
    }
}
