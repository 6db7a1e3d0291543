use reqwest::header::HeaderMap;
use serde_json::Value;
use tracing::debug;

use crate::cache::resolver::CachedResolver;
use crate::error::Result;

/// Outbound HTTP with a cache in front of every JSON GET. This is the
/// single chokepoint for upstream metadata and enrichment calls, so
/// per-endpoint TTL policy lives at the call sites as named constants.
///
/// Cache keys are the request URL. Every call through here is a GET, so
/// method and body cannot collide on a key.
#[derive(Clone)]
pub struct CachedHttpClient {
    client: reqwest::Client,
    resolver: CachedResolver,
}

impl CachedHttpClient {
    pub fn new(client: reqwest::Client, resolver: CachedResolver) -> Self {
        Self { client, resolver }
    }

    /// GET `url` and parse the body as JSON, serving from cache when a
    /// fresh entry exists. Non-2xx statuses and network failures surface
    /// as errors and are never cached; a literal `null` body is returned
    /// but not cached either.
    pub async fn get_json(&self, url: &str, headers: HeaderMap, ttl_seconds: u64) -> Result<Value> {
        let key = format!("request:{url}");
        let value = self
            .resolver
            .resolve(&key, ttl_seconds, || async {
                debug!("{url}: fetching");
                let response = self
                    .client
                    .get(url)
                    .headers(headers)
                    .send()
                    .await?
                    .error_for_status()?;
                let json: Value = response.json().await?;
                Ok((!json.is_null()).then_some(json))
            })
            .await?;

        // The producer only ever withholds a literal null, so a hit or a
        // successful fetch both land here with Some.
        Ok(value.unwrap_or(Value::Null))
    }

    /// Plain uncached GET returning the body text. Used for upstream HTML
    /// pages, which are parsed rather than cached.
    pub async fn get_text(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }
}
