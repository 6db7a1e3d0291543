use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Movie
// ---------------------------------------------------------------------------

/// Normalized movie record. Immutable once built; `id` is the IMDB const
/// and the join key for every enrichment step. Wire names are camelCase to
/// match what the table UI consumes.
///
/// `ratings` and `viewing_options` are always serialized as objects with
/// every member present (absent values as explicit nulls), so consumers
/// never branch on missing keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    pub id: String,
    pub title: String,
    pub imdb_url: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub release_date: Option<String>,
    /// Total runtime in minutes (per-episode runtime times episode count
    /// for series).
    pub run_time: Option<f64>,
    #[serde(default)]
    pub genres: Vec<String>,
    pub ratings: MovieRatings,
    pub viewing_options: ViewingOptions,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieRatings {
    pub metascore: Option<u32>,
    pub rotten_tomatoes_meter: Option<u32>,
    /// IMDB's 0-10 rating scaled to 0-100.
    pub imdb: Option<f64>,
    pub bechdel: Option<BechdelRating>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BechdelRating {
    /// 0-3: how many of the three test criteria the movie passes.
    pub rating: u8,
    pub dubious: bool,
}

// ---------------------------------------------------------------------------
// Viewing options
// ---------------------------------------------------------------------------

/// Per-provider availability. All four keys are always on the wire, null
/// until a provider integration fills them in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewingOptions {
    pub netflix: Option<ViewingOption>,
    pub hbo: Option<ViewingOption>,
    pub itunes: Option<ViewingOption>,
    pub amazon: Option<ViewingOption>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewingOption {
    pub provider: String,
    pub url: String,
    pub monetization_type: String,
    pub presentation_type: String,
    pub price: Option<f64>,
}

// ---------------------------------------------------------------------------
// Watchlist
// ---------------------------------------------------------------------------

/// A user's watchlist, built fresh per request and never persisted.
/// `movies` preserves the upstream list order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Watchlist {
    pub id: String,
    pub name: String,
    pub movies: Vec<Movie>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_movie() -> Movie {
        Movie {
            id: "tt0111161".to_string(),
            title: "The Shawshank Redemption".to_string(),
            imdb_url: "https://www.imdb.com/title/tt0111161/".to_string(),
            kind: "featureFilm".to_string(),
            release_date: None,
            run_time: None,
            genres: Vec::new(),
            ratings: MovieRatings::default(),
            viewing_options: ViewingOptions::default(),
        }
    }

    #[test]
    fn ratings_and_viewing_options_serialize_with_explicit_nulls() {
        let value = serde_json::to_value(bare_movie()).unwrap();

        let ratings = value.get("ratings").unwrap();
        for field in ["metascore", "rottenTomatoesMeter", "imdb", "bechdel"] {
            assert!(ratings.get(field).unwrap().is_null(), "ratings.{field}");
        }

        let options = value.get("viewingOptions").unwrap();
        for provider in ["netflix", "hbo", "itunes", "amazon"] {
            assert!(options.get(provider).unwrap().is_null(), "viewingOptions.{provider}");
        }
    }

    #[test]
    fn kind_serializes_as_type() {
        let value = serde_json::to_value(bare_movie()).unwrap();
        assert_eq!(value.get("type").unwrap(), "featureFilm");
        assert!(value.get("kind").is_none());
    }

    #[test]
    fn movie_roundtrips_through_json() {
        let mut movie = bare_movie();
        movie.run_time = Some(142.0);
        movie.genres = vec!["Drama".to_string()];
        movie.ratings.imdb = Some(93.0);
        movie.ratings.bechdel = Some(BechdelRating { rating: 3, dubious: true });

        let text = serde_json::to_string(&movie).unwrap();
        let back: Movie = serde_json::from_str(&text).unwrap();
        assert_eq!(back, movie);
    }
}
