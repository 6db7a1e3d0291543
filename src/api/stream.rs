use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::api::routes::ApiState;
use crate::enrich::enrich_movie;
use crate::types::{Movie, Watchlist};
use crate::watchlist::fetch_watchlist;

/// Requests the UI sends over /stream.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "body", rename_all = "lowercase")]
pub enum ClientMessage {
    #[serde(rename_all = "camelCase")]
    Watchlist { user_id: String },
    Movie { movie: Movie },
}

/// Replies sent back on the same socket, tagged like the request that
/// triggered them.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "body", rename_all = "lowercase")]
pub enum ServerMessage {
    #[serde(rename_all = "camelCase")]
    Watchlist { user_id: String, list: Watchlist },
    Movie { movie: Movie },
}

pub async fn stream_handler(ws: WebSocketUpgrade, State(state): State<ApiState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// One duplex session. Requests are handled in arrival order; a failed
/// resolution is logged and produces no reply frame, and the connection
/// stays open for the next request.
async fn handle_socket(socket: WebSocket, state: ApiState) {
    info!("stream client connected");
    let (mut sender, mut receiver) = socket.split();

    while let Some(message) = receiver.next().await {
        let text = match message {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => continue,
        };

        let request: ClientMessage = match serde_json::from_str(&text) {
            Ok(request) => request,
            Err(e) => {
                warn!("unreadable stream message: {e}");
                continue;
            }
        };

        let reply = match request {
            ClientMessage::Watchlist { user_id } => {
                match fetch_watchlist(&state.http, &state.config, &user_id).await {
                    Ok(list) => ServerMessage::Watchlist { user_id, list },
                    Err(e) => {
                        warn!("watchlist fetch for {user_id} failed: {e}");
                        continue;
                    }
                }
            }
            ClientMessage::Movie { movie } => {
                let movie = enrich_movie(&state.http, &state.config, movie).await;
                ServerMessage::Movie { movie }
            }
        };

        let reply_text = match serde_json::to_string(&reply) {
            Ok(text) => text,
            Err(e) => {
                warn!("failed to encode stream reply: {e}");
                continue;
            }
        };
        if sender.send(Message::Text(reply_text)).await.is_err() {
            break;
        }
    }

    debug!("stream client disconnected");
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::types::{MovieRatings, ViewingOptions};

    fn movie() -> Movie {
        Movie {
            id: "tt0111161".to_string(),
            title: "The Shawshank Redemption".to_string(),
            imdb_url: "https://www.imdb.com/title/tt0111161/".to_string(),
            kind: "featureFilm".to_string(),
            release_date: Some("1994-10-14".to_string()),
            run_time: Some(142.0),
            genres: vec!["Drama".to_string()],
            ratings: MovieRatings::default(),
            viewing_options: ViewingOptions::default(),
        }
    }

    #[test]
    fn decodes_watchlist_request() {
        let request: ClientMessage =
            serde_json::from_str(r#"{"type":"watchlist","body":{"userId":"ur000001"}}"#).unwrap();
        assert_eq!(request, ClientMessage::Watchlist { user_id: "ur000001".to_string() });
    }

    #[test]
    fn decodes_movie_request() {
        let text = json!({"type": "movie", "body": {"movie": movie()}}).to_string();
        let request: ClientMessage = serde_json::from_str(&text).unwrap();
        assert_eq!(request, ClientMessage::Movie { movie: movie() });
    }

    #[test]
    fn encodes_watchlist_reply_with_type_and_body() {
        let reply = ServerMessage::Watchlist {
            user_id: "ur000001".to_string(),
            list: Watchlist { id: "ls1".to_string(), name: "W".to_string(), movies: vec![movie()] },
        };
        let value = serde_json::to_value(&reply).unwrap();

        assert_eq!(value["type"], "watchlist");
        assert_eq!(value["body"]["userId"], "ur000001");
        assert_eq!(value["body"]["list"]["movies"][0]["id"], "tt0111161");
    }

    #[test]
    fn encodes_movie_reply_with_type_and_body() {
        let value = serde_json::to_value(ServerMessage::Movie { movie: movie() }).unwrap();
        assert_eq!(value["type"], "movie");
        assert_eq!(value["body"]["movie"]["type"], "featureFilm");
    }

    #[test]
    fn unknown_type_fails_to_decode() {
        let result: Result<ClientMessage, _> =
            serde_json::from_str(r#"{"type":"justwatch","body":{}}"#);
        assert!(result.is_err());
    }
}
