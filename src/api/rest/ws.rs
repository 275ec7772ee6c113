use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::SinkExt;
use futures::StreamExt;
use serde::Deserialize;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{info, warn};

use super::ApiQuery;
use crate::auth::extract::Caller;
use crate::models::tracking::TrackingEvent;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct FeedQuery {
    pub tracking_id: Option<String>,
}

/// Live tracking feed. Without `tracking_id` every appended event is sent.
pub async fn ws_handler(
    State(state): State<Arc<AppState>>,
    Caller(identity): Caller,
    ApiQuery(query): ApiQuery<FeedQuery>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    info!(email = %identity.email, tracking_id = ?query.tracking_id, "tracking feed requested");
    ws.on_upgrade(move |socket| handle_socket(socket, state, query.tracking_id))
}

fn in_feed(event: &TrackingEvent, tracking_id: Option<&str>) -> bool {
    tracking_id.is_none_or(|wanted| event.tracking_id == wanted)
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, tracking_id: Option<String>) {
    let (mut sender, mut receiver) = socket.split();
    let mut events = BroadcastStream::new(state.tracking_events_tx.subscribe());

    info!("websocket client connected");

    let send_task = tokio::spawn(async move {
        while let Some(next) = events.next().await {
            let event = match next {
                Ok(event) => event,
                Err(err) => {
                    warn!(error = %err, "tracking feed lagged");
                    continue;
                }
            };

            if !in_feed(&event, tracking_id.as_deref()) {
                continue;
            }

            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(err) => {
                    warn!(error = %err, "failed to serialize tracking event for ws");
                    continue;
                }
            };

            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let recv_task = tokio::spawn(async move {
        while let Some(Ok(_msg)) = receiver.next().await {}
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    info!("websocket client disconnected");
}
