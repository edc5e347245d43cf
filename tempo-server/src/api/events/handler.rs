//! WebSocket fan-out handler

use axum::{
    extract::{Query, State},
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    response::Response,
};
use serde::Deserialize;
use tokio::sync::broadcast;

use crate::auth::{CurrentUser, session};
use crate::core::ServerState;
use crate::services::presence;
use crate::utils::AppError;

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub token: String,
}

/// GET /api/events - WebSocket 升级
pub async fn events(
    State(state): State<ServerState>,
    Query(query): Query<EventsQuery>,
    ws: WebSocketUpgrade,
) -> Result<Response, AppError> {
    let claims = state
        .jwt_service
        .validate_token(&query.token)
        .map_err(|_| AppError::invalid_token("Invalid WebSocket token"))?;
    let user = CurrentUser::try_from(claims)
        .map_err(|e| AppError::invalid_token(format!("Malformed JWT claims: {}", e)))?;

    if !session::is_active(&state.pool, &state.clock, user.session_id).await? {
        return Err(AppError::unauthorized());
    }

    Ok(ws.on_upgrade(move |socket| handle_socket(state, user, socket)))
}

async fn handle_socket(state: ServerState, user: CurrentUser, mut socket: WebSocket) {
    tracing::debug!(account_id = user.id, "WebSocket client connected");
    let _ = presence::heartbeat(&state, user.id).await;

    let mut rx = state.bus.subscribe();

    loop {
        tokio::select! {
            bus_msg = rx.recv() => match bus_msg {
                Ok(msg) => {
                    let Ok(text) = serde_json::to_string(&msg) else { continue };
                    if socket.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                // 滞后只意味着客户端错过了旧消息，它会按 version 重拉
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(account_id = user.id, skipped, "WebSocket client lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                // 客户端的任何帧都刷新在线状态
                Some(Ok(_)) => {
                    let _ = presence::heartbeat(&state, user.id).await;
                }
                _ => break,
            }
        }
    }

    let _ = presence::mark_offline(&state, user.id).await;
    tracing::debug!(account_id = user.id, "WebSocket client disconnected");
}
