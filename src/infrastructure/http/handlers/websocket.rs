//! WebSocket Handler - 书籍处理进度事件

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::infrastructure::events::BookEvent;
use crate::infrastructure::http::dto::EventsParams;
use crate::infrastructure::http::state::AppState;

/// 事件 WebSocket：`/ws/events`，可选 `?book_id=` 只订阅单本书
pub async fn events_websocket_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<EventsParams>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let book_id = params.book_id.filter(|id| !id.is_empty());
    ws.on_upgrade(move |socket| handle_events_socket(socket, book_id, state))
}

async fn handle_events_socket(socket: WebSocket, book_id: Option<String>, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    let mut event_rx: broadcast::Receiver<BookEvent> = match &book_id {
        Some(id) => state.event_publisher.subscribe_book(id),
        None => state.event_publisher.subscribe_global(),
    };

    tracing::info!(book_id = ?book_id, "Events WebSocket connected");

    // 事件转发任务
    let forward_task = tokio::spawn(async move {
        loop {
            let event = match event_rx.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Events WebSocket lagged, dropping events");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };

            let msg = match serde_json::to_string(&event) {
                Ok(json) => Message::Text(json),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to serialize event");
                    continue;
                }
            };

            if let Err(e) = sender.send(msg).await {
                tracing::debug!(error = %e, "Failed to send WebSocket message");
                break;
            }
        }
    });

    // 接收客户端消息（心跳）
    let receive_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Close(_)) => {
                    tracing::info!("Events WebSocket closed by client");
                    break;
                }
                Err(e) => {
                    tracing::debug!(error = %e, "Events WebSocket error");
                    break;
                }
                // Ping 由 axum 自动回应 pong
                _ => {}
            }
        }
    });

    // 等待任一任务完成
    tokio::select! {
        _ = forward_task => {}
        _ = receive_task => {}
    }

    // 清理无订阅者的单书通道
    state.event_publisher.prune();
    tracing::info!(book_id = ?book_id, "Events WebSocket disconnected");
}
