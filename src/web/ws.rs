//! 巡检结果的WebSocket推送

use super::AppState;
use crate::broadcast::SweepEvent;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast::{error::RecvError, Receiver};
use tracing::{debug, warn};

/// WebSocket升级处理函数
///
/// 订阅在升级前完成，连接建立后发生的巡检都会推送给该客户端。
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let receiver = state.scheduler.broadcaster().subscribe();
    ws.on_upgrade(move |socket| handle_socket(socket, receiver))
}

async fn handle_socket(socket: WebSocket, mut receiver: Receiver<SweepEvent>) {
    debug!("WebSocket客户端已连接");
    let (mut sender, mut incoming) = socket.split();

    loop {
        tokio::select! {
            event = receiver.recv() => match event {
                Ok(event) => {
                    let json = match serde_json::to_string(&event) {
                        Ok(json) => json,
                        Err(e) => {
                            warn!("巡检结果序列化失败: {}", e);
                            continue;
                        }
                    };
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("WebSocket客户端处理过慢，丢弃了 {} 次巡检结果", skipped);
                }
                Err(RecvError::Closed) => break,
            },
            message = incoming.next() => match message {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                // 客户端消息不需要处理
                Some(Ok(_)) => {}
            },
        }
    }

    debug!("WebSocket客户端已断开");
}
