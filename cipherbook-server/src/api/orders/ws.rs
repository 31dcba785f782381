use axum::{
    extract::{
        Path, State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use cipherbook_core::entities::{Order, OrderId, Stage};
use cipherbook_sdk::objects::ws::{WsCloseCode, WsServerMessage};

use super::super::to_response;
use crate::state::AppState;

/// `GET /orders/{id}/ws`: WebSocket order progress stream.
///
/// The first frame is always the current state; further frames follow
/// every stage change. The connection is closed after a terminal stage.
pub(in crate::api) async fn order_progress_ws(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_order_ws(socket, state, OrderId::from(id)))
}

/// Background task that drives a single WebSocket connection.
///
/// Subscribes to the store *before* reading the current order so a change
/// racing with the first frame is still seen.
async fn handle_order_ws(mut socket: WebSocket, state: AppState, order_id: OrderId) {
    let mut watcher = state.coordinator.subscribe();

    let Some(order) = state.coordinator.get_order(&order_id) else {
        let _ = send_json(
            &mut socket,
            &WsServerMessage::Error {
                code: WsCloseCode::ORDER_NOT_FOUND,
                reason: "order not found".into(),
            },
        )
        .await;
        let _ = socket
            .send(Message::Close(Some(CloseFrame {
                code: WsCloseCode::ORDER_NOT_FOUND,
                reason: "order not found".into(),
            })))
            .await;
        return;
    };

    if send_progress(&mut socket, &order).await.is_err() {
        return;
    }
    if order.is_terminal() {
        let _ = socket.send(Message::Close(None)).await;
        return;
    }
    let mut last_stage: Stage = order.stage;

    loop {
        tokio::select! {
            changed = watcher.changed() => {
                if changed.is_err() {
                    let _ = socket
                        .send(Message::Close(Some(CloseFrame {
                            code: WsCloseCode::GOING_AWAY,
                            reason: "server shutting down".into(),
                        })))
                        .await;
                    return;
                }

                let book = watcher.latest();
                let Some(order) = book.get(&order_id) else {
                    break;
                };
                if order.stage == last_stage {
                    continue;
                }
                last_stage = order.stage;

                if send_progress(&mut socket, order).await.is_err() {
                    return;
                }
                if order.is_terminal() {
                    tracing::debug!(order_id = %order_id, stage = ?order.stage, "WS: terminal stage delivered");
                    break;
                }
            }

            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    let _ = socket.send(Message::Close(None)).await;
}

async fn send_progress(
    socket: &mut WebSocket,
    order: &Order,
) -> Result<(), ()> {
    send_json(
        socket,
        &WsServerMessage::Progress {
            order: to_response(order),
        },
    )
    .await
}

/// Serialize `value` as JSON and send it as a text WebSocket frame.
///
/// Returns `Err(())` if the send fails (client disconnected).
async fn send_json<T: serde::Serialize>(socket: &mut WebSocket, value: &T) -> Result<(), ()> {
    let json = serde_json::to_string(value).map_err(|_| ())?;
    socket
        .send(Message::Text(json.into()))
        .await
        .map_err(|_| ())
}
