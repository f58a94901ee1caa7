//! `/ws/chat`: bidirectional turn streaming plus confirmation resolution
//! (spec §6). Incoming text frames are either a chat message or a
//! `feedback_ack` resolving a pending confirmation; outgoing frames are
//! serialized [`Event`]s.

use crate::state::AppState;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use dagctl_adapters::ChatMessage;
use dagctl_core::event::Event;
use dagctl_runtime::ConfirmationOutcome;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    Chat { session_id: String, message: String },
    FeedbackAck { id: String, outcome: FeedbackOutcome },
}

#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
enum FeedbackOutcome {
    Approved,
    Rejected,
    Edited { text: String },
}

impl From<FeedbackOutcome> for ConfirmationOutcome {
    fn from(value: FeedbackOutcome) -> Self {
        match value {
            FeedbackOutcome::Approved => ConfirmationOutcome::Approved,
            FeedbackOutcome::Rejected => ConfirmationOutcome::Rejected,
            FeedbackOutcome::Edited { text } => ConfirmationOutcome::Edited(text),
        }
    }
}

pub async fn ws_chat(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>) {
    while let Some(Ok(msg)) = socket.recv().await {
        let Message::Text(text) = msg else { continue };
        let Ok(client_msg) = serde_json::from_str::<ClientMessage>(&text) else {
            let _ = socket
                .send(Message::Text(
                    serde_json::to_string(&Event::Error { kind: "bad_request".into(), message: "unrecognized message".into() }).unwrap_or_default(),
                ))
                .await;
            continue;
        };

        match client_msg {
            ClientMessage::FeedbackAck { id, outcome } => {
                state.runtime.resolve_confirmation(&id, outcome.into());
            }
            ClientMessage::Chat { session_id, message } => {
                if run_turn(&mut socket, &state, &session_id, message).await.is_err() {
                    break;
                }
            }
        }
    }
}

async fn run_turn(socket: &mut WebSocket, state: &Arc<AppState>, session_id: &str, message: String) -> Result<(), axum::Error> {
    let turn_id = nanoid::nanoid!(12);
    let history = match state.push_and_compact(session_id, ChatMessage::user(message)).await {
        Ok(h) => h,
        Err(e) => {
            let _ = send_event(socket, &Event::Error { kind: e.kind().to_string(), message: e.to_string() }).await;
            return Ok(());
        }
    };

    let (bus, mut rx) = state.runtime.begin_turn(turn_id.clone());
    let llm = state.llm.clone();
    let (tx, mut chunk_rx) = tokio::sync::mpsc::channel(64);

    tokio::spawn(async move {
        let _ = llm.stream(&history, tx).await;
    });

    let mut full = String::new();
    while let Some(chunk) = chunk_rx.recv().await {
        if chunk.done {
            break;
        }
        full.push_str(&chunk.delta);
        bus.publish(Event::Message { role: "assistant".to_string(), text: chunk.delta });
    }
    let _ = state.push_and_compact(session_id, ChatMessage::assistant(full)).await;
    bus.publish(Event::Done { turn_id: turn_id.clone() });
    state.runtime.end_turn(&turn_id);

    while let Ok(event) = rx.try_recv() {
        send_event(socket, &event).await?;
        if event.is_terminal() {
            break;
        }
    }
    Ok(())
}

async fn send_event(socket: &mut WebSocket, event: &Event) -> Result<(), axum::Error> {
    let data = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());
    socket.send(Message::Text(data)).await
}
