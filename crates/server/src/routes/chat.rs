//! `/api/chat` and `/api/chat/stream` (spec §6).

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Query, State};
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use axum::Json;
use dagctl_adapters::ChatMessage;
use dagctl_core::event::Event;
use futures_util::stream::Stream;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

#[derive(Deserialize)]
pub struct ChatRequest {
    pub session_id: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct ChatResponse {
    pub turn_id: String,
    pub reply: String,
}

pub async fn post_chat(State(state): State<Arc<AppState>>, Json(req): Json<ChatRequest>) -> Result<Json<ChatResponse>, ApiError> {
    let turn_id = nanoid::nanoid!(12);
    let history = state.push_and_compact(&req.session_id, ChatMessage::user(req.message)).await?;
    let reply = state.llm.complete(&history).await?;
    state.push_and_compact(&req.session_id, ChatMessage::assistant(reply.clone())).await?;
    Ok(Json(ChatResponse { turn_id, reply }))
}

#[derive(Deserialize)]
pub struct ChatStreamQuery {
    pub session_id: String,
    pub message: String,
}

pub async fn get_chat_stream(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ChatStreamQuery>,
) -> Result<Sse<impl Stream<Item = Result<SseEvent, Infallible>>>, ApiError> {
    let turn_id = nanoid::nanoid!(12);
    let history = state.push_and_compact(&q.session_id, ChatMessage::user(q.message)).await?;

    let (bus, rx) = state.runtime.begin_turn(turn_id.clone());
    let llm = state.llm.clone();
    let state2 = state.clone();
    let session_id = q.session_id.clone();
    let turn_id_for_task = turn_id.clone();

    tokio::spawn(async move {
        let (tx, mut chunk_rx) = tokio::sync::mpsc::channel(64);
        let mut full = String::new();

        tokio::spawn(async move {
            let _ = llm.stream(&history, tx).await;
        });

        while let Some(chunk) = chunk_rx.recv().await {
            if chunk.done {
                break;
            }
            full.push_str(&chunk.delta);
            bus.publish(Event::Message { role: "assistant".to_string(), text: chunk.delta });
        }

        let _ = state2.push_and_compact(&session_id, ChatMessage::assistant(full)).await;
        bus.publish(Event::Done { turn_id: turn_id_for_task.clone() });
        state2.runtime.end_turn(&turn_id_for_task);
    });

    let stream = ReceiverStream::new(rx).map(|event| {
        let data = serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string());
        Ok(SseEvent::default().event(event.kind()).data(data))
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
