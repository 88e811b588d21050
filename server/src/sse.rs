//! `GET /stream`: the SSE event feed. Mirrors the source's `stream()`
//! generator: send `hello`, then an immediate snapshot, then forward
//! whatever lands in the user's queue, interleaved with a keepalive `ping`
//! at least every 15 seconds of idle time.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::stream::Stream;
use serde_json::json;
use tokio::sync::mpsc;

use subsim_shared::events::ServerEvent;

use crate::auth::AuthedUser;
use crate::state::{AppState, SSE_QUEUE_CAPACITY};

const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(15);

pub async fn stream_handler(
    State(state): State<Arc<AppState>>,
    user: AuthedUser,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::channel::<ServerEvent>(SSE_QUEUE_CAPACITY);
    state.queues.lock().unwrap().insert(user.user_id, tx.clone());

    let hello = ServerEvent::Hello {
        server_time: state.sim_now(),
    };
    let snapshot = ServerEvent::Snapshot {
        state: snapshot_for_user(&state, user),
    };
    let _ = tx.try_send(hello);
    let _ = tx.try_send(snapshot);

    let stream = async_stream::stream! {
        let mut rx = rx;
        loop {
            match tokio::time::timeout(KEEPALIVE_INTERVAL, rx.recv()).await {
                Ok(Some(event)) => {
                    if let Ok(frame) = event_to_sse(&event) {
                        yield Ok(frame);
                    }
                }
                Ok(None) => break,
                Err(_elapsed) => {
                    yield Ok(Event::default().event("ping").data(json!({"type": "ping"}).to_string()));
                }
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::new().interval(KEEPALIVE_INTERVAL))
}

fn event_to_sse(event: &ServerEvent) -> Result<Event, serde_json::Error> {
    let value = serde_json::to_value(event)?;
    let name = value
        .get("type")
        .and_then(|v| v.as_str())
        .unwrap_or("message")
        .to_string();
    Ok(Event::default().event(name).data(serde_json::to_string(&value)?))
}

fn snapshot_for_user(state: &Arc<AppState>, user: AuthedUser) -> serde_json::Value {
    let world = state.world.lock().unwrap();
    let subs: Vec<_> = world
        .subs_owned_by(user.user_id)
        .map(|s| json!({"id": s.id.to_string(), "alive": s.alive, "x": s.x, "y": s.y, "depth": s.depth}))
        .collect();
    json!({ "subs": subs, "sim_time": world.sim_time })
}
