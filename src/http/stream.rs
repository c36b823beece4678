//! `GET /api/logs/stream`: historical matches via the streaming reader,
//! then a `historical-end` sentinel, then — if no `limit` was given — the
//! live tail for the remainder of the connection.

use super::auth::check_secret;
use super::query::LogQuery;
use super::state::SharedState;
use crate::reader::{self, Lenience};
use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use tokio_stream::wrappers::ReceiverStream;

const CHANNEL_CAPACITY: usize = 256;

pub async fn stream_logs(State(state): State<SharedState>, Query(q): Query<LogQuery>) -> Response {
    if let Err(e) = check_secret(q.pwd.as_deref(), &state.password) {
        return e.into_response();
    }

    let filter = q.to_filter();
    let wants_live = filter.limit.is_none();

    let (tx, rx) = tokio::sync::mpsc::channel::<Result<Event, std::convert::Infallible>>(CHANNEL_CAPACITY);

    // Subscribe before the historical scan runs so no record appended while
    // we're still reading the historical prefix is missed.
    let live_rx = wants_live.then(|| state.tailer.subscribe());

    let state = state.clone();
    tokio::task::spawn_blocking(move || {
        let mut historical_count = 0usize;
        let send_result = reader::read_matching(&state.log_path, &filter, &state.cache, Lenience::Strict, |rec| {
            let Ok(payload) = serde_json::to_string(&rec) else {
                return true;
            };
            historical_count += 1;
            tx.blocking_send(Ok(Event::default().data(payload))).is_ok()
        });
        if let Err(e) = send_result {
            log::error!("stream: historical scan failed: {e}");
        }

        if tx
            .blocking_send(Ok(Event::default().event("historical-end").data(historical_count.to_string())))
            .is_err()
        {
            return;
        }

        let Some(mut live_rx) = live_rx else {
            return;
        };

        loop {
            match live_rx.blocking_recv() {
                Ok(rec) => {
                    if !filter.matches(&rec) {
                        continue;
                    }
                    let Ok(payload) = serde_json::to_string(&rec) else {
                        continue;
                    };
                    if tx.blocking_send(Ok(Event::default().data(payload))).is_err() {
                        return;
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Closed) => return,
            }
        }
    });

    Sse::new(ReceiverStream::new(rx))
        .keep_alive(KeepAlive::default())
        .into_response()
}
