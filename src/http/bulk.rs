//! `GET /api/logs`: run the streaming reader to completion, then apply
//! pagination over the full match set.

use super::auth::check_secret;
use super::query::LogQuery;
use super::state::SharedState;
use crate::error::LogViewError;
use crate::reader::{self, Lenience};
use crate::record::Record;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

pub async fn get_logs(State(state): State<SharedState>, Query(q): Query<LogQuery>) -> Response {
    if let Err(e) = check_secret(q.pwd.as_deref(), &state.password) {
        return e.into_response();
    }

    let mut filter = q.to_filter();
    let page_limit = filter.limit.take();
    let page_offset = filter.offset.take().unwrap_or(0);

    let state = state.clone();
    let result = tokio::task::spawn_blocking(move || -> Result<Vec<Record>, LogViewError> {
        let mut records = Vec::new();
        reader::read_matching(&state.log_path, &filter, &state.cache, Lenience::Permissive, |rec| {
            records.push(rec);
            true
        })?;
        Ok(records)
    })
    .await;

    let records = match result {
        Ok(Ok(records)) => records,
        Ok(Err(e)) => return e.into_response(),
        Err(_) => return LogViewError::Io(std::io::Error::other("bulk read task panicked")).into_response(),
    };

    let total = records.len();
    let page: Vec<Record> = records
        .into_iter()
        .skip(page_offset)
        .take(page_limit.unwrap_or(usize::MAX))
        .collect();
    let count = page.len();
    let has_more = page_offset + count < total;

    Json(json!({
        "logs": page,
        "count": count,
        "total": total,
        "hasMore": has_more,
    }))
    .into_response()
}
