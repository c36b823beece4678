//! `GET /api/logs/raw`: the same match set as the bulk endpoint, formatted
//! one record per line as plain text with a pagination header block.

use super::auth::check_secret;
use super::query::LogQuery;
use super::state::SharedState;
use crate::error::LogViewError;
use crate::reader::{self, Lenience};
use crate::record::Record;
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde_json::Value;

pub async fn get_logs_raw(State(state): State<SharedState>, Query(q): Query<LogQuery>) -> Response {
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
        Err(_) => return LogViewError::Io(std::io::Error::other("raw read task panicked")).into_response(),
    };

    let total = records.len();
    let page: Vec<Record> = records
        .into_iter()
        .skip(page_offset)
        .take(page_limit.unwrap_or(usize::MAX))
        .collect();
    let count = page.len();
    let has_more = page_offset + count < total;

    let mut body = format!(
        "# count={count} total={total} offset={page_offset} hasMore={has_more}\n\n"
    );
    for rec in &page {
        body.push_str(&format_line(rec));
        body.push('\n');
    }

    ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body).into_response()
}

fn format_line(rec: &Record) -> String {
    let ts = rec
        .time_ms
        .and_then(format_timestamp)
        .unwrap_or_else(|| "-".to_string());
    let level = rec.level.as_deref().unwrap_or("info");
    let module = rec.module.as_deref().unwrap_or("");
    let msg = rec.msg.as_deref().unwrap_or("");

    let extras: Vec<String> = rec
        .extra
        .iter()
        .map(|(k, v)| format!("{k}={}", value_to_plain(v)))
        .collect();

    let mut line = format!("{ts} [{level}] {module}: {msg}");
    if !extras.is_empty() {
        line.push_str(&format!(" ({})", extras.join(" ")));
    }
    line
}

fn format_timestamp(ms: i64) -> Option<String> {
    chrono::DateTime::from_timestamp_millis(ms).map(|dt| dt.format("%Y-%m-%d %H:%M:%S%.3f").to_string())
}

fn value_to_plain(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
