//! The streaming HTML page: a cached shell fragment split at a magic
//! comment into a `before_logs` and `after_logs` half, so the server can
//! interleave per-row HTML without re-rendering the shell on every request.

use super::auth::check_secret;
use super::query::LogQuery;
use super::state::SharedState;
use crate::reader::{self, Lenience};
use crate::record::Record;
use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use once_cell::sync::Lazy;
use serde_json::Value;

const SPLIT_MARKER: &str = "<!--LOG_ROWS-->";

static LOGIN_PAGE: Lazy<String> = Lazy::new(|| {
    r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>logview</title></head>
<body>
<form method="get" action="/">
  <input type="password" name="pwd" placeholder="password" autofocus>
  <button type="submit">view logs</button>
</form>
</body>
</html>
"#
    .to_string()
});

/// The shell, pre-split at [`SPLIT_MARKER`]. Built once per process and
/// reused for every request to `GET /`.
#[derive(Debug, Clone)]
pub struct ShellHalves {
    pub before_logs: String,
    pub after_logs: String,
}

impl ShellHalves {
    pub fn build() -> ShellHalves {
        let shell = format!(
            r#"<!doctype html>
<html>
<head>
  <meta charset="utf-8">
  <title>logview</title>
  <style>
    body {{ font-family: monospace; font-size: 13px; margin: 0; padding: 1rem; background: #111; color: #ddd; }}
    .row {{ white-space: pre-wrap; border-bottom: 1px solid #222; padding: 2px 0; }}
    .level-error {{ color: #f66; }}
    .level-warn {{ color: #fc6; }}
    .level-debug {{ color: #888; }}
  </style>
</head>
<body>
<div id="logs">
{SPLIT_MARKER}
</div>
</body>
</html>
"#
        );

        let (before_logs, after_logs) = shell
            .split_once(SPLIT_MARKER)
            .expect("shell template must contain the split marker");

        ShellHalves {
            before_logs: before_logs.to_string(),
            after_logs: after_logs.to_string(),
        }
    }
}

pub fn login_page() -> &'static str {
    &LOGIN_PAGE
}

/// Renders one log record as a single HTML row. Values are escaped; extra
/// fields are rendered as `key=value` pairs after the message.
pub fn render_row(rec: &Record) -> String {
    let level = rec.level.as_deref().unwrap_or("info");
    let time = rec.time.as_deref().unwrap_or("");
    let module = rec.module.as_deref().unwrap_or("");
    let msg = rec.msg.as_deref().unwrap_or("");

    let extras: String = rec
        .extra
        .iter()
        .map(|(k, v)| format!(" {}={}", escape(k), escape(&value_to_plain(v))))
        .collect();

    format!(
        "<div class=\"row level-{}\">{} [{}] {}: {}{}</div>\n",
        escape(level),
        escape(time),
        escape(level),
        escape(module),
        escape(msg),
        extras,
    )
}

/// The end-of-document hydration script: records the session secret (so the
/// client can reuse it for the live-stream connection) and the final row
/// count as data attributes on the document body.
pub fn hydration_script(pwd: &str, record_count: usize) -> String {
    format!(
        "<script>document.body.dataset.pwd = {:?}; document.body.dataset.recordCount = \"{}\";</script>\n",
        pwd, record_count
    )
}

fn value_to_plain(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// `GET /`: the static login page if unauthenticated, otherwise the
/// streaming document described in the HTTP boundary design — shell prelude,
/// one row per matching record as it's read, then the hydration script.
pub async fn index_page(State(state): State<SharedState>, Query(q): Query<LogQuery>) -> Response {
    let pwd = q.pwd.clone();
    if check_secret(pwd.as_deref(), &state.password).is_err() {
        return (
            [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
            login_page(),
        )
            .into_response();
    }

    let filter = q.to_filter();
    let shell = state.shell.clone();
    let pwd = pwd.unwrap_or_default();
    let state = state.clone();

    let body_stream = async_stream::stream! {
        yield Ok::<_, std::io::Error>(shell.before_logs.clone().into_bytes());

        let (tx, mut rx) = tokio::sync::mpsc::channel::<String>(256);
        let task_state = state.clone();
        let handle = tokio::task::spawn_blocking(move || {
            reader::read_matching(&task_state.log_path, &filter, &task_state.cache, Lenience::Permissive, |rec| {
                tx.blocking_send(render_row(&rec)).is_ok()
            })
        });

        let mut record_count = 0usize;
        while let Some(row) = rx.recv().await {
            record_count += 1;
            yield Ok(row.into_bytes());
        }
        let _ = handle.await;

        yield Ok(shell.after_logs.clone().into_bytes());
        yield Ok(hydration_script(&pwd, record_count).into_bytes());
    };

    (
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        Body::from_stream(body_stream),
    )
        .into_response()
}
