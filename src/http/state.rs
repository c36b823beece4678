use crate::cache::OffsetCache;
use crate::tail::Tailer;
use std::path::PathBuf;
use std::sync::Arc;

/// Shared server state handed to every handler via axum's `State` extractor.
pub struct AppState {
    pub log_path: PathBuf,
    pub password: String,
    pub cache: OffsetCache,
    pub tailer: Arc<Tailer>,
    pub shell: crate::http::html::ShellHalves,
}

pub type SharedState = Arc<AppState>;
