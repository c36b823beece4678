//! The tailer: watches the log file path, reads appended bytes
//! incrementally, and fans parsed records out to subscribers. Built
//! directly on the file-watch loop used elsewhere in this crate's lineage
//! for waiting on new events, generalized from a single wait into a
//! standing broadcaster.

use crate::record::{self, Record};
use notify::{EventKind, RecursiveMode, Watcher};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// How long the watch loop waits for a filesystem notification before
/// polling the file size anyway — guards against missed or coalesced
/// notify events.
const POLL_INTERVAL: Duration = Duration::from_secs(2);

const CHANNEL_CAPACITY: usize = 4096;

/// Watches a single NDJSON file and broadcasts newly appended, strictly
/// parsed records to every subscriber. One tailer owns exactly one watcher
/// for the lifetime of the process.
pub struct Tailer {
    path: PathBuf,
    sender: broadcast::Sender<Record>,
}

impl Tailer {
    /// Spawns the watch loop on a dedicated OS thread (file watching and
    /// the reads it triggers are synchronous) and returns a handle other
    /// tasks can subscribe to.
    pub fn spawn(path: PathBuf) -> Arc<Tailer> {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        let tailer = Arc::new(Tailer {
            path,
            sender,
        });

        let worker = tailer.clone();
        std::thread::spawn(move || worker.run());

        tailer
    }

    /// Subscribes to live records. Each subscriber should apply its own
    /// filter to the records it receives — the tailer itself fans out
    /// unfiltered so it stays a single source of truth for file position.
    pub fn subscribe(&self) -> broadcast::Receiver<Record> {
        self.sender.subscribe()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn run(&self) {
        let mut last_size = std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0);
        let mut carry: Vec<u8> = Vec::new();

        let (notify_tx, notify_rx) = mpsc::channel();
        let watch_dir = self
            .path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.path.clone());

        let mut watcher = match notify::recommended_watcher(move |res: Result<notify::Event, _>| {
            if let Ok(event) = res {
                if matches!(
                    event.kind,
                    EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
                ) {
                    let _ = notify_tx.send(());
                }
            }
        }) {
            Ok(w) => w,
            Err(e) => {
                log::error!("tailer: failed to create watcher for {}: {e}", self.path.display());
                return;
            }
        };

        if let Err(e) = watcher.watch(&watch_dir, RecursiveMode::NonRecursive) {
            log::error!("tailer: failed to watch {}: {e}", watch_dir.display());
            return;
        }

        loop {
            match notify_rx.recv_timeout(POLL_INTERVAL) {
                Ok(()) | Err(mpsc::RecvTimeoutError::Timeout) => {}
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    log::warn!("tailer: watcher channel disconnected for {}", self.path.display());
                    return;
                }
            }

            let current_size = match std::fs::metadata(&self.path) {
                Ok(m) => m.len(),
                Err(_) => continue,
            };

            if current_size < last_size {
                log::info!("tailer: detected rotation of {}", self.path.display());
                last_size = 0;
                carry.clear();
            }

            if current_size > last_size {
                match self.deliver_delta(last_size, current_size, &mut carry) {
                    Ok(()) => {}
                    Err(e) => {
                        log::error!("tailer: read error on {}: {e}", self.path.display());
                        continue;
                    }
                }
            }

            last_size = current_size;
        }
    }

    fn deliver_delta(&self, from: u64, to: u64, carry: &mut Vec<u8>) -> std::io::Result<()> {
        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(from))?;
        let mut buf = vec![0u8; (to - from) as usize];
        file.read_exact(&mut buf)?;
        carry.extend_from_slice(&buf);

        let mut pos = 0usize;
        while let Some(nl) = memchr::memchr(b'\n', &carry[pos..]) {
            let line_end = pos + nl;
            let line = String::from_utf8_lossy(&carry[pos..line_end]);
            if let Some(rec) = record::strict_parse(&line) {
                // No receivers is not an error — it just means nobody's
                // subscribed right now.
                let _ = self.sender.send(rec);
            }
            pos = line_end + 1;
        }
        carry.drain(..pos);

        Ok(())
    }
}
