//! The offset cache: a single-slot, process-lifetime cache keyed by the
//! requested `from` timestamp, file size, and first-line fingerprint, so
//! repeated queries with drifting but nearby `from` bounds skip the locator.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::sync::Mutex;

/// Requests with a `from` bound within this many milliseconds of a cached
/// entry's `from` are eligible for a hit.
const WINDOW_MS: i64 = 60 * 60 * 1000;

#[derive(Debug, Clone)]
struct Entry {
    from_timestamp_ms: i64,
    byte_offset: u64,
    validation_line: String,
    file_size: u64,
}

/// Process-wide, single-writer-at-a-time offset cache. See the data model
/// section for the validity conditions encoded in [`OffsetCache::lookup`].
#[derive(Default)]
pub struct OffsetCache {
    slot: Mutex<Option<Entry>>,
}

impl OffsetCache {
    pub fn new() -> Self {
        OffsetCache {
            slot: Mutex::new(None),
        }
    }

    /// Returns a usable byte offset for `from_ms` if the cached entry is
    /// still valid: the file hasn't shrunk below what was observed, the
    /// requested `from` isn't before the entry's `from` nor too far past
    /// it, and re-reading at the cached offset still yields the exact line
    /// that was cached there.
    pub fn lookup(&self, from_ms: i64, current_size: u64, file: &mut File) -> Option<u64> {
        let entry = {
            let guard = self.slot.lock().unwrap();
            guard.clone()?
        };

        if current_size < entry.file_size {
            return None;
        }
        if from_ms < entry.from_timestamp_ms {
            return None;
        }
        if from_ms - entry.from_timestamp_ms > WINDOW_MS {
            return None;
        }

        let probe_len = entry.validation_line.len() + 100;
        let actual = read_first_line(file, entry.byte_offset, probe_len).ok()?;
        if actual == entry.validation_line {
            Some(entry.byte_offset)
        } else {
            None
        }
    }

    /// Records a fresh locator result, replacing whatever was cached.
    pub fn store(&self, from_ms: i64, byte_offset: u64, validation_line: String, file_size: u64) {
        let mut guard = self.slot.lock().unwrap();
        *guard = Some(Entry {
            from_timestamp_ms: from_ms,
            byte_offset,
            validation_line,
            file_size,
        });
    }

    /// Invalidates the cache unconditionally (e.g. after a failed
    /// validation, or a detected rotation).
    pub fn clear(&self) {
        *self.slot.lock().unwrap() = None;
    }
}

fn read_first_line(file: &mut File, offset: u64, max_len: usize) -> std::io::Result<String> {
    file.seek(SeekFrom::Start(offset))?;
    let mut buf = vec![0u8; max_len];
    let mut read_total = 0;
    while read_total < max_len {
        let n = file.read(&mut buf[read_total..])?;
        if n == 0 {
            break;
        }
        read_total += n;
    }
    buf.truncate(read_total);

    let end = memchr::memchr(b'\n', &buf).unwrap_or(buf.len());
    Ok(String::from_utf8_lossy(&buf[..end]).into_owned())
}
