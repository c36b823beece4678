//! The streaming reader: opens the log at a computed offset, reassembles
//! lines across chunk boundaries, evaluates the filter, and emits matches
//! to a callback with early termination on the `to` bound.

use crate::cache::OffsetCache;
use crate::error::LogViewError;
use crate::filter::FilterSpec;
use crate::locator;
use crate::record::{self, Record};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// Below this file size, the reader always starts at offset 0 — indexing
/// overhead isn't worth it for small files.
const INDEX_THRESHOLD: u64 = 1024 * 1024;

const CHUNK_SIZE: usize = 128 * 1024;

/// Which line parser the reader's output loop uses. The offset locator
/// itself always uses the strict parser regardless of this setting — only
/// strict records carry a usable instant for indexing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lenience {
    /// Drop non-strict lines silently. Used by the live-stream endpoint.
    Strict,
    /// Synthesize a record for non-JSON lines so they still reach the
    /// caller. Used by the bulk and raw endpoints.
    Permissive,
}

/// Reads `path`, applying `filter`, calling `on_match` for each match in
/// file order. `on_match` returning `false` cancels the read immediately.
/// Returns the number of matches delivered.
pub fn read_matching(
    path: &Path,
    filter: &FilterSpec,
    cache: &OffsetCache,
    lenience: Lenience,
    mut on_match: impl FnMut(Record) -> bool,
) -> Result<usize, LogViewError> {
    let size = std::fs::metadata(path)?.len();
    let mut file = File::open(path)?;

    let start_offset = match filter.from {
        Some(from_ms) if size > INDEX_THRESHOLD => resolve_start_offset(&mut file, size, from_ms, cache)?,
        _ => 0,
    };

    if start_offset >= size {
        return Ok(0);
    }

    file.seek(SeekFrom::Start(start_offset))?;

    let mut carry: Vec<u8> = Vec::new();
    let mut chunk = vec![0u8; CHUNK_SIZE];
    let mut count = 0usize;

    'outer: loop {
        let n = file.read(&mut chunk)?;
        if n == 0 {
            break;
        }
        carry.extend_from_slice(&chunk[..n]);

        let mut pos = 0usize;
        while let Some(nl) = memchr::memchr(b'\n', &carry[pos..]) {
            let line_end = pos + nl;
            let line = String::from_utf8_lossy(&carry[pos..line_end]).into_owned();
            pos = line_end + 1;

            match process_line(&line, filter, lenience, &mut on_match, &mut count)? {
                LineOutcome::Continue => {}
                LineOutcome::Stop => break 'outer,
            }
        }
        carry.drain(..pos);
    }

    if !carry.is_empty() {
        let line = String::from_utf8_lossy(&carry).into_owned();
        process_line(&line, filter, lenience, &mut on_match, &mut count)?;
    }

    Ok(count)
}

enum LineOutcome {
    Continue,
    Stop,
}

fn process_line(
    line: &str,
    filter: &FilterSpec,
    lenience: Lenience,
    on_match: &mut impl FnMut(Record) -> bool,
    count: &mut usize,
) -> Result<LineOutcome, LogViewError> {
    let parsed = match lenience {
        Lenience::Strict => record::strict_parse(line),
        Lenience::Permissive => record::permissive_parse(line),
    };
    let Some(rec) = parsed else {
        return Ok(LineOutcome::Continue);
    };

    // Early termination only ever applies to a strictly-parsed record's own
    // time. `rec.is_strict()` isn't enough to tell a genuine strict-parsed
    // record apart from a permissive-synthesized one: `Record::synthesized`
    // stamps noise lines with `time_ms: Some(now())`, so it reports
    // `is_strict() == true` too. Gate on `lenience` instead — only
    // `Lenience::Strict` ever runs `strict_parse`, whose `time_ms` is read
    // from the line rather than synthesized — so a stray non-JSON line
    // under `Lenience::Permissive` never compares a synthetic "now" against
    // `to`, per spec.md §4.5 step 4 ("a strict record's time").
    if lenience == Lenience::Strict {
        if let (Some(to), Some(t)) = (filter.to, rec.time_ms) {
            if t > to {
                // Records are assumed chronologically non-decreasing; this
                // optimization must never be relied on for correctness
                // elsewhere, only as an early exit here.
                log::debug!("reader: record time {t} exceeds `to` bound {to}, stopping early");
                return Ok(LineOutcome::Stop);
            }
        }
    }

    if filter.matches(&rec) {
        *count += 1;
        let keep_going = on_match(rec);
        if !keep_going {
            return Ok(LineOutcome::Stop);
        }
        if let Some(limit) = filter.limit {
            if *count >= limit {
                return Ok(LineOutcome::Stop);
            }
        }
    }

    Ok(LineOutcome::Continue)
}

fn resolve_start_offset(
    file: &mut File,
    size: u64,
    from_ms: i64,
    cache: &OffsetCache,
) -> Result<u64, LogViewError> {
    if let Some(offset) = cache.lookup(from_ms, size, file) {
        log::debug!("reader: offset cache hit for from={from_ms}, seeding at {offset}");
        return Ok(offset);
    }

    cache.clear();
    let result = locator::locate(file, size, from_ms)?;
    if result.is_found() {
        log::debug!("reader: locator resolved from={from_ms} to offset {}", result.offset);
        cache.store(from_ms, result.offset, result.first_line.clone(), size);
        Ok(result.offset)
    } else {
        log::debug!("reader: locator found no record at or after from={from_ms}");
        Ok(size)
    }
}
