//! The offset locator: a byte-offset binary search over an NDJSON file that
//! tolerates non-JSON noise and arbitrarily long lines, producing a byte
//! offset usable for resumed chunked reading downstream. This is the hard
//! part of the system — see the module-level algorithm notes on each step.

use crate::record::strict_parse;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};

/// Below this window size, binary search stops probing and hands off to the
/// confirmation scan.
const WINDOW_FLOOR: u64 = 64 * 1024;

/// Initial probe read size during binary search.
const PROBE_INITIAL: usize = 4 * 1024;

/// Probe reads grow up to this size to accommodate giant records before the
/// search gives up on finding a bounded candidate line.
const PROBE_MAX: usize = 4 * 1024 * 1024;

/// Initial confirmation scan window.
const SCAN_MIN: usize = 256 * 1024;

/// Confirmation scan windows grow up to this size while making progress
/// through long non-strict runs or oversized records.
const SCAN_MAX: usize = 64 * 1024 * 1024;

/// Result of [`locate`]. `first_line` is empty iff no record at or after
/// `target` exists in the file — callers treat that as "no matches".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LocateResult {
    pub offset: u64,
    pub first_line: String,
}

impl LocateResult {
    fn not_found(size: u64) -> Self {
        LocateResult {
            offset: size,
            first_line: String::new(),
        }
    }

    pub fn is_found(&self) -> bool {
        !self.first_line.is_empty()
    }
}

/// Locates the byte offset of the first strict record whose time is ≥
/// `target_ms`. Returns `offset = 0` if `target_ms` precedes every record,
/// and an empty `first_line` if no such record exists.
///
/// Maintains the invariant that every strict record at offset < `low` has
/// time < `target_ms`, and the answer (if any) lies in `[low, high)`.
/// Retreating `high` is only safe when a probe conclusively establishes the
/// probed region is at or after `target_ms`; on ambiguous (non-JSON) probes
/// the search advances `low` instead, to avoid oscillating on noise.
pub fn locate(file: &mut File, size: u64, target_ms: i64) -> std::io::Result<LocateResult> {
    if size == 0 {
        return Ok(LocateResult::not_found(0));
    }

    let mut low: u64 = 0;
    let mut high: u64 = size;

    while high - low > WINDOW_FLOOR {
        let mid = low + (high - low) / 2;
        let buf = read_growing_probe(file, mid, size)?;

        let newlines: Vec<usize> = memchr::memchr_iter(b'\n', &buf).collect();

        if newlines.is_empty() {
            // No line boundary anywhere in the (possibly maximally grown)
            // probe: we can't even bound a candidate line. Retreat.
            log::trace!("locator: no newline in probe at {mid} ({}B), retreating high", buf.len());
            high = mid;
            continue;
        }

        if newlines.len() < 2 {
            // Only the boundary before our candidate line is known; its
            // terminating newline never showed up (a giant record past
            // PROBE_MAX, or the file's last unterminated line). We can't
            // compare this candidate's time to target_ms, so we can't rule
            // out that it belongs at or after target_ms — retreat, the same
            // as the no-newline case above, rather than risk advancing low
            // past an unresolved record.
            log::trace!("locator: only one newline in probe at {mid} ({}B), retreating high", buf.len());
            high = mid;
            continue;
        }

        let mut advanced = false;
        for pair in newlines.windows(2) {
            let (start_nl, end_nl) = (pair[0], pair[1]);
            let line_start = start_nl + 1;
            let line_bytes = &buf[line_start..end_nl];
            let line = String::from_utf8_lossy(line_bytes);

            if let Some(rec) = strict_parse(&line) {
                let t = rec.time_ms.expect("strict record carries a parsed time");
                if t < target_ms {
                    low = (mid + (end_nl + 1) as u64).min(high);
                } else {
                    high = mid;
                }
                log::trace!("locator: probe at {mid} -> record time {t} vs target {target_ms}, low={low} high={high}");
                advanced = true;
                break;
            }
        }

        if !advanced {
            // Every candidate line in this probe failed to strict-parse —
            // noisy region. Advance past it rather than retreat, or the
            // search would loop on the same bytes forever.
            log::trace!("locator: probe at {mid} was all non-strict noise, advancing low past {}B", buf.len());
            low = (mid + buf.len() as u64).min(high);
        }
    }

    log::debug!("locator: binary search settled on low={low}, starting confirmation scan");
    confirm(file, low, size, target_ms)
}

/// Reads a window starting at `pos`, growing it geometrically until it
/// contains at least two newlines (enough to bound one full candidate
/// line), until it reaches EOF, or until it hits `PROBE_MAX`.
fn read_growing_probe(file: &mut File, pos: u64, size: u64) -> std::io::Result<Vec<u8>> {
    let mut want = PROBE_INITIAL;
    loop {
        let buf = read_at(file, pos, want, size)?;
        let newline_count = memchr::memchr_iter(b'\n', &buf).count();
        let reached_eof = pos + buf.len() as u64 >= size;
        if newline_count >= 2 || reached_eof || want >= PROBE_MAX {
            return Ok(buf);
        }
        want = (want * 8).min(PROBE_MAX);
    }
}

/// Forward confirmation scan from `low`: the first strict record at or
/// after `low` whose time ≥ `target_ms`. If `low > 0`, the first (possibly
/// partial) line is discarded once. Grows its window and keeps scanning
/// from the current cursor — never reports "not found" before EOF.
fn confirm(
    file: &mut File,
    low: u64,
    size: u64,
    target_ms: i64,
) -> std::io::Result<LocateResult> {
    let mut cursor = low;
    let mut skip_first = low > 0;
    let mut window = SCAN_MIN;

    loop {
        if cursor >= size {
            return Ok(LocateResult::not_found(size));
        }

        let buf = read_at(file, cursor, window, size)?;
        let mut pos = 0usize;
        let mut consumed_to = 0usize;

        for nl in memchr::memchr_iter(b'\n', &buf) {
            let line_start = pos;
            let line_end = nl;
            pos = nl + 1;
            consumed_to = pos;

            if skip_first {
                skip_first = false;
                continue;
            }

            let line_bytes = &buf[line_start..line_end];
            let line = String::from_utf8_lossy(line_bytes);
            if let Some(rec) = strict_parse(&line) {
                if rec.time_ms.expect("strict record carries a parsed time") >= target_ms {
                    return Ok(LocateResult {
                        offset: cursor + line_start as u64,
                        first_line: line.into_owned(),
                    });
                }
            }
        }

        let reached_eof = cursor + buf.len() as u64 >= size;
        if reached_eof {
            return Ok(LocateResult::not_found(size));
        }

        if consumed_to == 0 {
            // Not even one full line fit in this window (a record bigger
            // than the window) — grow and re-read from the same cursor.
            window = (window * 2).min(SCAN_MAX);
            log::trace!("locator: confirmation window grown to {window}B at cursor {cursor}, no full line yet");
        } else {
            cursor += consumed_to as u64;
            window = SCAN_MIN;
        }
    }
}

fn read_at(file: &mut File, pos: u64, len: usize, size: u64) -> std::io::Result<Vec<u8>> {
    let capped_len = len.min((size - pos) as usize);
    let mut buf = vec![0u8; capped_len];
    file.seek(SeekFrom::Start(pos))?;
    let mut read_total = 0;
    while read_total < capped_len {
        let n = file.read(&mut buf[read_total..])?;
        if n == 0 {
            break;
        }
        read_total += n;
    }
    buf.truncate(read_total);
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_lines(lines: &[String]) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(f, "{line}").unwrap();
        }
        f.flush().unwrap();
        f
    }

    fn rec_line(ts: &str, idx: usize) -> String {
        format!(r#"{{"time":"{ts}","level":"info","msg":"event {idx}"}}"#)
    }

    #[test]
    fn chronological_scan_lands_on_exact_boundary() {
        let mut lines = Vec::new();
        let base = chrono::DateTime::parse_from_rfc3339("2025-12-01T00:00:00Z")
            .unwrap()
            .timestamp();
        for i in 0..200 {
            let ts = chrono::DateTime::from_timestamp(base + i * 120, 0).unwrap();
            lines.push(rec_line(&ts.to_rfc3339(), i as usize));
        }
        let file = write_lines(&lines);
        let size = file.as_file().metadata().unwrap().len();
        let mut f = file.reopen().unwrap();

        let target = chrono::DateTime::parse_from_rfc3339("2025-12-01T02:00:00Z")
            .unwrap()
            .timestamp_millis();
        let result = locate(&mut f, size, target).unwrap();
        assert!(result.is_found());
        let rec = strict_parse(&result.first_line).unwrap();
        assert_eq!(rec.time_ms, Some(target));
    }

    #[test]
    fn target_before_everything_returns_offset_zero() {
        let lines = vec![
            rec_line("2025-12-14T08:00:00Z", 0),
            rec_line("2025-12-14T10:00:00Z", 1),
        ];
        let file = write_lines(&lines);
        let size = file.as_file().metadata().unwrap().len();
        let mut f = file.reopen().unwrap();

        let target = chrono::DateTime::parse_from_rfc3339("2000-01-01T00:00:00Z")
            .unwrap()
            .timestamp_millis();
        let result = locate(&mut f, size, target).unwrap();
        assert_eq!(result.offset, 0);
        assert!(result.is_found());
    }

    #[test]
    fn target_after_everything_returns_not_found() {
        let lines = vec![rec_line("2025-12-14T08:00:00Z", 0)];
        let file = write_lines(&lines);
        let size = file.as_file().metadata().unwrap().len();
        let mut f = file.reopen().unwrap();

        let target = chrono::DateTime::parse_from_rfc3339("2030-01-01T00:00:00Z")
            .unwrap()
            .timestamp_millis();
        let result = locate(&mut f, size, target).unwrap();
        assert!(!result.is_found());
    }

    #[test]
    fn target_between_records() {
        let lines = vec![
            rec_line("2025-12-14T08:00:00Z", 0),
            rec_line("2025-12-14T10:00:00Z", 1),
            rec_line("2025-12-14T12:00:00Z", 2),
        ];
        let file = write_lines(&lines);
        let size = file.as_file().metadata().unwrap().len();
        let mut f = file.reopen().unwrap();

        let target = chrono::DateTime::parse_from_rfc3339("2025-12-14T09:00:00Z")
            .unwrap()
            .timestamp_millis();
        let result = locate(&mut f, size, target).unwrap();
        let rec = strict_parse(&result.first_line).unwrap();
        assert_eq!(rec.msg.as_deref(), Some("event 1"));
    }

    #[test]
    fn non_json_gap_is_skipped_without_stalling() {
        let mut lines = vec![rec_line("2025-12-15T12:00:00Z", 0)];
        // ~400 KiB of non-structured noise
        let noise_line = "x".repeat(200);
        for _ in 0..2048 {
            lines.push(noise_line.clone());
        }
        lines.push(rec_line("2025-12-16T05:00:00Z", 1));
        let file = write_lines(&lines);
        let size = file.as_file().metadata().unwrap().len();
        let mut f = file.reopen().unwrap();

        let target = chrono::DateTime::parse_from_rfc3339("2025-12-15T23:00:00Z")
            .unwrap()
            .timestamp_millis();
        let result = locate(&mut f, size, target).unwrap();
        let rec = strict_parse(&result.first_line).unwrap();
        assert_eq!(rec.msg.as_deref(), Some("event 1"));
    }

    #[test]
    fn large_burst_of_identical_timestamps_does_not_stall() {
        let mut lines = Vec::new();
        for day in 1..15 {
            lines.push(rec_line(&format!("2025-12-{day:02}T00:00:00Z"), day as usize));
        }
        // ~640 KiB of records sharing one timestamp.
        for i in 0..3000 {
            lines.push(rec_line("2025-12-15T20:30:00.123Z", i));
        }
        lines.push(rec_line("2025-12-16T05:00:00Z", 9999));
        let file = write_lines(&lines);
        let size = file.as_file().metadata().unwrap().len();
        let mut f = file.reopen().unwrap();

        let target = chrono::DateTime::parse_from_rfc3339("2025-12-15T23:00:00Z")
            .unwrap()
            .timestamp_millis();
        let result = locate(&mut f, size, target).unwrap();
        let rec = strict_parse(&result.first_line).unwrap();
        assert_eq!(rec.msg.as_deref(), Some("event 9999"));
    }

    #[test]
    fn idempotent_across_repeated_calls() {
        let lines = vec![
            rec_line("2025-12-14T08:00:00Z", 0),
            rec_line("2025-12-14T10:00:00Z", 1),
            rec_line("2025-12-14T12:00:00Z", 2),
        ];
        let file = write_lines(&lines);
        let size = file.as_file().metadata().unwrap().len();
        let target = chrono::DateTime::parse_from_rfc3339("2025-12-14T09:00:00Z")
            .unwrap()
            .timestamp_millis();

        let mut results = Vec::new();
        for _ in 0..3 {
            let mut f = file.reopen().unwrap();
            results.push(locate(&mut f, size, target).unwrap());
        }
        assert_eq!(results[0], results[1]);
        assert_eq!(results[1], results[2]);
    }
}
