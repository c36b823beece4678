//! Property-based coverage of the locator's idempotence invariant, run
//! against randomly generated chronological logs rather than the fixed
//! scenarios already exercised by `locator.rs`'s inline unit tests.

use logview::locator::locate;
use logview::record::strict_parse;
use proptest::prelude::*;
use std::io::Write;

const BASE_MS: i64 = 1_764_547_200_000; // 2025-12-01T00:00:00Z
const STEP_MS: i64 = 60_000;

fn build_log(count: usize) -> tempfile::NamedTempFile {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    for i in 0..count {
        let ms = BASE_MS + i as i64 * STEP_MS;
        let dt = chrono::DateTime::from_timestamp_millis(ms).unwrap();
        writeln!(
            f,
            r#"{{"time":"{}","msg":"record {i}"}}"#,
            dt.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
        )
        .unwrap();
    }
    f.flush().unwrap();
    f
}

proptest! {
    #[test]
    fn locate_is_idempotent_across_repeated_calls(
        count in 50usize..500,
        target_index in 0usize..500,
    ) {
        let target_index = target_index % count.max(1);
        let f = build_log(count);
        let size = f.as_file().metadata().unwrap().len();
        let target_ms = BASE_MS + target_index as i64 * STEP_MS;

        let mut handle = f.reopen().unwrap();
        let first = locate(&mut handle, size, target_ms).unwrap();
        let second = locate(&mut handle, size, target_ms).unwrap();
        let third = locate(&mut handle, size, target_ms).unwrap();

        prop_assert_eq!(&first, &second);
        prop_assert_eq!(&second, &third);
    }
}

#[test]
fn locate_on_single_tiny_record_file() {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    writeln!(f, r#"{{"time":"2025-12-01T00:00:00Z","msg":"x"}}"#).unwrap();
    f.flush().unwrap();
    let size = f.as_file().metadata().unwrap().len();

    let mut handle = f.reopen().unwrap();
    let result = locate(&mut handle, size, 1_764_547_200_000).unwrap();
    assert_eq!(result.offset, 0);
}

#[test]
fn giant_record_past_probe_max_is_not_skipped() {
    // A record whose own terminating newline sits well past PROBE_MAX (4 MiB)
    // makes an early probe land on a "one newline found" boundary: the
    // candidate's start is known but its close never showed up within the
    // probe. The search must retreat there, same as when it finds no
    // newline at all, rather than advance past the candidate unconfirmed.
    let mut f = tempfile::NamedTempFile::new().unwrap();
    writeln!(f, r#"{{"time":"2025-12-01T00:00:00Z","msg":"before"}}"#).unwrap();
    let giant_msg = "a".repeat(4_300_000);
    let target_ms = chrono::DateTime::parse_from_rfc3339("2025-12-02T00:00:00Z")
        .unwrap()
        .timestamp_millis();
    writeln!(f, r#"{{"time":"2025-12-02T00:00:00Z","msg":"{giant_msg}"}}"#).unwrap();
    f.flush().unwrap();
    let size = f.as_file().metadata().unwrap().len();

    let mut handle = f.reopen().unwrap();
    let result = locate(&mut handle, size, target_ms).unwrap();
    assert!(result.is_found(), "the giant record must be found, not skipped");
    let rec = strict_parse(&result.first_line).unwrap();
    assert_eq!(rec.time_ms, Some(target_ms));
    assert_eq!(rec.msg.as_deref(), Some(giant_msg.as_str()));
}
