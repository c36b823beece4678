//! The filter evaluator: a pure predicate over a [`Record`] and a
//! [`FilterSpec`], described in the component design as applying level/module
//! membership and inclusive time bounds.

use crate::record::Record;
use std::collections::HashSet;

/// A request's filter criteria. `from`/`to` are inclusive millisecond
/// instants; empty `levels`/`modules` sets mean "no constraint" rather than
/// "match nothing".
#[derive(Debug, Clone, Default)]
pub struct FilterSpec {
    pub from: Option<i64>,
    pub to: Option<i64>,
    pub levels: HashSet<String>,
    pub modules: HashSet<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl FilterSpec {
    /// Whether `record` satisfies this filter. A record whose `time` failed
    /// to parse is rejected whenever either time bound is set, and accepted
    /// otherwise.
    pub fn matches(&self, record: &Record) -> bool {
        if !self.levels.is_empty() {
            match &record.level {
                Some(level) if self.levels.contains(level) => {}
                _ => return false,
            }
        }

        if !self.modules.is_empty() {
            match &record.module {
                Some(module) if self.modules.contains(module) => {}
                _ => return false,
            }
        }

        if self.from.is_some() || self.to.is_some() {
            match record.time_ms {
                Some(t) => {
                    if let Some(from) = self.from {
                        if t < from {
                            return false;
                        }
                    }
                    if let Some(to) = self.to {
                        if t > to {
                            return false;
                        }
                    }
                }
                None => return false,
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::strict_parse;

    fn rec(json: &str) -> Record {
        strict_parse(json).expect("fixture line must be strict")
    }

    #[test]
    fn empty_filter_matches_everything() {
        let r = rec(r#"{"time":"2025-12-01T00:00:00Z","level":"info","msg":"x"}"#);
        assert!(FilterSpec::default().matches(&r));
    }

    #[test]
    fn level_set_restricts_matches() {
        let r = rec(r#"{"time":"2025-12-01T00:00:00Z","level":"debug","msg":"x"}"#);
        let mut f = FilterSpec::default();
        f.levels.insert("error".to_string());
        assert!(!f.matches(&r));
        f.levels.insert("debug".to_string());
        assert!(f.matches(&r));
    }

    #[test]
    fn module_must_be_present_and_in_set() {
        let r = rec(r#"{"time":"2025-12-01T00:00:00Z","msg":"x"}"#);
        let mut f = FilterSpec::default();
        f.modules.insert("auth".to_string());
        assert!(!f.matches(&r), "record without module must fail a module filter");
    }

    #[test]
    fn inclusive_time_bounds() {
        let r = rec(r#"{"time":"2025-12-01T00:00:00Z","msg":"x"}"#);
        let t = r.time_ms.unwrap();
        let mut f = FilterSpec {
            from: Some(t),
            to: Some(t),
            ..Default::default()
        };
        assert!(f.matches(&r), "bounds equal to the record's time are inclusive");
        f.from = Some(t + 1);
        assert!(!f.matches(&r));
    }
}
