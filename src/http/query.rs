//! Query parameters common to all four endpoints.

use crate::filter::FilterSpec;
use crate::record::parse_instant_ms;
use serde::Deserialize;
use std::collections::HashSet;

#[derive(Debug, Deserialize)]
pub struct LogQuery {
    pub pwd: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub level: Option<String>,
    pub module: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl LogQuery {
    pub fn to_filter(&self) -> FilterSpec {
        FilterSpec {
            from: self.from.as_deref().and_then(parse_instant_ms),
            to: self.to.as_deref().and_then(parse_instant_ms),
            levels: split_lowercase_set(self.level.as_deref()),
            modules: split_lowercase_set(self.module.as_deref()),
            limit: self.limit.filter(|l| *l > 0),
            offset: self.offset,
        }
    }
}

fn split_lowercase_set(raw: Option<&str>) -> HashSet<String> {
    match raw {
        Some(s) if !s.is_empty() => s
            .split(',')
            .map(|part| part.trim().to_lowercase())
            .filter(|part| !part.is_empty())
            .collect(),
        _ => HashSet::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comma_separated_sets() {
        let q = LogQuery {
            pwd: None,
            from: None,
            to: None,
            level: Some("Error, warn".to_string()),
            module: None,
            limit: None,
            offset: None,
        };
        let filter = q.to_filter();
        assert!(filter.levels.contains("error"));
        assert!(filter.levels.contains("warn"));
        assert_eq!(filter.levels.len(), 2);
    }

    #[test]
    fn zero_limit_means_unlimited() {
        let q = LogQuery {
            pwd: None,
            from: None,
            to: None,
            level: None,
            module: None,
            limit: Some(0),
            offset: None,
        };
        assert_eq!(q.to_filter().limit, None);
    }
}
