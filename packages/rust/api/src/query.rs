//! Query-string builder that drops unset values.

use chrono::{DateTime, SecondsFormat, Utc};

/// Ordered query parameters; zero numbers and blank strings are skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query(Vec<(&'static str, String)>);

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn int(mut self, key: &'static str, value: u32) -> Self {
        if value > 0 {
            self.0.push((key, value.to_string()));
        }
        self
    }

    pub fn string(mut self, key: &'static str, value: &str) -> Self {
        let value = value.trim();
        if !value.is_empty() {
            self.0.push((key, value.to_string()));
        }
        self
    }

    pub fn time(mut self, key: &'static str, value: Option<&DateTime<Utc>>) -> Self {
        if let Some(t) = value {
            self.0
                .push((key, t.to_rfc3339_opts(SecondsFormat::Secs, true)));
        }
        self
    }

    pub fn pairs(&self) -> &[(&'static str, String)] {
        &self.0
    }
}
