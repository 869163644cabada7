//! Filter helpers for Qdrant search, scroll, and delete requests.

use serde_json::{Value, json};

/// A "field value is one of" clause.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterMatch {
    /// Metadata field name, unqualified.
    pub key: String,
    /// Accepted values.
    pub values: Vec<Value>,
}

impl FilterMatch {
    /// Build a clause from a key and any iterable of JSON-convertible values.
    pub fn new<I, V>(key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            key: key.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

/// Compose a conjunction of match-any clauses, qualifying each key through `path`.
///
/// An empty clause list yields `{"must": []}`, which Qdrant treats as "match everything".
pub fn build_match_any_filter<F>(matches: &[FilterMatch], path: F) -> Value
where
    F: Fn(&str) -> String,
{
    let must: Vec<Value> = matches
        .iter()
        .map(|clause| {
            json!({
                "key": path(&clause.key),
                "match": { "any": clause.values }
            })
        })
        .collect();

    json!({ "must": must })
}

/// Parse a `key=value` pair as typed on a command line into a single-value clause.
pub fn parse_key_value(input: &str) -> Option<FilterMatch> {
    let (key, value) = input.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some(FilterMatch::new(key, [value.trim().to_string()]))
}
