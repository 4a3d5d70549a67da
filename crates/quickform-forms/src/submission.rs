//! Submitted form data.
//!
//! [`SubmitData`] is an ordered multimap parsed from
//! `application/x-www-form-urlencoded` bodies or query strings. Forms bind
//! through the narrower [`SubmissionSource`] trait so integrations can feed
//! their own request types without converting.

use std::collections::HashMap;

use percent_encoding::percent_decode_str;

/// Where a form reads its submitted values from.
pub trait SubmissionSource {
    fn contains(&self, key: &str) -> bool;

    /// All values submitted under `key`, in submission order. `None` when
    /// the key is absent.
    fn values(&self, key: &str) -> Option<Vec<&str>>;
}

/// A multimap of submitted field names to values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmitData {
    inner: HashMap<String, Vec<String>>,
}

impl SubmitData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a urlencoded payload. `+` decodes to a space; repeated keys
    /// accumulate. Pairs without `=` are stored with an empty value.
    pub fn parse(payload: &str) -> Self {
        let mut data = Self::new();
        for pair in payload.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = match pair.split_once('=') {
                Some((k, v)) => (k, v),
                None => (pair, ""),
            };
            data.append(&decode_component(key), decode_component(value));
        }
        data
    }

    pub fn append(&mut self, key: &str, value: impl Into<String>) {
        self.inner
            .entry(key.to_string())
            .or_default()
            .push(value.into());
    }

    /// Replaces all values under `key` with a single value.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.inner.insert(key.to_string(), vec![value.into()]);
    }

    /// The last value submitted under `key`, mirroring how browsers resolve
    /// duplicate scalar inputs.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.inner
            .get(key)
            .and_then(|vals| vals.last())
            .map(String::as_str)
    }

    pub fn get_list(&self, key: &str) -> Option<&[String]> {
        self.inner.get(key).map(Vec::as_slice)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.inner.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

impl SubmissionSource for SubmitData {
    fn contains(&self, key: &str) -> bool {
        self.contains_key(key)
    }

    fn values(&self, key: &str) -> Option<Vec<&str>> {
        self.inner
            .get(key)
            .map(|vals| vals.iter().map(String::as_str).collect())
    }
}
