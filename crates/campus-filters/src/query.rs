//! Ordered query-string multimap.
//!
//! # Design
//! - Preserve parameter order so repeated keys (`ids=1&ids=2`) survive edits.
//! - Parsing is total: undecodable escapes are kept verbatim instead of failing.
//! - The same type holds a whole URL and the raw fragment cached for one filter.

use std::borrow::Cow;
use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

/// Parsed query string as ordered `name=value` pairs.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Query {
    pairs: Vec<(String, String)>,
}

impl Query {
    /// Empty query.
    #[must_use]
    pub const fn new() -> Self {
        Self { pairs: Vec::new() }
    }

    /// Parse a raw query string, with or without the leading `?`.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let raw = raw.strip_prefix('?').unwrap_or(raw);
        let pairs = raw
            .split('&')
            .filter(|segment| !segment.is_empty())
            .map(|segment| {
                let (name, value) = segment.split_once('=').unwrap_or((segment, ""));
                (decode_component(name), decode_component(value))
            })
            .filter(|(name, _)| !name.is_empty())
            .collect();
        Self { pairs }
    }

    /// First value for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Every value for `name`, in order.
    #[must_use]
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
            .collect()
    }

    /// Whether `name` appears at least once.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.pairs.iter().any(|(key, _)| key == name)
    }

    /// Replace every value of `name` with a single value, keeping the position
    /// of the first occurrence.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.pairs.iter().position(|(key, _)| key == name) {
            Some(index) => {
                self.pairs[index].1 = value;
                let mut seen = 0usize;
                self.pairs.retain(|(key, _)| {
                    if key == name {
                        seen += 1;
                        seen == 1
                    } else {
                        true
                    }
                });
            }
            None => self.pairs.push((name.to_string(), value)),
        }
    }

    /// Append one more value for `name`.
    pub fn append(&mut self, name: &str, value: impl Into<String>) {
        self.pairs.push((name.to_string(), value.into()));
    }

    /// Remove every value of `name`; returns whether anything was removed.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.pairs.len();
        self.pairs.retain(|(key, _)| key != name);
        before != self.pairs.len()
    }

    /// Copy of the pairs whose name is listed in `names`.
    #[must_use]
    pub fn select(&self, names: &[&str]) -> Self {
        Self {
            pairs: self
                .pairs
                .iter()
                .filter(|(key, _)| names.contains(&key.as_str()))
                .cloned()
                .collect(),
        }
    }

    /// Append every pair from `other`.
    pub fn extend(&mut self, other: &Self) {
        self.pairs.extend(other.pairs.iter().cloned());
    }

    /// Whether the query carries no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Number of `name=value` pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Iterate over pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

impl Display for Query {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        for (index, (name, value)) in self.pairs.iter().enumerate() {
            if index > 0 {
                formatter.write_str("&")?;
            }
            write!(
                formatter,
                "{}={}",
                urlencoding::encode(name),
                urlencoding::encode(value)
            )?;
        }
        Ok(())
    }
}

impl From<&str> for Query {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Query {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            pairs: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }
}

fn decode_component(raw: &str) -> String {
    let spaced: Cow<'_, str> = if raw.contains('+') {
        Cow::Owned(raw.replace('+', " "))
    } else {
        Cow::Borrowed(raw)
    };
    urlencoding::decode(&spaced).map_or_else(|_| spaced.to_string(), Cow::into_owned)
}

#[cfg(test)]
mod tests {
    use super::Query;

    #[test]
    fn parse_handles_repeats_escapes_and_prefix() {
        let query = Query::parse("?classroom_ids=1&classroom_ids=&classroom_ids=2&q=a%20b+c");
        assert_eq!(query.get_all("classroom_ids"), vec!["1", "", "2"]);
        assert_eq!(query.get("q"), Some("a b c"));
        assert_eq!(query.get("missing"), None);
    }

    #[test]
    fn parse_tolerates_bare_names_and_bad_escapes() {
        let query = Query::parse("flag&&bad=%zz&=orphan");
        assert_eq!(query.get("flag"), Some(""));
        assert_eq!(query.get("bad"), Some("%zz"));
        assert_eq!(query.len(), 2);
    }

    #[test]
    fn set_collapses_repeats_in_place() {
        let mut query = Query::parse("a=1&b=2&a=3");
        query.set("a", "9");
        assert_eq!(query.to_string(), "a=9&b=2");
        query.set("c", "x y");
        assert_eq!(query.to_string(), "a=9&b=2&c=x%20y");
    }

    #[test]
    fn remove_and_select_work_on_names() {
        let mut query = Query::parse("a=1&b=2&a=3&c=4");
        let fragment = query.select(&["a"]);
        assert_eq!(fragment.to_string(), "a=1&a=3");
        assert!(query.remove("a"));
        assert!(!query.remove("a"));
        assert_eq!(query.to_string(), "b=2&c=4");
    }

    #[test]
    fn display_round_trips_through_parse() {
        let query: Query = [("search", "smith & co"), ("page", "1")]
            .into_iter()
            .collect();
        assert_eq!(Query::parse(&query.to_string()), query);
    }
}
