//! Decoding of the flat JSON metrics document served by Spring.

use std::collections::HashMap;
use std::fmt;

use serde::Deserialize;
use serde::de::{Deserializer, MapAccess, Visitor};

/// Raw key/value metrics of one scrape, in document order.
///
/// Only a JSON object whose values are all numbers is accepted. Nested
/// objects, arrays, strings, booleans and nulls are rejected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawPayload {
    entries: Vec<(String, f64)>,
}

impl RawPayload {
    /// Parse a response body.
    pub fn parse(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the payload has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(key, value)` pairs in document order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl IntoIterator for RawPayload {
    type Item = (String, f64);
    type IntoIter = std::vec::IntoIter<(String, f64)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'de> Deserialize<'de> for RawPayload {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(PayloadVisitor)
    }
}

struct PayloadVisitor;

impl<'de> Visitor<'de> for PayloadVisitor {
    type Value = RawPayload;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a JSON object mapping metric names to numbers")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut entries: Vec<(String, f64)> = Vec::with_capacity(map.size_hint().unwrap_or(0));
        let mut positions: HashMap<String, usize> = HashMap::new();

        while let Some((key, value)) = map.next_entry::<String, f64>()? {
            // A repeated key keeps its first position but takes the last value.
            match positions.get(&key) {
                Some(&idx) => entries[idx].1 = value,
                None => {
                    positions.insert(key.clone(), entries.len());
                    entries.push((key, value));
                }
            }
        }

        Ok(RawPayload { entries })
    }
}
