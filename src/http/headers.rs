//! Case-insensitive, insertion-ordered header multimap.

use crate::errors::ErrorKind;
use std::fmt;

/// Value stored under a header name.
///
/// A name only holds a list once it has been [`add`](HeaderBag::add)ed more than once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderValue {
    Single(String),
    Multi(Vec<String>),
}

impl HeaderValue {
    pub fn first(&self) -> &str {
        match self {
            HeaderValue::Single(value) => value,
            HeaderValue::Multi(values) => values.first().map(String::as_str).unwrap_or_default(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let values: &[String] = match self {
            HeaderValue::Single(value) => std::slice::from_ref(value),
            HeaderValue::Multi(values) => values,
        };
        values.iter().map(String::as_str)
    }
}

/// Ordered mapping from lower-cased, trimmed header names to their values.
///
/// # Examples
/// ```
/// use kiln::HeaderBag;
///
/// let mut headers = HeaderBag::new();
/// headers.add("X-Tag", "a");
/// headers.add("x-tag", " b ");
///
/// assert_eq!(headers.get_all("X-TAG"), ["a", "b"]);
/// assert_eq!(headers.serialize(), "x-tag: a\r\nx-tag: b");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderBag {
    entries: Vec<(String, HeaderValue)>,
}

#[inline]
fn normalize(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

impl HeaderBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a raw `Name: value\r\n...` block.
    ///
    /// Empty lines are skipped, repeated names are appended. A line without a
    /// colon is an [`ErrorKind::InvalidHeader`].
    pub fn parse(raw: &str) -> Result<Self, ErrorKind> {
        let mut headers = Self::new();

        for line in raw.split("\r\n").filter(|line| !line.is_empty()) {
            let (name, value) = line.split_once(':').ok_or(ErrorKind::InvalidHeader)?;
            if name.trim().is_empty() {
                return Err(ErrorKind::InvalidHeader);
            }
            headers.add(name, value);
        }

        Ok(headers)
    }

    /// Builds a bag from a multi-value source, keeping the source's order.
    pub fn parse_multi<I, N, V, S>(source: I) -> Self
    where
        I: IntoIterator<Item = (N, V)>,
        N: AsRef<str>,
        V: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut headers = Self::new();
        for (name, values) in source {
            for value in values {
                headers.add(name.as_ref(), value.as_ref());
            }
        }
        headers
    }

    fn position(&self, name: &str) -> Option<usize> {
        let name = normalize(name);
        self.entries.iter().position(|(key, _)| *key == name)
    }

    /// Appends `value`, promoting an existing scalar to a list.
    pub fn add(&mut self, name: &str, value: &str) -> &mut Self {
        let value = value.trim().to_string();

        match self.position(name) {
            Some(index) => {
                let slot = &mut self.entries[index].1;
                match slot {
                    HeaderValue::Multi(values) => values.push(value),
                    HeaderValue::Single(first) => {
                        *slot = HeaderValue::Multi(vec![std::mem::take(first), value]);
                    }
                }
            }
            None => self.entries.push((normalize(name), HeaderValue::Single(value))),
        }
        self
    }

    /// Replaces any existing value in place; does nothing when `overwrite`
    /// is off and the header already exists.
    pub fn set_with(&mut self, name: &str, value: &str, overwrite: bool) -> &mut Self {
        let value = HeaderValue::Single(value.trim().to_string());

        match self.position(name) {
            Some(index) if overwrite => self.entries[index].1 = value,
            Some(_) => {}
            None => self.entries.push((normalize(name), value)),
        }
        self
    }

    #[inline]
    pub fn set(&mut self, name: &str, value: &str) -> &mut Self {
        self.set_with(name, value, true)
    }

    pub fn remove(&mut self, name: &str) -> Option<HeaderValue> {
        let index = self.position(name)?;
        Some(self.entries.remove(index).1)
    }

    /// First value of the header.
    pub fn get(&self, name: &str) -> Option<&str> {
        let index = self.position(name)?;
        Some(self.entries[index].1.first())
    }

    pub fn get_all(&self, name: &str) -> Vec<&str> {
        match self.position(name) {
            Some(index) => self.entries[index].1.iter().collect(),
            None => Vec::new(),
        }
    }

    /// Whether the header exists, or with `value`, whether any of its values
    /// equals `value` ignoring case.
    pub fn has(&self, name: &str, value: Option<&str>) -> bool {
        let Some(index) = self.position(name) else {
            return false;
        };

        match value {
            None => true,
            Some(value) => self.entries[index]
                .1
                .iter()
                .any(|stored| stored.eq_ignore_ascii_case(value.trim())),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// `name: value` lines joined by CRLF, one line per value, in insertion order.
    pub fn serialize(&self) -> String {
        self.entries
            .iter()
            .flat_map(|(name, value)| value.iter().map(move |value| format!("{name}: {value}")))
            .collect::<Vec<_>>()
            .join("\r\n")
    }

    /// Entries of a comma-separated, `q`-weighted header, heaviest first.
    ///
    /// Entries without a `q` parameter weigh `1.0`; ties keep their written order.
    pub fn weighted(&self, name: &str) -> Vec<Weighted> {
        let mut entries: Vec<Weighted> = self
            .get_all(name)
            .into_iter()
            .flat_map(|value| value.split(','))
            .filter_map(Weighted::parse)
            .collect();

        entries.sort_by(|a, b| b.weight.total_cmp(&a.weight));
        entries
    }
}

macro_rules! header_accessors {
    ($($(#[$docs:meta])* $method:ident => $name:literal;)*) => {
        impl HeaderBag {$(
            $(#[$docs])*
            #[inline]
            pub fn $method(&self) -> Option<&str> {
                self.get($name)
            }
        )*}
    };
}

header_accessors! {
    accept => "accept";
    accept_encoding => "accept-encoding";
    connection => "connection";
    content_encoding => "content-encoding";
    content_type => "content-type";
    host => "host";
    transfer_encoding => "transfer-encoding";
    upgrade => "upgrade";
    user_agent => "user-agent";
}

impl HeaderBag {
    /// `Content-Length` when it is present, single and made of digits only.
    ///
    /// Lengths past `usize::MAX` saturate so they still trip body ceilings.
    pub fn content_length(&self) -> Option<usize> {
        match self.get_all("content-length").as_slice() {
            [value] if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) => {
                Some(value.parse().unwrap_or(usize::MAX))
            }
            _ => None,
        }
    }
}

impl fmt::Display for HeaderBag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize())
    }
}

/// One entry of a `q`-weighted list such as `Accept` or `Accept-Encoding`.
#[derive(Debug, Clone, PartialEq)]
pub struct Weighted {
    pub value: String,
    pub weight: f32,
}

impl Weighted {
    fn parse(entry: &str) -> Option<Self> {
        let mut segments = entry.split(';').map(str::trim);
        let value = segments.next().filter(|value| !value.is_empty())?;

        let weight = segments
            .find_map(|segment| segment.strip_prefix("q="))
            .and_then(|q| q.parse::<f32>().ok())
            .unwrap_or(1.0);

        Some(Self {
            value: value.to_ascii_lowercase(),
            weight,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_insensitive_lookup() {
        #[rustfmt::skip]
        let cases = [
            ("Content-Type",   "content-type"),
            ("content-type",   "CONTENT-TYPE"),
            ("  X-Request-Id", "x-request-ID "),
        ];

        for (set_name, get_name) in cases {
            let mut headers = HeaderBag::new();
            headers.set(set_name, "value");
            assert_eq!(headers.get(get_name), Some("value"), "{set_name} / {get_name}");
        }
    }

    #[test]
    fn multi_value_promotion() {
        let mut headers = HeaderBag::new();
        headers.add("X", "a").add("x", "b");
        assert_eq!(headers.get_all("X"), ["a", "b"]);
        assert_eq!(headers.get("X"), Some("a"));

        headers.add("X", "c");
        assert_eq!(headers.get_all("x"), ["a", "b", "c"]);

        headers.set("X", "c");
        assert_eq!(headers.get_all("X"), ["c"]);
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn set_without_overwrite() {
        let mut headers = HeaderBag::new();
        headers.set("Server", "one");
        headers.set_with("server", "two", false);
        headers.set_with("X-Frame-Options", "SAMEORIGIN", false);

        assert_eq!(headers.get("server"), Some("one"));
        assert_eq!(headers.get("x-frame-options"), Some("SAMEORIGIN"));
    }

    #[test]
    fn remove_and_has() {
        let mut headers = HeaderBag::new();
        headers.set("Connection", "Upgrade");

        assert!(headers.has("connection", None));
        assert!(headers.has("CONNECTION", Some("upgrade")));
        assert!(!headers.has("connection", Some("close")));
        assert!(!headers.has("upgrade", None));

        assert!(headers.remove("Connection").is_some());
        assert!(headers.remove("Connection").is_none());
        assert!(headers.is_empty());
    }

    #[test]
    fn serialize_keeps_insertion_order() {
        let mut headers = HeaderBag::new();
        headers.set("B", "2").set("A", "1").add("C", "3").add("c", "4");
        headers.set("b", "two");

        assert_eq!(headers.serialize(), "b: two\r\na: 1\r\nc: 3\r\nc: 4");
    }

    #[test]
    fn parse_raw_block() {
        #[rustfmt::skip]
        let cases = [
            ("Host: example.com\r\nAccept:  */* \r\n", Ok(vec![("host", "example.com"), ("accept", "*/*")])),
            ("Host: a:8080",                            Ok(vec![("host", "a:8080")])),
            ("X-Empty:\r\n\r\n",                        Ok(vec![("x-empty", "")])),
            ("",                                        Ok(vec![])),
            ("Broken line",                             Err(ErrorKind::InvalidHeader)),
            (": no name",                               Err(ErrorKind::InvalidHeader)),
        ];

        for (input, expected) in cases {
            let parsed = HeaderBag::parse(input).map(|headers| {
                headers
                    .iter()
                    .map(|(name, value)| (name.to_string(), value.first().to_string()))
                    .collect::<Vec<_>>()
            });
            let expected = expected.map(|pairs| {
                pairs
                    .into_iter()
                    .map(|(n, v)| (n.to_string(), v.to_string()))
                    .collect::<Vec<_>>()
            });
            assert_eq!(parsed, expected, "{input:?}");
        }
    }

    #[test]
    fn parse_repeated_names() {
        let headers = HeaderBag::parse("Set-Cookie: a=1\r\nset-cookie: b=2").unwrap();
        assert_eq!(headers.get_all("set-cookie"), ["a=1", "b=2"]);

        let headers = HeaderBag::parse_multi([("Accept", vec!["text/html", "application/json"])]);
        assert_eq!(headers.get_all("accept"), ["text/html", "application/json"]);
    }

    #[test]
    fn content_length() {
        #[rustfmt::skip]
        let cases = [
            ("Content-Length: 12",                       Some(12)),
            ("Content-Length: 12a",                      None),
            ("Content-Length: 99999999999999999999999",  Some(usize::MAX)),
            ("Content-Length: -1",                       None),
            ("Content-Length: 1\r\nContent-Length: 1",   None),
            ("Host: a",                                  None),
        ];

        for (input, expected) in cases {
            assert_eq!(HeaderBag::parse(input).unwrap().content_length(), expected, "{input}");
        }
    }

    #[test]
    fn weighted_entries() {
        let headers =
            HeaderBag::parse("Accept: text/html;q=0.5, application/json, */*;q=0.1").unwrap();
        let order: Vec<_> = headers
            .weighted("accept")
            .into_iter()
            .map(|entry| entry.value)
            .collect();

        assert_eq!(order, ["application/json", "text/html", "*/*"]);
    }
}
