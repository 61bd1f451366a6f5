//! Compiled `(method, path)` lookup table.
//!
//! # Pattern syntax
//!
//! | Pattern          | Matches                                          |
//! |------------------|--------------------------------------------------|
//! | `:name`          | one non-empty path segment                       |
//! | `:?name`         | the same, optional (with its leading `/`)        |
//! | `{name}`         | one non-empty path segment                       |
//! | `{name:regex}`   | `regex`                                          |
//!
//! A constraint registered for a parameter replaces its default pattern.
//! Captures are lazy, so `/users/:id:?format` splits `/users/7.json` into
//! `id = "7"` and `format = ".json"`.

use crate::{errors::Error, http::request::Parameters, http::types::Method};
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;

const SEGMENT: &str = "[^/]+?";

struct Entry<T> {
    methods: Vec<Method>,
    pattern: Regex,
    names: Vec<String>,
    payload: T,
}

/// Routes compiled to anchored regular expressions, tried in registration
/// order; the first match wins.
pub struct DispatchTable<T> {
    entries: Vec<Entry<T>>,
}

impl<T> Default for DispatchTable<T> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<T> DispatchTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiles `uri` and registers `payload` for `methods`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidRoute`] when the pattern or a constraint is not a valid regex.
    pub fn add_route(
        &mut self,
        methods: &[Method],
        uri: &str,
        payload: T,
        constraints: &BTreeMap<String, String>,
    ) -> Result<&mut Self, Error> {
        let (source, names) = compile(uri, constraints);
        let pattern = Regex::new(&source).map_err(|source| Error::InvalidRoute {
            uri: uri.to_string(),
            source,
        })?;

        self.entries.push(Entry {
            methods: methods.to_vec(),
            pattern,
            names,
            payload,
        });
        Ok(self)
    }

    /// Payload of the first route accepting `method` on `path`, with the
    /// parameters it captured.
    ///
    /// One trailing slash is ignored on paths other than `/`.
    pub fn dispatch(&self, method: Method, path: &str) -> Option<(&T, Parameters)> {
        let path = match path.strip_suffix('/') {
            Some(trimmed) if !trimmed.is_empty() => trimmed,
            _ => path,
        };

        self.entries
            .iter()
            .filter(|entry| entry.methods.iter().any(|allowed| allowed.accepts(method)))
            .find_map(|entry| {
                let captures = entry.pattern.captures(path)?;
                let parameters = entry
                    .names
                    .iter()
                    .filter_map(|name| {
                        let value = captures.name(name)?;
                        Some((name.clone(), Value::String(value.as_str().to_string())))
                    })
                    .collect();
                Some((&entry.payload, parameters))
            })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Translates a route pattern into an anchored regex and its parameter names.
fn compile(uri: &str, constraints: &BTreeMap<String, String>) -> (String, Vec<String>) {
    let mut source = String::from("^");
    let mut names = Vec::new();
    let mut literal = String::new();
    let mut rest = uri;

    while let Some(c) = rest.chars().next() {
        match c {
            ':' => {
                let optional = rest[1..].starts_with('?');
                let start = if optional { 2 } else { 1 };
                let name = identifier(&rest[start..]);
                if name.is_empty() {
                    literal.push(c);
                    rest = &rest[1..];
                    continue;
                }

                let pattern = constraints.get(name).map_or(SEGMENT, String::as_str);
                let group = format!("(?P<{name}>{pattern})");

                if optional {
                    // `/users/:?page` also matches `/users`; a leading `/` stays mandatory.
                    let slash = literal.len() > 1 || (literal.len() == 1 && source.len() > 1);
                    if literal.ends_with('/') && slash {
                        literal.pop();
                        source.push_str(&regex::escape(&literal));
                        source.push_str(&format!("(?:/{group})?"));
                    } else {
                        source.push_str(&regex::escape(&literal));
                        source.push_str(&format!("{group}?"));
                    }
                } else {
                    source.push_str(&regex::escape(&literal));
                    source.push_str(&group);
                }
                literal.clear();
                names.push(name.to_string());
                rest = &rest[start + name.len()..];
            }
            '{' => match rest.find('}') {
                Some(end) => {
                    let inner = &rest[1..end];
                    let (name, inline) = match inner.split_once(':') {
                        Some((name, pattern)) => (name, pattern),
                        None => (inner, SEGMENT),
                    };
                    let pattern = constraints.get(name).map_or(inline, String::as_str);

                    source.push_str(&regex::escape(&literal));
                    source.push_str(&format!("(?P<{name}>{pattern})"));
                    literal.clear();
                    names.push(name.to_string());
                    rest = &rest[end + 1..];
                }
                None => {
                    literal.push(c);
                    rest = &rest[1..];
                }
            },
            _ => {
                literal.push(c);
                rest = &rest[c.len_utf8()..];
            }
        }
    }

    source.push_str(&regex::escape(&literal));
    source.push('$');
    (source, names)
}

fn identifier(input: &str) -> &str {
    let end = input
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(input.len());
    &input[..end]
}
