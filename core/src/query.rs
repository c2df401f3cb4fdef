//! Query-string rendering.
//!
//! Rules shared by every endpoint: booleans render lowercase, omitted
//! optional fields are not rendered, list values render either as repeated
//! `name[]=value` pairs or as one comma-joined value, and every name and
//! value is percent-encoded.

use std::borrow::Cow;

/// Percent-encode an id for use as a single path segment.
pub fn path_segment(id: &str) -> Cow<'_, str> {
    urlencoding::encode(id)
}

/// How a list-valued parameter is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListStyle {
    /// `statuses[]=a&statuses[]=b`
    Repeated,
    /// `assignee=1,2`
    CommaJoined,
}

/// Ordered accumulator of query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryString {
    pairs: Vec<(String, String)>,
}

impl QueryString {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: &str, value: impl ToString) -> &mut Self {
        self.pairs.push((name.to_string(), value.to_string()));
        self
    }

    pub fn push_opt<V: ToString>(&mut self, name: &str, value: Option<V>) -> &mut Self {
        if let Some(value) = value {
            self.push(name, value);
        }
        self
    }

    pub fn push_bool(&mut self, name: &str, value: Option<bool>) -> &mut Self {
        // `bool::to_string` is already lowercase.
        self.push_opt(name, value)
    }

    pub fn push_list<V: ToString>(&mut self, name: &str, values: &[V], style: ListStyle) -> &mut Self {
        if values.is_empty() {
            return self;
        }
        match style {
            ListStyle::Repeated => {
                let key = format!("{name}[]");
                for value in values {
                    self.pairs.push((key.clone(), value.to_string()));
                }
            }
            ListStyle::CommaJoined => {
                let joined = values.iter().map(ToString::to_string).collect::<Vec<_>>().join(",");
                self.pairs.push((name.to_string(), joined));
            }
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Render as `""` when empty, otherwise `"?a=b&c=d"`.
    pub fn render(&self) -> String {
        if self.pairs.is_empty() {
            return String::new();
        }
        let encoded: Vec<String> = self
            .pairs
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect();
        format!("?{}", encoded.join("&"))
    }
}
