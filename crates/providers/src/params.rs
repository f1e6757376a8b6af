//! Request parameters as the adapters see them.
//!
//! Webhook senders are inconsistent about where they put fields: some use the
//! query string, some a form-encoded POST body, some both. Parameters from
//! both sources are merged, query string first, and the first occurrence of a
//! name wins.

use url::form_urlencoded;

/// Decoded name/value pairs of one inbound request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestParams {
    pairs: Vec<(String, String)>,
}

impl RequestParams {
    /// Decodes parameters from an optional raw query string and a raw body.
    ///
    /// The body is only decoded when it is valid UTF-8 form data; anything
    /// else (e.g. a JSON payload) contributes no parameters.
    pub fn from_parts(query: Option<&str>, body: &[u8]) -> Self {
        let mut pairs: Vec<(String, String)> = query
            .map(|q| form_urlencoded::parse(q.as_bytes()).into_owned().collect())
            .unwrap_or_default();

        if let Ok(text) = std::str::from_utf8(body) {
            if looks_like_form(text) {
                pairs.extend(form_urlencoded::parse(text.as_bytes()).into_owned());
            }
        }

        Self { pairs }
    }

    /// Returns the first value of `name`, if present.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns the first value of `name` with surrounding whitespace removed,
    /// or `None` if absent or blank.
    pub fn get_non_blank(&self, name: &str) -> Option<&str> {
        self.get(name).map(str::trim).filter(|v| !v.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RequestParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            pairs: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

fn looks_like_form(text: &str) -> bool {
    let trimmed = text.trim_start();
    !trimmed.is_empty() && !trimmed.starts_with('{') && !trimmed.starts_with('[')
}
