use serde::{Deserialize, Serialize};

/// Current router position: path plus raw query string (without the `?`).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Location {
    pub path: String,
    #[serde(default)]
    pub query: String,
}

impl Location {
    pub fn new(path: impl Into<String>, query: impl Into<String>) -> Self {
        let query: String = query.into();
        Self { path: path.into(), query: query.trim_start_matches('?').to_string() }
    }

    /// Split a navigation target like `/login?redirectTo=/x#top` into path and query.
    pub fn parse(target: &str) -> Self {
        let without_fragment = target.split('#').next().unwrap_or("");
        match without_fragment.split_once('?') {
            Some((path, query)) => Self::new(path, query),
            None => Self::new(without_fragment, ""),
        }
    }

    /// First value of `name` in the query, percent-decoded.
    pub fn query_param(&self, name: &str) -> Option<String> {
        self.query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
            .find(|(k, _)| decode(k) == name)
            .map(|(_, v)| decode(v))
    }

    pub fn redirect_to(&self) -> Option<String> {
        self.query_param("redirectTo").filter(|v| !v.is_empty())
    }

    pub fn target(&self) -> String {
        if self.query.is_empty() { self.path.clone() } else { format!("{}?{}", self.path, self.query) }
    }
}

fn decode(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    let decoded = urlencoding::decode(&spaced).map(|c| c.into_owned());
    decoded.unwrap_or(spaced)
}
