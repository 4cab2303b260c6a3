//! Notification click routing.

use serde_json::Value;
use url::Url;

use crate::messaging::constants::DEFAULT_URL;

/// How a notification's target URL is compared with the URL of an open window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ClickRouting {
    /// Same origin and same path, ignoring query, fragment and trailing
    /// slashes. `/news` matches `https://site/news?ref=1` and
    /// `https://site/news/` but not `https://site/newsletter`.
    #[default]
    SamePath,
    /// The window URL contains the target as a substring. Loose on purpose:
    /// `/news` also matches `https://site/newsletter`.
    Contains,
}

impl ClickRouting {
    pub fn matches(&self, client_url: &str, target: &str) -> bool {
        match self {
            ClickRouting::Contains => client_url.contains(target),
            ClickRouting::SamePath => same_path(client_url, target),
        }
    }
}

fn same_path(client_url: &str, target: &str) -> bool {
    let Ok(client) = Url::parse(client_url) else {
        return false;
    };
    let Ok(target) = client.join(target) else {
        return false;
    };
    client.origin() == target.origin()
        && trim_trailing_slash(client.path()) == trim_trailing_slash(target.path())
}

fn trim_trailing_slash(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/"
    } else {
        trimmed
    }
}

/// Reads the click-through URL stored in a notification's `data`.
pub fn target_url(data: Option<&Value>) -> String {
    data.and_then(|data| data.get("url"))
        .and_then(Value::as_str)
        .filter(|url| !url.trim().is_empty())
        .unwrap_or(DEFAULT_URL)
        .to_string()
}
