use std::fmt::Display;

use serde::Serialize;
use url::Url;

/// The URLs requested on the way to a response, starting with the
/// original URL and ending with the URL that produced the response.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Redirects(Vec<Url>);

impl From<Vec<Url>> for Redirects {
    fn from(value: Vec<Url>) -> Self {
        Self(value)
    }
}

impl Display for Redirects {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let list = self
            .0
            .iter()
            .map(Url::as_str)
            .collect::<Vec<_>>()
            .join(" --> ");
        write!(f, "{list}")
    }
}

impl Redirects {
    /// Start a history at the originally requested URL.
    #[must_use]
    pub fn starting_at(url: Url) -> Self {
        Self(vec![url])
    }

    /// Count how many times a redirect was followed.
    /// This is the length of the list minus one.
    #[must_use]
    pub const fn count(&self) -> usize {
        self.0.len().saturating_sub(1)
    }

    /// Iterate over the requested URLs in order
    pub fn iter(&self) -> impl Iterator<Item = &Url> {
        self.0.iter()
    }

    /// The URL of the last hop
    #[must_use]
    pub fn last(&self) -> Option<&Url> {
        self.0.last()
    }
}
