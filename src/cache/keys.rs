//! Query keys identifying cached feed pages.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::types::{FeedView, PageNumber};

/// Identifies one cached page: which listing, and which page of it. Two keys are equal only
/// when view, username and page all match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryKey {
    #[serde(flatten)]
    pub view: FeedView,
    pub page: PageNumber,
}

impl QueryKey {
    pub fn new(view: FeedView, page: PageNumber) -> Self {
        Self { view, page }
    }

    pub fn all_posts(page: PageNumber) -> Self {
        Self::new(FeedView::AllPosts, page)
    }

    pub fn profile(username: impl Into<String>, page: PageNumber) -> Self {
        Self::new(FeedView::Profile(username.into()), page)
    }

    pub fn following(page: PageNumber) -> Self {
        Self::new(FeedView::Following, page)
    }

    /// Listing endpoint serving this key.
    pub fn api_path(&self) -> String {
        self.view.api_path(self.page)
    }

    /// Same view, different page.
    #[must_use]
    pub fn with_page(&self, page: PageNumber) -> Self {
        Self::new(self.view.clone(), page)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.view, self.page)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn page(number: u32) -> PageNumber {
        PageNumber::new(number).expect("non-zero page")
    }

    #[test]
    fn equality_covers_every_component() {
        let keys: HashSet<QueryKey> = [
            QueryKey::all_posts(page(1)),
            QueryKey::all_posts(page(2)),
            QueryKey::following(page(1)),
            QueryKey::profile("ada", page(1)),
            QueryKey::profile("bob", page(1)),
            QueryKey::profile("ada", page(1)),
        ]
        .into_iter()
        .collect();

        assert_eq!(keys.len(), 5);
    }

    #[test]
    fn display_and_paths() {
        let key = QueryKey::profile("ada", page(3));
        assert_eq!(key.to_string(), "profile/ada:3");
        assert_eq!(key.api_path(), "/api/profile/ada/3");
        assert_eq!(key.with_page(page(4)).api_path(), "/api/profile/ada/4");
        assert_eq!(QueryKey::all_posts(page(1)).to_string(), "all_posts:1");
    }

    #[test]
    fn serializes_flat() {
        let value = serde_json::to_value(QueryKey::profile("ada", page(2))).expect("serialize");
        assert_eq!(
            value,
            serde_json::json!({"view": "profile", "username": "ada", "page": 2})
        );
    }
}
