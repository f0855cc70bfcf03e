//! Feed views and page numbers shared by the query cache and the pagination controller.

use std::fmt;
use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

/// Which post listing a view is showing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "view", content = "username")]
pub enum FeedView {
    /// Every post, newest first.
    AllPosts,
    /// Posts written by one user.
    Profile(String),
    /// Posts written by users the viewer follows.
    Following,
}

impl FeedView {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedView::AllPosts => "all_posts",
            FeedView::Profile(_) => "profile",
            FeedView::Following => "following",
        }
    }

    pub fn username(&self) -> Option<&str> {
        match self {
            FeedView::Profile(username) => Some(username.as_str()),
            _ => None,
        }
    }

    /// Path of the listing endpoint serving `page` of this view.
    pub fn api_path(&self, page: PageNumber) -> String {
        match self {
            FeedView::AllPosts => format!("/api/all_posts/{page}"),
            FeedView::Profile(username) => format!("/api/profile/{username}/{page}"),
            FeedView::Following => format!("/api/following/{page}"),
        }
    }

    /// Navigable path for `page`; the first page uses the bare view path.
    pub fn nav_path(&self, page: PageNumber) -> String {
        let base = match self {
            FeedView::AllPosts => String::new(),
            FeedView::Profile(username) => format!("/profile/{username}"),
            FeedView::Following => "/following".to_string(),
        };

        if page != PageNumber::FIRST {
            format!("{base}/{page}")
        } else if base.is_empty() {
            "/".to_string()
        } else {
            base
        }
    }
}

impl fmt::Display for FeedView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedView::Profile(username) => write!(f, "profile/{username}"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// 1-indexed page number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageNumber(NonZeroU32);

impl PageNumber {
    pub const FIRST: Self = Self(NonZeroU32::MIN);

    pub fn new(number: u32) -> Option<Self> {
        NonZeroU32::new(number).map(Self)
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }

    pub fn previous(self) -> Option<Self> {
        Self::new(self.get() - 1)
    }

    pub fn next(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }

    /// Reads a page from a path segment. Missing, non-numeric and zero segments mean the first page.
    pub fn from_segment(segment: Option<&str>) -> Self {
        segment
            .and_then(|value| value.parse::<u32>().ok())
            .and_then(Self::new)
            .unwrap_or(Self::FIRST)
    }
}

impl Default for PageNumber {
    fn default() -> Self {
        Self::FIRST
    }
}

impl fmt::Display for PageNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(number: u32) -> PageNumber {
        PageNumber::new(number).expect("non-zero page")
    }

    #[test]
    fn segment_parsing_defaults_to_first_page() {
        assert_eq!(PageNumber::from_segment(None), PageNumber::FIRST);
        assert_eq!(PageNumber::from_segment(Some("abc")), PageNumber::FIRST);
        assert_eq!(PageNumber::from_segment(Some("0")), PageNumber::FIRST);
        assert_eq!(PageNumber::from_segment(Some("-2")), PageNumber::FIRST);
        assert_eq!(PageNumber::from_segment(Some("4")), page(4));
    }

    #[test]
    fn previous_stops_at_first_page() {
        assert_eq!(PageNumber::FIRST.previous(), None);
        assert_eq!(page(3).previous(), Some(page(2)));
        assert_eq!(page(3).next(), Some(page(4)));
        assert_eq!(page(u32::MAX).next(), None);
    }

    #[test]
    fn api_paths_per_view() {
        assert_eq!(FeedView::AllPosts.api_path(page(2)), "/api/all_posts/2");
        assert_eq!(
            FeedView::Profile("ada".into()).api_path(PageNumber::FIRST),
            "/api/profile/ada/1"
        );
        assert_eq!(FeedView::Following.api_path(page(3)), "/api/following/3");
    }

    #[test]
    fn nav_paths_omit_first_page() {
        assert_eq!(FeedView::AllPosts.nav_path(PageNumber::FIRST), "/");
        assert_eq!(FeedView::AllPosts.nav_path(page(2)), "/2");
        assert_eq!(FeedView::Following.nav_path(PageNumber::FIRST), "/following");
        assert_eq!(
            FeedView::Profile("ada".into()).nav_path(page(5)),
            "/profile/ada/5"
        );
    }
}
