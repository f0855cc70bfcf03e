//! Page navigation state for one feed view.
//!
//! The controller tracks two things separately: the key the viewer asked for, and the key of
//! the page actually on screen. They differ while a new page is loading and the previous one
//! is still shown as a placeholder, and navigation forward is only offered from real data.

use netfeed_api_types::PostPage;
use serde::Serialize;

use crate::cache::QueryKey;
use crate::domain::error::DomainError;
use crate::domain::types::{FeedView, PageNumber};

/// One entry of the numbered page list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageLink {
    pub page: PageNumber,
    pub path: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Displayed {
    key: QueryKey,
    next_page: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationController {
    key: QueryKey,
    displayed: Option<Displayed>,
    num_pages: u32,
}

impl PaginationController {
    pub fn new(key: QueryKey) -> Self {
        Self {
            key,
            displayed: None,
            num_pages: 1,
        }
    }

    /// Parses a navigable path. Page segments that are missing, non-numeric or zero mean the
    /// first page.
    pub fn from_path(path: &str) -> Result<Self, DomainError> {
        let segments: Vec<&str> = path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .collect();

        let key = match segments.as_slice() {
            [] => QueryKey::all_posts(PageNumber::FIRST),
            ["following"] => QueryKey::following(PageNumber::FIRST),
            ["following", page] => QueryKey::following(PageNumber::from_segment(Some(*page))),
            ["profile", username] => QueryKey::profile(*username, PageNumber::FIRST),
            ["profile", username, page] => {
                QueryKey::profile(*username, PageNumber::from_segment(Some(*page)))
            }
            ["profile"] => {
                return Err(DomainError::validation(
                    "profile path must name a user, as in `/profile/{username}`",
                ));
            }
            [page] => QueryKey::all_posts(PageNumber::from_segment(Some(*page))),
            _ => {
                return Err(DomainError::validation(format!(
                    "unrecognised feed path `{path}`"
                )));
            }
        };

        Ok(Self::new(key))
    }

    pub fn query_key(&self) -> &QueryKey {
        &self.key
    }

    pub fn view(&self) -> &FeedView {
        &self.key.view
    }

    pub fn page(&self) -> PageNumber {
        self.key.page
    }

    pub fn num_pages(&self) -> u32 {
        self.num_pages
    }

    /// Navigable path for the requested page.
    pub fn path(&self) -> String {
        self.key.view.nav_path(self.key.page)
    }

    /// Records that `page`, fetched for `key`, is what is on screen now.
    pub fn observe(&mut self, key: &QueryKey, page: &PostPage) {
        self.num_pages = page.num_pages.max(1);
        self.displayed = Some(Displayed {
            key: key.clone(),
            next_page: page.next_page,
        });
    }

    /// Nothing has been displayed yet.
    pub fn is_loading(&self) -> bool {
        self.displayed.is_none()
    }

    /// The page on screen belongs to a different key than the one requested.
    pub fn is_refreshing(&self) -> bool {
        self.displayed
            .as_ref()
            .is_some_and(|displayed| displayed.key != self.key)
    }

    pub fn previous_enabled(&self) -> bool {
        self.key.page != PageNumber::FIRST
    }

    pub fn next_enabled(&self) -> bool {
        self.current_next_page().is_some()
    }

    pub fn go_previous(&mut self) -> Option<QueryKey> {
        let previous = self.key.page.previous()?;
        Some(self.switch_to(self.key.with_page(previous)))
    }

    pub fn go_next(&mut self) -> Option<QueryKey> {
        let next = self.current_next_page()?;
        Some(self.switch_to(self.key.with_page(next)))
    }

    /// Jumps to `page` of the current view. Pages past the last known one are refused.
    pub fn go_to(&mut self, page: PageNumber) -> Option<QueryKey> {
        if page.get() > self.num_pages {
            return None;
        }
        Some(self.switch_to(self.key.with_page(page)))
    }

    /// Switches to another key, keeping what is on screen as a placeholder.
    pub fn switch_to(&mut self, key: QueryKey) -> QueryKey {
        if key.view != self.key.view {
            self.num_pages = 1;
        }
        self.key = key;
        self.key.clone()
    }

    pub fn page_links(&self) -> Vec<PageLink> {
        (1..=self.num_pages)
            .filter_map(PageNumber::new)
            .map(|page| PageLink {
                page,
                path: self.key.view.nav_path(page),
                active: page == self.key.page,
            })
            .collect()
    }

    fn current_next_page(&self) -> Option<PageNumber> {
        let displayed = self.displayed.as_ref()?;
        if displayed.key != self.key {
            return None;
        }
        displayed.next_page.and_then(PageNumber::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(number: u32) -> PageNumber {
        PageNumber::new(number).expect("non-zero page")
    }

    fn listing(previous_page: Option<u32>, next_page: Option<u32>, num_pages: u32) -> PostPage {
        PostPage {
            posts: Vec::new(),
            page: None,
            previous_page,
            next_page,
            num_pages,
            is_following: None,
        }
    }

    #[test]
    fn paths_resolve_to_keys() {
        let cases = [
            ("/", QueryKey::all_posts(page(1))),
            ("", QueryKey::all_posts(page(1))),
            ("/3", QueryKey::all_posts(page(3))),
            ("/abc", QueryKey::all_posts(page(1))),
            ("/following", QueryKey::following(page(1))),
            ("/following/2", QueryKey::following(page(2))),
            ("/following/0", QueryKey::following(page(1))),
            ("/profile/ada", QueryKey::profile("ada", page(1))),
            ("/profile/ada/4/", QueryKey::profile("ada", page(4))),
            ("/profile/ada/x", QueryKey::profile("ada", page(1))),
        ];

        for (path, expected) in cases {
            let controller = PaginationController::from_path(path).expect(path);
            assert_eq!(controller.query_key(), &expected, "{path}");
        }
    }

    #[test]
    fn unknown_paths_are_rejected() {
        assert!(PaginationController::from_path("/profile").is_err());
        assert!(PaginationController::from_path("/settings/privacy/extra").is_err());
    }

    #[test]
    fn first_page_controls() {
        let mut controller = PaginationController::from_path("/").expect("root");
        assert!(controller.is_loading());
        assert!(!controller.next_enabled());

        let key = controller.query_key().clone();
        controller.observe(&key, &listing(None, Some(2), 3));

        assert!(!controller.previous_enabled());
        assert!(controller.next_enabled());
        assert_eq!(controller.go_previous(), None);

        let next = controller.go_next().expect("next enabled");
        assert_eq!(next, QueryKey::all_posts(page(2)));
        assert_eq!(controller.path(), "/2");
    }

    #[test]
    fn placeholder_data_disables_next() {
        let mut controller = PaginationController::from_path("/").expect("root");
        let first = controller.query_key().clone();
        controller.observe(&first, &listing(None, Some(2), 3));

        controller.go_next().expect("next");
        assert!(controller.is_refreshing());
        assert!(!controller.next_enabled());
        assert!(controller.previous_enabled());
        assert_eq!(controller.go_next(), None);

        let second = controller.query_key().clone();
        controller.observe(&second, &listing(Some(1), Some(3), 3));
        assert!(!controller.is_refreshing());
        assert!(controller.next_enabled());
    }

    #[test]
    fn last_page_has_no_next() {
        let mut controller = PaginationController::from_path("/following/3").expect("path");
        let key = controller.query_key().clone();
        controller.observe(&key, &listing(Some(2), None, 3));

        assert!(!controller.next_enabled());
        assert_eq!(
            controller.go_previous(),
            Some(QueryKey::following(page(2)))
        );
    }

    #[test]
    fn page_links_follow_server_count() {
        let mut controller = PaginationController::from_path("/profile/ada/2").expect("path");
        let key = controller.query_key().clone();
        controller.observe(&key, &listing(Some(1), Some(3), 3));

        let links = controller.page_links();
        assert_eq!(links.len(), 3);
        assert_eq!(links[0].path, "/profile/ada");
        assert_eq!(links[2].path, "/profile/ada/3");
        let active: Vec<u32> = links
            .iter()
            .filter(|link| link.active)
            .map(|link| link.page.get())
            .collect();
        assert_eq!(active, vec![2]);

        assert_eq!(controller.go_to(page(4)), None);
        assert_eq!(
            controller.go_to(page(3)),
            Some(QueryKey::profile("ada", page(3)))
        );
    }
}
