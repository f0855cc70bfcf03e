#![deny(clippy::all, clippy::pedantic)]

use netfeed::application::{
    error::AppError,
    mutations::MutationOutcome,
    pagination::{PageLink, PaginationController},
};
use netfeed::cache::QueryKey;
use netfeed_api_types::PostPage;
use serde::Serialize;

/// A feed page as rendered for the terminal: the listing plus its navigation controls.
#[derive(Debug, Serialize)]
pub struct FeedOutput<'a> {
    pub key: &'a QueryKey,
    pub path: String,
    pub num_pages: u32,
    pub previous_enabled: bool,
    pub next_enabled: bool,
    pub pages: Vec<PageLink>,
    pub listing: &'a PostPage,
}

impl<'a> FeedOutput<'a> {
    pub fn new(controller: &'a PaginationController, listing: &'a PostPage) -> Self {
        Self {
            key: controller.query_key(),
            path: controller.path(),
            num_pages: controller.num_pages(),
            previous_enabled: controller.previous_enabled(),
            next_enabled: controller.next_enabled(),
            pages: controller.page_links(),
            listing,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MutationOutput<'a> {
    #[serde(flatten)]
    pub outcome: &'a MutationOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'a str>,
    /// The page under the target key after the patch, when one is cached.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<&'a PostPage>,
}

pub fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let out = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::unexpected(format!("failed to render output: {e}")))?;
    println!("{out}");
    Ok(())
}
