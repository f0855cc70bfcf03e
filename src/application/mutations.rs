//! Server-confirmed mutations.
//!
//! A command is validated, sent, and only after the server accepts it is the cached page
//! patched with the server's answer. Nothing is applied optimistically, and a failure leaves
//! the cache exactly as it was.

use std::sync::Arc;

use metrics::counter;
use netfeed_api_types::{EditPostResponse, FollowResponse, LikeResponse, Post, PostId};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::application::commands::FeedCommand;
use crate::application::error::MutationError;
use crate::cache::{QueryCache, QueryKey};
use crate::domain::{comments, patch};
use crate::domain::text::{DEFAULT_MAX_TEXT_CHARS, SubmittedText};
use crate::infra::api::FeedApi;
use crate::infra::transport::Transport;

const METRIC_MUTATION: &str = "netfeed_mutation_total";
const METRIC_MUTATION_FAILED: &str = "netfeed_mutation_failed_total";

/// What the server confirmed. `applied` is false when the targeted post (or page) was not
/// cached under the key, which is not an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MutationOutcome {
    PostCreated {
        post: Post,
        applied: bool,
    },
    PostEdited {
        edit: EditPostResponse,
        applied: bool,
    },
    LikeToggled {
        post_id: PostId,
        like: LikeResponse,
        applied: bool,
    },
    FollowToggled {
        username: String,
        follow: FollowResponse,
        applied: bool,
    },
    CommentAdded {
        post: Post,
        applied: bool,
    },
}

impl MutationOutcome {
    pub fn applied(&self) -> bool {
        match self {
            MutationOutcome::PostCreated { applied, .. }
            | MutationOutcome::PostEdited { applied, .. }
            | MutationOutcome::LikeToggled { applied, .. }
            | MutationOutcome::FollowToggled { applied, .. }
            | MutationOutcome::CommentAdded { applied, .. } => *applied,
        }
    }

    /// Informational text the server attached, if any.
    pub fn message(&self) -> Option<&str> {
        match self {
            MutationOutcome::FollowToggled { follow, .. } => follow.message.as_deref(),
            _ => None,
        }
    }
}

pub struct MutationEngine<T> {
    cache: Arc<QueryCache>,
    api: FeedApi<T>,
    max_text_chars: usize,
}

impl<T> Clone for MutationEngine<T> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            api: self.api.clone(),
            max_text_chars: self.max_text_chars,
        }
    }
}

impl<T: Transport> MutationEngine<T> {
    pub fn new(cache: Arc<QueryCache>, api: FeedApi<T>) -> Self {
        Self {
            cache,
            api,
            max_text_chars: DEFAULT_MAX_TEXT_CHARS,
        }
    }

    #[must_use]
    pub fn with_max_text_chars(mut self, max_text_chars: usize) -> Self {
        self.max_text_chars = max_text_chars;
        self
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    /// Runs `command` and patches the page cached under `key` on success.
    pub async fn execute(
        &self,
        key: &QueryKey,
        command: FeedCommand,
    ) -> Result<MutationOutcome, MutationError> {
        let kind = command.kind();
        let result = self.run(key, command).await;

        match &result {
            Ok(outcome) => {
                counter!(METRIC_MUTATION, "kind" => kind).increment(1);
                info!(
                    key = %key,
                    kind,
                    applied = outcome.applied(),
                    "Mutation confirmed by server"
                );
            }
            Err(err) if err.is_cancelled() => {
                debug!(key = %key, kind, "Mutation cancelled");
            }
            Err(err) => {
                counter!(METRIC_MUTATION_FAILED, "kind" => kind).increment(1);
                warn!(key = %key, kind, error = %err, "Mutation failed");
            }
        }

        result
    }

    async fn run(
        &self,
        key: &QueryKey,
        command: FeedCommand,
    ) -> Result<MutationOutcome, MutationError> {
        match command {
            FeedCommand::CreatePost { text } => {
                let text = self.validate(&text)?;
                let post = self.api.new_post(text.as_str()).await?;
                let applied = self
                    .cache
                    .patch(key, |page| Some(patch::append_post(page, post.clone())));
                Ok(MutationOutcome::PostCreated { post, applied })
            }
            FeedCommand::EditPost { post_id, text } => {
                let text = self.validate(&text)?;
                let edit = self.api.edit_post(post_id, text.as_str()).await?;
                let applied = self.cache.patch(key, |page| patch::apply_edit(page, &edit));
                Ok(MutationOutcome::PostEdited { edit, applied })
            }
            FeedCommand::ToggleLike { post_id } => {
                let like = self.api.like(post_id).await?;
                let applied = self
                    .cache
                    .patch(key, |page| patch::apply_like(page, post_id, like));
                Ok(MutationOutcome::LikeToggled {
                    post_id,
                    like,
                    applied,
                })
            }
            FeedCommand::ToggleFollow { username, post_id } => {
                let follow = self.api.follow(&username).await?;
                let is_following = follow.is_following;
                let applied = match post_id {
                    Some(post_id) => self
                        .cache
                        .patch(key, |page| patch::apply_follow(page, post_id, is_following)),
                    None => self.cache.patch(key, |page| {
                        Some(patch::apply_profile_follow(page, is_following))
                    }),
                };
                Ok(MutationOutcome::FollowToggled {
                    username,
                    follow,
                    applied,
                })
            }
            FeedCommand::NewComment {
                text,
                post_id,
                comment_id,
            } => {
                let text = self.validate(&text)?;
                let post = self
                    .api
                    .new_comment(post_id, comment_id, text.as_str())
                    .await?;
                if let Err(err) = comments::validate_tree(&post.comments) {
                    warn!(
                        key = %key,
                        post_id = %post_id,
                        error = %err,
                        "Server returned a malformed comment tree; cached page left as is"
                    );
                    return Ok(MutationOutcome::CommentAdded {
                        post,
                        applied: false,
                    });
                }
                debug!(
                    post_id = %post_id,
                    comments = comments::count(&post.comments),
                    depth = comments::depth(&post.comments),
                    "Comment accepted"
                );
                let applied = self
                    .cache
                    .patch(key, |page| patch::replace_post(page, post_id, post.clone()));
                Ok(MutationOutcome::CommentAdded { post, applied })
            }
        }
    }

    fn validate(&self, raw: &str) -> Result<SubmittedText, MutationError> {
        SubmittedText::parse(raw, self.max_text_chars).map_err(MutationError::from)
    }
}
