//! User actions against the feed.

use netfeed_api_types::{CommentId, PostId};
use serde::{Deserialize, Serialize};

/// A write the viewer asked for. Each variant maps to one backend endpoint and one cache
/// patch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum FeedCommand {
    CreatePost {
        text: String,
    },
    EditPost {
        post_id: PostId,
        text: String,
    },
    ToggleLike {
        post_id: PostId,
    },
    /// Follows or unfollows `username`. `post_id` names the post whose button was pressed;
    /// without it the page-level profile flag is updated instead.
    ToggleFollow {
        username: String,
        post_id: Option<PostId>,
    },
    /// Comments on a post, or replies to `comment_id` inside it.
    NewComment {
        text: String,
        post_id: PostId,
        comment_id: Option<CommentId>,
    },
}

impl FeedCommand {
    pub fn kind(&self) -> &'static str {
        match self {
            FeedCommand::CreatePost { .. } => "create_post",
            FeedCommand::EditPost { .. } => "edit_post",
            FeedCommand::ToggleLike { .. } => "toggle_like",
            FeedCommand::ToggleFollow { .. } => "toggle_follow",
            FeedCommand::NewComment { .. } => "new_comment",
        }
    }

    /// Post the command targets, when it targets one.
    pub fn post_id(&self) -> Option<PostId> {
        match self {
            FeedCommand::CreatePost { .. } => None,
            FeedCommand::EditPost { post_id, .. }
            | FeedCommand::ToggleLike { post_id }
            | FeedCommand::NewComment { post_id, .. } => Some(*post_id),
            FeedCommand::ToggleFollow { post_id, .. } => *post_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialized_with_command_tag() {
        let command = FeedCommand::NewComment {
            text: "hi".to_string(),
            post_id: PostId(3),
            comment_id: Some(CommentId(9)),
        };
        let value = serde_json::to_value(&command).expect("serialize");
        assert_eq!(
            value,
            serde_json::json!({
                "command": "new_comment",
                "text": "hi",
                "post_id": 3,
                "comment_id": 9
            })
        );
        assert_eq!(command.kind(), "new_comment");
        assert_eq!(command.post_id(), Some(PostId(3)));
    }

    #[test]
    fn follow_without_post_targets_nothing() {
        let command = FeedCommand::ToggleFollow {
            username: "ada".to_string(),
            post_id: None,
        };
        assert_eq!(command.post_id(), None);
    }
}
