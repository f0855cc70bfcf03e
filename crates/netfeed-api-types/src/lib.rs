//! Request and response shapes of the netfeed JSON API.
//!
//! Field names follow the backend's camelCase JSON. Timestamps travel as RFC 3339 strings.

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;

/// Server-assigned post identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(pub u64);

/// Comment identifier, unique within its post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommentId(pub u64);

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<u64> for PostId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<u64> for CommentId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl FromStr for PostId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

impl FromStr for CommentId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: PostId,
    pub username: String,
    pub text: String,
    #[serde(with = "time::serde::rfc3339")]
    pub publication_date: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_modified: Option<OffsetDateTime>,
    #[serde(default)]
    pub edited: bool,
    #[serde(default)]
    pub likes: u32,
    #[serde(default)]
    pub liked_by_user: bool,
    /// Whether the viewer follows the post's author.
    #[serde(default)]
    pub is_following: bool,
    /// Whether the viewer wrote the post.
    #[serde(default)]
    pub is_owner: bool,
    /// Top-level comments; replies hang off each comment.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    pub username: String,
    pub text: String,
    #[serde(with = "time::serde::rfc3339")]
    pub publication_date: OffsetDateTime,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub replies: Vec<Comment>,
}

/// One page of a post listing plus its pagination metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostPage {
    pub posts: Vec<Post>,
    /// Current page number. The listing endpoints omit it; clients fill in the requested page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default)]
    pub previous_page: Option<u32>,
    #[serde(default)]
    pub next_page: Option<u32>,
    #[serde(default = "one")]
    pub num_pages: u32,
    /// Page-level follow state reported by the profile listing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_following: Option<bool>,
}

impl PostPage {
    pub fn find_post(&self, id: PostId) -> Option<&Post> {
        self.posts.iter().find(|post| post.id == id)
    }

    pub fn position(&self, id: PostId) -> Option<usize> {
        self.posts.iter().position(|post| post.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPostRequest {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditPostRequest {
    #[serde(rename = "postID")]
    pub post_id: PostId,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeRequest {
    #[serde(rename = "postID")]
    pub post_id: PostId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCommentRequest {
    pub text: String,
    #[serde(rename = "postID")]
    pub post_id: PostId,
    /// Comment being replied to; absent for a top-level comment.
    #[serde(rename = "commentID", default, skip_serializing_if = "Option::is_none")]
    pub comment_id: Option<CommentId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditPostResponse {
    pub id: PostId,
    pub text: String,
    #[serde(default = "truthy")]
    pub edited: bool,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_modified: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeResponse {
    pub likes: u32,
    pub liked_by_user: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowResponse {
    pub is_following: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Body of a non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

fn one() -> u32 {
    1
}

fn truthy() -> bool {
    true
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
