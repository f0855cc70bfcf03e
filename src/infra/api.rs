//! Typed wrappers over the feed backend's JSON endpoints.

use std::sync::Arc;

use netfeed_api_types::{
    CommentId, EditPostRequest, EditPostResponse, FollowResponse, LikeRequest, LikeResponse,
    NewCommentRequest, NewPostRequest, Post, PostId, PostPage,
};
use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::cache::QueryKey;

use super::transport::{ApiError, Transport};

pub struct FeedApi<T> {
    transport: Arc<T>,
}

impl<T> Clone for FeedApi<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
        }
    }
}

impl<T: Transport> FeedApi<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Loads one listing page. The page number is filled in from the key when the backend
    /// omits it.
    pub async fn fetch_page(&self, key: &QueryKey) -> Result<PostPage, ApiError> {
        let mut page: PostPage = self.call(Method::GET, &key.api_path(), None).await?;
        page.page.get_or_insert(key.page.get());
        Ok(page)
    }

    pub async fn new_post(&self, text: &str) -> Result<Post, ApiError> {
        let body = encode(&NewPostRequest {
            text: text.to_string(),
        })?;
        self.call(Method::POST, "/api/new_post", Some(body)).await
    }

    pub async fn edit_post(&self, post_id: PostId, text: &str) -> Result<EditPostResponse, ApiError> {
        let body = encode(&EditPostRequest {
            post_id,
            text: text.to_string(),
        })?;
        self.call(Method::POST, "/api/edit_post", Some(body)).await
    }

    pub async fn like(&self, post_id: PostId) -> Result<LikeResponse, ApiError> {
        let body = encode(&LikeRequest { post_id })?;
        self.call(Method::POST, "/api/like", Some(body)).await
    }

    pub async fn follow(&self, username: &str) -> Result<FollowResponse, ApiError> {
        self.call(Method::POST, &format!("/api/follow/{username}"), None)
            .await
    }

    pub async fn new_comment(
        &self,
        post_id: PostId,
        reply_to: Option<CommentId>,
        text: &str,
    ) -> Result<Post, ApiError> {
        let body = encode(&NewCommentRequest {
            text: text.to_string(),
            post_id,
            comment_id: reply_to,
        })?;
        self.call(Method::POST, "/api/new_comment", Some(body)).await
    }

    async fn call<R: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<R, ApiError> {
        let value = self.transport.request(method, path, body).await?;
        serde_json::from_value(value)
            .map_err(|err| ApiError::decode(format!("unexpected response from `{path}`: {err}")))
    }
}

fn encode<B: Serialize>(body: &B) -> Result<Value, ApiError> {
    serde_json::to_value(body)
        .map_err(|err| ApiError::request(format!("failed to encode request body: {err}")))
}

#[cfg(test)]
mod tests {
    use httpmock::MockServer;
    use serde_json::json;

    use crate::domain::types::PageNumber;
    use crate::infra::transport::{HttpTransport, TransportConfig};

    use super::*;

    fn api(server: &MockServer) -> FeedApi<HttpTransport> {
        let transport = HttpTransport::new(&TransportConfig {
            base_url: server.base_url(),
            cookie: Some("csrftoken=tok".to_string()),
            ..TransportConfig::default()
        })
        .expect("transport");
        FeedApi::new(Arc::new(transport))
    }

    #[tokio::test]
    async fn fetch_page_fills_missing_page_number() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method("GET").path("/api/profile/ada/2");
            then.status(200).header("content-type", "application/json").body(
                r#"{"posts": [], "numPages": 3, "previousPage": 1, "nextPage": 3, "isFollowing": true}"#,
            );
        });

        let key = QueryKey::profile("ada", PageNumber::new(2).expect("page"));
        let page = api(&server).fetch_page(&key).await.expect("page");

        mock.assert();
        assert_eq!(page.page, Some(2));
        assert_eq!(page.num_pages, 3);
        assert_eq!(page.next_page, Some(3));
        assert_eq!(page.is_following, Some(true));
    }

    #[tokio::test]
    async fn comment_request_shape() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method("POST")
                .path("/api/new_comment")
                .header("X-CSRFToken", "tok")
                .json_body(json!({"text": "agreed", "postID": 4, "commentID": 7}));
            then.status(200).header("content-type", "application/json").body(
                r#"{"id": 4, "username": "bob", "text": "hello",
                    "publicationDate": "2024-03-01T10:00:00Z",
                    "comments": [{"id": 7, "username": "ada", "text": "hi",
                                  "publicationDate": "2024-03-01T10:05:00Z",
                                  "replies": [{"id": 8, "username": "cy", "text": "agreed",
                                               "publicationDate": "2024-03-01T10:06:00Z"}]}]}"#,
            );
        });

        let post = api(&server)
            .new_comment(PostId(4), Some(CommentId(7)), "agreed")
            .await
            .expect("comment");

        mock.assert();
        assert_eq!(post.comments[0].replies[0].id, CommentId(8));
    }

    #[tokio::test]
    async fn wrong_shape_is_decode_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method("POST").path("/api/like");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"status": "ok"}"#);
        });

        let err = api(&server).like(PostId(1)).await.expect_err("bad shape");
        assert!(matches!(err, ApiError::Decode { .. }), "{err:?}");
    }
}
