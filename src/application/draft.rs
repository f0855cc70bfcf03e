//! Compose-box state for posts, edits and comments.

use std::future::Future;

use crate::application::error::MutationError;

/// Text the viewer is composing. The text is cleared only once the server has accepted it;
/// a failed submission keeps it and exposes the alert to show next to the form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    text: String,
    alert: Option<String>,
    submitting: bool,
}

impl Draft {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replaces the text. A pending alert is dismissed.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.alert = None;
    }

    pub fn alert(&self) -> Option<&str> {
        self.alert.as_deref()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// Hands the current text to `send` and records the result.
    pub async fn submit<F, Fut, R>(&mut self, send: F) -> Result<R, MutationError>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<R, MutationError>>,
    {
        self.submitting = true;
        self.alert = None;
        let result = send(self.text.clone()).await;
        self.submitting = false;

        match &result {
            Ok(_) => self.text.clear(),
            Err(err) => self.alert = err.user_message(),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::error::DomainError;
    use crate::infra::transport::ApiError;

    use super::*;

    #[tokio::test]
    async fn success_clears_text() {
        let mut draft = Draft::new("hello world");
        let sent = draft
            .submit(|text| async move { Ok::<_, MutationError>(text) })
            .await
            .expect("accepted");

        assert_eq!(sent, "hello world");
        assert_eq!(draft.text(), "");
        assert_eq!(draft.alert(), None);
        assert!(!draft.is_submitting());
    }

    #[tokio::test]
    async fn failure_keeps_text_and_alerts() {
        let mut draft = Draft::new("hey");
        let err = draft
            .submit(|_| async {
                Err::<(), _>(MutationError::Api(ApiError::Server {
                    status: 400,
                    message: "Post must be at least 5 characters long.".to_string(),
                    payload: None,
                }))
            })
            .await
            .expect_err("rejected");

        assert!(matches!(err, MutationError::Api(_)));
        assert_eq!(draft.text(), "hey");
        assert_eq!(
            draft.alert(),
            Some("Server responded. Error: Post must be at least 5 characters long.")
        );

        draft.set_text("hey there");
        assert_eq!(draft.alert(), None);
    }

    #[tokio::test]
    async fn validation_failure_alerts_with_domain_message() {
        let mut draft = Draft::new("   ");
        let _ = draft
            .submit(|_| async {
                Err::<(), _>(MutationError::Validation(DomainError::validation(
                    "text must not be empty",
                )))
            })
            .await;

        assert_eq!(draft.alert(), Some("text must not be empty"));
        assert_eq!(draft.text(), "   ");
    }

    #[tokio::test]
    async fn cancellation_is_silent() {
        let mut draft = Draft::new("draft");
        let _ = draft
            .submit(|_| async { Err::<(), _>(MutationError::Api(ApiError::Cancelled)) })
            .await;

        assert_eq!(draft.alert(), None);
        assert_eq!(draft.text(), "draft");
    }
}
