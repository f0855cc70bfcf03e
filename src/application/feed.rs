//! Feed session: the composition root for one consuming view.
//!
//! A session owns the pagination state of a single view, reads pages through the shared
//! query cache, and dispatches the viewer's commands through the mutation engine. A session
//! watches the key it is on, so a background refresh for a key stops once no session is left on
//! it. Closing the session (or dropping it) aborts its transport so that responses arriving
//! afterwards cannot touch anything.

use std::sync::Arc;

use netfeed_api_types::PostPage;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::application::commands::FeedCommand;
use crate::application::error::MutationError;
use crate::application::mutations::{MutationEngine, MutationOutcome};
use crate::application::pagination::PaginationController;
use crate::cache::{CacheEvent, FetchError, QueryCache, QueryKey};
use crate::domain::error::DomainError;
use crate::domain::types::PageNumber;
use crate::infra::api::FeedApi;
use crate::infra::transport::Transport;

/// The signed-in user, fixed for the lifetime of a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewer {
    pub username: Option<String>,
}

impl Viewer {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn signed_in(username: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.username.is_some()
    }

    pub fn is(&self, username: &str) -> bool {
        self.username.as_deref() == Some(username)
    }
}

pub struct FeedSession<T: Transport + 'static> {
    cache: Arc<QueryCache>,
    api: FeedApi<T>,
    engine: MutationEngine<T>,
    controller: PaginationController,
    viewer: Viewer,
    closed: bool,
}

impl<T: Transport + 'static> FeedSession<T> {
    /// Starts a session on `controller`'s key. `transport` should be dedicated to this session
    /// since closing the session aborts it.
    pub fn new(
        cache: Arc<QueryCache>,
        transport: Arc<T>,
        viewer: Viewer,
        controller: PaginationController,
    ) -> Self {
        let api = FeedApi::new(transport);
        cache.watch(controller.query_key());
        let engine = MutationEngine::new(Arc::clone(&cache), api.clone());
        Self {
            cache,
            api,
            engine,
            controller,
            viewer,
            closed: false,
        }
    }

    #[must_use]
    pub fn with_max_text_chars(mut self, max_text_chars: usize) -> Self {
        self.engine = self.engine.clone().with_max_text_chars(max_text_chars);
        self
    }

    pub fn controller(&self) -> &PaginationController {
        &self.controller
    }

    pub fn query_key(&self) -> &QueryKey {
        self.controller.query_key()
    }

    pub fn viewer(&self) -> &Viewer {
        &self.viewer
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.cache.subscribe()
    }

    /// Loads the current key, serving a fresh cached page at once when there is one.
    pub async fn load(&mut self) -> Result<Arc<PostPage>, FetchError> {
        let key = self.controller.query_key().clone();
        let api = self.api.clone();
        let fetch_key = key.clone();

        let page = self
            .cache
            .fetch(key.clone(), async move { api.fetch_page(&fetch_key).await })
            .await?;

        self.controller.observe(&key, &page);
        Ok(page)
    }

    /// Moves to the next page and loads it. `None` when there is no next page to go to.
    pub async fn next(&mut self) -> Result<Option<Arc<PostPage>>, FetchError> {
        if !self.transition(PaginationController::go_next) {
            return Ok(None);
        }
        self.load().await.map(Some)
    }

    pub async fn previous(&mut self) -> Result<Option<Arc<PostPage>>, FetchError> {
        if !self.transition(PaginationController::go_previous) {
            return Ok(None);
        }
        self.load().await.map(Some)
    }

    pub async fn go_to(&mut self, page: PageNumber) -> Result<Option<Arc<PostPage>>, FetchError> {
        if !self.transition(|controller| controller.go_to(page)) {
            return Ok(None);
        }
        self.load().await.map(Some)
    }

    /// Switches to the key named by `path` without loading it.
    pub fn navigate(&mut self, path: &str) -> Result<&QueryKey, DomainError> {
        let target = PaginationController::from_path(path)?.query_key().clone();
        self.transition(|controller| Some(controller.switch_to(target)));
        Ok(self.controller.query_key())
    }

    /// Applies a controller move and hands the session's watch over to the new key. Leaving a
    /// key cancels its background refresh unless another session still watches it. Returns
    /// `false` when the controller refused the move.
    fn transition<F>(&mut self, step: F) -> bool
    where
        F: FnOnce(&mut PaginationController) -> Option<QueryKey>,
    {
        let previous = self.controller.query_key().clone();
        let Some(next) = step(&mut self.controller) else {
            return false;
        };
        if next != previous && !self.closed {
            self.cache.unwatch(&previous);
            self.cache.watch(&next);
            debug!(from = %previous, to = %next, "Feed session moved");
        }
        true
    }

    /// Runs a viewer command against the current key.
    pub async fn dispatch(&self, command: FeedCommand) -> Result<MutationOutcome, MutationError> {
        if let FeedCommand::ToggleFollow { username, .. } = &command
            && self.viewer.is(username)
        {
            return Err(MutationError::Validation(DomainError::validation(
                "you cannot follow yourself",
            )));
        }

        self.engine
            .execute(self.controller.query_key(), command)
            .await
    }

    /// Aborts in-flight requests and stops watching the current key, which cancels its
    /// background refresh when no other session watches it. Idempotent.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.api.transport().abort();
        self.cache.unwatch(self.controller.query_key());
        info!(key = %self.controller.query_key(), "Feed session closed");
    }
}

impl<T: Transport + 'static> Drop for FeedSession<T> {
    fn drop(&mut self) {
        self.close();
    }
}
