#![deny(clippy::all, clippy::pedantic)]

use std::sync::Arc;

use netfeed::{
    application::{error::AppError, feed::FeedSession, feed::Viewer, pagination::PaginationController},
    cache::{CacheConfig, QueryCache},
    config::Settings,
    infra::transport::{HttpTransport, TransportConfig},
};

/// Everything a handler needs: one cache and one transport shared by the sessions it opens.
pub struct Ctx {
    pub cache: Arc<QueryCache>,
    transport: HttpTransport,
    viewer: Viewer,
    max_text_chars: usize,
}

impl Ctx {
    pub fn new(settings: &Settings) -> Result<Self, AppError> {
        let transport = HttpTransport::new(&TransportConfig::from(&settings.api))?;
        let viewer = Viewer {
            username: settings.viewer.username.clone(),
        };

        Ok(Self {
            cache: Arc::new(QueryCache::new(&CacheConfig::from(&settings.cache))),
            transport,
            viewer,
            max_text_chars: settings.validation.max_text_chars.get(),
        })
    }

    /// Opens a session on `path` with its own abortable child transport.
    pub fn session(&self, path: &str) -> Result<FeedSession<HttpTransport>, AppError> {
        let controller = PaginationController::from_path(path)?;
        let session = FeedSession::new(
            Arc::clone(&self.cache),
            Arc::new(self.transport.child()),
            self.viewer.clone(),
            controller,
        )
        .with_max_text_chars(self.max_text_chars);
        Ok(session)
    }
}
