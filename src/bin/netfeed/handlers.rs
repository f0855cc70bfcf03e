#![deny(clippy::all, clippy::pedantic)]

use netfeed::application::{
    commands::FeedCommand, draft::Draft, error::AppError, feed::FeedSession,
    mutations::MutationOutcome,
};
use netfeed::domain::error::DomainError;
use netfeed::infra::transport::HttpTransport;
use netfeed_api_types::{CommentId, PostId};
use tracing::debug;

use crate::context::Ctx;
use crate::print::{FeedOutput, MutationOutput, print_json};

pub async fn feed(ctx: &Ctx, path: &str) -> Result<(), AppError> {
    let mut session = ctx.session(path)?;
    let page = session.load().await?;
    print_json(&FeedOutput::new(session.controller(), &page))
}

pub async fn next(ctx: &Ctx, path: &str) -> Result<(), AppError> {
    let mut session = ctx.session(path)?;
    session.load().await?;

    let Some(page) = session.next().await? else {
        return Err(DomainError::validation(format!("`{path}` has no next page")).into());
    };
    print_json(&FeedOutput::new(session.controller(), &page))
}

pub async fn post(ctx: &Ctx, path: &str, text: String) -> Result<(), AppError> {
    let session = loaded_session(ctx, path).await?;
    let mut draft = Draft::new(text);
    let outcome = draft
        .submit(|text| session.dispatch(FeedCommand::CreatePost { text }))
        .await?;
    print_outcome(&session, &outcome)
}

pub async fn edit(ctx: &Ctx, path: &str, post_id: PostId, text: String) -> Result<(), AppError> {
    let session = loaded_session(ctx, path).await?;
    let mut draft = Draft::new(text);
    let outcome = draft
        .submit(|text| session.dispatch(FeedCommand::EditPost { post_id, text }))
        .await?;
    print_outcome(&session, &outcome)
}

pub async fn like(ctx: &Ctx, path: &str, post_id: PostId) -> Result<(), AppError> {
    let session = loaded_session(ctx, path).await?;
    let outcome = session
        .dispatch(FeedCommand::ToggleLike { post_id })
        .await?;
    print_outcome(&session, &outcome)
}

pub async fn follow(
    ctx: &Ctx,
    path: &str,
    username: String,
    post_id: Option<PostId>,
) -> Result<(), AppError> {
    let session = loaded_session(ctx, path).await?;
    let outcome = session
        .dispatch(FeedCommand::ToggleFollow { username, post_id })
        .await?;
    print_outcome(&session, &outcome)
}

pub async fn comment(
    ctx: &Ctx,
    path: &str,
    post_id: PostId,
    reply_to: Option<CommentId>,
    text: String,
) -> Result<(), AppError> {
    let session = loaded_session(ctx, path).await?;
    let mut draft = Draft::new(text);
    let outcome = draft
        .submit(|text| {
            session.dispatch(FeedCommand::NewComment {
                text,
                post_id,
                comment_id: reply_to,
            })
        })
        .await?;
    print_outcome(&session, &outcome)
}

/// Mutations patch the page under the session's key, so it is loaded first.
async fn loaded_session(ctx: &Ctx, path: &str) -> Result<FeedSession<HttpTransport>, AppError> {
    let mut session = ctx.session(path)?;
    session.load().await?;
    debug!(key = %session.query_key(), "Target page loaded");
    Ok(session)
}

fn print_outcome(
    session: &FeedSession<HttpTransport>,
    outcome: &MutationOutcome,
) -> Result<(), AppError> {
    let page = session.cache().page(session.query_key());
    print_json(&MutationOutput {
        outcome,
        message: outcome.message(),
        page: page.as_deref(),
    })
}
