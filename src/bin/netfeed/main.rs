//! netfeed: command-line client for the feed API.
#![deny(clippy::all, clippy::pedantic)]

mod context;
mod handlers;
mod print;

use std::process;

use netfeed::{
    application::error::AppError,
    config::{self, Command},
    infra::telemetry,
};
use tracing::{Dispatch, Level, dispatcher, error};
use tracing_subscriber::fmt as tracing_fmt;

use context::Ctx;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    let message = error.presentation_message();
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
    } else {
        let subscriber = tracing_fmt()
            .with_writer(std::io::stderr)
            .with_max_level(Level::ERROR)
            .finish();
        let dispatch = Dispatch::new(subscriber);
        dispatcher::with_default(&dispatch, || {
            error!(error = %error, "application error");
        });
    }
    eprintln!("error: {message}");
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;
    telemetry::init(&settings.logging)?;

    let ctx = Ctx::new(&settings)?;

    match cli_args.command {
        Command::Feed { path } => handlers::feed(&ctx, &path).await,
        Command::Next { path } => handlers::next(&ctx, &path).await,
        Command::Post { text, target } => handlers::post(&ctx, &target.path, text).await,
        Command::Edit {
            post_id,
            text,
            target,
        } => handlers::edit(&ctx, &target.path, post_id, text).await,
        Command::Like { post_id, target } => handlers::like(&ctx, &target.path, post_id).await,
        Command::Follow {
            username,
            post_id,
            target,
        } => handlers::follow(&ctx, &target.path, username, post_id).await,
        Command::Comment {
            post_id,
            text,
            reply_to,
            target,
        } => handlers::comment(&ctx, &target.path, post_id, reply_to, text).await,
    }
}
