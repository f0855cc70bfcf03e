use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};
use netfeed_api_types::{CommentId, PostId};

/// Command-line arguments for the netfeed binary.
#[derive(Debug, Parser)]
#[command(name = "netfeed", version, about = "Paginated post feed client")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "NETFEED_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: Overrides,

    #[command(subcommand)]
    pub command: Command,
}

/// Settings that can be overridden per invocation. The session cookie is deliberately not
/// among them; set it through `NETFEED__API__COOKIE` or a config file so it stays out of shell
/// history.
#[derive(Debug, Args, Default, Clone)]
pub struct Overrides {
    /// Override the backend base URL.
    #[arg(long = "base-url", value_name = "URL", global = true)]
    pub base_url: Option<String>,

    /// Override the connection timeout.
    #[arg(long = "connect-timeout-seconds", value_name = "SECONDS", global = true)]
    pub connect_timeout_seconds: Option<u64>,

    /// Username of the signed-in viewer.
    #[arg(long = "username", value_name = "NAME", global = true)]
    pub username: Option<String>,

    /// Override the maximum accepted post and comment length.
    #[arg(long = "max-text-chars", value_name = "COUNT", global = true)]
    pub max_text_chars: Option<usize>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Show one feed page with its navigation state.
    Feed {
        /// Feed path, e.g. `/`, `/2`, `/following`, `/profile/ada/3`.
        #[arg(value_name = "PATH", default_value = "/")]
        path: String,
    },
    /// Load a feed page, then follow its next link.
    Next {
        #[arg(value_name = "PATH")]
        path: String,
    },
    /// Publish a new post.
    Post {
        text: String,
        #[command(flatten)]
        target: TargetArgs,
    },
    /// Edit one of your posts.
    Edit {
        post_id: PostId,
        text: String,
        #[command(flatten)]
        target: TargetArgs,
    },
    /// Like or unlike a post.
    Like {
        post_id: PostId,
        #[command(flatten)]
        target: TargetArgs,
    },
    /// Follow or unfollow a user.
    Follow {
        username: String,
        /// Post whose author is being followed.
        #[arg(long = "post", value_name = "POST_ID")]
        post_id: Option<PostId>,
        #[command(flatten)]
        target: TargetArgs,
    },
    /// Comment on a post, or reply to one of its comments.
    Comment {
        post_id: PostId,
        text: String,
        #[arg(long = "reply-to", value_name = "COMMENT_ID")]
        reply_to: Option<CommentId>,
        #[command(flatten)]
        target: TargetArgs,
    },
}

/// Feed page loaded before a mutation so the result can be patched into it.
#[derive(Debug, Args, Clone)]
pub struct TargetArgs {
    #[arg(long = "path", value_name = "PATH", default_value = "/")]
    pub path: String,
}
