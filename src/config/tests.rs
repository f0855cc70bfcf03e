use std::io::Write;

use netfeed_api_types::{CommentId, PostId};
use tempfile::NamedTempFile;

use super::*;

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("tmp file");
    file.write_all(contents.as_bytes()).expect("write config");
    file
}

#[test]
fn defaults_resolve() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.api.base_url.as_str(), "http://127.0.0.1:8000/");
    assert_eq!(settings.api.cookie, None);
    assert_eq!(settings.api.csrf_cookie_name, "csrftoken");
    assert_eq!(settings.api.csrf_header_name, "X-CSRFToken");
    assert_eq!(settings.api.connect_timeout, Duration::from_secs(10));
    assert_eq!(settings.logging.level, LevelFilter::INFO);
    assert!(matches!(settings.logging.format, LogFormat::Compact));
    assert_eq!(settings.cache.event_capacity.get(), 64);
    assert_eq!(settings.validation.max_text_chars.get(), 280);
    assert_eq!(settings.viewer.username, None);
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.api.base_url = Some("http://from-file.test".to_string());
    raw.logging.level = Some("info".to_string());

    let overrides = Overrides {
        base_url: Some("http://from-cli.test:9000".to_string()),
        log_level: Some("debug".to_string()),
        username: Some("ada".to_string()),
        ..Default::default()
    };

    raw.apply_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.api.base_url.as_str(), "http://from-cli.test:9000/");
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert_eq!(settings.viewer.username.as_deref(), Some("ada"));
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    raw.apply_overrides(&Overrides {
        log_json: Some(true),
        ..Default::default()
    });
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn zero_values_are_rejected() {
    let mut raw = RawSettings::default();
    raw.validation.max_text_chars = Some(0);
    let err = Settings::from_raw(raw).expect_err("zero limit");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "validation.max_text_chars",
            ..
        }
    ));

    let mut raw = RawSettings::default();
    raw.api.connect_timeout_seconds = Some(0);
    let err = Settings::from_raw(raw).expect_err("zero timeout");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "api.connect_timeout_seconds",
            ..
        }
    ));

    let mut raw = RawSettings::default();
    raw.cache.event_capacity = Some(0);
    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn bad_urls_and_headers_are_rejected() {
    let mut raw = RawSettings::default();
    raw.api.base_url = Some("not a url".to_string());
    assert!(matches!(
        Settings::from_raw(raw),
        Err(LoadError::Invalid {
            key: "api.base_url",
            ..
        })
    ));

    let mut raw = RawSettings::default();
    raw.api.base_url = Some("ftp://example.test".to_string());
    assert!(Settings::from_raw(raw).is_err());

    let mut raw = RawSettings::default();
    raw.api.csrf_header_name = Some("bad header".to_string());
    assert!(matches!(
        Settings::from_raw(raw),
        Err(LoadError::Invalid {
            key: "api.csrf_header_name",
            ..
        })
    ));
}

#[test]
fn blank_strings_fall_back() {
    let mut raw = RawSettings::default();
    raw.api.cookie = Some("   ".to_string());
    raw.api.csrf_cookie_name = Some(String::new());
    raw.viewer.username = Some(" ".to_string());

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.api.cookie, None);
    assert_eq!(settings.api.csrf_cookie_name, "csrftoken");
    assert_eq!(settings.viewer.username, None);
}

#[test]
fn explicit_config_file_is_loaded() {
    let file = config_file(
        r#"
[api]
base_url = "http://feed.test:8080"
cookie = "sessionid=abc; csrftoken=tok"

[validation]
max_text_chars = 140

[viewer]
username = "ada"
"#,
    );

    let args = CliArgs::parse_from([
        "netfeed",
        "--config-file",
        file.path().to_str().expect("utf-8 path"),
        "feed",
    ]);
    let settings = load(&args).expect("settings");

    assert_eq!(settings.api.base_url.as_str(), "http://feed.test:8080/");
    assert_eq!(
        settings.api.cookie.as_deref(),
        Some("sessionid=abc; csrftoken=tok")
    );
    assert_eq!(settings.validation.max_text_chars.get(), 140);
    assert_eq!(settings.viewer.username.as_deref(), Some("ada"));
}

#[test]
fn missing_explicit_config_file_fails() {
    let args = CliArgs::parse_from([
        "netfeed",
        "--config-file",
        "/nonexistent/netfeed-config.toml",
        "feed",
    ]);
    assert!(matches!(load(&args), Err(LoadError::Build(_))));
}

#[test]
fn parse_feed_defaults_to_root() {
    let args = CliArgs::parse_from(["netfeed", "feed"]);
    match args.command {
        Command::Feed { path } => assert_eq!(path, "/"),
        other => panic!("wrong command parsed: {other:?}"),
    }
}

#[test]
fn parse_comment_arguments() {
    let args = CliArgs::parse_from([
        "netfeed",
        "comment",
        "12",
        "nice post",
        "--reply-to",
        "4",
        "--path",
        "/following",
        "--username",
        "ada",
    ]);

    match args.command {
        Command::Comment {
            post_id,
            text,
            reply_to,
            target,
        } => {
            assert_eq!(post_id, PostId(12));
            assert_eq!(text, "nice post");
            assert_eq!(reply_to, Some(CommentId(4)));
            assert_eq!(target.path, "/following");
        }
        other => panic!("wrong command parsed: {other:?}"),
    }
    assert_eq!(args.overrides.username.as_deref(), Some("ada"));
}

#[test]
fn parse_follow_arguments() {
    let args = CliArgs::parse_from(["netfeed", "follow", "bob", "--post", "7"]);

    match args.command {
        Command::Follow {
            username,
            post_id,
            target,
        } => {
            assert_eq!(username, "bob");
            assert_eq!(post_id, Some(PostId(7)));
            assert_eq!(target.path, "/");
        }
        other => panic!("wrong command parsed: {other:?}"),
    }
}

#[test]
fn api_settings_convert_to_transport_config() {
    let mut raw = RawSettings::default();
    raw.api.base_url = Some("https://feed.test".to_string());
    raw.api.cookie = Some("csrftoken=abc".to_string());
    raw.api.connect_timeout_seconds = Some(3);
    let settings = Settings::from_raw(raw).expect("valid settings");

    let transport = TransportConfig::from(&settings.api);
    assert_eq!(transport.base_url, "https://feed.test/");
    assert_eq!(transport.cookie.as_deref(), Some("csrftoken=abc"));
    assert_eq!(transport.csrf_header_name, "X-CSRFToken");
    assert_eq!(transport.connect_timeout, Duration::from_secs(3));
}
