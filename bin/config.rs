//! Configuration for the herald preview binary.
//!
//! Settings are read from a TOML file and overridden by CLI arguments or
//! environment variables. The draft itself always comes from the CLI.

use std::path::Path;

use clap::Parser;
use herald::{Attachment, AudioMeta, PublicationDraft, PublicationKind, PublisherConfig};
use serde::{Deserialize, Serialize};

/// CLI arguments for herald.
#[derive(Debug, Parser)]
#[command(name = "herald")]
#[command(about = "Build, validate and upload publication metadata")]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, env = "HERALD_CONFIG")]
    pub config: Option<String>,

    /// Handle of the author, without the leading `@`.
    #[arg(long, env = "HERALD_HANDLE")]
    pub handle: Option<String>,

    /// Endpoint metadata documents are POSTed to. Nothing is uploaded if unset.
    #[arg(long, env = "HERALD_UPLOAD_URL")]
    pub upload_url: Option<String>,

    /// Build the metadata of a comment instead of a post.
    #[arg(long)]
    pub comment: bool,

    /// Markdown text of the publication.
    #[arg(long, default_value = "")]
    pub text: String,

    /// Attachment as `locator=mime/type`. May be repeated.
    #[arg(long = "attachment", value_parser = parse_attachment)]
    pub attachments: Vec<Attachment>,

    /// Audio title.
    #[arg(long)]
    pub audio_title: Option<String>,

    /// Audio author.
    #[arg(long)]
    pub audio_author: Option<String>,

    /// Audio cover as `locator=mime/type`.
    #[arg(long, value_parser = parse_attachment)]
    pub audio_cover: Option<Attachment>,
}

impl Cli {
    /// Post or comment.
    pub const fn kind(&self) -> PublicationKind {
        if self.comment {
            PublicationKind::Comment
        } else {
            PublicationKind::Post
        }
    }

    /// Builds the draft described by the arguments.
    pub fn draft(&self) -> PublicationDraft {
        let cover = self.audio_cover.clone().unwrap_or_else(|| Attachment::new("", ""));
        PublicationDraft {
            text: self.text.clone(),
            attachments: self.attachments.clone(),
            audio_meta: AudioMeta {
                title: self.audio_title.clone().unwrap_or_default(),
                cover: cover.locator,
                cover_mime_type: cover.mime_type,
                author: self.audio_author.clone().unwrap_or_default(),
            },
            ..PublicationDraft::default()
        }
    }
}

fn parse_attachment(value: &str) -> Result<Attachment, String> {
    let (locator, mime_type) =
        value.rsplit_once('=').ok_or_else(|| format!("expected locator=mime/type, got {value}"))?;
    Ok(Attachment::new(locator, mime_type))
}

/// Configuration for herald.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Handle of the author.
    pub handle: String,

    /// Endpoint metadata documents are POSTed to.
    pub upload_url: Option<String>,

    /// Publisher settings.
    pub publisher: PublisherConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self { handle: "anonymous".to_string(), upload_url: None, publisher: PublisherConfig::default() }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents).map_err(ConfigError::Parse)
    }

    /// Load configuration from the config file, if any, overridden by CLI arguments.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let mut config =
            if let Some(ref path) = cli.config { Self::from_file(path)? } else { Self::default() };

        if let Some(handle) = &cli.handle {
            config.handle.clone_from(handle);
        }

        if cli.upload_url.is_some() {
            config.upload_url.clone_from(&cli.upload_url);
        }

        Ok(config)
    }
}

/// Configuration loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse configuration file.
    #[error("failed to parse config: {0}")]
    Parse(toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.handle, "anonymous");
        assert!(config.upload_url.is_none());
        assert!(config.publisher.relay_enabled);
    }

    #[test]
    fn test_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            handle = "alice"

            [publisher]
            relay_enabled = false
            app_id = "herald"
            "#,
        )
        .unwrap();
        assert_eq!(config.handle, "alice");
        assert!(!config.publisher.relay_enabled);
        assert_eq!(config.publisher.app_id, "herald");
        assert_eq!(config.publisher.locale, "en");
    }

    #[test]
    fn test_cli_draft() {
        let cli = Cli::parse_from([
            "herald",
            "--comment",
            "--text",
            "listen",
            "--attachment",
            "ar://track=audio/mpeg",
            "--audio-title",
            "Track",
            "--audio-cover",
            "ar://cover=image/png",
        ]);
        let draft = cli.draft();
        assert_eq!(cli.kind(), PublicationKind::Comment);
        assert_eq!(draft.attachments, vec![Attachment::new("ar://track", "audio/mpeg")]);
        assert_eq!(draft.audio_meta.cover_mime_type, "image/png");
        assert!(draft.audio_meta.author.is_empty());
    }

    #[test]
    fn test_parse_attachment_requires_mime() {
        assert!(parse_attachment("ar://x").is_err());
    }
}
