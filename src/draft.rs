//! Publication drafts and the content validator.
//!
//! A [`PublicationDraft`] is the mutable state of a composer session. The
//! derived values (content focus, animation url, cover image) are computed
//! on demand from the draft rather than cached on it.

use serde::{Deserialize, Serialize};

use crate::types::{PublicationKind, ValidationError};

/// Audio mime types accepted as attachments.
pub const ALLOWED_AUDIO_TYPES: &[&str] =
    &["audio/mpeg", "audio/wav", "audio/mp4", "audio/aac", "audio/ogg", "audio/webm", "audio/flac"];

/// Image mime types accepted as attachments.
pub const ALLOWED_IMAGE_TYPES: &[&str] = &["image/png", "image/jpeg", "image/gif", "image/webp"];

/// Video mime types accepted as attachments.
pub const ALLOWED_VIDEO_TYPES: &[&str] =
    &["video/mp4", "video/mpeg", "video/ogg", "video/webm", "video/quicktime"];

/// An uploaded media item attached to a draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Locator of the uploaded media.
    #[serde(rename = "item")]
    pub locator: String,
    /// Mime type of the media.
    #[serde(rename = "type")]
    pub mime_type: String,
    /// Alternative text.
    #[serde(rename = "altTag")]
    pub alt_text: String,
}

impl Attachment {
    /// Creates an attachment with empty alt text.
    pub fn new(locator: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self { locator: locator.into(), mime_type: mime_type.into(), alt_text: String::new() }
    }
}

/// Extra metadata describing an audio publication.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioMeta {
    /// Track title.
    pub title: String,
    /// Locator of the cover image.
    pub cover: String,
    /// Mime type of the cover image.
    pub cover_mime_type: String,
    /// Track author.
    pub author: String,
}

impl AudioMeta {
    /// Checks the audio schema, returning the first violation.
    pub fn validate(&self) -> Result<(), String> {
        let checks = [
            (&self.title, "Invalid audio title"),
            (&self.author, "Invalid author name"),
            (&self.cover, "Invalid cover image"),
            (&self.cover_mime_type, "Invalid cover image type"),
        ];
        match checks.iter().find(|(value, _)| value.trim().is_empty()) {
            Some((_, message)) => Err((*message).to_string()),
            None => Ok(()),
        }
    }
}

/// The collect module chosen in the collect settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollectModuleKind {
    /// Anyone (or followers) can collect for free.
    FreeCollectModule,
    /// Collecting costs a fee.
    FeeCollectModule,
    /// Collecting costs a fee and the supply is capped.
    LimitedFeeCollectModule,
    /// Collecting costs a fee and closes after 24 hours.
    TimedFeeCollectModule,
    /// Capped supply that closes after 24 hours.
    LimitedTimedFeeCollectModule,
    /// Collecting is disabled.
    #[default]
    RevertCollectModule,
}

/// Selected collect module and the opaque payload forwarded to the protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectModuleConfig {
    /// The selected module.
    pub selected: CollectModuleKind,
    /// Payload built by the collect settings, sent as-is.
    pub payload: serde_json::Value,
}

impl Default for CollectModuleConfig {
    fn default() -> Self {
        Self {
            selected: CollectModuleKind::RevertCollectModule,
            payload: serde_json::json!({ "revertCollectModule": true }),
        }
    }
}

impl CollectModuleConfig {
    /// Returns true when collecting is disabled.
    pub fn is_revert(&self) -> bool {
        self.selected == CollectModuleKind::RevertCollectModule
    }
}

/// Selected reference module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferenceModuleConfig {
    /// Only followers may comment and mirror.
    FollowersOnly {
        /// Whether the restriction is active.
        followers_only: bool,
    },
    /// Only profiles within the given social distance may comment and mirror.
    DegreesOfSeparation {
        /// Maximum degrees of separation.
        degrees_of_separation: u8,
    },
}

impl Default for ReferenceModuleConfig {
    fn default() -> Self {
        Self::FollowersOnly { followers_only: false }
    }
}

/// What a publication is mainly about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentFocus {
    /// Text only.
    TextOnly,
    /// Image attachment.
    Image,
    /// Video attachment.
    Video,
    /// Audio attachment.
    Audio,
}

impl ContentFocus {
    /// Lowercase name used in the `type` attribute.
    pub const fn attribute_value(self) -> &'static str {
        match self {
            Self::TextOnly => "text_only",
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
        }
    }
}

/// Classification of a single mime type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// Allowed audio type.
    Audio,
    /// Allowed image type.
    Image,
    /// Allowed video type.
    Video,
}

impl MediaKind {
    /// Classifies a mime type, returning `None` for unsupported types.
    pub fn of(mime_type: &str) -> Option<Self> {
        if ALLOWED_AUDIO_TYPES.contains(&mime_type) {
            Some(Self::Audio)
        } else if ALLOWED_IMAGE_TYPES.contains(&mime_type) {
            Some(Self::Image)
        } else if ALLOWED_VIDEO_TYPES.contains(&mime_type) {
            Some(Self::Video)
        } else {
            None
        }
    }
}

/// A post or comment being composed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicationDraft {
    /// Markdown text.
    pub text: String,
    /// Attachments in display order.
    pub attachments: Vec<Attachment>,
    /// Audio metadata, used when the first attachment is audio.
    pub audio_meta: AudioMeta,
    /// Collect module selection.
    pub collect_module: CollectModuleConfig,
    /// Reference module selection.
    pub reference_module: ReferenceModuleConfig,
}

impl PublicationDraft {
    /// Creates a text-only draft with default module settings.
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into(), ..Self::default() }
    }

    /// Kind of the first attachment, if any and supported.
    pub fn first_media(&self) -> Option<MediaKind> {
        self.attachments.first().and_then(|a| MediaKind::of(&a.mime_type))
    }

    /// Returns true when the first attachment is audio.
    pub fn is_audio(&self) -> bool {
        self.first_media() == Some(MediaKind::Audio)
    }

    /// Resolves the main content focus from the first attachment.
    ///
    /// Returns `None` when the first attachment has an unsupported type.
    pub fn content_focus(&self) -> Option<ContentFocus> {
        if self.attachments.is_empty() {
            return Some(ContentFocus::TextOnly);
        }
        self.first_media().map(|kind| match kind {
            MediaKind::Audio => ContentFocus::Audio,
            MediaKind::Image => ContentFocus::Image,
            MediaKind::Video => ContentFocus::Video,
        })
    }

    /// Locator of the playable media, set only for audio and video.
    pub fn animation_url(&self) -> Option<&str> {
        match self.first_media() {
            Some(MediaKind::Audio | MediaKind::Video) => {
                self.attachments.first().map(|a| a.locator.as_str())
            }
            _ => None,
        }
    }

    /// Cover image and its mime type supplied by the attachments.
    pub fn attachment_image(&self) -> Option<(&str, &str)> {
        let first = self.attachments.first()?;
        if self.is_audio() {
            Some((self.audio_meta.cover.as_str(), self.audio_meta.cover_mime_type.as_str()))
        } else {
            Some((first.locator.as_str(), first.mime_type.as_str()))
        }
    }

    /// Validates the draft before any network call.
    ///
    /// Returns the resolved content focus on success.
    pub fn validate(&self, kind: PublicationKind) -> Result<ContentFocus, ValidationError> {
        if self.text.trim().is_empty() && self.attachments.is_empty() {
            return Err(ValidationError::EmptyContent { kind });
        }

        let focus = self.content_focus().ok_or_else(|| {
            let mime = self.attachments.first().map(|a| a.mime_type.clone()).unwrap_or_default();
            ValidationError::UnsupportedMedia(mime)
        })?;

        if focus == ContentFocus::Audio {
            self.audio_meta.validate().map_err(ValidationError::InvalidAudioMetadata)?;
        }

        Ok(focus)
    }
}
