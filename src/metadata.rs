//! Publication metadata and the builder that derives it from a draft.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    draft::{Attachment, ContentFocus, PublicationDraft},
    publisher::PublisherConfig,
    traits::TagExtractor,
    types::PublicationKind,
};

/// Mime type of the rendered text image.
pub const TEXT_IMAGE_MIME_TYPE: &str = "image/svg+xml";

static BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("valid blank line pattern"));

static HASHTAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#(\w+)").expect("valid hashtag pattern"));

/// Collapses runs of blank lines into one and trims the result.
pub fn trimify(value: &str) -> String {
    BLANK_LINES.replace_all(value, "\n\n").trim().to_string()
}

/// Extracts `#hashtag` tokens, lowercased and deduplicated in first-seen order.
#[derive(Debug, Clone, Copy, Default)]
pub struct Hashtags;

impl TagExtractor for Hashtags {
    fn tags(&self, content: &str) -> Vec<String> {
        let mut tags: Vec<String> = Vec::new();
        for capture in HASHTAG.captures_iter(content) {
            let tag = capture[1].to_lowercase();
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }
        tags
    }
}

/// A `{traitType, displayType, value}` attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataAttribute {
    /// Attribute name.
    pub trait_type: String,
    /// Display hint.
    pub display_type: String,
    /// Attribute value.
    pub value: String,
}

impl MetadataAttribute {
    fn string(trait_type: &str, value: impl Into<String>) -> Self {
        Self {
            trait_type: trait_type.to_string(),
            display_type: "string".to_string(),
            value: value.into(),
        }
    }
}

/// The metadata document uploaded to content-addressed storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationMetadata {
    /// Metadata schema version.
    pub version: String,
    /// Unique metadata id.
    pub metadata_id: Uuid,
    /// Normalised text.
    pub description: String,
    /// Normalised text, duplicated for protocol compatibility.
    pub content: String,
    /// Link to the author's profile.
    pub external_url: String,
    /// Cover or preview image.
    pub image: Option<String>,
    /// Mime type of `image`.
    #[serde(rename = "imageMimeType")]
    pub image_mime_type: Option<String>,
    /// Display name.
    pub name: String,
    /// Tags derived from the content.
    pub tags: Vec<String>,
    /// Playable media, set only for audio and video.
    pub animation_url: Option<String>,
    /// Main content focus.
    #[serde(rename = "mainContentFocus")]
    pub main_content_focus: ContentFocus,
    /// Content warning, never set by the composer.
    #[serde(rename = "contentWarning")]
    pub content_warning: Option<String>,
    /// Attributes, always starting with the content type.
    pub attributes: Vec<MetadataAttribute>,
    /// Attached media.
    pub media: Vec<Attachment>,
    /// Locale of the author.
    pub locale: String,
    /// Creation time.
    #[serde(rename = "createdOn")]
    pub created_on: DateTime<Utc>,
    /// Publishing application.
    #[serde(rename = "appId")]
    pub app_id: String,
}

/// Per-submission inputs of the metadata builder.
#[derive(Debug, Clone)]
pub struct MetadataContext {
    /// Handle of the author.
    pub handle: String,
    /// Post or comment.
    pub kind: PublicationKind,
    /// Creation time.
    pub created_on: DateTime<Utc>,
    /// Unique id for the metadata document.
    pub metadata_id: Uuid,
    /// Tags extracted from the content.
    pub tags: Vec<String>,
    /// Rendered text image, used when there are no attachments.
    pub text_image: Option<String>,
}

impl MetadataContext {
    /// Creates a context with a fresh metadata id and no tags or text image.
    pub fn new(handle: impl Into<String>, kind: PublicationKind, created_on: DateTime<Utc>) -> Self {
        Self {
            handle: handle.into(),
            kind,
            created_on,
            metadata_id: Uuid::new_v4(),
            tags: Vec::new(),
            text_image: None,
        }
    }
}

/// Builds [`PublicationMetadata`] from a validated draft.
#[derive(Debug, Clone, Copy)]
pub struct MetadataBuilder<'a> {
    config: &'a PublisherConfig,
}

impl<'a> MetadataBuilder<'a> {
    /// Creates a builder using the given publisher settings.
    pub const fn new(config: &'a PublisherConfig) -> Self {
        Self { config }
    }

    /// Returns true when a text image should be rendered for this draft.
    ///
    /// Skipped when an attachment supplies the cover or collecting is disabled.
    pub fn needs_text_image(draft: &PublicationDraft) -> bool {
        draft.attachments.is_empty() && !draft.collect_module.is_revert()
    }

    /// Assembles the metadata document.
    pub fn build(
        &self,
        draft: &PublicationDraft,
        focus: ContentFocus,
        ctx: MetadataContext,
    ) -> PublicationMetadata {
        let content = trimify(&draft.text);
        let is_audio = focus == ContentFocus::Audio;

        let (image, image_mime_type) = match draft.attachment_image() {
            Some((image, mime)) => (Some(image.to_string()), Some(mime.to_string())),
            None => {
                let mime = ctx.text_image.as_ref().map(|_| TEXT_IMAGE_MIME_TYPE.to_string());
                (ctx.text_image, mime)
            }
        };

        let mut attributes = vec![MetadataAttribute::string("type", focus.attribute_value())];
        if is_audio {
            attributes.push(MetadataAttribute::string("author", draft.audio_meta.author.clone()));
        }

        let name = if is_audio {
            draft.audio_meta.title.clone()
        } else {
            format!("{} by @{}", ctx.kind, ctx.handle)
        };

        PublicationMetadata {
            version: self.config.metadata_version.clone(),
            metadata_id: ctx.metadata_id,
            description: content.clone(),
            content,
            external_url: format!("{}{}", self.config.profile_url_base, ctx.handle),
            image,
            image_mime_type,
            name,
            tags: ctx.tags,
            animation_url: draft.animation_url().map(str::to_string),
            main_content_focus: focus,
            content_warning: None,
            attributes,
            media: draft.attachments.clone(),
            locale: self.config.locale.clone(),
            created_on: ctx.created_on,
            app_id: self.config.app_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use rstest::rstest;

    use super::*;
    use crate::draft::{AudioMeta, CollectModuleConfig, CollectModuleKind};

    fn ctx(kind: PublicationKind) -> MetadataContext {
        MetadataContext::new("alice", kind, Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap())
    }

    fn free_collect() -> CollectModuleConfig {
        CollectModuleConfig {
            selected: CollectModuleKind::FreeCollectModule,
            payload: serde_json::json!({ "freeCollectModule": { "followerOnly": false } }),
        }
    }

    #[rstest]
    #[case::plain("hello", "hello")]
    #[case::surrounding("  hello \n", "hello")]
    #[case::blank_runs("a\n\n\n\nb", "a\n\nb")]
    #[case::whitespace_lines("a\n  \n \nb", "a\n\nb")]
    fn trimify_normalises(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(trimify(input), expected);
    }

    #[test]
    fn hashtags_are_lowercased_and_deduplicated() {
        let tags = Hashtags.tags("gm #Lens and #rust, #lens again #Web3");
        assert_eq!(tags, vec!["lens", "rust", "web3"]);
        assert!(Hashtags.tags("no tags here").is_empty());
    }

    #[test]
    fn text_post_metadata() {
        let config = PublisherConfig::default();
        let draft = PublicationDraft::text("  hello #World  ");
        let mut ctx = ctx(PublicationKind::Post);
        ctx.tags = Hashtags.tags(&draft.text);
        ctx.text_image = Some("https://img/text.svg".into());

        let meta = MetadataBuilder::new(&config).build(&draft, ContentFocus::TextOnly, ctx);
        assert_eq!(meta.content, "hello #World");
        assert_eq!(meta.description, meta.content);
        assert_eq!(meta.name, "Post by @alice");
        assert_eq!(meta.external_url, "https://lenster.xyz/u/alice");
        assert_eq!(meta.image.as_deref(), Some("https://img/text.svg"));
        assert_eq!(meta.image_mime_type.as_deref(), Some(TEXT_IMAGE_MIME_TYPE));
        assert_eq!(meta.animation_url, None);
        assert_eq!(meta.tags, vec!["world"]);
        assert_eq!(meta.attributes, vec![MetadataAttribute::string("type", "text_only")]);
        assert_eq!(meta.app_id, "Lenster");
        assert_eq!(meta.version, "2.0.0");
    }

    #[test]
    fn audio_metadata_uses_cover_and_author() {
        let config = PublisherConfig::default();
        let draft = PublicationDraft {
            text: "listen".into(),
            attachments: vec![Attachment::new("ar://track", "audio/mpeg")],
            audio_meta: AudioMeta {
                title: "Track".into(),
                cover: "ar://cover".into(),
                cover_mime_type: "image/jpeg".into(),
                author: "bob".into(),
            },
            ..PublicationDraft::default()
        };

        let meta =
            MetadataBuilder::new(&config).build(&draft, ContentFocus::Audio, ctx(PublicationKind::Comment));
        assert_eq!(meta.name, "Track");
        assert_eq!(meta.image.as_deref(), Some("ar://cover"));
        assert_eq!(meta.image_mime_type.as_deref(), Some("image/jpeg"));
        assert_eq!(meta.animation_url.as_deref(), Some("ar://track"));
        assert_eq!(meta.main_content_focus, ContentFocus::Audio);
        assert_eq!(
            meta.attributes,
            vec![
                MetadataAttribute::string("type", "audio"),
                MetadataAttribute::string("author", "bob"),
            ]
        );
    }

    #[test]
    fn image_attachment_is_cover_without_animation() {
        let config = PublisherConfig::default();
        let draft = PublicationDraft {
            attachments: vec![Attachment::new("ar://pic", "image/png")],
            ..PublicationDraft::default()
        };
        let meta =
            MetadataBuilder::new(&config).build(&draft, ContentFocus::Image, ctx(PublicationKind::Comment));
        assert_eq!(meta.name, "Comment by @alice");
        assert_eq!(meta.image.as_deref(), Some("ar://pic"));
        assert_eq!(meta.animation_url, None);
        assert_eq!(meta.media.len(), 1);
    }

    #[rstest]
    #[case::revert_text(PublicationDraft::text("hi"), false)]
    #[case::free_text(PublicationDraft { collect_module: free_collect(), ..PublicationDraft::text("hi") }, true)]
    #[case::free_with_attachment(
        PublicationDraft {
            collect_module: free_collect(),
            attachments: vec![Attachment::new("ar://pic", "image/png")],
            ..PublicationDraft::default()
        },
        false
    )]
    fn text_image_needed(#[case] draft: PublicationDraft, #[case] expected: bool) {
        assert_eq!(MetadataBuilder::needs_text_image(&draft), expected);
    }

    #[test]
    fn metadata_serializes_protocol_field_names() {
        let config = PublisherConfig::default();
        let meta = MetadataBuilder::new(&config).build(
            &PublicationDraft::text("hello"),
            ContentFocus::TextOnly,
            ctx(PublicationKind::Post),
        );
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["mainContentFocus"], "TEXT_ONLY");
        assert_eq!(json["appId"], "Lenster");
        assert!(json["animation_url"].is_null());
        assert!(json["image"].is_null());
        assert!(json["contentWarning"].is_null());
        assert!(json.get("metadata_id").is_some());
        assert!(json.get("createdOn").is_some());
    }
}
