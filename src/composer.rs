//! Composer session: owns a draft and submits it through a [`Publisher`].

use std::sync::Arc;

use tracing::debug;

use crate::{
    draft::{Attachment, AudioMeta, CollectModuleConfig, PublicationDraft, ReferenceModuleConfig},
    publisher::{Publisher, Receipt},
    session::Session,
    traits::{MetadataStore, RelayApi, TextImageRenderer, Wallet},
    types::{ParentPublication, PublicationKind, SubmissionError},
};

/// Mime type of attached GIFs.
pub const GIF_MIME_TYPE: &str = "image/gif";

/// State of one composer: the draft, the publication it replies to and the
/// inline validation error.
///
/// Successful submissions clear the text, the attachments and the collect
/// module. Audio metadata and the reference module are kept.
pub struct Composer<S, R, A, W> {
    publisher: Arc<Publisher<S, R, A, W>>,
    parent: Option<ParentPublication>,
    draft: PublicationDraft,
    content_error: Option<String>,
}

impl<S, R, A, W> std::fmt::Debug for Composer<S, R, A, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Composer")
            .field("parent", &self.parent)
            .field("draft", &self.draft)
            .field("content_error", &self.content_error)
            .finish_non_exhaustive()
    }
}

impl<S, R, A, W> Composer<S, R, A, W>
where
    S: MetadataStore,
    R: TextImageRenderer,
    A: RelayApi,
    W: Wallet,
{
    /// Opens a composer for a new post, or a comment on `parent`.
    pub fn new(publisher: Arc<Publisher<S, R, A, W>>, parent: Option<ParentPublication>) -> Self {
        Self { publisher, parent, draft: PublicationDraft::default(), content_error: None }
    }

    /// Post or comment, depending on the parent.
    pub const fn kind(&self) -> PublicationKind {
        if self.parent.is_some() {
            PublicationKind::Comment
        } else {
            PublicationKind::Post
        }
    }

    /// The current draft.
    pub const fn draft(&self) -> &PublicationDraft {
        &self.draft
    }

    /// The inline validation message, if the last submission was rejected.
    pub fn content_error(&self) -> Option<&str> {
        self.content_error.as_deref()
    }

    /// Replaces the text.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.draft.text = text.into();
    }

    /// Appends an uploaded attachment.
    pub fn add_attachment(&mut self, attachment: Attachment) {
        self.draft.attachments.push(attachment);
    }

    /// Appends a GIF picked from a search provider.
    pub fn add_gif(&mut self, url: impl Into<String>, title: impl Into<String>) {
        let mut attachment = Attachment::new(url, GIF_MIME_TYPE);
        attachment.alt_text = title.into();
        self.add_attachment(attachment);
    }

    /// Removes the attachment at `index`.
    pub fn remove_attachment(&mut self, index: usize) -> Option<Attachment> {
        (index < self.draft.attachments.len()).then(|| self.draft.attachments.remove(index))
    }

    /// Replaces the audio metadata and clears any inline error.
    pub fn set_audio_meta(&mut self, audio_meta: AudioMeta) {
        self.draft.audio_meta = audio_meta;
        self.content_error = None;
    }

    /// Selects a collect module.
    pub fn set_collect_module(&mut self, collect_module: CollectModuleConfig) {
        self.draft.collect_module = collect_module;
    }

    /// Selects a reference module.
    pub fn set_reference_module(&mut self, reference_module: ReferenceModuleConfig) {
        self.draft.reference_module = reference_module;
    }

    /// Submits the draft.
    ///
    /// Validation failures are also kept as the inline error. On success the
    /// draft is reset.
    pub async fn submit(&mut self, session: Option<&Session>) -> Result<Receipt, SubmissionError> {
        self.content_error = None;
        match self.publisher.publish(session, &self.draft, self.parent.as_ref()).await {
            Ok(receipt) => {
                self.reset();
                Ok(receipt)
            }
            Err(SubmissionError::Validation(err)) => {
                self.content_error = Some(err.to_string());
                Err(err.into())
            }
            Err(err) => Err(err),
        }
    }

    fn reset(&mut self) {
        debug!(kind = %self.kind(), "resetting composer");
        self.draft.text.clear();
        self.draft.attachments.clear();
        self.draft.collect_module = CollectModuleConfig::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        draft::CollectModuleKind,
        test_utils::{profile, Harness, MockApi, MockRenderer, MockStore, MockWallet},
        types::{PublicationId, ValidationError},
    };

    type TestComposer = Composer<MockStore, MockRenderer, MockApi, MockWallet>;

    fn composer(h: &Harness, parent: Option<ParentPublication>) -> TestComposer {
        Composer::new(Arc::new(h.publisher()), parent)
    }

    #[tokio::test]
    async fn empty_comment_sets_inline_error() {
        let h = Harness::new();
        let parent = ParentPublication::Post { id: PublicationId("0x02-0x01".into()) };
        let mut composer = composer(&h, Some(parent));
        let session = Session::new(profile(true), 0);

        let err = composer.submit(Some(&session)).await.unwrap_err();
        assert_eq!(
            err,
            SubmissionError::Validation(ValidationError::EmptyContent { kind: PublicationKind::Comment })
        );
        assert_eq!(composer.content_error(), Some("Comment should not be empty!"));
        assert!(h.calls().is_empty());

        composer.set_audio_meta(AudioMeta::default());
        assert_eq!(composer.content_error(), None);
    }

    #[tokio::test]
    async fn success_resets_draft_but_keeps_audio_and_reference() {
        let h = Harness::new();
        let mut composer = composer(&h, None);
        let session = Session::new(profile(false), 0);

        let audio = AudioMeta { title: "kept".into(), ..AudioMeta::default() };
        let reference = ReferenceModuleConfig::DegreesOfSeparation { degrees_of_separation: 2 };
        composer.set_text("gm");
        composer.add_gif("https://media.giphy.com/x.gif", "wave");
        composer.set_audio_meta(audio.clone());
        composer.set_reference_module(reference);
        composer.set_collect_module(CollectModuleConfig {
            selected: CollectModuleKind::FreeCollectModule,
            payload: serde_json::json!({ "freeCollectModule": { "followerOnly": true } }),
        });

        composer.submit(Some(&session)).await.unwrap();

        let draft = composer.draft();
        assert!(draft.text.is_empty());
        assert!(draft.attachments.is_empty());
        assert!(draft.collect_module.is_revert());
        assert_eq!(draft.audio_meta, audio);
        assert_eq!(draft.reference_module, reference);
        assert_eq!(h.queue.len().await, 1);
    }

    #[tokio::test]
    async fn transport_failure_keeps_draft() {
        let h = Harness::new();
        h.store.fail();
        let mut composer = composer(&h, None);
        composer.set_text("gm");

        let err = composer.submit(Some(&Session::new(profile(false), 0))).await.unwrap_err();
        assert!(!err.is_validation());
        assert_eq!(composer.draft().text, "gm");
        assert_eq!(composer.content_error(), None);
    }

    #[test]
    fn gif_attachment() {
        let h = Harness::new();
        let mut composer = composer(&h, None);
        composer.add_gif("https://media.giphy.com/x.gif", "wave");

        let gif = &composer.draft().attachments[0];
        assert_eq!(gif.mime_type, GIF_MIME_TYPE);
        assert_eq!(gif.alt_text, "wave");
        assert_eq!(composer.remove_attachment(3), None);
        let removed = composer.remove_attachment(0).unwrap();
        assert_eq!(removed.locator, "https://media.giphy.com/x.gif");
        assert_eq!(composer.kind(), PublicationKind::Post);
    }
}
