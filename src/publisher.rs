//! Publication submission orchestrator.
//!
//! The [`Publisher`] turns a draft into an accepted on-chain submission:
//! validate, build metadata, upload it, build the request, dispatch it and
//! record an optimistic queue entry.
//!
//! # Dispatch
//!
//! ```text
//! Start ──(dispatcher usable)──▶ DispatcherRelay ──(relayed)──▶ Done
//!   │                                 │
//!   │                           (RelayError)
//!   ▼                                 ▼
//! SignAndSubmit ◀─────────────────────┘
//!   ├─ relay disabled ──▶ direct write ──▶ Done
//!   └─ broadcast ──(relayed)──▶ Done
//!          └──(rejected with reason)──▶ direct write ──▶ Done
//! ```
//!
//! Every branch falls back at most once. A failure after the fallback is
//! returned to the caller.

use std::{fmt, sync::Arc};

use alloy_primitives::B256;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    draft::PublicationDraft,
    metadata::{Hashtags, MetadataBuilder, MetadataContext},
    queue::{TransactionQueue, TxnQueueEntry},
    request::SubmissionRequest,
    session::Session,
    signature::{self, WithSigArgs},
    traits::{
        BroadcastResult, MetadataStore, RelayApi, RelayResult, TagExtractor, TextImageRenderer,
        TypedDataOptions, Wallet,
    },
    types::{ParentPublication, PublicationKind, SubmissionError},
};

/// Number of completion events buffered per subscriber.
const COMPLETION_CAPACITY: usize = 16;

/// Configuration for the publisher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublisherConfig {
    /// Whether signed payloads go through the broadcast relay.
    ///
    /// When disabled, signed payloads are always written directly.
    pub relay_enabled: bool,
    /// Application id recorded in metadata.
    pub app_id: String,
    /// Gateway prefix turning a storage locator into a content URI.
    pub content_gateway: String,
    /// Prefix of profile links recorded in metadata.
    pub profile_url_base: String,
    /// Locale recorded in metadata.
    pub locale: String,
    /// Metadata schema version.
    pub metadata_version: String,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            relay_enabled: true,
            app_id: "Lenster".to_string(),
            content_gateway: "https://arweave.net".to_string(),
            profile_url_base: "https://lenster.xyz/u/".to_string(),
            locale: "en".to_string(),
            metadata_version: "2.0.0".to_string(),
        }
    }
}

impl PublisherConfig {
    /// Returns the content URI for a storage locator.
    ///
    /// A scheme-only gateway such as `ar://` is used as a prefix unchanged.
    pub fn content_uri(&self, locator: &str) -> String {
        let gateway = &self.content_gateway;
        if gateway.ends_with("://") {
            return format!("{gateway}{locator}");
        }
        let base = gateway.strip_suffix('/').unwrap_or(gateway);
        format!("{base}/{locator}")
    }
}

/// How an accepted submission reached the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    /// Gasless, through the profile's dispatcher.
    Dispatcher,
    /// Signed, through the broadcast relay.
    Broadcast,
    /// Signed, written directly to the contract by the wallet.
    Direct,
}

/// Outcome of an accepted submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Id of the optimistic queue entry.
    pub entry_id: Uuid,
    /// Route that accepted the submission.
    pub route: Route,
    /// Whether a fallback hop was taken.
    pub fell_back: bool,
    /// Transaction hash, when known.
    pub tx_hash: Option<B256>,
    /// Relay transaction id, for relayed submissions.
    pub tx_id: Option<String>,
}

/// Result of the dispatch state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Accepted {
    route: Route,
    fell_back: bool,
    tx_hash: Option<B256>,
    tx_id: Option<String>,
}

/// States of the dispatch state machine.
#[derive(Debug)]
enum DispatchState {
    Start,
    DispatcherRelay,
    SignAndSubmit { fell_back: bool },
    Done(Accepted),
}

/// Publication submission orchestrator.
///
/// # Type Parameters
///
/// * `S` - Metadata storage, must implement [`MetadataStore`]
/// * `R` - Text image renderer, must implement [`TextImageRenderer`]
/// * `A` - Protocol API, must implement [`RelayApi`]
/// * `W` - Connected wallet, must implement [`Wallet`]
///
/// # Example
///
/// ```ignore
/// use herald::{Publisher, PublisherConfig, Session, TransactionQueue, PublicationDraft};
///
/// let publisher = Publisher::new(
///     PublisherConfig::default(), store, renderer, api, wallet, TransactionQueue::new(),
/// );
/// let session = Session::new(profile, nonce);
///
/// let receipt = publisher.publish(Some(&session), &PublicationDraft::text("gm"), None).await?;
/// ```
pub struct Publisher<S, R, A, W> {
    config: PublisherConfig,
    store: S,
    renderer: R,
    api: A,
    wallet: W,
    tags: Arc<dyn TagExtractor>,
    queue: TransactionQueue,
    completions: broadcast::Sender<Receipt>,
}

impl<S, R, A, W> fmt::Debug for Publisher<S, R, A, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Publisher").field("config", &self.config).finish_non_exhaustive()
    }
}

impl<S, R, A, W> Publisher<S, R, A, W>
where
    S: MetadataStore,
    R: TextImageRenderer,
    A: RelayApi,
    W: Wallet,
{
    /// Creates a publisher that records accepted submissions in `queue`.
    pub fn new(
        config: PublisherConfig,
        store: S,
        renderer: R,
        api: A,
        wallet: W,
        queue: TransactionQueue,
    ) -> Self {
        let (completions, _) = broadcast::channel(COMPLETION_CAPACITY);
        Self {
            config,
            store,
            renderer,
            api,
            wallet,
            tags: Arc::new(Hashtags),
            queue,
            completions,
        }
    }

    /// Replaces the default hashtag extractor.
    pub fn with_tag_extractor(mut self, tags: impl TagExtractor) -> Self {
        self.tags = Arc::new(tags);
        self
    }

    /// Returns the configuration.
    pub const fn config(&self) -> &PublisherConfig {
        &self.config
    }

    /// Returns the optimistic transaction queue.
    pub const fn queue(&self) -> &TransactionQueue {
        &self.queue
    }

    /// Subscribes to receipts of accepted submissions.
    pub fn subscribe(&self) -> broadcast::Receiver<Receipt> {
        self.completions.subscribe()
    }

    /// Submits a draft as a post, or as a comment on `parent`.
    ///
    /// Only one submission per session may be in flight. On success an
    /// optimistic entry has been prepended to the queue and subscribers
    /// have been notified; resetting the draft is left to the caller.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - no session is signed in, or one of its submissions is still running
    /// - the draft fails validation (no network call is made)
    /// - a collaborator fails, or the wallet refuses to sign
    pub async fn publish(
        &self,
        session: Option<&Session>,
        draft: &PublicationDraft,
        parent: Option<&ParentPublication>,
    ) -> Result<Receipt, SubmissionError> {
        let result = self.try_publish(session, draft, parent).await;
        match &result {
            Ok(receipt) => info!(
                entry = %receipt.entry_id,
                route = ?receipt.route,
                fell_back = receipt.fell_back,
                "publication accepted"
            ),
            Err(err) if err.is_validation() => debug!(%err, "draft rejected"),
            Err(err) => error!(%err, "publication submission failed"),
        }
        result
    }

    async fn try_publish(
        &self,
        session: Option<&Session>,
        draft: &PublicationDraft,
        parent: Option<&ParentPublication>,
    ) -> Result<Receipt, SubmissionError> {
        let session = session.ok_or(SubmissionError::NotAuthenticated)?;
        let _guard = session.begin_submission()?;
        let profile = session.profile();

        let kind = if parent.is_some() { PublicationKind::Comment } else { PublicationKind::Post };
        let focus = draft.validate(kind)?;

        let created_on = Utc::now();
        let mut ctx = MetadataContext::new(profile.handle.clone(), kind, created_on);
        ctx.tags = self.tags.tags(&draft.text);
        if MetadataBuilder::needs_text_image(draft) {
            let image = self.renderer.render(&draft.text, &profile.handle, created_on).await?;
            ctx.text_image = Some(image);
        }
        let metadata = MetadataBuilder::new(&self.config).build(draft, focus, ctx);

        let locator = self.store.upload(&metadata).await?;
        let content_uri = self.config.content_uri(&locator);
        debug!(%content_uri, metadata_id = %metadata.metadata_id, "uploaded metadata");

        let request = SubmissionRequest::new(draft, profile, content_uri, parent);
        let accepted = self.dispatch(session, &request).await?;

        let (tx_hash, tx_id) = match accepted.route {
            Route::Direct => (accepted.tx_hash, None),
            Route::Dispatcher | Route::Broadcast => (None, accepted.tx_id.clone()),
        };
        let entry = TxnQueueEntry::new(draft, parent.map(|p| p.id().clone()), tx_hash, tx_id);
        let receipt = Receipt {
            entry_id: entry.id,
            route: accepted.route,
            fell_back: accepted.fell_back,
            tx_hash: accepted.tx_hash,
            tx_id: accepted.tx_id,
        };
        self.queue.prepend(entry).await;

        // No subscribers is fine.
        let _ = self.completions.send(receipt.clone());
        Ok(receipt)
    }

    /// Runs the dispatch state machine for a built request.
    async fn dispatch(
        &self,
        session: &Session,
        request: &SubmissionRequest,
    ) -> Result<Accepted, SubmissionError> {
        let mut state = DispatchState::Start;
        loop {
            debug!(?state, "dispatch");
            state = match state {
                DispatchState::Start => {
                    if session.profile().can_use_dispatcher() {
                        DispatchState::DispatcherRelay
                    } else {
                        DispatchState::SignAndSubmit { fell_back: false }
                    }
                }
                DispatchState::DispatcherRelay => match self.via_dispatcher(request).await? {
                    RelayResult::Relayed { tx_hash, tx_id } => DispatchState::Done(Accepted {
                        route: Route::Dispatcher,
                        fell_back: false,
                        tx_hash: Some(tx_hash),
                        tx_id: Some(tx_id),
                    }),
                    RelayResult::RelayError => {
                        warn!(
                            nonce = session.nonce().current(),
                            "dispatcher refused request, falling back to signature"
                        );
                        DispatchState::SignAndSubmit { fell_back: true }
                    }
                },
                DispatchState::SignAndSubmit { fell_back } => {
                    DispatchState::Done(self.sign_and_submit(session, request, fell_back).await?)
                }
                DispatchState::Done(accepted) => return Ok(accepted),
            };
        }
    }

    async fn via_dispatcher(&self, request: &SubmissionRequest) -> Result<RelayResult, SubmissionError> {
        let result = match request.kind() {
            PublicationKind::Post => self.api.create_post_via_dispatcher(request).await?,
            PublicationKind::Comment => self.api.create_comment_via_dispatcher(request).await?,
        };
        Ok(result)
    }

    /// Signs the request and submits it through the broadcast relay, or
    /// directly when relaying is disabled or the relay rejects it.
    async fn sign_and_submit(
        &self,
        session: &Session,
        request: &SubmissionRequest,
        fell_back: bool,
    ) -> Result<Accepted, SubmissionError> {
        let kind = request.kind();
        let options = TypedDataOptions { override_sig_nonce: session.nonce().reserve() };
        let generated = match kind {
            PublicationKind::Post => self.api.create_post_typed_data(request, options).await?,
            PublicationKind::Comment => self.api.create_comment_typed_data(request, options).await?,
        };
        if generated.typed_data.value.kind() != kind {
            return Err(SubmissionError::VariantMismatch { expected: kind });
        }

        let signed = signature::sign(&self.wallet, &generated.typed_data).await?;
        let args = WithSigArgs::new(&generated.typed_data.value, signed.envelope);

        if !self.config.relay_enabled {
            let tx_hash = self.write(&args).await?;
            return Ok(Accepted { route: Route::Direct, fell_back, tx_hash: Some(tx_hash), tx_id: None });
        }

        match self.api.broadcast(&generated.id, &signed.signature).await? {
            BroadcastResult::Relayed { tx_hash, tx_id } => Ok(Accepted {
                route: Route::Broadcast,
                fell_back,
                tx_hash: Some(tx_hash),
                tx_id: Some(tx_id),
            }),
            BroadcastResult::Rejected { reason } => {
                warn!(%reason, id = %generated.id, "broadcast rejected, writing directly");
                let tx_hash = self.write(&args).await?;
                Ok(Accepted { route: Route::Direct, fell_back: true, tx_hash: Some(tx_hash), tx_id: None })
            }
        }
    }

    async fn write(&self, args: &WithSigArgs) -> Result<B256, SubmissionError> {
        debug!(function = args.function_name(), "writing to contract");
        Ok(self.wallet.write_with_sig(args).await?)
    }
}
