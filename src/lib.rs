#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/herald-rs/herald/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod composer;
pub use composer::{Composer, GIF_MIME_TYPE};

mod draft;
pub use draft::{
    Attachment, AudioMeta, CollectModuleConfig, CollectModuleKind, ContentFocus, MediaKind,
    PublicationDraft, ReferenceModuleConfig, ALLOWED_AUDIO_TYPES, ALLOWED_IMAGE_TYPES,
    ALLOWED_VIDEO_TYPES,
};

mod metadata;
pub use metadata::{
    trimify, Hashtags, MetadataAttribute, MetadataBuilder, MetadataContext, PublicationMetadata,
    TEXT_IMAGE_MIME_TYPE,
};

mod publisher;
pub use publisher::{Publisher, PublisherConfig, Receipt, Route};

mod queue;
pub use queue::{QueueError, TransactionQueue, TxnKind, TxnQueueEntry};

mod request;
pub use request::{DegreesOfSeparationParams, ReferenceModuleParams, SubmissionRequest};

mod session;
pub use session::{Session, SubmissionGuard};

mod signature;
pub use signature::{
    sign, split_signature, CommentPointer, CommentWithSigValue, NonceCounter, PostWithSigValue,
    SignatureEnvelope, SignedPayload, TypedData, TypedDataDomain, TypedDataValue, WithSigArgs,
};

mod traits;
pub use traits::{
    BroadcastResult, MetadataStore, RelayApi, RelayResult, TagExtractor, TextImageRenderer,
    TypedDataOptions, TypedDataResponse, Wallet,
};

mod types;
pub use types::{
    Dispatcher, ParentPublication, Profile, ProfileId, PublicationId, PublicationKind,
    SubmissionError, TransportError, ValidationError, WalletError,
};

#[cfg(test)]
mod test_utils;
