//! Core types for the herald publisher.
//!
//! This module contains identifiers, the authenticated profile, the parent
//! publication a comment points at, and the error taxonomy shared by every
//! stage of a submission.

use std::fmt;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

/// Protocol profile identifier (e.g. `0x01`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileId(pub String);

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Protocol publication identifier (e.g. `0x01-0x2a`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PublicationId(pub String);

impl fmt::Display for PublicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Dispatcher delegated by a profile for gasless submissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dispatcher {
    /// Address of the dispatcher.
    pub address: Address,
    /// Whether the relay currently accepts requests through this dispatcher.
    pub can_use_relay: bool,
}

/// The authenticated profile submitting publications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Profile id.
    pub id: ProfileId,
    /// Handle without the leading `@`.
    pub handle: String,
    /// Dispatcher, if one was ever set on the profile.
    pub dispatcher: Option<Dispatcher>,
}

impl Profile {
    /// Returns true if the gasless dispatcher path can be attempted.
    pub fn can_use_dispatcher(&self) -> bool {
        self.dispatcher.as_ref().is_some_and(|d| d.can_use_relay)
    }
}

/// Whether a submission creates a post or a comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PublicationKind {
    /// A top-level post.
    Post,
    /// A comment on another publication.
    Comment,
}

impl PublicationKind {
    /// Capitalised label used in user-facing text.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Post => "Post",
            Self::Comment => "Comment",
        }
    }
}

impl fmt::Display for PublicationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The publication a comment is written against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "__typename")]
pub enum ParentPublication {
    /// An original post.
    Post {
        /// Publication id.
        id: PublicationId,
    },
    /// A comment.
    Comment {
        /// Publication id.
        id: PublicationId,
    },
    /// A re-share of another publication.
    Mirror {
        /// Id of the mirror itself.
        id: PublicationId,
        /// Id of the mirrored publication.
        #[serde(rename = "mirrorOf")]
        mirror_of: PublicationId,
    },
}

impl ParentPublication {
    /// Id of the parent as displayed (the mirror's own id for mirrors).
    pub const fn id(&self) -> &PublicationId {
        match self {
            Self::Post { id } | Self::Comment { id } | Self::Mirror { id, .. } => id,
        }
    }

    /// Id a comment must point at: mirrors resolve to the original.
    pub const fn target_id(&self) -> &PublicationId {
        match self {
            Self::Post { id } | Self::Comment { id } => id,
            Self::Mirror { mirror_of, .. } => mirror_of,
        }
    }
}

/// A draft failed local checks. Nothing was sent over the network.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Neither text nor attachments were provided.
    #[error("{kind} should not be empty!")]
    EmptyContent {
        /// Kind of publication being composed.
        kind: PublicationKind,
    },

    /// Audio metadata did not satisfy its schema.
    #[error("{0}")]
    InvalidAudioMetadata(String),

    /// The first attachment has a mime type outside the allowed sets.
    #[error("unsupported media type: {0}")]
    UnsupportedMedia(String),
}

/// A network, storage or chain collaborator failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Metadata upload failed.
    #[error("metadata upload failed: {0}")]
    Upload(String),

    /// Text-to-image rendering failed.
    #[error("text image rendering failed: {0}")]
    Render(String),

    /// The protocol API (dispatcher, typed data, broadcast) failed.
    #[error("api request failed: {0}")]
    Api(String),

    /// The direct contract write failed.
    #[error("transaction failed: {0}")]
    Chain(String),
}

/// The connected wallet refused or failed to sign.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WalletError {
    /// The user rejected the signature request.
    #[error("user rejected the request")]
    Rejected,

    /// The wallet failed for an implementation-specific reason.
    #[error("wallet error: {0}")]
    Failed(String),

    /// The returned signature was not 65 bytes long.
    #[error("malformed signature: expected 65 bytes, got {0}")]
    MalformedSignature(usize),
}

/// Errors returned by a publication submission.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmissionError {
    /// No profile is signed in.
    #[error("Please sign in your wallet.")]
    NotAuthenticated,

    /// Another submission from this session is still outstanding.
    #[error("a submission is already in flight")]
    InFlight,

    /// The draft was rejected before any network call.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A collaborator call failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Signing failed.
    #[error(transparent)]
    Wallet(#[from] WalletError),

    /// The typed data returned does not match the publication being submitted.
    #[error("typed data mismatch: expected {expected} payload")]
    VariantMismatch {
        /// The kind of publication being submitted.
        expected: PublicationKind,
    },
}

impl SubmissionError {
    /// Returns true for errors that are shown inline next to the editor.
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
