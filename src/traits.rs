//! Collaborator abstractions for the herald publisher.
//!
//! The publisher owns the submission logic; everything that talks to the
//! outside world sits behind one of these traits:
//!
//! - [`MetadataStore`]: content-addressed metadata storage
//! - [`TextImageRenderer`]: renders text posts as preview images
//! - [`TagExtractor`]: derives tags from content
//! - [`RelayApi`]: dispatcher relay, typed-data generation and broadcast relay
//! - [`Wallet`]: typed-data signing and direct contract writes

use std::future::Future;

use alloy_primitives::{Bytes, B256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    metadata::PublicationMetadata,
    request::SubmissionRequest,
    signature::{TypedData, WithSigArgs},
    types::{TransportError, WalletError},
};

/// Content-addressed storage for metadata documents.
///
/// # Example
///
/// ```ignore
/// use herald::{MetadataStore, PublicationMetadata, TransportError};
///
/// #[derive(Clone)]
/// struct Arweave {
///     client: reqwest::Client,
/// }
///
/// impl MetadataStore for Arweave {
///     async fn upload(&self, metadata: &PublicationMetadata) -> Result<String, TransportError> {
///         // POST the document and return the transaction id
///     }
/// }
/// ```
pub trait MetadataStore: Send + Sync + 'static {
    /// Persists the document and returns a stable locator for it.
    fn upload(
        &self,
        metadata: &PublicationMetadata,
    ) -> impl Future<Output = Result<String, TransportError>> + Send;
}

/// Renders the text of a publication into a preview image.
pub trait TextImageRenderer: Send + Sync + 'static {
    /// Returns the locator of the rendered image.
    fn render(
        &self,
        content: &str,
        handle: &str,
        created_on: DateTime<Utc>,
    ) -> impl Future<Output = Result<String, TransportError>> + Send;
}

/// Derives tags from publication content.
pub trait TagExtractor: Send + Sync + 'static {
    /// Returns the tags for `content`.
    fn tags(&self, content: &str) -> Vec<String>;
}

/// Options attached to a typed-data request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedDataOptions {
    /// Nonce the signature must use instead of the one known to the API.
    pub override_sig_nonce: u64,
}

/// Typed data generated by the API for a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedDataResponse {
    /// Id used to broadcast the signed payload.
    pub id: String,
    /// The payload to sign.
    pub typed_data: TypedData,
}

/// Result of a dispatcher relay request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "__typename")]
pub enum RelayResult {
    /// The relay accepted the request.
    #[serde(rename = "RelayerResult", rename_all = "camelCase")]
    Relayed {
        /// Transaction hash.
        tx_hash: B256,
        /// Relay transaction id.
        tx_id: String,
    },
    /// The relay refused the request.
    RelayError,
}

/// Result of a broadcast relay request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BroadcastResult {
    /// The relay refused the signed payload.
    Rejected {
        /// Why the relay refused.
        reason: String,
    },
    /// The relay submitted the transaction.
    #[serde(rename_all = "camelCase")]
    Relayed {
        /// Transaction hash.
        tx_hash: B256,
        /// Relay transaction id.
        tx_id: String,
    },
}

/// The protocol API: dispatcher relay, typed-data generation and broadcast.
///
/// Each call returns `Err` only for transport failures. Typed refusals come
/// back as `Ok` variants so the publisher can decide on a fallback.
pub trait RelayApi: Send + Sync + 'static {
    /// Creates a post through the profile's dispatcher.
    fn create_post_via_dispatcher(
        &self,
        request: &SubmissionRequest,
    ) -> impl Future<Output = Result<RelayResult, TransportError>> + Send;

    /// Creates a comment through the profile's dispatcher.
    fn create_comment_via_dispatcher(
        &self,
        request: &SubmissionRequest,
    ) -> impl Future<Output = Result<RelayResult, TransportError>> + Send;

    /// Generates `PostWithSig` typed data.
    fn create_post_typed_data(
        &self,
        request: &SubmissionRequest,
        options: TypedDataOptions,
    ) -> impl Future<Output = Result<TypedDataResponse, TransportError>> + Send;

    /// Generates `CommentWithSig` typed data.
    fn create_comment_typed_data(
        &self,
        request: &SubmissionRequest,
        options: TypedDataOptions,
    ) -> impl Future<Output = Result<TypedDataResponse, TransportError>> + Send;

    /// Submits a signed payload through the broadcast relay.
    fn broadcast(
        &self,
        id: &str,
        signature: &Bytes,
    ) -> impl Future<Output = Result<BroadcastResult, TransportError>> + Send;
}

/// The connected wallet.
pub trait Wallet: Send + Sync + 'static {
    /// Signs typed data, returning the 65 byte `r ‖ s ‖ v` signature.
    fn sign_typed_data(
        &self,
        typed_data: &TypedData,
    ) -> impl Future<Output = Result<Bytes, WalletError>> + Send;

    /// Sends `postWithSig` or `commentWithSig` (see [`WithSigArgs::function_name`])
    /// to the protocol contract, returning the transaction hash.
    fn write_with_sig(
        &self,
        args: &WithSigArgs,
    ) -> impl Future<Output = Result<B256, TransportError>> + Send;
}
