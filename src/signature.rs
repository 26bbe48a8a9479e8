//! Structured signable payloads, signatures and the per-session nonce.
//!
//! The protocol API hands out EIP-712 typed data for `PostWithSig` and
//! `CommentWithSig`. The connected wallet signs it, the 65 byte signature is
//! split into `(v, r, s)` and, together with the typed values, becomes the
//! argument struct of the on-chain call.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    traits::Wallet,
    types::{PublicationKind, WalletError},
};

const DOMAIN_TYPE: &str =
    "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";

const POST_WITH_SIG_TYPE: &str = "PostWithSig(uint256 profileId,string contentURI,\
address collectModule,bytes collectModuleInitData,address referenceModule,\
bytes referenceModuleInitData,uint256 nonce,uint256 deadline)";

const COMMENT_WITH_SIG_TYPE: &str = "CommentWithSig(uint256 profileId,string contentURI,\
uint256 profileIdPointed,uint256 pubIdPointed,bytes referenceModuleData,\
address collectModule,bytes collectModuleInitData,address referenceModule,\
bytes referenceModuleInitData,uint256 nonce,uint256 deadline)";

/// EIP-712 domain of the protocol contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedDataDomain {
    /// Protocol name.
    pub name: String,
    /// Protocol version.
    pub version: String,
    /// Chain id.
    pub chain_id: u64,
    /// Address of the protocol proxy contract.
    pub verifying_contract: Address,
}

impl TypedDataDomain {
    /// Computes the EIP-712 domain separator.
    pub fn separator(&self) -> B256 {
        let mut buf = Vec::with_capacity(5 * 32);
        buf.extend_from_slice(keccak256(DOMAIN_TYPE).as_slice());
        buf.extend_from_slice(keccak256(self.name.as_bytes()).as_slice());
        buf.extend_from_slice(keccak256(self.version.as_bytes()).as_slice());
        buf.extend_from_slice(&U256::from(self.chain_id).to_be_bytes::<32>());
        buf.extend_from_slice(self.verifying_contract.into_word().as_slice());
        keccak256(buf)
    }
}

/// Typed values of a `PostWithSig` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostWithSigValue {
    /// Profile publishing.
    pub profile_id: U256,
    /// Metadata URI.
    #[serde(rename = "contentURI")]
    pub content_uri: String,
    /// Collect module contract.
    pub collect_module: Address,
    /// Collect module init data.
    pub collect_module_init_data: Bytes,
    /// Reference module contract.
    pub reference_module: Address,
    /// Reference module init data.
    pub reference_module_init_data: Bytes,
    /// Signature nonce.
    pub nonce: U256,
    /// Signature deadline.
    pub deadline: U256,
}

/// Typed values of a `CommentWithSig` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentWithSigValue {
    /// Fields shared with posts.
    #[serde(flatten)]
    pub base: PostWithSigValue,
    /// Profile owning the commented publication.
    pub profile_id_pointed: U256,
    /// Publication being commented on.
    pub pub_id_pointed: U256,
    /// Data for the pointed publication's reference module.
    pub reference_module_data: Bytes,
}

/// Post or comment typed values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypedDataValue {
    /// A comment. Listed first so the wider shape wins when deserializing.
    Comment(CommentWithSigValue),
    /// A post.
    Post(PostWithSigValue),
}

impl TypedDataValue {
    /// Kind of publication the payload creates.
    pub const fn kind(&self) -> PublicationKind {
        match self {
            Self::Post(_) => PublicationKind::Post,
            Self::Comment(_) => PublicationKind::Comment,
        }
    }

    /// Fields shared by both variants.
    pub const fn base(&self) -> &PostWithSigValue {
        match self {
            Self::Post(value) => value,
            Self::Comment(value) => &value.base,
        }
    }

    /// Computes the EIP-712 struct hash.
    pub fn struct_hash(&self) -> B256 {
        let base = self.base();
        let mut buf = Vec::with_capacity(12 * 32);
        let type_hash = match self {
            Self::Post(_) => keccak256(POST_WITH_SIG_TYPE),
            Self::Comment(_) => keccak256(COMMENT_WITH_SIG_TYPE),
        };
        buf.extend_from_slice(type_hash.as_slice());
        buf.extend_from_slice(&base.profile_id.to_be_bytes::<32>());
        buf.extend_from_slice(keccak256(base.content_uri.as_bytes()).as_slice());
        if let Self::Comment(comment) = self {
            buf.extend_from_slice(&comment.profile_id_pointed.to_be_bytes::<32>());
            buf.extend_from_slice(&comment.pub_id_pointed.to_be_bytes::<32>());
            buf.extend_from_slice(keccak256(&comment.reference_module_data).as_slice());
        }
        buf.extend_from_slice(base.collect_module.into_word().as_slice());
        buf.extend_from_slice(keccak256(&base.collect_module_init_data).as_slice());
        buf.extend_from_slice(base.reference_module.into_word().as_slice());
        buf.extend_from_slice(keccak256(&base.reference_module_init_data).as_slice());
        buf.extend_from_slice(&base.nonce.to_be_bytes::<32>());
        buf.extend_from_slice(&base.deadline.to_be_bytes::<32>());
        keccak256(buf)
    }
}

/// A domain-separated payload ready to be signed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedData {
    /// Signing domain.
    pub domain: TypedDataDomain,
    /// Typed values.
    pub value: TypedDataValue,
}

impl TypedData {
    /// Primary EIP-712 type name.
    pub const fn primary_type(&self) -> &'static str {
        match self.value {
            TypedDataValue::Post(_) => "PostWithSig",
            TypedDataValue::Comment(_) => "CommentWithSig",
        }
    }

    /// Computes the digest a wallet signs: `keccak256(0x1901 ‖ domain ‖ struct)`.
    pub fn signing_hash(&self) -> B256 {
        let mut buf = Vec::with_capacity(2 + 64);
        buf.extend_from_slice(&[0x19, 0x01]);
        buf.extend_from_slice(self.domain.separator().as_slice());
        buf.extend_from_slice(self.value.struct_hash().as_slice());
        keccak256(buf)
    }
}

/// A split signature plus the deadline it was produced for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureEnvelope {
    /// Recovery id, normalised to 27 or 28.
    pub v: u8,
    /// First half of the signature.
    pub r: B256,
    /// Second half of the signature.
    pub s: B256,
    /// Deadline copied from the typed values.
    pub deadline: U256,
}

/// Splits a 65 byte `r ‖ s ‖ v` signature.
pub fn split_signature(signature: &[u8], deadline: U256) -> Result<SignatureEnvelope, WalletError> {
    if signature.len() != 65 {
        return Err(WalletError::MalformedSignature(signature.len()));
    }
    let r = B256::from_slice(&signature[..32]);
    let s = B256::from_slice(&signature[32..64]);
    let v = match signature[64] {
        v @ (0 | 1) => v + 27,
        v => v,
    };
    Ok(SignatureEnvelope { v, r, s, deadline })
}

/// A signature together with its split form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedPayload {
    /// Raw signature, as sent to the broadcast relay.
    pub signature: Bytes,
    /// Split signature, as passed to the contract.
    pub envelope: SignatureEnvelope,
}

/// Asks the wallet to sign typed data and splits the result.
pub async fn sign<W: Wallet>(wallet: &W, typed_data: &TypedData) -> Result<SignedPayload, WalletError> {
    debug!(
        primary_type = typed_data.primary_type(),
        digest = %typed_data.signing_hash(),
        nonce = %typed_data.value.base().nonce,
        "requesting signature"
    );
    let signature = wallet.sign_typed_data(typed_data).await?;
    let envelope = split_signature(&signature, typed_data.value.base().deadline)?;
    Ok(SignedPayload { signature, envelope })
}

/// Pointer to the publication a comment is written against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentPointer {
    /// Profile owning the commented publication.
    pub profile_id_pointed: U256,
    /// Publication being commented on.
    pub pub_id_pointed: U256,
    /// Data for the pointed publication's reference module.
    pub reference_module_data: Bytes,
}

/// Arguments of `postWithSig` / `commentWithSig`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithSigArgs {
    /// Profile publishing.
    pub profile_id: U256,
    /// Metadata URI.
    #[serde(rename = "contentURI")]
    pub content_uri: String,
    /// Collect module contract.
    pub collect_module: Address,
    /// Collect module init data.
    pub collect_module_init_data: Bytes,
    /// Reference module contract.
    pub reference_module: Address,
    /// Reference module init data.
    pub reference_module_init_data: Bytes,
    /// Present only for comments.
    #[serde(flatten)]
    pub comment: Option<CommentPointer>,
    /// Signature over the typed data.
    pub sig: SignatureEnvelope,
}

impl WithSigArgs {
    /// Builds the call arguments from signed typed values.
    pub fn new(value: &TypedDataValue, sig: SignatureEnvelope) -> Self {
        let base = value.base();
        let comment = match value {
            TypedDataValue::Post(_) => None,
            TypedDataValue::Comment(c) => Some(CommentPointer {
                profile_id_pointed: c.profile_id_pointed,
                pub_id_pointed: c.pub_id_pointed,
                reference_module_data: c.reference_module_data.clone(),
            }),
        };
        Self {
            profile_id: base.profile_id,
            content_uri: base.content_uri.clone(),
            collect_module: base.collect_module,
            collect_module_init_data: base.collect_module_init_data.clone(),
            reference_module: base.reference_module,
            reference_module_init_data: base.reference_module_init_data.clone(),
            comment,
            sig,
        }
    }

    /// Kind of publication the call creates.
    pub const fn kind(&self) -> PublicationKind {
        if self.comment.is_some() {
            PublicationKind::Comment
        } else {
            PublicationKind::Post
        }
    }

    /// Name of the contract function to call.
    pub const fn function_name(&self) -> &'static str {
        match self.kind() {
            PublicationKind::Post => "postWithSig",
            PublicationKind::Comment => "commentWithSig",
        }
    }
}

/// Optimistic per-session signature nonce.
///
/// The counter only moves forward. A reservation hands out the current value
/// and advances the counter before any signature is requested; failed
/// attempts do not give their nonce back.
#[derive(Debug, Clone, Default)]
pub struct NonceCounter {
    inner: Arc<AtomicU64>,
}

impl NonceCounter {
    /// Creates a counter starting at the given on-chain nonce.
    pub fn new(start: u64) -> Self {
        Self { inner: Arc::new(AtomicU64::new(start)) }
    }

    /// Returns the nonce the next reservation will hand out.
    pub fn current(&self) -> u64 {
        self.inner.load(Ordering::Acquire)
    }

    /// Reserves the current nonce, returning the pre-increment value.
    pub fn reserve(&self) -> u64 {
        let nonce = self.inner.fetch_add(1, Ordering::AcqRel);
        debug!(nonce, "reserved signature nonce");
        nonce
    }

    /// Advances the counter only if it still equals `expected`.
    ///
    /// Returns the observed value on mismatch, or when the counter is
    /// exhausted.
    pub fn compare_and_increment(&self, expected: u64) -> Result<u64, u64> {
        let next = expected.checked_add(1).ok_or_else(|| self.current())?;
        self.inner.compare_exchange(expected, next, Ordering::AcqRel, Ordering::Acquire)
    }

    /// Resynchronises with the authoritative nonce.
    ///
    /// Values lower than the current counter are ignored.
    pub fn set(&self, nonce: u64) {
        self.inner.fetch_max(nonce, Ordering::AcqRel);
    }
}
