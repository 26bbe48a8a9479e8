//! The normalised submission request sent to the protocol API.

use serde::{Deserialize, Serialize};

use crate::{
    draft::{PublicationDraft, ReferenceModuleConfig},
    types::{ParentPublication, Profile, ProfileId, PublicationId, PublicationKind},
};

/// Reference module payload in the shape the protocol API expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReferenceModuleParams {
    /// Restrict comments and mirrors to followers.
    FollowerOnlyReferenceModule(bool),
    /// Restrict comments and mirrors by social distance.
    DegreesOfSeparationReferenceModule(DegreesOfSeparationParams),
}

/// Parameters of the degrees-of-separation reference module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DegreesOfSeparationParams {
    /// Whether comments are restricted.
    pub comments_restricted: bool,
    /// Whether mirrors are restricted.
    pub mirrors_restricted: bool,
    /// Maximum degrees of separation.
    pub degrees_of_separation: u8,
}

impl From<ReferenceModuleConfig> for ReferenceModuleParams {
    fn from(config: ReferenceModuleConfig) -> Self {
        match config {
            ReferenceModuleConfig::FollowersOnly { followers_only } => {
                Self::FollowerOnlyReferenceModule(followers_only)
            }
            ReferenceModuleConfig::DegreesOfSeparation { degrees_of_separation } => {
                Self::DegreesOfSeparationReferenceModule(DegreesOfSeparationParams {
                    comments_restricted: true,
                    mirrors_restricted: true,
                    degrees_of_separation,
                })
            }
        }
    }
}

/// Request to create a post or comment. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRequest {
    /// Profile publishing.
    pub profile_id: ProfileId,
    /// URI of the uploaded metadata.
    #[serde(rename = "contentURI")]
    pub content_uri: String,
    /// Publication being commented on. Present only for comments.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publication_id: Option<PublicationId>,
    /// Opaque collect module payload.
    pub collect_module: serde_json::Value,
    /// Reference module payload.
    pub reference_module: ReferenceModuleParams,
}

impl SubmissionRequest {
    /// Builds the request for a draft whose metadata is stored at `content_uri`.
    ///
    /// Comments on a mirror point at the mirrored publication.
    pub fn new(
        draft: &PublicationDraft,
        profile: &Profile,
        content_uri: String,
        parent: Option<&ParentPublication>,
    ) -> Self {
        Self {
            profile_id: profile.id.clone(),
            content_uri,
            publication_id: parent.map(|p| p.target_id().clone()),
            collect_module: draft.collect_module.payload.clone(),
            reference_module: draft.reference_module.into(),
        }
    }

    /// Kind of publication this request creates.
    pub const fn kind(&self) -> PublicationKind {
        if self.publication_id.is_some() {
            PublicationKind::Comment
        } else {
            PublicationKind::Post
        }
    }
}
