//! Optimistic transaction queue.
//!
//! Every accepted submission prepends a placeholder entry so it can be shown
//! before the transaction is indexed. Entries are removed or replaced by the
//! reconciler once the outcome is known; the publisher only ever prepends.

use std::{collections::VecDeque, path::Path, sync::Arc};

use alloy_primitives::B256;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::{
    draft::{Attachment, PublicationDraft},
    types::{PublicationId, PublicationKind},
};

/// Kind of an optimistic entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TxnKind {
    /// A new post.
    NewPost,
    /// A new comment.
    NewComment,
}

impl From<PublicationKind> for TxnKind {
    fn from(kind: PublicationKind) -> Self {
        match kind {
            PublicationKind::Post => Self::NewPost,
            PublicationKind::Comment => Self::NewComment,
        }
    }
}

/// A locally synthesised placeholder for an unconfirmed publication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxnQueueEntry {
    /// Unique entry id.
    pub id: Uuid,
    /// Post or comment.
    #[serde(rename = "type")]
    pub kind: TxnKind,
    /// Publication commented on.
    #[serde(rename = "parent", skip_serializing_if = "Option::is_none", default)]
    pub parent_id: Option<PublicationId>,
    /// Hash of a directly submitted transaction.
    pub tx_hash: Option<B256>,
    /// Relay transaction id.
    pub tx_id: Option<String>,
    /// Text as typed.
    pub content: String,
    /// Attachments in display order.
    pub attachments: Vec<Attachment>,
    /// Audio title.
    #[serde(rename = "title")]
    pub audio_title: Option<String>,
    /// Audio cover locator.
    #[serde(rename = "cover")]
    pub audio_cover: Option<String>,
    /// Audio author.
    #[serde(rename = "author")]
    pub audio_author: Option<String>,
}

impl TxnQueueEntry {
    /// Creates an entry for an accepted submission of `draft`.
    pub fn new(
        draft: &PublicationDraft,
        parent_id: Option<PublicationId>,
        tx_hash: Option<B256>,
        tx_id: Option<String>,
    ) -> Self {
        let kind =
            if parent_id.is_some() { PublicationKind::Comment } else { PublicationKind::Post };
        let audio = draft.is_audio().then_some(&draft.audio_meta);
        Self {
            id: Uuid::new_v4(),
            kind: kind.into(),
            parent_id,
            tx_hash,
            tx_id,
            content: draft.text.clone(),
            attachments: draft.attachments.clone(),
            audio_title: audio.map(|a| a.title.clone()),
            audio_cover: audio.map(|a| a.cover.clone()),
            audio_author: audio.map(|a| a.author.clone()),
        }
    }
}

/// Errors that can occur while persisting or restoring the queue.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// Reading or writing the file failed.
    #[error("queue io error: {0}")]
    Io(#[from] std::io::Error),

    /// The file did not contain a valid queue.
    #[error("queue decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Process-wide list of pending entries, newest first.
#[derive(Debug, Clone, Default)]
pub struct TransactionQueue {
    entries: Arc<RwLock<VecDeque<TxnQueueEntry>>>,
}

impl TransactionQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a queue from entries ordered newest first.
    pub fn from_entries(entries: Vec<TxnQueueEntry>) -> Self {
        Self { entries: Arc::new(RwLock::new(entries.into())) }
    }

    /// Adds an entry in front of all existing ones.
    pub async fn prepend(&self, entry: TxnQueueEntry) {
        let mut entries = self.entries.write().await;
        debug!(id = %entry.id, kind = ?entry.kind, pending = entries.len() + 1, "queued optimistic entry");
        entries.push_front(entry);
    }

    /// Returns a copy of all entries, newest first.
    pub async fn snapshot(&self) -> Vec<TxnQueueEntry> {
        self.entries.read().await.iter().cloned().collect()
    }

    /// Returns the number of pending entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns true if nothing is pending.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Returns the pending comments on a publication, newest first.
    pub async fn for_parent(&self, parent: &PublicationId) -> Vec<TxnQueueEntry> {
        self.entries
            .read()
            .await
            .iter()
            .filter(|e| e.parent_id.as_ref() == Some(parent))
            .cloned()
            .collect()
    }

    /// Removes an entry once its outcome is known.
    pub async fn remove(&self, id: &Uuid) -> Option<TxnQueueEntry> {
        let mut entries = self.entries.write().await;
        let index = entries.iter().position(|e| &e.id == id)?;
        entries.remove(index)
    }

    /// Replaces an entry in place, keeping its position.
    ///
    /// Returns the previous entry, or `None` if `id` is unknown.
    pub async fn replace(&self, id: &Uuid, entry: TxnQueueEntry) -> Option<TxnQueueEntry> {
        let mut entries = self.entries.write().await;
        let slot = entries.iter_mut().find(|e| &e.id == id)?;
        Some(std::mem::replace(slot, entry))
    }

    /// Writes the queue as JSON.
    pub async fn persist(&self, path: impl AsRef<Path>) -> Result<(), QueueError> {
        let json = serde_json::to_vec(&self.snapshot().await)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    /// Loads a queue written by [`persist`](Self::persist).
    ///
    /// A missing file yields an empty queue.
    pub async fn restore(path: impl AsRef<Path>) -> Result<Self, QueueError> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Self::from_entries(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::new()),
            Err(e) => Err(e.into()),
        }
    }
}
