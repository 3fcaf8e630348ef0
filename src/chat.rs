//! UI-agnostic chat domain types
//!
//! Shared between the data-access layer and the view. Everything here mirrors
//! the backend's wire format; the client reads these records but never
//! mutates them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One turn in the conversation as stored by the backend.
///
/// Which of the two text fields is present determines whether this renders as
/// a user turn or an assistant turn. The backend may in principle set both;
/// the view then renders both halves.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assistant_message: Option<String>,
    #[serde(default)]
    pub tracks: Vec<Track>,
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn is_user_turn(&self) -> bool {
        self.user_message.is_some()
    }

    pub fn is_assistant_turn(&self) -> bool {
        self.assistant_message.is_some()
    }
}

/// A playable audio reference attached to an assistant message.
///
/// `uri` is the identifier playback intents are keyed by. The envelope is
/// camelCase but `preview_url` stays snake case on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub name: String,
    pub artist: String,
    pub album: String,
    pub uri: String,
    pub id: String,
    #[serde(default)]
    pub preview_url: Option<String>,
}

/// A conversation scope identifier grouping related messages.
///
/// Comes from config when set, otherwise generated at startup. Threaded
/// explicitly through every operation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the user asked the backend to do, before wire formatting.
///
/// Playback intents share the chat endpoint with plain text, but their
/// string encoding is an operation-layer concern (`api::chat`), not a UI one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatInput {
    Text(String),
    Playback { uri: String, action: PlaybackAction },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackAction {
    Play,
    Pause,
}

/// Optimistic local echo of a just-sent user message.
///
/// Shown until the refetch that follows the create lands. `confirmed` flips
/// when the create succeeds; confirmed echoes are dropped as soon as the
/// server's copy of the list arrives.
#[derive(Debug, Clone)]
pub struct PendingMessage {
    pub id: Uuid,
    pub text: String,
    pub sent_at: DateTime<Utc>,
    pub confirmed: bool,
}

impl PendingMessage {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            sent_at: Utc::now(),
            confirmed: false,
        }
    }
}
