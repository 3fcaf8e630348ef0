//! Chat resource operations: create a message, fetch the session history.

use serde::{Deserialize, Serialize};

use crate::api::client::{ApiClient, ApiError};
use crate::chat::{ChatInput, ChatMessage, PlaybackAction, SessionId};

/// Stable operation key for the create mutation.
pub const CREATE_CHAT_KEY: &str = "create_chat";
/// Stable operation key for the history query.
pub const FETCH_CHATS_KEY: &str = "fetch_chats";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateChatBody<'a> {
    session_id: &'a str,
    user_message: String,
}

/// Success payload of `POST /chat`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCreated {
    pub message: String,
}

#[derive(Deserialize)]
struct ChatHistory {
    messages: Vec<ChatMessage>,
}

/// Wire encoding of a chat input. Plain text passes through unchanged;
/// playback intents share the text channel as `Play <uri>` / `Pause <uri>`.
fn encode_input(input: &ChatInput) -> String {
    match input {
        ChatInput::Text(text) => text.clone(),
        ChatInput::Playback { uri, action } => match action {
            PlaybackAction::Play => format!("Play {uri}"),
            PlaybackAction::Pause => format!("Pause {uri}"),
        },
    }
}

#[derive(Debug, Clone)]
pub struct ChatApi {
    api: ApiClient,
}

impl ChatApi {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn create_chat(
        &self,
        session: &SessionId,
        input: &ChatInput,
    ) -> Result<ChatCreated, ApiError> {
        let body = CreateChatBody {
            session_id: session.as_str(),
            user_message: encode_input(input),
        };
        self.api.post("/chat", &body).await
    }

    /// Fetches the session's message history, oldest first.
    pub async fn fetch_chats(&self, session: &SessionId) -> Result<Vec<ChatMessage>, ApiError> {
        let history: ChatHistory = self
            .api
            .get("/chat", &[("sessionId", session.as_str())])
            .await?;
        Ok(history.messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_text_passes_through() {
        let input = ChatInput::Text("play something upbeat".to_string());
        assert_eq!(encode_input(&input), "play something upbeat");
    }

    #[test]
    fn test_encode_play_intent() {
        let input = ChatInput::Playback {
            uri: "spotify:track:A".to_string(),
            action: PlaybackAction::Play,
        };
        assert_eq!(encode_input(&input), "Play spotify:track:A");
    }

    #[test]
    fn test_encode_pause_intent() {
        let input = ChatInput::Playback {
            uri: "spotify:track:A".to_string(),
            action: PlaybackAction::Pause,
        };
        assert_eq!(encode_input(&input), "Pause spotify:track:A");
    }

    #[test]
    fn test_create_body_wire_format() {
        let body = CreateChatBody {
            session_id: "abc",
            user_message: "hello".to_string(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"sessionId": "abc", "userMessage": "hello"})
        );
    }
}
