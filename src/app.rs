use anyhow::Result;
use uuid::Uuid;

use crate::api::{self, ApiClient, ChatApi, ChatCreated};
use crate::chat::{ChatInput, ChatMessage, PendingMessage, PlaybackAction, SessionId};
use crate::config::Config;
use crate::query::{Mutation, Query, QueryOptions};

/// Application.
pub struct App {
    /// Set to quit the main loop.
    pub should_quit: bool,

    // Composer state
    pub input: String,
    pub cursor: usize, // char position in input

    // Playback state: uri of the track currently marked playing, at most one
    pub now_playing: Option<String>,
    // Keyboard selection over the visible track rows, flattened in render order
    pub selected_track: Option<usize>,

    // Data layer
    pub chats: Query<Vec<ChatMessage>>,
    pub create: Mutation<ChatCreated>,
    pub pending_echoes: Vec<PendingMessage>,

    // Chat viewport
    pub chat_scroll: u16,
    pub chat_height: u16, // inner size, updated during render
    pub chat_width: u16,
    pub follow_bottom: bool,

    // Most recent operation failure, rendered in the footer
    pub status: Option<String>,
    // 0-2 for ellipsis animation
    pub animation_frame: u8,

    session: SessionId,
    chat_api: ChatApi,
}

impl App {
    pub fn new(config: &Config) -> Result<Self> {
        let api = ApiClient::new(config.base_url())?;
        let session = config
            .session_id
            .clone()
            .map(SessionId::new)
            .unwrap_or_else(SessionId::generate);

        Ok(Self {
            should_quit: false,
            input: String::new(),
            cursor: 0,
            now_playing: None,
            selected_track: None,
            chats: Query::new(
                api::FETCH_CHATS_KEY,
                QueryOptions {
                    refetch_on_focus: false,
                },
            ),
            create: Mutation::new(api::CREATE_CHAT_KEY),
            pending_echoes: Vec::new(),
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            follow_bottom: true,
            status: None,
            animation_frame: 0,
            session,
            chat_api: ChatApi::new(api),
        })
    }

    pub fn session(&self) -> &SessionId {
        &self.session
    }

    pub fn messages(&self) -> &[ChatMessage] {
        self.chats.data().map(Vec::as_slice).unwrap_or_default()
    }

    /// True while anything the thinking indicator covers is in flight.
    pub fn is_thinking(&self) -> bool {
        self.chats.is_loading() || self.create.is_pending()
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Submit the composer. Trims the input; does nothing on empty text or
    /// while a request is pending. The input clears immediately, independent
    /// of the request outcome.
    pub fn send(&mut self) {
        let text = self.input.trim().to_string();
        if text.is_empty() || self.is_thinking() {
            return;
        }

        self.input.clear();
        self.cursor = 0;

        let echo = PendingMessage::new(text.clone());
        let tag = echo.id;
        self.pending_echoes.push(echo);
        self.follow_bottom = true;

        self.submit(Some(tag), ChatInput::Text(text));
    }

    /// Flip play state for a track and tell the backend. Pausing only
    /// happens for the track currently playing; selecting a different track
    /// switches to it without pausing the old one upstream.
    ///
    /// Returns the intent that was submitted.
    pub fn toggle_playback(&mut self, uri: &str) -> ChatInput {
        let action = if self.now_playing.as_deref() == Some(uri) {
            self.now_playing = None;
            PlaybackAction::Pause
        } else {
            self.now_playing = Some(uri.to_string());
            PlaybackAction::Play
        };

        let input = ChatInput::Playback {
            uri: uri.to_string(),
            action,
        };
        self.submit(None, input.clone());
        input
    }

    fn submit(&mut self, tag: Option<Uuid>, input: ChatInput) {
        let chat_api = self.chat_api.clone();
        let session = self.session.clone();
        self.create.begin(
            tag,
            tokio::spawn(async move { chat_api.create_chat(&session, &input).await }),
        );
    }

    /// Kicks off a history fetch when the slot is stale and free, so an
    /// invalidation always translates into exactly one refetch.
    pub fn maybe_refetch(&mut self) {
        if !self.chats.needs_fetch() {
            return;
        }
        let chat_api = self.chat_api.clone();
        let session = self.session.clone();
        self.chats
            .begin(tokio::spawn(async move { chat_api.fetch_chats(&session).await }));
    }

    /// Resolve finished network tasks. Called from the event loop on ticks.
    pub async fn poll(&mut self) {
        let mut changed = false;

        for (tag, result) in self.create.poll().await {
            changed = true;
            match result {
                Ok(created) => {
                    tracing::debug!(reply = %created.message, "chat created");
                    if let Some(tag) = tag {
                        self.confirm_echo(tag);
                    }
                    self.chats.invalidate();
                }
                Err(err) => {
                    tracing::error!(error = %err, "failed to create chat");
                    if let Some(tag) = tag {
                        self.pending_echoes.retain(|echo| echo.id != tag);
                    }
                    self.status = Some(format!("Send failed: {err}"));
                }
            }
        }

        if self.chats.poll().await {
            changed = true;
            if self.chats.data().is_some() {
                // The server's list now contains every confirmed echo.
                self.pending_echoes.retain(|echo| !echo.confirmed);
            } else if let Some(err) = self.chats.error() {
                self.status = Some(format!("Refresh failed: {err}"));
            }
        }

        if changed && self.follow_bottom {
            self.scroll_to_bottom();
        }

        self.maybe_refetch();
    }

    fn confirm_echo(&mut self, tag: Uuid) {
        if let Some(echo) = self.pending_echoes.iter_mut().find(|echo| echo.id == tag) {
            echo.confirmed = true;
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_thinking() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    // Track selection

    pub fn track_count(&self) -> usize {
        self.messages()
            .iter()
            .filter(|msg| msg.is_assistant_turn())
            .map(|msg| msg.tracks.len())
            .sum()
    }

    pub fn selected_track_uri(&self) -> Option<String> {
        let idx = self.selected_track?;
        self.messages()
            .iter()
            .filter(|msg| msg.is_assistant_turn())
            .flat_map(|msg| msg.tracks.iter())
            .nth(idx)
            .map(|track| track.uri.clone())
    }

    pub fn cycle_track_forward(&mut self) {
        let count = self.track_count();
        if count == 0 {
            self.selected_track = None;
            return;
        }
        self.selected_track = Some(match self.selected_track {
            Some(idx) => (idx + 1) % count,
            None => 0,
        });
    }

    pub fn cycle_track_backward(&mut self) {
        let count = self.track_count();
        if count == 0 {
            self.selected_track = None;
            return;
        }
        self.selected_track = Some(match self.selected_track {
            Some(0) | None => count - 1,
            Some(idx) => idx - 1,
        });
    }

    pub fn clear_track_selection(&mut self) {
        self.selected_track = None;
    }

    // Chat viewport

    pub fn scroll_up(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_sub(1);
        self.follow_bottom = false;
    }

    pub fn scroll_down(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_add(1);
    }

    pub fn jump_to_bottom(&mut self) {
        self.follow_bottom = true;
        self.scroll_to_bottom();
    }

    /// Scroll the chat so the newest message (and the thinking indicator)
    /// is visible.
    pub fn scroll_to_bottom(&mut self) {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;

        for msg in self.messages() {
            if let Some(text) = &msg.user_message {
                total_lines += 1; // label line
                total_lines += wrapped_line_count(text, wrap_width);
                total_lines += 1; // blank line after bubble
            }
            if let Some(text) = &msg.assistant_message {
                total_lines += 1;
                total_lines += wrapped_line_count(text, wrap_width);
                total_lines += msg.tracks.len() as u16; // one row per track
                total_lines += 1;
            }
        }

        for echo in &self.pending_echoes {
            total_lines += 1;
            total_lines += wrapped_line_count(&echo.text, wrap_width);
            total_lines += 1;
        }

        if self.is_thinking() {
            total_lines += 2; // label + "Thinking..."
        }

        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };

        if total_lines > visible_height {
            self.chat_scroll = total_lines.saturating_sub(visible_height);
        } else {
            self.chat_scroll = 0;
        }
    }
}

fn wrapped_line_count(text: &str, wrap_width: usize) -> u16 {
    let mut total: u16 = 0;
    for line in text.lines() {
        // Use character count, not byte length, for proper UTF-8 handling
        let char_count = line.chars().count();
        if char_count == 0 {
            total += 1;
        } else {
            total += ((char_count / wrap_width) + 1) as u16;
        }
    }
    total.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::Track;
    use chrono::Utc;

    fn test_app() -> App {
        let config = Config {
            // A port that refuses connections, so spawned requests settle fast
            base_url: Some("http://127.0.0.1:9".to_string()),
            session_id: Some("test-session".to_string()),
        };
        App::new(&config).unwrap()
    }

    fn track(uri: &str) -> Track {
        Track {
            name: "Song".to_string(),
            artist: "Artist".to_string(),
            album: "Album".to_string(),
            uri: uri.to_string(),
            id: uri.to_string(),
            preview_url: None,
        }
    }

    fn assistant_message(tracks: Vec<Track>) -> ChatMessage {
        ChatMessage {
            user_message: None,
            assistant_message: Some("Here you go".to_string()),
            tracks,
            session_id: "test-session".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_send_trims_clears_and_creates_once() {
        let mut app = test_app();
        app.input = "  hello there  ".to_string();
        app.cursor = app.input.chars().count();

        app.send();

        assert_eq!(app.input, "");
        assert_eq!(app.cursor, 0);
        assert_eq!(app.create.in_flight(), 1);
        assert_eq!(app.pending_echoes.len(), 1);
        assert_eq!(app.pending_echoes[0].text, "hello there");
    }

    #[tokio::test]
    async fn test_send_ignores_whitespace_input() {
        let mut app = test_app();
        app.input = "   ".to_string();

        app.send();

        assert_eq!(app.input, "   ");
        assert!(!app.create.is_pending());
        assert!(app.pending_echoes.is_empty());
    }

    #[tokio::test]
    async fn test_send_is_noop_while_pending() {
        let mut app = test_app();
        app.input = "first".to_string();
        app.send();

        app.input = "second".to_string();
        app.send();

        // Gated: the second input is untouched and no second create fires.
        assert_eq!(app.input, "second");
        assert_eq!(app.create.in_flight(), 1);
        assert_eq!(app.pending_echoes.len(), 1);
    }

    #[tokio::test]
    async fn test_play_from_stopped() {
        let mut app = test_app();

        let intent = app.toggle_playback("spotify:track:A");

        assert_eq!(app.now_playing.as_deref(), Some("spotify:track:A"));
        assert_eq!(
            intent,
            ChatInput::Playback {
                uri: "spotify:track:A".to_string(),
                action: PlaybackAction::Play,
            }
        );
    }

    #[tokio::test]
    async fn test_pause_toggles_same_track_off() {
        let mut app = test_app();
        app.toggle_playback("spotify:track:A");

        let intent = app.toggle_playback("spotify:track:A");

        assert_eq!(app.now_playing, None);
        assert_eq!(
            intent,
            ChatInput::Playback {
                uri: "spotify:track:A".to_string(),
                action: PlaybackAction::Pause,
            }
        );
    }

    #[tokio::test]
    async fn test_switching_tracks_sends_no_pause() {
        let mut app = test_app();
        app.toggle_playback("spotify:track:A");

        let intent = app.toggle_playback("spotify:track:B");

        // The new track plays; the old one gets no pause message, so only
        // two creates have fired in total.
        assert_eq!(app.now_playing.as_deref(), Some("spotify:track:B"));
        assert_eq!(app.create.in_flight(), 2);
        assert_eq!(
            intent,
            ChatInput::Playback {
                uri: "spotify:track:B".to_string(),
                action: PlaybackAction::Play,
            }
        );
    }

    #[tokio::test]
    async fn test_playback_not_gated_on_pending_send() {
        let mut app = test_app();
        app.input = "hello".to_string();
        app.send();
        assert!(app.create.is_pending());

        app.toggle_playback("spotify:track:A");
        assert_eq!(app.now_playing.as_deref(), Some("spotify:track:A"));
    }

    #[tokio::test]
    async fn test_failed_create_rolls_back_echo_and_surfaces_error() {
        let mut app = test_app();
        app.input = "hello".to_string();
        app.send();

        // Connection refused settles quickly; poll until the mutation drains.
        for _ in 0..200 {
            app.poll().await;
            if !app.create.is_pending() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }

        assert!(!app.create.is_pending());
        assert!(app.pending_echoes.is_empty());
        assert!(app.status.is_some());
        assert!(app.messages().is_empty());
    }

    #[tokio::test]
    async fn test_track_selection_cycles_and_wraps() {
        let mut app = test_app();
        app.chats.begin(tokio::spawn(async {
            Ok(vec![assistant_message(vec![
                track("spotify:track:A"),
                track("spotify:track:B"),
            ])])
        }));
        while !app.chats.poll().await {
            tokio::task::yield_now().await;
        }

        assert_eq!(app.track_count(), 2);
        app.cycle_track_forward();
        assert_eq!(app.selected_track_uri().as_deref(), Some("spotify:track:A"));
        app.cycle_track_forward();
        assert_eq!(app.selected_track_uri().as_deref(), Some("spotify:track:B"));
        app.cycle_track_forward();
        assert_eq!(app.selected_track_uri().as_deref(), Some("spotify:track:A"));
        app.cycle_track_backward();
        assert_eq!(app.selected_track_uri().as_deref(), Some("spotify:track:B"));

        app.clear_track_selection();
        assert!(app.selected_track_uri().is_none());
    }

    #[tokio::test]
    async fn test_cycle_with_no_tracks_selects_nothing() {
        let mut app = test_app();
        app.cycle_track_forward();
        assert!(app.selected_track_uri().is_none());
    }

    #[test]
    fn test_wrapped_line_count() {
        assert_eq!(wrapped_line_count("short", 50), 1);
        assert_eq!(wrapped_line_count(&"x".repeat(120), 50), 3);
        assert_eq!(wrapped_line_count("a\nb", 50), 2);
        assert_eq!(wrapped_line_count("", 50), 1);
    }
}
