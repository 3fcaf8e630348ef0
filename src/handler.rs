use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};

use crate::app::App;
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => {
            if app.follow_bottom {
                app.scroll_to_bottom();
            }
        }
        AppEvent::FocusGained => app.chats.on_focus(),
        AppEvent::Tick => {
            app.tick_animation();
            app.poll().await;
        }
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any state
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.quit();
        return;
    }

    match key.code {
        KeyCode::Enter => {
            // Enter acts on the selected track row when there is one,
            // otherwise submits the composer.
            if let Some(uri) = app.selected_track_uri() {
                app.toggle_playback(&uri);
            } else {
                app.send();
            }
        }

        // Track row selection
        KeyCode::Tab => app.cycle_track_forward(),
        KeyCode::BackTab => app.cycle_track_backward(),

        KeyCode::Esc => {
            if app.selected_track.is_some() {
                app.clear_track_selection();
            } else if app.status.is_some() {
                app.status = None;
            } else {
                app.jump_to_bottom();
            }
        }

        // Chat scrolling
        KeyCode::Up => app.scroll_up(),
        KeyCode::Down => app.scroll_down(),
        KeyCode::PageUp => {
            for _ in 0..5 {
                app.scroll_up();
            }
        }
        KeyCode::PageDown => {
            for _ in 0..5 {
                app.scroll_down();
            }
        }

        // Composer editing
        KeyCode::Backspace => {
            if app.cursor > 0 {
                app.cursor -= 1;
                let byte_pos = char_to_byte_index(&app.input, app.cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.input.chars().count();
            if app.cursor < char_count {
                let byte_pos = char_to_byte_index(&app.input, app.cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.cursor = app.cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.input.chars().count();
            app.cursor = (app.cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.cursor = 0;
        }
        KeyCode::End => {
            app.cursor = app.input.chars().count();
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.input, app.cursor);
            app.input.insert(byte_pos, c);
            app.cursor += 1;
        }
        _ => {}
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::ScrollDown => {
            app.scroll_down();
            app.scroll_down();
            app.scroll_down();
        }
        MouseEventKind::ScrollUp => {
            app.scroll_up();
            app.scroll_up();
            app.scroll_up();
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn test_app() -> App {
        let config = Config {
            base_url: Some("http://127.0.0.1:9".to_string()),
            session_id: Some("test-session".to_string()),
        };
        App::new(&config).unwrap()
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_char_to_byte_index_multibyte() {
        assert_eq!(char_to_byte_index("héllo", 0), 0);
        assert_eq!(char_to_byte_index("héllo", 1), 1);
        assert_eq!(char_to_byte_index("héllo", 2), 3);
        assert_eq!(char_to_byte_index("héllo", 99), 6);
    }

    #[tokio::test]
    async fn test_typing_inserts_at_cursor() {
        let mut app = test_app();
        handle_key(&mut app, press(KeyCode::Char('a')));
        handle_key(&mut app, press(KeyCode::Char('c')));
        handle_key(&mut app, press(KeyCode::Left));
        handle_key(&mut app, press(KeyCode::Char('b')));

        assert_eq!(app.input, "abc");
        assert_eq!(app.cursor, 2);
    }

    #[tokio::test]
    async fn test_backspace_removes_before_cursor() {
        let mut app = test_app();
        for c in "héllo".chars() {
            handle_key(&mut app, press(KeyCode::Char(c)));
        }
        handle_key(&mut app, press(KeyCode::Home));
        handle_key(&mut app, press(KeyCode::Right));
        handle_key(&mut app, press(KeyCode::Right));
        handle_key(&mut app, press(KeyCode::Backspace));

        assert_eq!(app.input, "hllo");
        assert_eq!(app.cursor, 1);
    }

    #[tokio::test]
    async fn test_ctrl_c_quits() {
        let mut app = test_app();
        handle_key(
            &mut app,
            KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL),
        );
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn test_esc_clears_status_before_rejoining_bottom() {
        let mut app = test_app();
        app.status = Some("Send failed: boom".to_string());
        handle_key(&mut app, press(KeyCode::Esc));
        assert!(app.status.is_none());
    }
}
