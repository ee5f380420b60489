use anyhow::Result;
use companion_core::UiEvent;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};

use crate::app::{App, InputMode};
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
        AppEvent::Key(key) => handle_key(app, key).await,
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => app.tick(),
    }
    app.poll_reply().await;
    Ok(())
}

async fn handle_key(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    if app.show_template_picker {
        handle_template_picker(app, key).await;
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key).await,
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

async fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('i') | KeyCode::Tab => app.input_mode = InputMode::Editing,
        KeyCode::Char('c') => {
            if app.conversation().can_continue() {
                app.submit(true);
            }
        }
        KeyCode::Char('y') => app.copy_last_reply(),
        KeyCode::Char('t') => app.open_template_picker(),
        KeyCode::Char('x') => {
            app.apply(UiEvent::ClearRequested).await;
            app.chat_scroll = 0;
        }
        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(),
        KeyCode::Char('G') | KeyCode::End => app.scroll_chat_to_bottom(),
        KeyCode::Char('g') | KeyCode::Home => app.chat_scroll = 0,
        _ => {}
    }
}

async fn handle_template_picker(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => app.show_template_picker = false,
        KeyCode::Char('j') | KeyCode::Down => app.template_picker_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.template_picker_nav_up(),
        KeyCode::Enter => {
            app.show_template_picker = false;
            if let Some(key) = app.selected_template() {
                app.apply(UiEvent::TemplateSelected(key)).await;
                app.input_cursor = app.draft().chars().count();
                app.input_mode = InputMode::Editing;
                app.scroll_chat_to_bottom();
            }
        }
        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    let mut draft = app.draft().to_string();
    let mut cursor = app.input_cursor;
    let char_count = draft.chars().count();

    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
            return;
        }
        KeyCode::Enter => {
            app.submit(false);
            return;
        }
        KeyCode::Backspace => {
            if cursor == 0 {
                return;
            }
            cursor -= 1;
            draft.remove(char_to_byte_index(&draft, cursor));
        }
        KeyCode::Delete => {
            if cursor >= char_count {
                return;
            }
            draft.remove(char_to_byte_index(&draft, cursor));
        }
        KeyCode::Left => {
            app.input_cursor = cursor.saturating_sub(1);
            return;
        }
        KeyCode::Right => {
            app.input_cursor = (cursor + 1).min(char_count);
            return;
        }
        KeyCode::Home => {
            app.input_cursor = 0;
            return;
        }
        KeyCode::End => {
            app.input_cursor = char_count;
            return;
        }
        KeyCode::Char(c) => {
            draft.insert(char_to_byte_index(&draft, cursor), c);
            cursor += 1;
        }
        _ => return,
    }

    // Drafts are frozen while a reply is pending.
    if app.conversation().is_busy() {
        return;
    }
    app.set_draft(draft, cursor);
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_down(),
        MouseEventKind::ScrollUp => app.scroll_up(),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use std::time::Duration;

    use companion_core::{ChatSettings, Orchestrator, Provider, ProxyGateway, StaticTemplateService};
    use pretty_assertions::assert_eq;

    fn app() -> App {
        let mut templates = BTreeMap::new();
        templates.insert("Explain promotion".to_string(), "What is promotion {contextId}?".to_string());
        templates.insert("Risks".to_string(), "What are the risks?".to_string());

        let gateway = ProxyGateway::new("http://127.0.0.1:1/gateway", None, Duration::from_secs(1))
            .unwrap();
        let orchestrator = Orchestrator::new(
            ChatSettings::default(),
            "P-0042",
            Arc::new(gateway),
            Arc::new(StaticTemplateService::new(templates)),
        );
        App::with_orchestrator(orchestrator, "Ada".to_string(), Provider::Proxy)
    }

    fn key(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    async fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            handle_event(app, key(KeyCode::Char(c))).await.unwrap();
        }
    }

    #[tokio::test]
    async fn typing_edits_draft_at_cursor() {
        let mut app = app();
        type_text(&mut app, "héllo").await;
        handle_event(&mut app, key(KeyCode::Left)).await.unwrap();
        handle_event(&mut app, key(KeyCode::Backspace)).await.unwrap();

        assert_eq!(app.draft(), "hélo");
        assert_eq!(app.input_cursor, 3);

        handle_event(&mut app, key(KeyCode::Home)).await.unwrap();
        handle_event(&mut app, key(KeyCode::Delete)).await.unwrap();
        assert_eq!(app.draft(), "élo");
        assert_eq!(app.input_cursor, 0);
    }

    #[tokio::test]
    async fn template_picker_fills_draft() {
        let mut app = app();
        app.load_templates().await;

        handle_event(&mut app, key(KeyCode::Esc)).await.unwrap();
        handle_event(&mut app, key(KeyCode::Char('t'))).await.unwrap();
        assert!(app.show_template_picker);

        handle_event(&mut app, key(KeyCode::Enter)).await.unwrap();
        assert!(!app.show_template_picker);
        assert_eq!(app.draft(), "What is promotion P-0042?");
        assert_eq!(app.input_cursor, app.draft().chars().count());
        assert_eq!(app.input_mode, InputMode::Editing);
        assert!(app.conversation().messages().is_empty());
    }

    #[tokio::test]
    async fn continue_key_ignored_without_truncated_reply() {
        let mut app = app();
        handle_event(&mut app, key(KeyCode::Esc)).await.unwrap();
        handle_event(&mut app, key(KeyCode::Char('c'))).await.unwrap();

        assert!(app.reply_task.is_none());
        assert!(!app.conversation().is_busy());
    }

    #[tokio::test]
    async fn clear_key_resets_conversation() {
        let mut app = app();
        type_text(&mut app, "draft").await;
        handle_event(&mut app, key(KeyCode::Esc)).await.unwrap();
        handle_event(&mut app, key(KeyCode::Char('x'))).await.unwrap();

        assert_eq!(app.draft(), "");
        assert_eq!(app.input_cursor, 0);
    }

    #[tokio::test]
    async fn failed_submission_ends_as_error_turn() {
        let mut app = app();
        type_text(&mut app, "Why?").await;
        handle_event(&mut app, key(KeyCode::Enter)).await.unwrap();

        assert!(app.conversation().is_busy());
        assert_eq!(app.draft(), "");

        // Typing while the reply is pending does nothing.
        type_text(&mut app, "more").await;
        assert_eq!(app.draft(), "");

        for _ in 0..50 {
            if app.reply_task.is_none() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
            handle_event(&mut app, AppEvent::Tick).await.unwrap();
        }

        let messages = app.conversation().messages();
        assert_eq!(messages.len(), 2);
        assert!(messages[1].content.starts_with("* There was an error: "));
        assert!(!app.conversation().is_busy());
    }
}
