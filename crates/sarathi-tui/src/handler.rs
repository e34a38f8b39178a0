use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use crate::app::App;
use crate::tui::AppEvent;

pub fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => app.tick_animation(),
        AppEvent::Reply(exchange, outcome) => app.on_reply(exchange, outcome),
        AppEvent::VersesLoaded(result) => app.on_verses_loaded(result),
        AppEvent::VerseRefresh => app.reload_verses(),
        AppEvent::Health(online) => {
            // A finished exchange is better evidence than the startup probe
            if app.backend_online.is_none() {
                app.backend_online = Some(online);
            }
        }
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    // Global keys
    match key.code {
        KeyCode::Char('c') if ctrl => {
            app.should_quit = true;
            return;
        }
        KeyCode::Esc => {
            app.should_quit = true;
            return;
        }
        KeyCode::Char('s') if ctrl => {
            app.export_transcript();
            return;
        }
        KeyCode::Char('l') if ctrl => {
            app.scroll_to_tail();
            return;
        }
        KeyCode::PageUp => {
            app.scroll_page_up();
            return;
        }
        KeyCode::PageDown => {
            app.scroll_page_down();
            return;
        }
        KeyCode::Up => {
            app.scroll_up(1);
            return;
        }
        KeyCode::Down => {
            app.scroll_down(1);
            return;
        }
        _ => {}
    }

    if key.code == KeyCode::Enter {
        if !key.modifiers.contains(KeyModifiers::SHIFT) {
            app.submit();
        }
        return;
    }

    // Composer editing (ignored by the composer itself while waiting)
    let composer = app.conversation.composer_mut();
    match key.code {
        KeyCode::Backspace => composer.backspace(),
        KeyCode::Delete => composer.delete(),
        KeyCode::Left => composer.left(),
        KeyCode::Right => composer.right(),
        KeyCode::Home => composer.home(),
        KeyCode::End => composer.end(),
        KeyCode::Char(c) if !ctrl => composer.insert(c),
        _ => {}
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let in_chat = app
        .chat_area
        .map(|r| point_in_rect(mouse.column, mouse.row, r))
        .unwrap_or(false);
    if !in_chat {
        return;
    }

    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_down(3),
        MouseEventKind::ScrollUp => app.scroll_up(3),
        _ => {}
    }
}
