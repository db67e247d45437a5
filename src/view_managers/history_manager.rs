use crate::{App, AppView, log_util::log_debug};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

pub(crate) struct HistoryManager<'a> {
    app: &'a mut App,
}

impl<'a> HistoryManager<'a> {
    pub(crate) fn new(app: &'a mut App) -> Self {
        Self { app }
    }

    pub(crate) fn show_history(app: &'a mut App) {
        app.selected_history = None;
        app.refresh_history();
        app.status = Some(format!("{} exam record(s).", app.history.len()));
        app.view = AppView::History;
    }

    pub(crate) fn handle_key(&mut self, key: KeyEvent) {
        match (key.modifiers, key.code) {
            (KeyModifiers::NONE, KeyCode::Down | KeyCode::Char('j')) => self.select_next(),
            (KeyModifiers::NONE, KeyCode::Up | KeyCode::Char('k')) => self.select_previous(),
            (KeyModifiers::NONE, KeyCode::Char('x')) | (KeyModifiers::NONE, KeyCode::Char('X')) => {
                self.clear_history()
            }
            (KeyModifiers::NONE, KeyCode::Char('m')) => self.app.return_to_menu(),
            _ => {}
        }
    }

    pub(crate) fn clear_history(&mut self) {
        match self.app.engine.clear_history() {
            Ok(()) => {
                log_debug("App", "exam history cleared");
                self.app.refresh_history();
                self.app.status = Some("Exam history cleared.".to_string());
            }
            Err(err) => {
                App::push_error(
                    &mut self.app.error,
                    format!("Failed to clear history: {}", err),
                );
            }
        }
    }

    fn select_next(&mut self) {
        if self.app.history.is_empty() {
            return;
        }
        let next = match self.app.selected_history {
            Some(index) if index + 1 < self.app.history.len() => index + 1,
            Some(index) => index,
            None => 0,
        };
        self.app.selected_history = Some(next);
    }

    fn select_previous(&mut self) {
        if let Some(index) = self.app.selected_history {
            self.app.selected_history = Some(index.saturating_sub(1));
        }
    }
}
