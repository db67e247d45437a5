use crate::{App, AppView, BankRequest, log_util::log_debug, question_bank::Chapter};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

pub(crate) struct ChapterManager<'a> {
    app: &'a mut App,
}

impl<'a> ChapterManager<'a> {
    pub(crate) fn new(app: &'a mut App) -> Self {
        Self { app }
    }

    pub(crate) fn show_chapters(app: &'a mut App) {
        app.view = AppView::Chapters;
        app.refresh_answered_counts();
        if app.chapter_counts.is_none() {
            app.request_bank(BankRequest::ChapterCounts);
        }
        log_debug("App", "opened chapter list");
    }

    pub(crate) fn handle_key(&mut self, key: KeyEvent) {
        match (key.modifiers, key.code) {
            (KeyModifiers::NONE, KeyCode::Down | KeyCode::Char('j')) => self.select_next(),
            (KeyModifiers::NONE, KeyCode::Up | KeyCode::Char('k')) => self.select_previous(),
            (KeyModifiers::NONE, KeyCode::Enter) | (KeyModifiers::NONE, KeyCode::Char('s')) => {
                self.start_practice()
            }
            (KeyModifiers::NONE, KeyCode::Char('x')) | (KeyModifiers::NONE, KeyCode::Char('X')) => {
                self.reset_selected_chapter()
            }
            (KeyModifiers::NONE, KeyCode::Char('m')) => {
                self.app.menu_index = 1;
                self.app.view = AppView::SessionType;
            }
            _ => {}
        }
    }

    pub(crate) fn selected_chapter(&self) -> Option<Chapter> {
        self.app.chapter_list().get(self.app.chapter_index).copied()
    }

    fn select_next(&mut self) {
        let len = self.app.chapter_list().len();
        if len == 0 {
            return;
        }
        self.app.chapter_index = (self.app.chapter_index + 1) % len;
    }

    fn select_previous(&mut self) {
        let len = self.app.chapter_list().len();
        if len == 0 {
            return;
        }
        if self.app.chapter_index == 0 {
            self.app.chapter_index = len - 1;
        } else {
            self.app.chapter_index -= 1;
        }
    }

    fn start_practice(&mut self) {
        if self.app.chapter_counts.is_none() {
            return;
        }
        let Some(chapter) = self.selected_chapter() else {
            return;
        };
        log_debug("App", &format!("practice requested for chapter {}", chapter));
        self.app.request_bank(BankRequest::Practice(chapter));
    }

    /// Forget practice progress for the highlighted chapter. History is left alone.
    pub(crate) fn reset_selected_chapter(&mut self) {
        let (Some(mode), Some(chapter)) = (self.app.mode, self.selected_chapter()) else {
            return;
        };
        match self.app.engine.clear_chapter_progress(mode, chapter) {
            Ok(()) => {
                self.app.answered_counts.insert(chapter, 0);
                self.app.status = Some(format!("Cleared progress for {}.", chapter.title()));
            }
            Err(err) => {
                App::push_error(
                    &mut self.app.error,
                    format!("Failed to reset chapter {}: {}", chapter, err),
                );
            }
        }
    }
}
