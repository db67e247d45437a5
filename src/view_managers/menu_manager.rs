use super::{
    chapter_manager::ChapterManager, config_manager::ConfigManager,
    history_manager::HistoryManager,
};
use crate::{App, AppView, BankRequest, log_util::log_debug, question_bank::Mode};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

pub(crate) const HOME_OPTIONS: [&str; 5] = [
    "1. General subjects",
    "2. Professional subjects",
    "3. Exam history",
    "4. Clear exam history",
    "5. Configure",
];

pub(crate) const SESSION_OPTIONS: [&str; 2] = ["1. Mock exam", "2. Chapter practice"];

pub(crate) struct MenuManager<'a> {
    app: &'a mut App,
}

impl<'a> MenuManager<'a> {
    pub(crate) fn new(app: &'a mut App) -> Self {
        Self { app }
    }

    pub(crate) fn handle_home_key(&mut self, key: KeyEvent) {
        match (key.modifiers, key.code) {
            (KeyModifiers::NONE, KeyCode::Down | KeyCode::Char('j')) => {
                self.menu_next(HOME_OPTIONS.len())
            }
            (KeyModifiers::NONE, KeyCode::Up | KeyCode::Char('k')) => {
                self.menu_previous(HOME_OPTIONS.len())
            }
            (KeyModifiers::NONE, KeyCode::Enter) => self.activate_home_option(),
            (KeyModifiers::NONE, KeyCode::Char(digit @ '1'..='5')) => {
                self.app.menu_index = digit as usize - '1' as usize;
                self.activate_home_option();
            }
            (KeyModifiers::NONE, KeyCode::Char('h')) => HistoryManager::show_history(self.app),
            (KeyModifiers::NONE, KeyCode::Char('c') | KeyCode::Char('C')) => {
                ConfigManager::new(self.app).show_config()
            }
            _ => {}
        }
    }

    pub(crate) fn handle_session_type_key(&mut self, key: KeyEvent) {
        match (key.modifiers, key.code) {
            (KeyModifiers::NONE, KeyCode::Down | KeyCode::Char('j')) => {
                self.menu_next(SESSION_OPTIONS.len())
            }
            (KeyModifiers::NONE, KeyCode::Up | KeyCode::Char('k')) => {
                self.menu_previous(SESSION_OPTIONS.len())
            }
            (KeyModifiers::NONE, KeyCode::Enter) => self.activate_session_option(),
            (KeyModifiers::NONE, KeyCode::Char(digit @ '1'..='2')) => {
                self.app.menu_index = digit as usize - '1' as usize;
                self.activate_session_option();
            }
            (KeyModifiers::NONE, KeyCode::Char('m')) => self.app.reset_to_home(),
            _ => {}
        }
    }

    pub(crate) fn choose_mode(&mut self, mode: Mode) {
        if self.app.mode != Some(mode) {
            self.app.chapter_counts = None;
            self.app.answered_counts.clear();
            self.app.chapter_index = 0;
        }
        self.app.mode = Some(mode);
        self.app.menu_index = 0;
        self.app.view = AppView::SessionType;
        log_debug("App", &format!("selected {} mode", mode));
    }

    fn menu_next(&mut self, len: usize) {
        self.app.menu_index = (self.app.menu_index + 1) % len;
    }

    fn menu_previous(&mut self, len: usize) {
        if self.app.menu_index == 0 {
            self.app.menu_index = len - 1;
        } else {
            self.app.menu_index -= 1;
        }
    }

    fn activate_home_option(&mut self) {
        match self.app.menu_index {
            0 => self.choose_mode(Mode::Normal),
            1 => self.choose_mode(Mode::Professional),
            2 => HistoryManager::show_history(self.app),
            3 => HistoryManager::new(self.app).clear_history(),
            4 => ConfigManager::new(self.app).show_config(),
            _ => {}
        }
    }

    fn activate_session_option(&mut self) {
        match self.app.menu_index {
            0 => {
                log_debug("App", "mock exam requested");
                self.app.request_bank(BankRequest::Exam);
            }
            1 => ChapterManager::show_chapters(self.app),
            _ => {}
        }
    }
}
