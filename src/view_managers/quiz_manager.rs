use super::history_manager::HistoryManager;
use crate::{
    App, AppView, BankRequest, config,
    log_util::log_debug,
    output_manager::OutputManager,
    question_bank::{self, Mode, Question},
    quiz_engine::{EngineState, HistoryEntry, QuestionPhase, QuizConfiguration, QuizError, SessionType},
};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

pub(crate) struct QuizManager<'a> {
    app: &'a mut App,
}

impl<'a> QuizManager<'a> {
    pub(crate) fn new(app: &'a mut App) -> Self {
        Self { app }
    }

    /// Build a session from a freshly loaded bank and switch to the quiz view.
    pub(crate) fn start_session(&mut self, mode: Mode, request: BankRequest, questions: &[Question]) {
        let quiz_config = match request {
            BankRequest::Exam => QuizConfiguration::exam(mode),
            BankRequest::Practice(chapter) => QuizConfiguration::practice(mode, chapter),
            BankRequest::ChapterCounts => return,
        };
        if self.app.chapter_counts.is_none() {
            self.app.chapter_counts = Some(question_bank::count_questions_by_chapter(questions));
        }

        let settings = config::mode_settings(mode);
        let mut rng = rand::rng();
        let started = self
            .app
            .engine
            .start(quiz_config, questions, &settings, &mut rng)
            .map(|session| (session.total(), session.is_complete()));

        self.app.option_index = 0;
        self.app.last_entry = None;
        self.app.report_path = None;
        match started {
            Ok((_, true)) => {
                self.app.status = Some(match quiz_config.chapter {
                    Some(chapter) => format!(
                        "Nothing left to answer in {}. Reset the chapter to practise it again.",
                        chapter.title()
                    ),
                    None => "The question bank is empty.".to_string(),
                });
                self.app.view = AppView::Summary;
            }
            Ok((total, false)) => {
                self.app.status = Some(format!("{} question(s) ready.", total));
                self.app.view = AppView::Quiz;
            }
            Err(err) => {
                App::push_error(
                    &mut self.app.error,
                    format!("Failed to start session: {}", err),
                );
                self.app.status = None;
            }
        }
    }

    pub(crate) fn handle_key(&mut self, key: KeyEvent) {
        match (key.modifiers, key.code) {
            (KeyModifiers::NONE, KeyCode::Down | KeyCode::Char('j')) => self.move_highlight(1),
            (KeyModifiers::NONE, KeyCode::Up | KeyCode::Char('k')) => self.move_highlight(-1),
            (_, KeyCode::Char(letter @ ('a'..='f' | 'A'..='F'))) => {
                self.select_label(&letter.to_ascii_uppercase().to_string())
            }
            (KeyModifiers::NONE, KeyCode::Enter) => self.primary_action(),
            (KeyModifiers::NONE, KeyCode::Char('n')) => self.advance(),
            (KeyModifiers::NONE, KeyCode::Char('m')) => {
                log_debug("App", "session abandoned");
                self.app.reset_to_home();
            }
            _ => {}
        }
    }

    pub(crate) fn handle_summary_key(&mut self, key: KeyEvent) {
        match (key.modifiers, key.code) {
            (KeyModifiers::NONE, KeyCode::Enter | KeyCode::Char('m')) => self.app.reset_to_home(),
            (KeyModifiers::NONE, KeyCode::Char('h')) => {
                self.app.engine.reset();
                HistoryManager::show_history(self.app);
            }
            (KeyModifiers::NONE, KeyCode::Char('r')) => self.retry(),
            _ => {}
        }
    }

    fn option_count(&self) -> usize {
        self.app
            .engine
            .session()
            .and_then(|session| session.current_question())
            .map(|question| question.options.len())
            .unwrap_or(0)
    }

    fn move_highlight(&mut self, delta: isize) {
        let count = self.option_count();
        if count == 0 || self.app.engine.state() == EngineState::InProgress(QuestionPhase::Answered) {
            return;
        }
        let next = (self.app.option_index as isize + delta).rem_euclid(count as isize) as usize;
        self.app.option_index = next;
        self.select_label(&question_bank::option_label(next));
    }

    fn select_label(&mut self, label: &str) {
        match self.app.engine.select_option(label) {
            Ok(()) => {
                if let Some(index) = question_bank::label_index(label) {
                    self.app.option_index = index;
                }
            }
            Err(QuizError::UnknownOption(label)) => {
                self.app.status = Some(format!("This question has no option {}.", label));
            }
            Err(err) => log_debug("App", &format!("ignored selection: {}", err)),
        }
    }

    fn primary_action(&mut self) {
        match self.app.engine.state() {
            EngineState::InProgress(QuestionPhase::AwaitingSelection) => {
                let label = question_bank::option_label(self.app.option_index);
                self.select_label(&label);
            }
            EngineState::InProgress(QuestionPhase::AwaitingConfirmation) => self.confirm(),
            EngineState::InProgress(QuestionPhase::Answered) => self.advance(),
            EngineState::Uninitialized | EngineState::Completed => {}
        }
    }

    fn confirm(&mut self) {
        match self.app.engine.confirm_answer() {
            Ok(record) => {
                self.app.status = Some(if record.is_correct {
                    "Correct.".to_string()
                } else {
                    format!("Incorrect. The answer is {}.", record.question.answer)
                });
            }
            Err(err) => self.report_engine_error("save the answer", err),
        }
    }

    fn advance(&mut self) {
        match self.app.engine.advance() {
            Ok(Some(entry)) => self.finish_exam(entry),
            Ok(None) if self.app.engine.state() == EngineState::Completed => {
                self.app.refresh_answered_counts();
                self.app.status = Some("Chapter practice finished.".to_string());
                self.app.view = AppView::Summary;
            }
            Ok(None) => {
                self.app.option_index = 0;
                self.app.status = None;
            }
            Err(err @ QuizError::InvalidTransition { .. }) => {
                log_debug("App", &format!("ignored advance: {}", err))
            }
            Err(err) => self.report_engine_error("record the exam", err),
        }
    }

    fn finish_exam(&mut self, entry: HistoryEntry) {
        let settings = config::current();
        if settings.write_result_reports {
            let artifact = OutputManager::new().write_result_report(&entry, settings.pass_score, true);
            if let Some(err) = artifact.error {
                App::push_error(&mut self.app.error, format!("Failed to write report: {}", err));
            }
            self.app.report_path = artifact.path;
        }
        self.app.status = Some(format!("Exam finished with score {}.", entry.score));
        self.app.last_entry = Some(entry);
        self.app.refresh_history();
        self.app.view = AppView::Summary;
    }

    fn retry(&mut self) {
        let Some(session) = self.app.engine.session() else {
            return;
        };
        let quiz_config = session.config();
        let request = match (quiz_config.session_type, quiz_config.chapter) {
            (SessionType::Exam, _) => BankRequest::Exam,
            (SessionType::Practice, Some(chapter)) => BankRequest::Practice(chapter),
            (SessionType::Practice, None) => return,
        };
        self.app.mode = Some(quiz_config.mode);
        self.app.request_bank(request);
    }

    fn report_engine_error(&mut self, action: &str, err: QuizError) {
        log_debug("App", &format!("failed to {}: {}", action, err));
        App::push_error(&mut self.app.error, format!("Failed to {}: {}", action, err));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        progress_store::{self, MemoryProgressStore},
        question_bank::{Chapter, sample_question},
        quiz_engine::QuizEngine,
    };

    fn app() -> App {
        let mut app = App::with_engine(QuizEngine::new(Box::new(MemoryProgressStore::new())), None);
        app.mode = Some(Mode::Normal);
        app
    }

    fn press(app: &mut App, code: KeyCode) {
        QuizManager::new(app).handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn pool() -> Vec<Question> {
        vec![
            sample_question(1, 1, "A"),
            sample_question(2, 1, "B"),
            sample_question(3, 2, "C"),
        ]
    }

    #[test]
    fn exam_runs_to_summary_and_records_history() {
        let mut app = app();
        QuizManager::new(&mut app).start_session(Mode::Normal, BankRequest::Exam, &pool());
        assert_eq!(app.view, AppView::Quiz);

        for _ in 0..3 {
            press(&mut app, KeyCode::Char('a'));
            press(&mut app, KeyCode::Enter);
            press(&mut app, KeyCode::Enter);
        }

        assert_eq!(app.view, AppView::Summary);
        let entry = app.last_entry.as_ref().unwrap();
        assert_eq!(entry.results.len(), 3);
        assert_eq!(entry.score, 33);
        assert_eq!(app.history.len(), 1);
        assert!(app.error.is_none());
    }

    #[test]
    fn enter_selects_the_highlighted_option_before_confirming() {
        let mut app = app();
        QuizManager::new(&mut app).start_session(Mode::Normal, BankRequest::Exam, &pool());

        press(&mut app, KeyCode::Down);
        assert_eq!(app.option_index, 1);
        assert_eq!(
            app.engine.session().unwrap().pending_selection(),
            Some("B")
        );

        press(&mut app, KeyCode::Enter);
        assert_eq!(
            app.engine.state(),
            EngineState::InProgress(QuestionPhase::Answered)
        );
        press(&mut app, KeyCode::Down);
        assert_eq!(app.option_index, 1);
    }

    #[test]
    fn unknown_option_keeps_question_unanswered() {
        let mut app = app();
        QuizManager::new(&mut app).start_session(Mode::Normal, BankRequest::Exam, &pool());

        press(&mut app, KeyCode::Char('f'));

        assert_eq!(
            app.engine.state(),
            EngineState::InProgress(QuestionPhase::AwaitingSelection)
        );
        assert_eq!(app.status.as_deref(), Some("This question has no option F."));
    }

    #[test]
    fn practice_records_progress_and_finishes() {
        let mut app = app();
        QuizManager::new(&mut app).start_session(
            Mode::Normal,
            BankRequest::Practice(Chapter(1)),
            &pool(),
        );

        for _ in 0..2 {
            press(&mut app, KeyCode::Char('b'));
            press(&mut app, KeyCode::Enter);
            press(&mut app, KeyCode::Char('n'));
        }

        assert_eq!(app.view, AppView::Summary);
        assert!(app.last_entry.is_none());
        assert!(app.history.is_empty());
        assert_eq!(app.answered_counts.get(&Chapter(1)), Some(&2));
    }

    #[test]
    fn exhausted_chapter_goes_straight_to_summary() {
        let mut store = MemoryProgressStore::new();
        progress_store::record_answered(&mut store, Mode::Normal, Chapter(2), 3).unwrap();
        let mut app = App::with_engine(QuizEngine::new(Box::new(store)), None);
        app.mode = Some(Mode::Normal);

        QuizManager::new(&mut app).start_session(
            Mode::Normal,
            BankRequest::Practice(Chapter(2)),
            &pool(),
        );

        assert_eq!(app.view, AppView::Summary);
        assert_eq!(app.engine.state(), EngineState::Completed);
        assert!(app.status.unwrap().starts_with("Nothing left to answer"));
    }

    #[test]
    fn leaving_the_quiz_discards_the_session() {
        let mut app = app();
        QuizManager::new(&mut app).start_session(Mode::Normal, BankRequest::Exam, &pool());

        press(&mut app, KeyCode::Char('m'));

        assert_eq!(app.view, AppView::Home);
        assert_eq!(app.engine.state(), EngineState::Uninitialized);
        assert!(app.history.is_empty());
    }
}
