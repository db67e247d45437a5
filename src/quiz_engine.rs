use std::fmt;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    config::ModeSettings,
    log_util::log_debug,
    progress_store::{self, ProgressStore},
    question_bank::{Chapter, Mode, Question, label_index},
    selection,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    /// Timed, mixed chapters, capped count, recorded in history.
    Exam,
    /// One chapter, only questions not answered before.
    Practice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizConfiguration {
    pub mode: Mode,
    pub session_type: SessionType,
    /// Required for practice sessions.
    pub chapter: Option<Chapter>,
}

impl QuizConfiguration {
    pub fn exam(mode: Mode) -> Self {
        Self {
            mode,
            session_type: SessionType::Exam,
            chapter: None,
        }
    }

    pub fn practice(mode: Mode, chapter: Chapter) -> Self {
        Self {
            mode,
            session_type: SessionType::Practice,
            chapter: Some(chapter),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRecord {
    pub question: Question,
    pub selected: String,
    pub is_correct: bool,
}

/// One completed exam, as persisted under the history key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub score: u32,
    pub results: Vec<AnswerRecord>,
    pub mode: Mode,
    /// Whole seconds from the first question to the last advance.
    pub duration: u64,
}

impl HistoryEntry {
    /// Unrounded score implied by the recorded answers. `score` is rounded for storage
    /// and would misjudge results just under the pass mark.
    pub fn exact_score(&self) -> f64 {
        if self.results.is_empty() {
            return self.score as f64;
        }
        let correct = self.results.iter().filter(|result| result.is_correct).count();
        (correct as f64 * 100.0 / self.results.len() as f64).min(100.0)
    }

    pub fn passed(&self, pass_score: u32) -> bool {
        passed(self.exact_score(), pass_score)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionPhase {
    AwaitingSelection,
    AwaitingConfirmation,
    Answered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    InProgress(QuestionPhase),
    Completed,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => f.write_str("no session is running"),
            Self::InProgress(QuestionPhase::AwaitingSelection) => {
                f.write_str("no option is selected")
            }
            Self::InProgress(QuestionPhase::AwaitingConfirmation) => {
                f.write_str("the selection is not confirmed")
            }
            Self::InProgress(QuestionPhase::Answered) => {
                f.write_str("the current question is already answered")
            }
            Self::Completed => f.write_str("the session is complete"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuizError {
    #[error("cannot {action}: {state}")]
    InvalidTransition {
        action: &'static str,
        state: EngineState,
    },
    #[error("option {0} does not exist for the current question")]
    UnknownOption(String),
    #[error("practice sessions need a chapter")]
    MissingChapter,
    #[error("progress store failed: {0}")]
    Store(String),
}

impl From<color_eyre::Report> for QuizError {
    fn from(report: color_eyre::Report) -> Self {
        let chain: Vec<String> = report.chain().map(|cause| cause.to_string()).collect();
        Self::Store(chain.join(": "))
    }
}

/// User intents the engine reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    SelectOption(String),
    ConfirmAnswer,
    Advance,
    Reset,
}

#[derive(Debug, Clone)]
pub struct QuizSession {
    config: QuizConfiguration,
    questions: Vec<Question>,
    position: usize,
    score: f64,
    answers: Vec<AnswerRecord>,
    pending: Option<String>,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl QuizSession {
    fn new(config: QuizConfiguration, questions: Vec<Question>, now: DateTime<Utc>) -> Self {
        let finished_at = if questions.is_empty() { Some(now) } else { None };
        Self {
            config,
            questions,
            position: 0,
            score: 0.0,
            answers: Vec::new(),
            pending: None,
            started_at: now,
            finished_at,
        }
    }

    pub fn config(&self) -> QuizConfiguration {
        self.config
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn total(&self) -> usize {
        self.questions.len()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn answers(&self) -> &[AnswerRecord] {
        &self.answers
    }

    pub fn pending_selection(&self) -> Option<&str> {
        self.pending.as_deref()
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.position)
    }

    /// The answer given for the current question, once confirmed.
    pub fn current_answer(&self) -> Option<&AnswerRecord> {
        if self.answers.len() > self.position {
            self.answers.get(self.position)
        } else {
            None
        }
    }

    pub fn is_complete(&self) -> bool {
        self.position >= self.questions.len()
    }

    pub fn state(&self) -> EngineState {
        if self.is_complete() {
            EngineState::Completed
        } else if self.answers.len() > self.position {
            EngineState::InProgress(QuestionPhase::Answered)
        } else if self.pending.is_some() {
            EngineState::InProgress(QuestionPhase::AwaitingConfirmation)
        } else {
            EngineState::InProgress(QuestionPhase::AwaitingSelection)
        }
    }

    /// Seconds elapsed until `now`, or until completion once finished.
    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> u64 {
        let end = self.finished_at.unwrap_or(now);
        (end - self.started_at).num_seconds().max(0) as u64
    }

    pub fn correct_count(&self) -> usize {
        self.answers.iter().filter(|answer| answer.is_correct).count()
    }

    pub fn wrong_answers(&self) -> impl Iterator<Item = &AnswerRecord> {
        self.answers.iter().filter(|answer| !answer.is_correct)
    }

    fn points_per_question(&self) -> f64 {
        100.0 / self.questions.len() as f64
    }
}

/// Whether a score clears the pass mark.
pub fn passed(score: f64, pass_score: u32) -> bool {
    score + 1e-9 >= pass_score as f64
}

/// Owns the single active session and the store it reports progress to.
#[derive(Debug)]
pub struct QuizEngine<S: ProgressStore> {
    store: S,
    session: Option<QuizSession>,
    clock: fn() -> DateTime<Utc>,
}

impl<S: ProgressStore> QuizEngine<S> {
    pub fn new(store: S) -> Self {
        Self::with_clock(store, Utc::now)
    }

    pub fn with_clock(store: S, clock: fn() -> DateTime<Utc>) -> Self {
        Self {
            store,
            session: None,
            clock,
        }
    }

    pub fn session(&self) -> Option<&QuizSession> {
        self.session.as_ref()
    }

    pub fn state(&self) -> EngineState {
        self.session
            .as_ref()
            .map(QuizSession::state)
            .unwrap_or(EngineState::Uninitialized)
    }

    /// Build a new session from `pool`, discarding any session already held.
    pub fn start<R: Rng + ?Sized>(
        &mut self,
        config: QuizConfiguration,
        pool: &[Question],
        settings: &ModeSettings,
        rng: &mut R,
    ) -> Result<&QuizSession, QuizError> {
        self.session = None;
        let questions = match config.session_type {
            SessionType::Exam => selection::select_exam_questions(
                pool,
                settings.questions_per_chapter,
                settings.total_questions,
                rng,
            ),
            SessionType::Practice => {
                let chapter = config.chapter.ok_or(QuizError::MissingChapter)?;
                let answered = progress_store::answered_set(&self.store, config.mode, chapter)?;
                selection::select_practice_questions(pool, chapter, &answered)
            }
        };

        log_debug("QuizEngine", &format!(
            "started {:?} session for {} mode{} with {} question(s)",
            config.session_type,
            config.mode,
            config
                .chapter
                .map(|chapter| format!(" chapter {}", chapter))
                .unwrap_or_default(),
            questions.len()
        ));
        let session = QuizSession::new(config, questions, (self.clock)());
        Ok(&*self.session.insert(session))
    }

    pub fn select_option(&mut self, label: &str) -> Result<(), QuizError> {
        let state = self.state();
        if !matches!(
            state,
            EngineState::InProgress(
                QuestionPhase::AwaitingSelection | QuestionPhase::AwaitingConfirmation
            )
        ) {
            return Err(QuizError::InvalidTransition {
                action: "select an option",
                state,
            });
        }
        let Some(session) = self.session.as_mut() else {
            return Err(QuizError::InvalidTransition {
                action: "select an option",
                state,
            });
        };
        let option_count = session
            .current_question()
            .map(|question| question.options.len())
            .unwrap_or(0);
        match label_index(label) {
            Some(index) if index < option_count => {
                session.pending = Some(label.to_string());
                Ok(())
            }
            _ => Err(QuizError::UnknownOption(label.to_string())),
        }
    }

    pub fn confirm_answer(&mut self) -> Result<AnswerRecord, QuizError> {
        let state = self.state();
        let invalid = QuizError::InvalidTransition {
            action: "confirm an answer",
            state,
        };
        if state != EngineState::InProgress(QuestionPhase::AwaitingConfirmation) {
            return Err(invalid);
        }
        let Some(session) = self.session.as_mut() else {
            return Err(invalid);
        };
        let (Some(question), Some(selected)) =
            (session.current_question().cloned(), session.pending.clone())
        else {
            return Err(invalid);
        };

        let is_correct = selected == question.answer;
        let config = session.config;
        if config.session_type == SessionType::Practice {
            let chapter = config.chapter.ok_or(QuizError::MissingChapter)?;
            progress_store::record_answered(&mut self.store, config.mode, chapter, question.id)?;
        }

        if is_correct {
            session.score = (session.score + session.points_per_question()).min(100.0);
        }
        let record = AnswerRecord {
            question,
            selected,
            is_correct,
        };
        session.answers.push(record.clone());
        session.pending = None;
        log_debug("QuizEngine", &format!(
            "question {} answered {} (correct: {})",
            record.question.id, record.selected, record.is_correct
        ));
        Ok(record)
    }

    /// Move past an answered question. Returns the history entry when this completes an exam.
    pub fn advance(&mut self) -> Result<Option<HistoryEntry>, QuizError> {
        let state = self.state();
        let invalid = QuizError::InvalidTransition {
            action: "advance",
            state,
        };
        if state != EngineState::InProgress(QuestionPhase::Answered) {
            return Err(invalid);
        }
        let now = (self.clock)();
        let Some(session) = self.session.as_mut() else {
            return Err(invalid);
        };

        let next = session.position + 1;
        if next < session.questions.len() {
            session.position = next;
            return Ok(None);
        }

        let mut entry = None;
        if session.config.session_type == SessionType::Exam {
            let record = HistoryEntry {
                timestamp: now,
                score: session.score.round() as u32,
                results: session.answers.clone(),
                mode: session.config.mode,
                duration: (now - session.started_at).num_seconds().max(0) as u64,
            };
            progress_store::append_history(&mut self.store, &record)?;
            entry = Some(record);
        }
        session.position = next;
        session.finished_at = Some(now);
        log_debug("QuizEngine", &format!(
            "session complete with score {:.1} ({}/{} correct)",
            session.score,
            session.correct_count(),
            session.questions.len()
        ));
        Ok(entry)
    }

    /// Drop the in-memory session. Persisted history and progress are untouched.
    pub fn reset(&mut self) {
        if self.session.take().is_some() {
            log_debug("QuizEngine", "session reset");
        }
    }

    pub fn apply(&mut self, intent: Intent) -> Result<(), QuizError> {
        match intent {
            Intent::SelectOption(label) => self.select_option(&label),
            Intent::ConfirmAnswer => self.confirm_answer().map(|_| ()),
            Intent::Advance => self.advance().map(|_| ()),
            Intent::Reset => {
                self.reset();
                Ok(())
            }
        }
    }

    pub fn list_history(&self) -> color_eyre::Result<Vec<HistoryEntry>> {
        progress_store::list_history(&self.store)
    }

    pub fn clear_history(&mut self) -> color_eyre::Result<()> {
        progress_store::clear_history(&mut self.store)
    }

    pub fn answered_count(&self, mode: Mode, chapter: Chapter) -> color_eyre::Result<usize> {
        progress_store::answered_count(&self.store, mode, chapter)
    }

    pub fn clear_chapter_progress(
        &mut self,
        mode: Mode,
        chapter: Chapter,
    ) -> color_eyre::Result<()> {
        progress_store::clear_chapter_progress(&mut self.store, mode, chapter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress_store::MemoryProgressStore;
    use crate::question_bank::sample_question;
    use chrono::{Duration, TimeZone};
    use rand::{SeedableRng, rngs::StdRng};
    use std::cell::Cell;

    thread_local! {
        static TICKS: Cell<i64> = const { Cell::new(0) };
    }

    /// Each reading is 30 seconds after the previous one.
    fn ticking_clock() -> DateTime<Utc> {
        let tick = TICKS.with(|ticks| {
            let current = ticks.get();
            ticks.set(current + 1);
            current
        });
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap() + Duration::seconds(30 * tick)
    }

    fn normal_settings() -> ModeSettings {
        ModeSettings {
            question_bank: String::new(),
            questions_per_chapter: 5,
            total_questions: 20,
        }
    }

    fn exam_pool() -> Vec<Question> {
        let mut pool = Vec::new();
        let mut id = 1;
        for (chapter, size) in [(1, 10), (2, 8), (3, 12), (4, 9)] {
            for _ in 0..size {
                pool.push(sample_question(id, chapter, "A"));
                id += 1;
            }
        }
        pool
    }

    fn exam_engine() -> QuizEngine<MemoryProgressStore> {
        let mut engine = QuizEngine::with_clock(MemoryProgressStore::new(), ticking_clock);
        let mut rng = StdRng::seed_from_u64(5);
        engine
            .start(
                QuizConfiguration::exam(Mode::Normal),
                &exam_pool(),
                &normal_settings(),
                &mut rng,
            )
            .unwrap();
        engine
    }

    fn answer(engine: &mut QuizEngine<MemoryProgressStore>, label: &str) -> Option<HistoryEntry> {
        engine.apply(Intent::SelectOption(label.to_string())).unwrap();
        engine.apply(Intent::ConfirmAnswer).unwrap();
        engine.advance().unwrap()
    }

    #[test]
    fn new_engine_is_uninitialized() {
        let engine = QuizEngine::new(MemoryProgressStore::new());

        assert_eq!(engine.state(), EngineState::Uninitialized);
        assert!(engine.session().is_none());
    }

    #[test]
    fn exam_session_uses_mode_quota_and_cap() {
        let engine = exam_engine();
        let session = engine.session().unwrap();

        assert_eq!(session.total(), 20);
        for chapter in 1..=4 {
            let count = session
                .questions()
                .iter()
                .filter(|question| question.chapter == Chapter(chapter))
                .count();
            assert!(count <= 5);
        }
        assert_eq!(
            engine.state(),
            EngineState::InProgress(QuestionPhase::AwaitingSelection)
        );
    }

    #[test]
    fn sixteen_of_twenty_correct_scores_eighty_and_passes() {
        let mut engine = exam_engine();
        let mut completed = None;

        for index in 0..20 {
            let label = if index < 16 { "A" } else { "B" };
            completed = answer(&mut engine, label);
            if index < 19 {
                assert!(completed.is_none());
            }
        }

        let session = engine.session().unwrap();
        assert_eq!(engine.state(), EngineState::Completed);
        assert!((session.score() - 80.0).abs() < 1e-9);
        assert!(passed(session.score(), 80));
        assert_eq!(session.correct_count(), 16);
        assert_eq!(session.wrong_answers().count(), 4);

        let entry = completed.expect("completing an exam produces a history entry");
        assert_eq!(entry.score, 80);
        assert_eq!(entry.results.len(), 20);
        assert_eq!(entry.mode, Mode::Normal);
        assert!(entry.duration > 0);
        assert_eq!(engine.list_history().unwrap(), vec![entry]);
    }

    #[test]
    fn all_correct_totals_one_hundred_for_any_length() {
        for total in [1usize, 3, 7, 20] {
            let pool: Vec<Question> = (1..=total as u32)
                .map(|id| sample_question(id, 1, "C"))
                .collect();
            let settings = ModeSettings {
                question_bank: String::new(),
                questions_per_chapter: total,
                total_questions: total,
            };
            let mut engine = QuizEngine::new(MemoryProgressStore::new());
            let mut rng = StdRng::seed_from_u64(total as u64);
            engine
                .start(QuizConfiguration::exam(Mode::Professional), &pool, &settings, &mut rng)
                .unwrap();

            for _ in 0..total {
                answer(&mut engine, "C");
                let score = engine.session().unwrap().score();
                assert!((0.0..=100.0).contains(&score));
            }

            let score = engine.session().unwrap().score();
            assert!((score - 100.0).abs() < 1e-9, "score was {score} for {total}");
        }
    }

    #[test]
    fn confirm_without_selection_is_rejected() {
        let mut engine = exam_engine();

        let err = engine.confirm_answer().unwrap_err();

        assert!(matches!(err, QuizError::InvalidTransition { .. }));
        assert!(engine.session().unwrap().answers().is_empty());
    }

    #[test]
    fn advance_before_answering_is_rejected() {
        let mut engine = exam_engine();
        assert!(engine.advance().is_err());

        engine.select_option("B").unwrap();
        assert!(engine.advance().is_err());
        assert_eq!(engine.session().unwrap().position(), 0);
    }

    #[test]
    fn reselecting_overwrites_pending_and_answered_question_is_locked() {
        let mut engine = exam_engine();
        engine.select_option("B").unwrap();
        engine.select_option("D").unwrap();
        assert_eq!(engine.session().unwrap().pending_selection(), Some("D"));

        let record = engine.confirm_answer().unwrap();
        assert_eq!(record.selected, "D");
        assert!(!record.is_correct);
        assert_eq!(
            engine.state(),
            EngineState::InProgress(QuestionPhase::Answered)
        );
        assert!(engine.select_option("A").is_err());
        assert!(engine.confirm_answer().is_err());
        assert_eq!(engine.session().unwrap().answers().len(), 1);
    }

    #[test]
    fn unknown_labels_are_rejected() {
        let mut engine = exam_engine();

        assert_eq!(
            engine.select_option("E"),
            Err(QuizError::UnknownOption("E".to_string()))
        );
        assert_eq!(
            engine.select_option("a"),
            Err(QuizError::UnknownOption("a".to_string()))
        );
        assert_eq!(
            engine.state(),
            EngineState::InProgress(QuestionPhase::AwaitingSelection)
        );
    }

    #[test]
    fn answer_count_tracks_position() {
        let mut engine = exam_engine();

        for _ in 0..5 {
            let session = engine.session().unwrap();
            assert_eq!(session.answers().len(), session.position());
            engine.select_option("A").unwrap();
            engine.confirm_answer().unwrap();
            let session = engine.session().unwrap();
            assert_eq!(session.answers().len(), session.position() + 1);
            engine.advance().unwrap();
        }
    }

    #[test]
    fn completed_session_rejects_further_intents_and_records_history_once() {
        let mut engine = exam_engine();
        for _ in 0..20 {
            answer(&mut engine, "A");
        }

        assert!(engine.advance().is_err());
        assert!(engine.select_option("A").is_err());
        assert!(engine.confirm_answer().is_err());
        assert_eq!(engine.list_history().unwrap().len(), 1);
    }

    #[test]
    fn practice_skips_answered_and_records_progress_on_confirm() {
        let pool = vec![
            sample_question(1, 2, "A"),
            sample_question(2, 2, "B"),
            sample_question(3, 2, "C"),
            sample_question(4, 1, "A"),
        ];
        let mut store = MemoryProgressStore::new();
        progress_store::record_answered(&mut store, Mode::Normal, Chapter(2), 2).unwrap();
        let mut engine = QuizEngine::new(store);
        let mut rng = StdRng::seed_from_u64(1);

        let session = engine
            .start(
                QuizConfiguration::practice(Mode::Normal, Chapter(2)),
                &pool,
                &normal_settings(),
                &mut rng,
            )
            .unwrap();
        let ids: Vec<u32> = session.questions().iter().map(|question| question.id).collect();
        assert_eq!(ids, vec![1, 3]);

        engine.select_option("A").unwrap();
        engine.confirm_answer().unwrap();
        assert_eq!(engine.answered_count(Mode::Normal, Chapter(2)).unwrap(), 2);

        engine.reset();
        assert_eq!(engine.state(), EngineState::Uninitialized);
        assert_eq!(engine.answered_count(Mode::Normal, Chapter(2)).unwrap(), 2);
    }

    #[test]
    fn practice_completion_does_not_write_history() {
        let pool = vec![sample_question(1, 3, "A")];
        let mut engine = QuizEngine::new(MemoryProgressStore::new());
        let mut rng = StdRng::seed_from_u64(2);
        engine
            .start(
                QuizConfiguration::practice(Mode::Professional, Chapter(3)),
                &pool,
                &normal_settings(),
                &mut rng,
            )
            .unwrap();

        let entry = answer(&mut engine, "A");

        assert!(entry.is_none());
        assert_eq!(engine.state(), EngineState::Completed);
        assert!(engine.list_history().unwrap().is_empty());
    }

    #[test]
    fn exhausted_chapter_starts_completed() {
        let pool = vec![sample_question(1, 1, "A")];
        let mut store = MemoryProgressStore::new();
        progress_store::record_answered(&mut store, Mode::Normal, Chapter(1), 1).unwrap();
        let mut engine = QuizEngine::new(store);
        let mut rng = StdRng::seed_from_u64(3);

        let session = engine
            .start(
                QuizConfiguration::practice(Mode::Normal, Chapter(1)),
                &pool,
                &normal_settings(),
                &mut rng,
            )
            .unwrap();

        assert_eq!(session.total(), 0);
        assert_eq!(engine.state(), EngineState::Completed);
        assert!(engine.advance().is_err());
        assert!(engine.list_history().unwrap().is_empty());
    }

    #[test]
    fn practice_without_chapter_is_rejected() {
        let mut engine = QuizEngine::new(MemoryProgressStore::new());
        let mut rng = StdRng::seed_from_u64(4);
        let config = QuizConfiguration {
            mode: Mode::Normal,
            session_type: SessionType::Practice,
            chapter: None,
        };

        let result = engine.start(config, &exam_pool(), &normal_settings(), &mut rng);

        assert_eq!(result.err(), Some(QuizError::MissingChapter));
        assert_eq!(engine.state(), EngineState::Uninitialized);
    }

    #[test]
    fn failed_start_still_discards_previous_session() {
        let mut engine = exam_engine();
        answer(&mut engine, "A");
        let mut rng = StdRng::seed_from_u64(6);
        let config = QuizConfiguration {
            chapter: None,
            ..QuizConfiguration::practice(Mode::Normal, Chapter(1))
        };

        let result = engine.start(config, &exam_pool(), &normal_settings(), &mut rng);

        assert!(result.is_err());
        assert_eq!(engine.state(), EngineState::Uninitialized);
        assert!(engine.session().is_none());
    }

    #[test]
    fn verdict_uses_unrounded_score() {
        let pool: Vec<Question> = (1..=44).map(|id| sample_question(id, 1, "A")).collect();
        let settings = ModeSettings {
            question_bank: String::new(),
            questions_per_chapter: 44,
            total_questions: 44,
        };
        let mut engine = QuizEngine::with_clock(MemoryProgressStore::new(), ticking_clock);
        let mut rng = StdRng::seed_from_u64(44);
        engine
            .start(QuizConfiguration::exam(Mode::Professional), &pool, &settings, &mut rng)
            .unwrap();

        let mut completed = None;
        for index in 0..44 {
            completed = answer(&mut engine, if index < 35 { "A" } else { "B" });
        }

        let live = engine.session().unwrap().score();
        let entry = completed.unwrap();
        assert_eq!(entry.score, 80);
        assert!((entry.exact_score() - live).abs() < 1e-9);
        assert!(!passed(live, 80));
        assert!(!entry.passed(80));
        assert!(entry.passed(79));
    }

    #[test]
    fn starting_again_discards_previous_session_without_history() {
        let mut engine = exam_engine();
        answer(&mut engine, "A");
        let mut rng = StdRng::seed_from_u64(9);

        engine
            .start(
                QuizConfiguration::exam(Mode::Normal),
                &exam_pool(),
                &normal_settings(),
                &mut rng,
            )
            .unwrap();

        assert_eq!(engine.session().unwrap().position(), 0);
        assert!(engine.list_history().unwrap().is_empty());
    }

    #[test]
    fn clearing_chapter_progress_leaves_history_alone() {
        let mut engine = exam_engine();
        for _ in 0..20 {
            answer(&mut engine, "A");
        }
        progress_store::record_answered(&mut engine.store, Mode::Normal, Chapter(1), 3).unwrap();

        engine.clear_chapter_progress(Mode::Normal, Chapter(1)).unwrap();
        engine.clear_chapter_progress(Mode::Normal, Chapter(1)).unwrap();

        assert_eq!(engine.answered_count(Mode::Normal, Chapter(1)).unwrap(), 0);
        assert_eq!(engine.list_history().unwrap().len(), 1);

        engine.clear_history().unwrap();
        assert!(engine.list_history().unwrap().is_empty());
    }
}
