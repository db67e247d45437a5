mod config;
mod log_util;
mod output_manager;
mod progress_store;
mod question_bank;
mod quiz_engine;
mod selection;
mod ui_renderer;
mod view_managers;

use color_eyre::Result;
use config::ConfigForm;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use dotenvy::dotenv;
use log_util::log_debug;
use progress_store::{MemoryProgressStore, ProgressStore, SqliteProgressStore};
use question_bank::{Chapter, Mode, Question};
use quiz_engine::{HistoryEntry, QuizEngine};
use ratatui::{DefaultTerminal, Frame};
use std::{
    collections::BTreeMap,
    path::PathBuf,
    sync::mpsc::{self, Receiver, TryRecvError},
    thread,
    time::Duration,
};
use tokio::runtime::Runtime;
use ui_renderer::UiRenderer;
use view_managers::{
    ChapterManager, ConfigManager, HistoryManager, MenuManager, QuizManager,
};

pub(crate) const LOADING_FRAMES: [&str; 4] = ["-", "\\", "|", "/"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AppView {
    Home,
    SessionType,
    Chapters,
    Quiz,
    Summary,
    History,
    Config,
}

/// What a background bank load is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BankRequest {
    Exam,
    Practice(Chapter),
    ChapterCounts,
}

#[derive(Debug)]
enum BankTaskMessage {
    Loaded {
        mode: Mode,
        request: BankRequest,
        questions: Vec<Question>,
    },
    Error {
        request: BankRequest,
        message: String,
    },
}

fn main() -> color_eyre::Result<()> {
    dotenv().ok();
    color_eyre::install()?;
    let terminal = ratatui::init();
    let result = App::new().run(terminal);
    ratatui::restore();
    result
}

/// The main application which holds the state and logic of the application.
#[derive(Debug)]
pub struct App {
    /// Is the application running?
    pub(crate) running: bool,
    /// Current view being displayed.
    pub(crate) view: AppView,
    /// Highlighted entry in the home and session-type menus.
    pub(crate) menu_index: usize,
    /// Question pool picked on the home screen.
    pub(crate) mode: Option<Mode>,
    /// Total questions per chapter for the active mode, once loaded.
    pub(crate) chapter_counts: Option<BTreeMap<Chapter, usize>>,
    /// Practice progress per chapter for the active mode.
    pub(crate) answered_counts: BTreeMap<Chapter, usize>,
    /// Highlighted chapter in the chapter list.
    pub(crate) chapter_index: usize,
    /// Session state machine and its progress store.
    pub(crate) engine: QuizEngine<Box<dyn ProgressStore>>,
    /// Highlighted option of the current question.
    pub(crate) option_index: usize,
    /// History entry produced by the most recently completed exam.
    pub(crate) last_entry: Option<HistoryEntry>,
    /// Markdown report written for the last exam, if enabled.
    pub(crate) report_path: Option<PathBuf>,
    /// Exam history, newest first.
    pub(crate) history: Vec<HistoryEntry>,
    /// Currently selected history entry.
    pub(crate) selected_history: Option<usize>,
    /// Any error encountered while loading banks or touching the store.
    pub(crate) error: Option<String>,
    /// Latest status line.
    pub(crate) status: Option<String>,
    /// Indicates whether a bank load is running.
    pub(crate) loading: bool,
    /// Spinner frame index for the active loading indicator.
    pub(crate) loading_frame: usize,
    /// A bank request arrived while another load was running and was dropped.
    pub(crate) ignored_request: bool,
    /// The running bank load and the channel its result arrives on.
    bank_task: Option<(BankRequest, Receiver<BankTaskMessage>)>,
    /// Holds the editable configuration state when rendering the config view.
    pub(crate) config_form: ConfigForm,
}

impl App {
    /// Construct a new instance of [`App`].
    pub fn new() -> Self {
        let mut aggregated_error: Option<String> = None;

        if let Err(err) = config::initialize() {
            Self::push_error(
                &mut aggregated_error,
                format!("Configuration load failed: {}", err),
            );
        }

        let store: Box<dyn ProgressStore> = match SqliteProgressStore::open_default() {
            Ok(store) => {
                log_debug(
                    "App",
                    &format!("opened progress store at {}", store.path().display()),
                );
                Box::new(store)
            }
            Err(err) => {
                Self::push_error(
                    &mut aggregated_error,
                    format!("Progress will not be saved: {}", err),
                );
                Box::new(MemoryProgressStore::new())
            }
        };

        Self::with_engine(QuizEngine::new(store), aggregated_error)
    }

    pub(crate) fn with_engine(
        engine: QuizEngine<Box<dyn ProgressStore>>,
        error: Option<String>,
    ) -> Self {
        let mut app = Self {
            running: false,
            view: AppView::Home,
            menu_index: 0,
            mode: None,
            chapter_counts: None,
            answered_counts: BTreeMap::new(),
            chapter_index: 0,
            engine,
            option_index: 0,
            last_entry: None,
            report_path: None,
            history: Vec::new(),
            selected_history: None,
            error,
            status: None,
            loading: false,
            loading_frame: 0,
            ignored_request: false,
            bank_task: None,
            config_form: ConfigForm::from_config(config::current()),
        };
        app.refresh_history();
        app
    }

    /// Run the application's main loop.
    pub fn run(mut self, mut terminal: DefaultTerminal) -> Result<()> {
        self.running = true;
        let tick_rate = Duration::from_millis(120);
        while self.running {
            self.poll_bank_messages();
            terminal.draw(|frame| self.render(frame))?;
            self.handle_crossterm_events(tick_rate)?;
        }
        Ok(())
    }

    /// Dispatch rendering based on the active view.
    fn render(&mut self, frame: &mut Frame) {
        UiRenderer::new(self).render(frame);
    }

    /// Reads the crossterm events and updates the state of [`App`].
    fn handle_crossterm_events(&mut self, tick_rate: Duration) -> Result<()> {
        if event::poll(tick_rate)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => self.on_key_event(key),
                Event::Mouse(_) => {}
                Event::Resize(_, _) => {}
                _ => {}
            }
            self.poll_bank_messages();
        } else {
            self.on_tick();
        }
        Ok(())
    }

    fn on_tick(&mut self) {
        if self.loading {
            self.loading_frame = (self.loading_frame + 1) % LOADING_FRAMES.len();
            self.update_loading_status();
        }
        self.poll_bank_messages();
    }

    /// Handles the key events and updates the state of [`App`].
    fn on_key_event(&mut self, key: KeyEvent) {
        match (key.modifiers, key.code) {
            (_, KeyCode::Esc | KeyCode::Char('q'))
            | (KeyModifiers::CONTROL, KeyCode::Char('c') | KeyCode::Char('C')) => self.quit(),
            _ => match self.view {
                AppView::Home => MenuManager::new(self).handle_home_key(key),
                AppView::SessionType => MenuManager::new(self).handle_session_type_key(key),
                AppView::Chapters => ChapterManager::new(self).handle_key(key),
                AppView::Quiz => QuizManager::new(self).handle_key(key),
                AppView::Summary => QuizManager::new(self).handle_summary_key(key),
                AppView::History => HistoryManager::new(self).handle_key(key),
                AppView::Config => ConfigManager::new(self).handle_key(key),
            },
        }
    }

    /// Fetch the active mode's bank on a background thread.
    pub(crate) fn request_bank(&mut self, request: BankRequest) {
        if self.loading {
            log_debug("App", "bank load already in progress; ignoring duplicate request");
            self.ignored_request = true;
            self.update_loading_status();
            return;
        }
        let Some(mode) = self.mode else {
            Self::push_error(
                &mut self.error,
                "Choose general or professional subjects first.".to_string(),
            );
            return;
        };

        let source = config::question_source(mode);
        let (sender, receiver) = mpsc::channel();
        self.bank_task = Some((request, receiver));
        self.loading = true;
        self.loading_frame = 0;
        self.update_loading_status();
        log_debug("App", &format!("requesting {:?} from {}", request, source));

        thread::spawn(move || {
            let runtime = match Runtime::new() {
                Ok(runtime) => runtime,
                Err(err) => {
                    let _ = sender.send(BankTaskMessage::Error {
                        request,
                        message: format!("Failed to build Tokio runtime: {}", err),
                    });
                    return;
                }
            };

            let result = runtime.block_on(question_bank::fetch_questions(&source));
            drop(runtime);

            let message = match result {
                Ok(questions) => BankTaskMessage::Loaded {
                    mode,
                    request,
                    questions,
                },
                Err(err) => BankTaskMessage::Error {
                    request,
                    message: format!("{:#}", err),
                },
            };
            let _ = sender.send(message);
        });
    }

    fn poll_bank_messages(&mut self) {
        let mut clear_receiver = false;
        if let Some((pending, receiver)) = self.bank_task.as_ref() {
            let pending = *pending;
            match receiver.try_recv() {
                Ok(message) => {
                    self.loading = false;
                    self.ignored_request = false;
                    clear_receiver = true;
                    match message {
                        BankTaskMessage::Loaded {
                            mode,
                            request,
                            questions,
                        } => self.handle_bank_loaded(mode, request, questions),
                        BankTaskMessage::Error { request, message } => {
                            self.handle_bank_error(request, message)
                        }
                    }
                }
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => {
                    self.loading = false;
                    self.ignored_request = false;
                    clear_receiver = true;
                    self.handle_bank_error(pending, "Background loader disconnected".to_string());
                }
            }
        }

        if clear_receiver {
            self.bank_task = None;
        }
    }

    fn update_loading_status(&mut self) {
        if self.loading {
            let frame = LOADING_FRAMES[self.loading_frame % LOADING_FRAMES.len()];
            let mut status = format!("{} Loading question bank…", frame);
            if self.ignored_request {
                status.push_str(" Still loading the previous request; try again once it finishes.");
            }
            self.status = Some(status);
        }
    }

    fn handle_bank_loaded(&mut self, mode: Mode, request: BankRequest, questions: Vec<Question>) {
        if self.mode != Some(mode) {
            log_debug("App", &format!("discarding {} bank load after mode change", mode));
            self.status = None;
            return;
        }

        match request {
            BankRequest::ChapterCounts => {
                self.chapter_counts = Some(question_bank::count_questions_by_chapter(&questions));
                self.refresh_answered_counts();
                self.status = Some(format!("Loaded {} question(s).", questions.len()));
            }
            BankRequest::Exam | BankRequest::Practice(_) => {
                QuizManager::new(self).start_session(mode, request, &questions)
            }
        }
    }

    fn handle_bank_error(&mut self, request: BankRequest, message: String) {
        let trimmed = message.trim().to_string();
        Self::push_error(
            &mut self.error,
            format!("Failed to load question bank: {}", trimmed),
        );
        log_debug("App", &format!("{:?} bank load failed: {}", request, trimmed));
        if request != BankRequest::ChapterCounts {
            self.engine.reset();
        }
        self.status = Some("Question bank unavailable. Pick the mode again to retry.".to_string());
    }

    pub(crate) fn refresh_answered_counts(&mut self) {
        let Some(mode) = self.mode else {
            self.answered_counts.clear();
            return;
        };
        let chapters: Vec<Chapter> = self.chapter_list();
        let mut counts = BTreeMap::new();
        for chapter in chapters {
            match self.engine.answered_count(mode, chapter) {
                Ok(count) => {
                    counts.insert(chapter, count);
                }
                Err(err) => {
                    counts.insert(chapter, 0);
                    log_debug("App", &format!(
                        "failed to read progress for chapter {}: {}",
                        chapter, err
                    ));
                }
            }
        }
        self.answered_counts = counts;
    }

    pub(crate) fn refresh_history(&mut self) {
        match self.engine.list_history() {
            Ok(history) => {
                self.history = history;
            }
            Err(err) => {
                self.history = Vec::new();
                Self::push_error(&mut self.error, format!("Failed to read history: {}", err));
            }
        }
        self.selected_history = if self.history.is_empty() {
            None
        } else {
            Some(
                self.selected_history
                    .unwrap_or(0)
                    .min(self.history.len() - 1),
            )
        };
    }

    /// Chapters shown in the practice list, in order.
    pub(crate) fn chapter_list(&self) -> Vec<Chapter> {
        match &self.chapter_counts {
            Some(counts) => counts.keys().copied().collect(),
            None => question_bank::KNOWN_CHAPTERS.to_vec(),
        }
    }

    /// Abandon any session and go back to the mode choice.
    pub(crate) fn reset_to_home(&mut self) {
        self.engine.apply(quiz_engine::Intent::Reset).ok();
        self.mode = None;
        self.chapter_counts = None;
        self.answered_counts.clear();
        self.option_index = 0;
        self.menu_index = 0;
        self.status = None;
        self.view = AppView::Home;
    }

    pub(crate) fn return_to_menu(&mut self) {
        if matches!(self.view, AppView::Config) {
            self.config_form = ConfigForm::from_config(config::current());
        }
        self.menu_index = 0;
        self.view = AppView::Home;
    }

    /// Set running to false to quit the application.
    fn quit(&mut self) {
        self.running = false;
    }

    /// Append a message to an optional error slot.
    pub(crate) fn push_error(slot: &mut Option<String>, message: String) {
        if let Some(existing) = slot {
            existing.push_str(" | ");
            existing.push_str(&message);
        } else {
            *slot = Some(message);
        }
    }
}
