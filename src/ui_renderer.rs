use crate::view_managers::menu_manager::{HOME_OPTIONS, SESSION_OPTIONS};
use crate::{
    App, AppView, config,
    output_manager::describe_option,
    question_bank::{self, Question},
    quiz_engine::{AnswerRecord, EngineState, QuestionPhase, QuizSession, SessionType},
};
use chrono::Utc;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style, Stylize},
    text::Line,
    widgets::{Block, List, ListItem, ListState, Paragraph, Wrap},
};
use std::rc::Rc;

pub(crate) struct UiRenderer<'a> {
    app: &'a mut App,
}

impl<'a> UiRenderer<'a> {
    pub(crate) fn new(app: &'a mut App) -> Self {
        Self { app }
    }

    pub(crate) fn render(&mut self, frame: &mut Frame) {
        match self.app.view {
            AppView::Home => self.render_home(frame),
            AppView::SessionType => self.render_session_type(frame),
            AppView::Chapters => self.render_chapters(frame),
            AppView::Quiz => self.render_quiz(frame),
            AppView::Summary => self.render_summary(frame),
            AppView::History => self.render_history(frame),
            AppView::Config => self.render_config(frame),
        }
    }

    fn render_home(&mut self, frame: &mut Frame) {
        let app = &*self.app;
        let layout = Self::layout(frame.area());
        Self::render_header(
            frame,
            layout[0],
            "Ground School",
            format!("Exam records: {}", app.history.len()),
        );

        let items: Vec<ListItem> = HOME_OPTIONS.iter().map(|label| ListItem::new(*label)).collect();
        Self::render_menu_list(frame, layout[1], items, "Menu", app.menu_index);

        Self::render_status(
            frame,
            layout[2],
            app,
            &[
                "Use ↑/↓ or j/k to choose. Press Enter or 1-5 to select.",
                "Press h for history, c to configure. Esc, Ctrl-C, or q to quit.",
            ],
        );
    }

    fn render_session_type(&mut self, frame: &mut Frame) {
        let app = &*self.app;
        let layout = Self::layout(frame.area());
        let mode_label = app.mode.map(|mode| mode.label()).unwrap_or("-");
        let settings = app.mode.map(config::mode_settings);
        let header = match settings {
            Some(settings) => format!(
                "Mock exams draw up to {} question(s) per chapter, {} in total.",
                settings.questions_per_chapter, settings.total_questions
            ),
            None => String::new(),
        };
        Self::render_header(frame, layout[0], mode_label, header);

        let items: Vec<ListItem> = SESSION_OPTIONS
            .iter()
            .map(|label| ListItem::new(*label))
            .collect();
        Self::render_menu_list(frame, layout[1], items, "Session", app.menu_index);

        Self::render_status(
            frame,
            layout[2],
            app,
            &["Press Enter, 1, or 2 to start. Press m for the main menu."],
        );
    }

    fn render_chapters(&mut self, frame: &mut Frame) {
        let app = &*self.app;
        let layout = Self::layout(frame.area());
        let mode_label = app.mode.map(|mode| mode.label()).unwrap_or("-");
        Self::render_header(
            frame,
            layout[0],
            &format!("{} • Chapter practice", mode_label),
            "Questions you have answered are skipped until the chapter is reset.".to_string(),
        );

        let items: Vec<ListItem> = app
            .chapter_list()
            .into_iter()
            .map(|chapter| {
                let answered = app.answered_counts.get(&chapter).copied().unwrap_or(0);
                let progress = match app
                    .chapter_counts
                    .as_ref()
                    .and_then(|counts| counts.get(&chapter))
                {
                    Some(total) => format!("{}/{}", answered.min(*total), total),
                    None => format!("{}/?", answered),
                };
                ListItem::new(format!("{:<9} {}", progress, chapter.title()))
            })
            .collect();
        Self::render_menu_list(frame, layout[1], items, "Chapters", app.chapter_index);

        Self::render_status(
            frame,
            layout[2],
            app,
            &["Enter to practise, x to reset chapter progress, m to go back."],
        );
    }

    fn render_quiz(&mut self, frame: &mut Frame) {
        let app = &*self.app;
        let layout = Self::layout(frame.area());
        let Some(session) = app.engine.session() else {
            Self::render_header(frame, layout[0], "Quiz", "No session is running.".to_string());
            Self::render_status(frame, layout[2], app, &["Press m for the main menu."]);
            return;
        };

        let quiz_config = session.config();
        let title = match (quiz_config.session_type, quiz_config.chapter) {
            (SessionType::Practice, Some(chapter)) => {
                format!("{} • {}", quiz_config.mode.label(), chapter.title())
            }
            _ => format!("{} • Mock exam", quiz_config.mode.label()),
        };
        let mut progress = format!(
            "Question {}/{}   Score {:.1}",
            (session.position() + 1).min(session.total()),
            session.total(),
            session.score()
        );
        if quiz_config.session_type == SessionType::Exam {
            progress.push_str(&format!(
                "   Time {}",
                format_clock(session.elapsed_seconds(Utc::now()))
            ));
        }
        Self::render_header(frame, layout[0], &title, progress);

        let body = match session.current_question() {
            Some(question) => question_text(session, question, app.option_index),
            None => "All questions answered.".to_string(),
        };
        frame.render_widget(
            Paragraph::new(body)
                .wrap(Wrap { trim: false })
                .block(Block::bordered().title(Line::from("Question"))),
            layout[1],
        );

        let hint = match session.state() {
            EngineState::InProgress(QuestionPhase::AwaitingSelection) => {
                "Choose with ↑/↓, j/k, or a letter. Enter selects the highlighted option."
            }
            EngineState::InProgress(QuestionPhase::AwaitingConfirmation) => {
                "Press Enter to confirm, or choose another option."
            }
            EngineState::InProgress(QuestionPhase::Answered) => {
                "Press Enter or n for the next question."
            }
            EngineState::Uninitialized | EngineState::Completed => "",
        };
        Self::render_status(frame, layout[2], app, &[hint, "Press m to abandon the session."]);
    }

    fn render_summary(&mut self, frame: &mut Frame) {
        let app = &*self.app;
        let layout = Self::layout(frame.area());
        let pass_score = config::pass_score();

        let (title, header, body) = if let Some(entry) = &app.last_entry {
            let verdict = if entry.passed(pass_score) {
                "Passed"
            } else {
                "Not passed"
            };
            let correct = entry.results.iter().filter(|result| result.is_correct).count();
            let mut header = format!(
                "Score {} ({}/{} correct) • {} • Time {}",
                entry.score,
                correct,
                entry.results.len(),
                verdict,
                format_clock(entry.duration)
            );
            if let Some(path) = &app.report_path {
                header.push_str(&format!("\nReport: {}", path.display()));
            }
            (
                format!("{} mock exam", entry.mode.label()),
                header,
                review_text(entry.results.iter().filter(|result| !result.is_correct)),
            )
        } else if let Some(session) = app.engine.session() {
            let header = if session.total() == 0 {
                "Nothing left to answer here.".to_string()
            } else {
                format!(
                    "{}/{} correct this round",
                    session.correct_count(),
                    session.total()
                )
            };
            let title = match session.config().chapter {
                Some(chapter) => chapter.title(),
                None => "Session".to_string(),
            };
            (title, header, review_text(session.wrong_answers()))
        } else {
            (
                "Summary".to_string(),
                String::new(),
                "No session to summarise.".to_string(),
            )
        };

        Self::render_header(frame, layout[0], &title, header);
        frame.render_widget(
            Paragraph::new(body)
                .wrap(Wrap { trim: false })
                .block(Block::bordered().title(Line::from("Review"))),
            layout[1],
        );
        Self::render_status(
            frame,
            layout[2],
            app,
            &["Press r to go again, h for history, Enter or m for the main menu."],
        );
    }

    fn render_history(&mut self, frame: &mut Frame) {
        let app = &*self.app;
        let layout = Self::layout(frame.area());
        let pass_score = config::pass_score();
        Self::render_header(
            frame,
            layout[0],
            "Exam history",
            format!("{} record(s), pass mark {}", app.history.len(), pass_score),
        );

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(layout[1]);

        let items: Vec<ListItem> = if app.history.is_empty() {
            vec![ListItem::new("No exams recorded yet.")]
        } else {
            app.history
                .iter()
                .map(|entry| {
                    let verdict = if entry.passed(pass_score) {
                        "pass"
                    } else {
                        "fail"
                    };
                    ListItem::new(format!(
                        "{} | {:<12} | {:>3} {}",
                        entry.timestamp.format("%Y-%m-%d %H:%M"),
                        entry.mode.label(),
                        entry.score,
                        verdict
                    ))
                })
                .collect()
        };

        let mut list_state = ListState::default();
        list_state.select(app.selected_history);
        frame.render_stateful_widget(
            List::new(items)
                .block(Block::bordered().title(Line::from("Exams")))
                .highlight_symbol("▶ ")
                .highlight_style(Style::default().add_modifier(Modifier::REVERSED)),
            body[0],
            &mut list_state,
        );

        let detail = match app.selected_history.and_then(|index| app.history.get(index)) {
            Some(entry) => {
                let correct = entry.results.iter().filter(|result| result.is_correct).count();
                format!(
                    "score: {}\ncorrect: {}/{}\ntime: {}\n\n{}",
                    entry.score,
                    correct,
                    entry.results.len(),
                    format_clock(entry.duration),
                    review_text(entry.results.iter().filter(|result| !result.is_correct))
                )
            }
            None => "Select an exam to view its mistakes.".to_string(),
        };
        frame.render_widget(
            Paragraph::new(detail)
                .wrap(Wrap { trim: false })
                .block(Block::bordered().title(Line::from("Details"))),
            body[1],
        );

        Self::render_status(
            frame,
            layout[2],
            app,
            &["Use ↑/↓ or j/k to navigate. Press x to clear history, m for the main menu."],
        );
    }

    fn render_config(&mut self, frame: &mut Frame) {
        let app = &*self.app;
        let layout = Self::layout(frame.area());
        Self::render_header(
            frame,
            layout[0],
            "Configuration",
            format!("Config file: {}", config::config_file_path().display()),
        );

        let items: Vec<ListItem> = app
            .config_form
            .rows()
            .into_iter()
            .map(|(label, value)| ListItem::new(format!("{}: {}", label, value)))
            .collect();
        Self::render_menu_list(
            frame,
            layout[1],
            items,
            "Defaults",
            app.config_form.selected_index(),
        );

        let mut lines = vec![
            "↑/↓ or j/k choose field. ←/→ or h/l adjust value.".to_string(),
            "Press s to save, r to reset, m to return to the menu.".to_string(),
        ];
        if app.config_form.dirty {
            lines.push("Unsaved changes".to_string());
        }
        if let Some(config_status) = &app.config_form.status {
            lines.push(config_status.clone());
        }
        let hints: Vec<&str> = lines.iter().map(String::as_str).collect();
        Self::render_status(frame, layout[2], app, &hints);
    }

    fn layout(area: Rect) -> Rc<[Rect]> {
        Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4),
                Constraint::Min(6),
                Constraint::Length(5),
            ])
            .split(area)
    }

    fn render_header(frame: &mut Frame, area: Rect, title: &str, text: String) {
        let header_title = Line::from(title.to_string()).bold().blue().centered();
        frame.render_widget(
            Paragraph::new(text)
                .block(Block::bordered().title(header_title))
                .centered(),
            area,
        );
    }

    fn render_menu_list(
        frame: &mut Frame,
        area: Rect,
        items: Vec<ListItem>,
        title: &str,
        selected: usize,
    ) {
        let mut state = ListState::default();
        state.select(Some(selected));
        frame.render_stateful_widget(
            List::new(items)
                .block(Block::bordered().title(Line::from(title.to_string())))
                .highlight_symbol("▶ ")
                .highlight_style(Style::default().add_modifier(Modifier::REVERSED)),
            area,
            &mut state,
        );
    }

    fn render_status(frame: &mut Frame, area: Rect, app: &App, hints: &[&str]) {
        let mut status_lines = Vec::new();
        if let Some(error) = &app.error {
            status_lines.push(format!("Error: {}", error));
        }
        if let Some(status) = &app.status {
            status_lines.push(status.clone());
        }
        status_lines.extend(
            hints
                .iter()
                .filter(|hint| !hint.is_empty())
                .map(|hint| hint.to_string()),
        );

        frame.render_widget(
            Paragraph::new(status_lines.join("\n"))
                .wrap(Wrap { trim: true })
                .block(Block::bordered().title(Line::from("Status"))),
            area,
        );
    }
}

fn format_clock(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

fn question_text(session: &QuizSession, question: &Question, highlighted: usize) -> String {
    let answered = session.current_answer();
    let pending = session.pending_selection();

    let mut lines = vec![
        question.chapter.title(),
        String::new(),
        question.question.clone(),
        String::new(),
    ];
    for (index, option) in question.options.iter().enumerate() {
        let label = question_bank::option_label(index);
        let marker = match answered {
            Some(_) if label == question.answer => "[✓]",
            Some(record) if record.selected == label => "[✗]",
            Some(_) => "[ ]",
            None if pending == Some(label.as_str()) => "[•]",
            None => "[ ]",
        };
        let prefix = if answered.is_none() && index == highlighted {
            "▶"
        } else {
            " "
        };
        lines.push(format!("{} {} {}. {}", prefix, marker, label, option));
    }

    if let Some(record) = answered {
        lines.push(String::new());
        if record.is_correct {
            lines.push("Correct.".to_string());
        } else {
            lines.push(format!(
                "Incorrect. Correct answer: {}",
                describe_option(question, &question.answer)
            ));
        }
    }
    lines.join("\n")
}

fn review_text<'r>(wrong: impl Iterator<Item = &'r AnswerRecord>) -> String {
    let sections: Vec<String> = wrong
        .map(|result| {
            format!(
                "{}\n  Your answer: {}\n  Correct answer: {}",
                result.question.question,
                describe_option(&result.question, &result.selected),
                describe_option(&result.question, &result.question.answer)
            )
        })
        .collect();
    if sections.is_empty() {
        "No mistakes to review.".to_string()
    } else {
        sections.join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::question_bank::sample_question;

    #[test]
    fn clock_is_minutes_and_seconds() {
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(754), "12:34");
    }

    #[test]
    fn review_lists_both_answers() {
        let record = AnswerRecord {
            question: sample_question(4, 3, "B"),
            selected: "D".to_string(),
            is_correct: false,
        };

        let text = review_text(std::iter::once(&record));

        assert!(text.contains("Your answer: D: Option D"));
        assert!(text.contains("Correct answer: B: Option B"));
        assert_eq!(review_text(std::iter::empty()), "No mistakes to review.");
    }
}
