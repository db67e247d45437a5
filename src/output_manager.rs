use crate::{config, question_bank::Question, quiz_engine::HistoryEntry};
use std::{
    env, fs,
    path::{Path, PathBuf},
};

const REPORTS_DIR: &str = "reports";
const UNRECOGNISED_OPTION: &str = "(unrecognised option)";

#[derive(Debug)]
pub struct OutputManager {
    root: PathBuf,
}

#[derive(Debug)]
pub struct ReportArtifact {
    pub path: Option<PathBuf>,
    pub content: String,
    pub error: Option<String>,
}

impl Default for OutputManager {
    fn default() -> Self {
        Self::with_root(config::data_dir())
    }
}

impl OutputManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    /// Render a completed exam as markdown, writing it under `reports/` when `persist` is set.
    pub fn write_result_report(
        &self,
        entry: &HistoryEntry,
        pass_score: u32,
        persist: bool,
    ) -> ReportArtifact {
        let document = render_report(entry, pass_score);
        if !persist {
            return ReportArtifact {
                path: None,
                content: document,
                error: None,
            };
        }

        let mut error: Option<String> = None;
        let mut written_path = None;
        match self.output_directory() {
            Ok(mut dir) => {
                dir.push(REPORTS_DIR);
                if let Err(err) = fs::create_dir_all(&dir) {
                    error = Some(format!("{}: {}", dir.display(), err));
                } else {
                    let stem = format!(
                        "exam-{}-{}",
                        entry.mode.key(),
                        entry.timestamp.format("%Y%m%d-%H%M%S")
                    );
                    let path = unique_path(&dir, &stem);
                    match fs::write(&path, &document) {
                        Ok(_) => written_path = Some(path),
                        Err(err) => error = Some(format!("{}: {}", path.display(), err)),
                    }
                }
            }
            Err(err) => error = Some(err),
        }

        ReportArtifact {
            path: written_path,
            content: document,
            error,
        }
    }

    pub fn output_directory(&self) -> Result<PathBuf, String> {
        if self.root.is_absolute() {
            return Ok(self.root.clone());
        }

        match env::current_dir() {
            Ok(mut dir) => {
                dir.push(&self.root);
                Ok(dir)
            }
            Err(err) => Err(format!("failed to resolve current directory: {}", err)),
        }
    }
}

fn unique_path(dir: &Path, stem: &str) -> PathBuf {
    let mut path = dir.join(format!("{stem}.md"));
    let mut counter = 2;
    while path.exists() {
        path = dir.join(format!("{stem}-{counter}.md"));
        counter += 1;
    }
    path
}

pub(crate) fn describe_option(question: &Question, label: &str) -> String {
    format!(
        "{}: {}",
        label,
        question.option_text(label).unwrap_or(UNRECOGNISED_OPTION)
    )
}

fn render_report(entry: &HistoryEntry, pass_score: u32) -> String {
    let correct = entry.results.iter().filter(|result| result.is_correct).count();
    let verdict = if entry.passed(pass_score) {
        "Passed"
    } else {
        "Not passed"
    };

    let mut document = format!(
        "# {} mock exam - {}\n\n",
        entry.mode.label(),
        entry.timestamp.format("%Y-%m-%d %H:%M UTC")
    );
    document.push_str(&format!(
        "- Score: {} ({} / {} correct)\n- Result: {} (pass mark {})\n- Time: {} min {} s\n\n",
        entry.score,
        correct,
        entry.results.len(),
        verdict,
        pass_score,
        entry.duration / 60,
        entry.duration % 60
    ));

    let wrong: Vec<_> = entry
        .results
        .iter()
        .filter(|result| !result.is_correct)
        .collect();
    if wrong.is_empty() {
        document.push_str("_Every question was answered correctly._\n");
        return document;
    }

    document.push_str("## Questions to review\n\n");
    for result in wrong {
        document.push_str(&format!(
            "### {}\n\n{}\n\n- Your answer: {}\n- Correct answer: {}\n\n",
            result.question.chapter.title(),
            result.question.question,
            describe_option(&result.question, &result.selected),
            describe_option(&result.question, &result.question.answer)
        ));
    }
    document
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::question_bank::{Mode, sample_question};
    use crate::quiz_engine::AnswerRecord;
    use chrono::{TimeZone, Utc};
    use std::time::SystemTime;

    fn entry(selected: &[&str]) -> HistoryEntry {
        HistoryEntry {
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap(),
            score: 50,
            results: selected
                .iter()
                .enumerate()
                .map(|(index, label)| AnswerRecord {
                    question: sample_question(index as u32 + 1, 2, "A"),
                    selected: label.to_string(),
                    is_correct: *label == "A",
                })
                .collect(),
            mode: Mode::Professional,
            duration: 125,
        }
    }

    #[test]
    fn score_rounded_up_to_pass_mark_is_not_a_pass() {
        let labels: Vec<&str> = (0..44).map(|index| if index < 35 { "A" } else { "C" }).collect();
        let mut rounded = entry(&labels);
        rounded.score = 80;

        let artifact = OutputManager::with_root("unused").write_result_report(&rounded, 80, false);

        assert!(artifact.content.contains("Result: Not passed (pass mark 80)"));
        assert!(artifact.content.contains("Score: 80 (35 / 44 correct)"));
    }

    #[test]
    fn report_lists_only_wrong_answers() {
        let manager = OutputManager::with_root("unused");

        let artifact = manager.write_result_report(&entry(&["A", "C"]), 80, false);

        assert!(artifact.path.is_none());
        assert!(artifact.content.contains("Not passed"));
        assert!(artifact.content.contains("2 min 5 s"));
        assert!(artifact.content.contains("Your answer: C: Option C"));
        assert!(artifact.content.contains("Correct answer: A: Option A"));
        assert!(!artifact.content.contains("Question 1\n"));
    }

    #[test]
    fn report_is_written_to_unique_files() {
        let mut temp_dir = std::env::temp_dir();
        let unique = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        temp_dir.push(format!("groundschool-reports-{unique}"));
        let manager = OutputManager::with_root(&temp_dir);

        let first = manager.write_result_report(&entry(&["A"]), 50, true);
        let second = manager.write_result_report(&entry(&["A"]), 50, true);

        let first_path = first.path.unwrap();
        let second_path = second.path.unwrap();
        assert_ne!(first_path, second_path);
        assert!(first.content.contains("Every question was answered correctly"));
        assert_eq!(fs::read_to_string(&second_path).unwrap(), second.content);

        fs::remove_dir_all(&temp_dir).unwrap();
    }

    #[test]
    fn unknown_labels_are_described_as_unrecognised() {
        let question = sample_question(1, 1, "A");

        assert_eq!(describe_option(&question, "Z"), "Z: (unrecognised option)");
    }
}
