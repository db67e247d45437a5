use crate::output_manager::OutputManager;
use chrono::{DateTime, SecondsFormat, Utc};
use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};

const LOG_FILENAME: &str = "groundschool-debug.log";

/// Append `[timestamp] [component] message` to the debug log under the data directory.
/// Failures go to stderr and never interrupt the caller.
pub fn log_debug(component: &str, message: &str) {
    let result = resolve_log_path(&OutputManager::new())
        .and_then(|path| append_line(&path, Utc::now(), component, message));
    if let Err(err) = result {
        eprintln!("[groundschool::log_util] failed to write debug log: {}", err);
    }
}

fn append_line(path: &Path, at: DateTime<Utc>, component: &str, message: &str) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", format_line(at, component, message))
}

fn format_line(at: DateTime<Utc>, component: &str, message: &str) -> String {
    // Continuation lines stay attached to their entry.
    let body = message.trim_end().replace('\n', "\n    ");
    format!(
        "[{}] [{}] {}",
        at.to_rfc3339_opts(SecondsFormat::Millis, true),
        component,
        body
    )
}

fn resolve_log_path(manager: &OutputManager) -> io::Result<PathBuf> {
    let dir = manager.output_directory().map_err(io::Error::other)?;
    fs::create_dir_all(&dir)?;
    Ok(dir.join(LOG_FILENAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::SystemTime;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 3, 7, 5, 9).unwrap()
    }

    #[test]
    fn lines_carry_timestamp_and_component() {
        assert_eq!(
            format_line(at(), "QuizEngine", "session reset"),
            "[2024-06-03T07:05:09.000Z] [QuizEngine] session reset"
        );
    }

    #[test]
    fn multiline_messages_are_indented() {
        assert_eq!(
            format_line(at(), "QuestionBank", "failed\ncaused by: missing\n"),
            "[2024-06-03T07:05:09.000Z] [QuestionBank] failed\n    caused by: missing"
        );
    }

    #[test]
    fn lines_are_appended_under_the_data_directory() {
        let mut temp_dir = std::env::temp_dir();
        let unique = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        temp_dir.push(format!("groundschool-log-{unique}"));
        let path = resolve_log_path(&OutputManager::with_root(&temp_dir)).unwrap();

        append_line(&path, at(), "App", "first").unwrap();
        append_line(&path, at(), "ProgressStore", "second").unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(path.ends_with(LOG_FILENAME));
        assert_eq!(contents.lines().count(), 2);
        assert!(contents.lines().nth(1).unwrap().contains("[ProgressStore] second"));

        fs::remove_dir_all(&temp_dir).unwrap();
    }
}
