use std::{collections::BTreeMap, fmt, path::PathBuf};

use color_eyre::eyre::{Context, Result, eyre};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::log_util::log_debug;

/// Chapters every bank is expected to cover, in display order.
pub const KNOWN_CHAPTERS: [Chapter; 4] = [Chapter(1), Chapter(2), Chapter(3), Chapter(4)];

/// Which question pool is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Normal,
    Professional,
}

impl Mode {
    pub fn key(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Professional => "professional",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Normal => "General subjects",
            Self::Professional => "Professional subjects",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Chapter(pub u8);

impl Chapter {
    pub fn title(self) -> String {
        match self.0 {
            1 => "Chapter 1 - Civil aviation law and regulations".to_string(),
            2 => "Chapter 2 - Principles of flight".to_string(),
            3 => "Chapter 3 - Meteorology".to_string(),
            4 => "Chapter 4 - Emergency procedures and flight decisions".to_string(),
            other => format!("Chapter {}", other),
        }
    }
}

impl fmt::Display for Chapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single multiple-choice question as stored in the bank files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: u32,
    pub chapter: Chapter,
    pub question: String,
    pub options: Vec<String>,
    pub answer: String,
}

impl Question {
    /// Option text for a label such as `"B"`, if the label names one of the options.
    pub fn option_text(&self, label: &str) -> Option<&str> {
        label_index(label)
            .and_then(|index| self.options.get(index))
            .map(String::as_str)
    }

    pub fn is_well_formed(&self) -> bool {
        self.option_text(&self.answer).is_some()
    }
}

/// Label for the option at `index`: 0 is `A`, 1 is `B`, and so on.
pub fn option_label(index: usize) -> String {
    ((b'A' + (index % 26) as u8) as char).to_string()
}

pub fn label_index(label: &str) -> Option<usize> {
    let mut chars = label.chars();
    let first = chars.next()?;
    if chars.next().is_some() || !first.is_ascii_uppercase() {
        return None;
    }
    Some((first as u8 - b'A') as usize)
}

/// Parse a bank file. Questions whose answer does not name one of their options are skipped.
pub fn parse_questions(contents: &str) -> Result<Vec<Question>> {
    let parsed: Vec<Question> =
        serde_json::from_str(contents).wrap_err("failed to parse question bank JSON")?;
    let total = parsed.len();
    let questions: Vec<Question> = parsed
        .into_iter()
        .filter(|question| {
            let ok = question.is_well_formed();
            if !ok {
                log_debug("QuestionBank", &format!(
                    "skipping question {} with answer '{}' outside its {} option(s)",
                    question.id,
                    question.answer,
                    question.options.len()
                ));
            }
            ok
        })
        .collect();
    if questions.len() != total {
        log_debug("QuestionBank", &format!(
            "kept {} of {} question(s)",
            questions.len(),
            total
        ));
    }
    Ok(questions)
}

/// Where a bank is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionSource {
    File(PathBuf),
    Url(String),
}

impl QuestionSource {
    pub fn parse(location: &str) -> Self {
        let trimmed = location.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            Self::Url(trimmed.to_string())
        } else {
            Self::File(PathBuf::from(trimmed))
        }
    }
}

impl fmt::Display for QuestionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Url(url) => f.write_str(url),
        }
    }
}

/// Fetch a whole bank in one shot.
pub async fn fetch_questions(source: &QuestionSource) -> Result<Vec<Question>> {
    log_debug("QuestionBank", &format!("fetching {}", source));
    let contents = match source {
        QuestionSource::File(path) => tokio::fs::read_to_string(path)
            .await
            .wrap_err_with(|| format!("failed to read question bank at {}", path.display()))?,
        QuestionSource::Url(url) => {
            let response = Client::new()
                .get(url)
                .send()
                .await
                .wrap_err_with(|| format!("failed to request question bank from {}", url))?;
            let status = response.status();
            if !status.is_success() {
                return Err(eyre!("question bank request to {} returned {}", url, status));
            }
            response
                .text()
                .await
                .wrap_err_with(|| format!("failed to read question bank body from {}", url))?
        }
    };
    let questions = parse_questions(&contents)
        .wrap_err_with(|| format!("question bank at {} is not valid", source))?;
    log_debug("QuestionBank", &format!(
        "loaded {} question(s) from {}",
        questions.len(),
        source
    ));
    Ok(questions)
}

/// Total questions per chapter. Known chapters are always present.
pub fn count_questions_by_chapter(pool: &[Question]) -> BTreeMap<Chapter, usize> {
    let mut counts: BTreeMap<Chapter, usize> =
        KNOWN_CHAPTERS.iter().map(|chapter| (*chapter, 0)).collect();
    for question in pool {
        *counts.entry(question.chapter).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
pub(crate) fn sample_question(id: u32, chapter: u8, answer: &str) -> Question {
    Question {
        id,
        chapter: Chapter(chapter),
        question: format!("Question {id}"),
        options: vec![
            "Option A".to_string(),
            "Option B".to_string(),
            "Option C".to_string(),
            "Option D".to_string(),
        ],
        answer: answer.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{fs, time::SystemTime};

    const BANK: &str = r#"[
        {"id": 1, "chapter": 1, "question": "Who controls the tower?", "options": ["Pilot", "Operator", "Tower"], "answer": "C"},
        {"id": 2, "chapter": 3, "question": "Fog forms when?", "options": ["Warm", "Saturated"], "answer": "B"},
        {"id": 3, "chapter": 2, "question": "Broken?", "options": ["Only"], "answer": "D"}
    ]"#;

    #[test]
    fn labels_follow_alphabetic_positions() {
        assert_eq!(option_label(0), "A");
        assert_eq!(option_label(3), "D");
        assert_eq!(label_index("A"), Some(0));
        assert_eq!(label_index("F"), Some(5));
        assert_eq!(label_index("a"), None);
        assert_eq!(label_index("AB"), None);
        assert_eq!(label_index(""), None);
    }

    #[test]
    fn parse_questions_drops_answers_outside_options() {
        let questions = parse_questions(BANK).unwrap();

        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].id, 1);
        assert_eq!(questions[0].option_text("C"), Some("Tower"));
        assert_eq!(questions[1].chapter, Chapter(3));
    }

    #[test]
    fn parse_questions_rejects_invalid_json() {
        assert!(parse_questions("{not json").is_err());
    }

    #[test]
    fn count_questions_by_chapter_keeps_empty_known_chapters() {
        let pool = vec![
            sample_question(1, 1, "A"),
            sample_question(2, 1, "B"),
            sample_question(3, 3, "C"),
            sample_question(4, 7, "D"),
        ];

        let counts = count_questions_by_chapter(&pool);

        assert_eq!(counts.get(&Chapter(1)), Some(&2));
        assert_eq!(counts.get(&Chapter(2)), Some(&0));
        assert_eq!(counts.get(&Chapter(3)), Some(&1));
        assert_eq!(counts.get(&Chapter(4)), Some(&0));
        assert_eq!(counts.get(&Chapter(7)), Some(&1));
    }

    #[test]
    fn question_source_detects_urls() {
        assert_eq!(
            QuestionSource::parse("https://example.org/questions-pro.json"),
            QuestionSource::Url("https://example.org/questions-pro.json".to_string())
        );
        assert_eq!(
            QuestionSource::parse(" data/questions-simple.json "),
            QuestionSource::File(PathBuf::from("data/questions-simple.json"))
        );
    }

    #[tokio::test]
    async fn fetch_questions_reads_local_bank() {
        let mut temp_dir = std::env::temp_dir();
        let unique = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        temp_dir.push(format!("groundschool-bank-{unique}"));
        fs::create_dir_all(&temp_dir).unwrap();
        let path = temp_dir.join("bank.json");
        fs::write(&path, BANK).unwrap();

        let questions = fetch_questions(&QuestionSource::File(path)).await.unwrap();
        assert_eq!(questions.len(), 2);

        let missing = fetch_questions(&QuestionSource::File(temp_dir.join("missing.json"))).await;
        assert!(missing.is_err());

        fs::remove_dir_all(&temp_dir).unwrap();
    }

    #[test]
    fn bundled_banks_cover_every_chapter() {
        for contents in [
            include_str!("../data/questions-simple.json"),
            include_str!("../data/questions-pro.json"),
        ] {
            let raw: Vec<Question> = serde_json::from_str(contents).unwrap();
            let questions = parse_questions(contents).unwrap();
            assert_eq!(questions.len(), raw.len());
            let counts = count_questions_by_chapter(&questions);
            assert!(KNOWN_CHAPTERS.iter().all(|chapter| counts[chapter] > 0));
        }
    }
}
