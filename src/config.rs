use color_eyre::eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};
use std::{
    env, fs, io,
    path::PathBuf,
    sync::{OnceLock, RwLock},
};

use crate::question_bank::{Mode, QuestionSource};

/// Per-mode question bank location and exam shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeSettings {
    pub question_bank: String,
    pub questions_per_chapter: usize,
    pub total_questions: usize,
}

impl ModeSettings {
    fn defaults_for(mode: Mode) -> Self {
        match mode {
            Mode::Normal => Self {
                question_bank: DEFAULT_NORMAL_BANK.to_string(),
                questions_per_chapter: 5,
                total_questions: 20,
            },
            Mode::Professional => Self {
                question_bank: DEFAULT_PROFESSIONAL_BANK.to_string(),
                questions_per_chapter: 10,
                total_questions: 40,
            },
        }
    }

    fn normalize(&mut self, mode: Mode) {
        let defaults = Self::defaults_for(mode);
        if self.question_bank.trim().is_empty() {
            self.question_bank = defaults.question_bank;
        }
        if self.questions_per_chapter == 0 {
            self.questions_per_chapter = defaults.questions_per_chapter;
        }
        if self.total_questions == 0 {
            self.total_questions = defaults.total_questions;
        }
    }
}

/// Globally accessible application configuration values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_normal_settings")]
    pub normal: ModeSettings,
    #[serde(default = "default_professional_settings")]
    pub professional: ModeSettings,
    #[serde(default = "default_pass_score_value")]
    pub pass_score: u32,
    #[serde(default = "default_data_dir_value")]
    pub data_dir: String,
    #[serde(default)]
    pub write_result_reports: bool,
}

impl AppConfig {
    fn normalize(&mut self) {
        self.normal.normalize(Mode::Normal);
        self.professional.normalize(Mode::Professional);
        if self.pass_score > 100 {
            self.pass_score = 100;
        }
        if self.data_dir.trim().is_empty() {
            self.data_dir = default_data_dir_value();
        }
    }

    pub fn mode_settings(&self, mode: Mode) -> &ModeSettings {
        match mode {
            Mode::Normal => &self.normal,
            Mode::Professional => &self.professional,
        }
    }

    fn mode_settings_mut(&mut self, mode: Mode) -> &mut ModeSettings {
        match mode {
            Mode::Normal => &mut self.normal,
            Mode::Professional => &mut self.professional,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            normal: default_normal_settings(),
            professional: default_professional_settings(),
            pass_score: DEFAULT_PASS_SCORE,
            data_dir: default_data_dir_value(),
            write_result_reports: false,
        }
    }
}

const DEFAULT_PASS_SCORE: u32 = 80;
const DEFAULT_NORMAL_BANK: &str = "data/questions-simple.json";
const DEFAULT_PROFESSIONAL_BANK: &str = "data/questions-pro.json";
const DEFAULT_DATA_DIR: &str = "output";
const NORMAL_BANK_ENV: &str = "GROUNDSCHOOL_NORMAL_BANK";
const PROFESSIONAL_BANK_ENV: &str = "GROUNDSCHOOL_PROFESSIONAL_BANK";

fn default_normal_settings() -> ModeSettings {
    ModeSettings::defaults_for(Mode::Normal)
}

fn default_professional_settings() -> ModeSettings {
    ModeSettings::defaults_for(Mode::Professional)
}

const fn default_pass_score_value() -> u32 {
    DEFAULT_PASS_SCORE
}

fn default_data_dir_value() -> String {
    DEFAULT_DATA_DIR.to_string()
}

const CONFIG_FILE_PATH: &str = "config/app_config.toml";

static APP_CONFIG: OnceLock<RwLock<AppConfig>> = OnceLock::new();

fn config_lock() -> &'static RwLock<AppConfig> {
    APP_CONFIG.get_or_init(|| RwLock::new(AppConfig::default()))
}

/// Attempt to load configuration from disk. If loading fails, the in-memory config will be reset to defaults
/// and the error will be returned for the caller to surface if desired.
pub fn initialize() -> Result<()> {
    match load_config_from_disk() {
        Ok(config) => {
            let lock = config_lock();
            *lock.write().expect("config lock poisoned") = config;
            Ok(())
        }
        Err(err) => {
            let lock = config_lock();
            *lock.write().expect("config lock poisoned") = AppConfig::default();
            Err(err)
        }
    }
}

/// Retrieve a clone of the current configuration.
pub fn current() -> AppConfig {
    config_lock().read().expect("config lock poisoned").clone()
}

/// Settings for `mode`, with the bank location overridden by the environment when set.
pub fn mode_settings(mode: Mode) -> ModeSettings {
    let mut settings = current().mode_settings(mode).clone();
    let variable = match mode {
        Mode::Normal => NORMAL_BANK_ENV,
        Mode::Professional => PROFESSIONAL_BANK_ENV,
    };
    if let Ok(location) = env::var(variable) {
        if !location.trim().is_empty() {
            settings.question_bank = location;
        }
    }
    settings
}

pub fn question_source(mode: Mode) -> QuestionSource {
    QuestionSource::parse(&mode_settings(mode).question_bank)
}

pub fn pass_score() -> u32 {
    config_lock().read().expect("config lock poisoned").pass_score
}

pub fn data_dir() -> String {
    config_lock()
        .read()
        .expect("config lock poisoned")
        .data_dir
        .clone()
}

/// Apply the provided mutation to the in-memory configuration and persist the result to disk.
pub fn update<F>(mutator: F) -> Result<AppConfig>
where
    F: FnOnce(&mut AppConfig),
{
    let lock = config_lock();
    let mut config = lock.write().expect("config lock poisoned");
    mutator(&mut config);
    config.normalize();
    save_config_to_disk(&config)?;
    Ok(config.clone())
}

/// Absolute path to the configuration file used for persistence.
pub fn config_file_path() -> PathBuf {
    PathBuf::from(CONFIG_FILE_PATH)
}

fn load_config_from_disk() -> Result<AppConfig> {
    let path = config_file_path();
    match fs::read_to_string(&path) {
        Ok(contents) => parse_config(&contents)
            .wrap_err_with(|| format!("failed to parse configuration at {}", path.display())),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(err) => Err(eyre!(format!(
            "failed to read configuration at {}: {}",
            path.display(),
            err
        ))),
    }
}

fn parse_config(contents: &str) -> Result<AppConfig> {
    let mut config: AppConfig = toml::from_str(contents)?;
    config.normalize();
    Ok(config)
}

fn save_config_to_disk(config: &AppConfig) -> Result<()> {
    let path = config_file_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).wrap_err_with(|| {
            format!(
                "failed to create configuration directory {}",
                parent.display()
            )
        })?;
    }
    let serialized =
        toml::to_string_pretty(config).wrap_err("failed to serialize configuration to TOML")?;
    fs::write(&path, serialized)
        .wrap_err_with(|| format!("failed to write configuration to {}", path.display()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigField {
    NormalPerChapter,
    NormalTotal,
    ProfessionalPerChapter,
    ProfessionalTotal,
    PassScore,
    ResultReports,
}

#[derive(Debug, Clone)]
pub struct ConfigForm {
    pub(crate) normal_per_chapter: usize,
    pub(crate) normal_total: usize,
    pub(crate) professional_per_chapter: usize,
    pub(crate) professional_total: usize,
    pub(crate) pass_score: u32,
    pub(crate) write_result_reports: bool,
    field: ConfigField,
    pub(crate) dirty: bool,
    pub(crate) status: Option<String>,
}

impl ConfigForm {
    pub(crate) fn from_config(config: AppConfig) -> Self {
        Self {
            normal_per_chapter: config.normal.questions_per_chapter,
            normal_total: config.normal.total_questions,
            professional_per_chapter: config.professional.questions_per_chapter,
            professional_total: config.professional.total_questions,
            pass_score: config.pass_score,
            write_result_reports: config.write_result_reports,
            field: ConfigField::NormalPerChapter,
            dirty: false,
            status: None,
        }
    }

    pub(crate) fn selected_index(&self) -> usize {
        self.field.index()
    }

    pub(crate) fn select_next(&mut self) {
        self.field = self.field.next();
    }

    pub(crate) fn select_previous(&mut self) {
        self.field = self.field.previous();
    }

    pub(crate) fn adjust_current(&mut self, delta: isize) {
        if delta == 0 {
            return;
        }

        if matches!(self.field, ConfigField::ResultReports) {
            self.write_result_reports = !self.write_result_reports;
            self.dirty = true;
            self.status = None;
            return;
        }

        if matches!(self.field, ConfigField::PassScore) {
            let updated = (self.pass_score as isize + delta).clamp(1, 100) as u32;
            if updated != self.pass_score {
                self.pass_score = updated;
                self.dirty = true;
                self.status = None;
            }
            return;
        }

        let value = match self.field {
            ConfigField::NormalPerChapter => &mut self.normal_per_chapter,
            ConfigField::NormalTotal => &mut self.normal_total,
            ConfigField::ProfessionalPerChapter => &mut self.professional_per_chapter,
            ConfigField::ProfessionalTotal => &mut self.professional_total,
            ConfigField::PassScore | ConfigField::ResultReports => {
                unreachable!()
            }
        };

        let updated = (*value as isize + delta).max(1) as usize;
        if updated != *value {
            *value = updated;
            self.dirty = true;
            self.status = None;
        }
    }

    /// Copy the edited values onto `config`.
    pub(crate) fn apply_to(&self, config: &mut AppConfig) {
        let normal = config.mode_settings_mut(Mode::Normal);
        normal.questions_per_chapter = self.normal_per_chapter;
        normal.total_questions = self.normal_total;
        let professional = config.mode_settings_mut(Mode::Professional);
        professional.questions_per_chapter = self.professional_per_chapter;
        professional.total_questions = self.professional_total;
        config.pass_score = self.pass_score;
        config.write_result_reports = self.write_result_reports;
    }

    pub(crate) fn apply_saved(&mut self, config: AppConfig) {
        let field = self.field;
        *self = Self::from_config(config);
        self.field = field;
    }

    pub(crate) fn set_status<S: Into<String>>(&mut self, status: S) {
        self.status = Some(status.into());
    }

    /// Label and display value for every field, in form order.
    pub(crate) fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            (
                "General: questions per chapter",
                self.normal_per_chapter.to_string(),
            ),
            ("General: exam length", self.normal_total.to_string()),
            (
                "Professional: questions per chapter",
                self.professional_per_chapter.to_string(),
            ),
            ("Professional: exam length", self.professional_total.to_string()),
            ("Pass score", self.pass_score.to_string()),
            (
                "Write result reports",
                if self.write_result_reports { "on" } else { "off" }.to_string(),
            ),
        ]
    }
}

impl ConfigField {
    fn index(self) -> usize {
        match self {
            Self::NormalPerChapter => 0,
            Self::NormalTotal => 1,
            Self::ProfessionalPerChapter => 2,
            Self::ProfessionalTotal => 3,
            Self::PassScore => 4,
            Self::ResultReports => 5,
        }
    }

    fn next(self) -> Self {
        match self {
            Self::NormalPerChapter => Self::NormalTotal,
            Self::NormalTotal => Self::ProfessionalPerChapter,
            Self::ProfessionalPerChapter => Self::ProfessionalTotal,
            Self::ProfessionalTotal => Self::PassScore,
            Self::PassScore => Self::ResultReports,
            Self::ResultReports => Self::NormalPerChapter,
        }
    }

    fn previous(self) -> Self {
        match self {
            Self::NormalPerChapter => Self::ResultReports,
            Self::NormalTotal => Self::NormalPerChapter,
            Self::ProfessionalPerChapter => Self::NormalTotal,
            Self::ProfessionalTotal => Self::ProfessionalPerChapter,
            Self::PassScore => Self::ProfessionalTotal,
            Self::ResultReports => Self::PassScore,
        }
    }
}
