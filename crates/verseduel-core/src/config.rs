use std::{
    env, fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::error::VerseDuelError;

const DEFAULT_CONFIG_PATH: &str = "config.toml";
const CONFIG_PATH_ENV: &str = "VERSEDUEL_CONFIG";

/// Top-level configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub rubric: RubricConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Helper to load configuration with guard rails.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a provided path or discoverable defaults.
    ///
    /// Resolution order:
    /// 1. Explicit `path` argument.
    /// 2. `VERSEDUEL_CONFIG` environment variable.
    /// 3. `config.toml` in the current working directory.
    /// 4. Built-in defaults when none of the above exists. A path that was
    ///    named explicitly (argument or environment) must exist.
    pub fn load(path: Option<PathBuf>) -> Result<Config, VerseDuelError> {
        let (candidate, explicit) = resolve_path(path);
        let raw = match fs::read_to_string(&candidate) {
            Ok(raw) => raw,
            Err(err) if !explicit && err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %candidate.display(), "no config file, using defaults");
                let config = Config::default();
                Self::validate(&config)?;
                return Ok(config);
            }
            Err(err) => return Err(VerseDuelError::config_io(candidate, err)),
        };
        let config: Config = toml::from_str(&raw)
            .map_err(|err| VerseDuelError::InvalidConfiguration(err.to_string()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    fn validate(config: &Config) -> Result<(), VerseDuelError> {
        let rubric_total = config.rubric.total();
        if rubric_total != 100 {
            return Err(VerseDuelError::InvalidConfiguration(format!(
                "rubric weights must sum to 100, got {rubric_total}"
            )));
        }
        if config.session.turn_timeout_ms == 0 || config.session.scoring_timeout_ms == 0 {
            return Err(VerseDuelError::InvalidConfiguration(
                "session timeouts must be positive".into(),
            ));
        }
        if config.retrieval.verse_snippets == 0 || config.retrieval.judge_snippets == 0 {
            return Err(VerseDuelError::InvalidConfiguration(
                "snippet caps must be positive".into(),
            ));
        }
        if config.retrieval.chunk_overlap >= config.retrieval.chunk_size {
            return Err(VerseDuelError::InvalidConfiguration(
                "retrieval.chunk_overlap must be smaller than retrieval.chunk_size".into(),
            ));
        }
        Ok(())
    }
}

fn resolve_path(path: Option<PathBuf>) -> (PathBuf, bool) {
    if let Some(path) = path {
        return (path, true);
    }

    if let Ok(from_env) = env::var(CONFIG_PATH_ENV) {
        if !from_env.trim().is_empty() {
            return (PathBuf::from(from_env), true);
        }
    }

    (Path::new(DEFAULT_CONFIG_PATH).to_path_buf(), false)
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Shared turn budget across both poets.
    #[serde(default = "SessionConfig::default_turns")]
    pub default_turns: i32,
    #[serde(default = "SessionConfig::default_turn_timeout_ms")]
    pub turn_timeout_ms: u64,
    #[serde(default = "SessionConfig::default_scoring_timeout_ms")]
    pub scoring_timeout_ms: u64,
}

impl SessionConfig {
    const fn default_turns() -> i32 {
        6
    }

    const fn default_turn_timeout_ms() -> u64 {
        30_000
    }

    const fn default_scoring_timeout_ms() -> u64 {
        60_000
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_turns: Self::default_turns(),
            turn_timeout_ms: Self::default_turn_timeout_ms(),
            scoring_timeout_ms: Self::default_scoring_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetrievalConfig {
    /// Snippets handed to a poet per turn.
    #[serde(default = "RetrievalConfig::default_verse_snippets")]
    pub verse_snippets: usize,
    /// Snippets handed to the judge.
    #[serde(default = "RetrievalConfig::default_judge_snippets")]
    pub judge_snippets: usize,
    #[serde(default = "RetrievalConfig::default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "RetrievalConfig::default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl RetrievalConfig {
    const fn default_verse_snippets() -> usize {
        2
    }

    const fn default_judge_snippets() -> usize {
        3
    }

    const fn default_chunk_size() -> usize {
        500
    }

    const fn default_chunk_overlap() -> usize {
        50
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            verse_snippets: Self::default_verse_snippets(),
            judge_snippets: Self::default_judge_snippets(),
            chunk_size: Self::default_chunk_size(),
            chunk_overlap: Self::default_chunk_overlap(),
        }
    }
}

/// Criterion weights for the judge. Must sum to 100.
#[derive(Debug, Clone, Deserialize)]
pub struct RubricConfig {
    #[serde(default = "RubricConfig::default_grounding")]
    pub grounding: u8,
    #[serde(default = "RubricConfig::default_literary")]
    pub literary: u8,
    #[serde(default = "RubricConfig::default_coherence")]
    pub coherence: u8,
    #[serde(default = "RubricConfig::default_originality")]
    pub originality: u8,
    #[serde(default = "RubricConfig::default_sound")]
    pub sound: u8,
}

impl RubricConfig {
    const fn default_grounding() -> u8 {
        30
    }

    const fn default_literary() -> u8 {
        25
    }

    const fn default_coherence() -> u8 {
        20
    }

    const fn default_originality() -> u8 {
        15
    }

    const fn default_sound() -> u8 {
        10
    }

    pub fn total(&self) -> u32 {
        self.grounding as u32
            + self.literary as u32
            + self.coherence as u32
            + self.originality as u32
            + self.sound as u32
    }
}

impl Default for RubricConfig {
    fn default() -> Self {
        Self {
            grounding: Self::default_grounding(),
            literary: Self::default_literary(),
            coherence: Self::default_coherence(),
            originality: Self::default_originality(),
            sound: Self::default_sound(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}
