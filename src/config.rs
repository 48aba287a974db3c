//! Configuration system for persona-sim
//!
//! Supports multiple configuration sources with the following precedence (highest to lowest):
//! 1. CLI arguments
//! 2. Environment variables (PERSONA_SIM_* prefix, plus OPENAI_API_KEY for the key)
//! 3. Configuration file (TOML)
//! 4. Default values

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::dialogue::DialogueSettings;
use crate::error::{Error, Result};
use crate::gateway::{FailurePolicy, OpenAiConfig, RetryPolicy};

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Text generation endpoint and retry behaviour
    pub generation: GenerationSettings,

    /// Questionnaire settings
    pub questionnaire: QuestionnaireSettings,

    /// Conversation settings
    pub dialogue: DialogueConfig,

    /// Batch settings
    pub pipeline: PipelineSettings,

    /// Input and output locations
    pub paths: PathSettings,

    /// Logging configuration
    pub logging: LoggingSettings,
}

/// OpenAI-compatible endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// API base URL (e.g., "https://api.openai.com/v1", "http://localhost:11434/v1")
    pub base_url: String,

    /// API key (empty string for local servers like Ollama)
    pub api_key: String,

    /// Model identifier
    pub model: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// What to do when a call still fails after retries
    pub failure_policy: FailurePolicy,

    /// Retry schedule
    pub retry: RetryPolicy,
}

/// Questionnaire settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestionnaireSettings {
    /// Sampling temperature for questionnaire answers
    pub temperature: f32,
}

/// Conversation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DialogueConfig {
    /// Rounds per single-scale session (turns = 2 x rounds)
    pub rounds: usize,

    /// Rounds per combined session
    pub combined_rounds: usize,

    /// Transcript window for single-scale sessions
    pub window: usize,

    /// Transcript window for combined sessions
    pub combined_window: usize,

    /// Answers per scale used as background in single-scale sessions
    pub background_cap: usize,

    /// Answers per scale used as background in combined sessions
    pub combined_background_cap: usize,
}

/// Batch settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Personas processed concurrently (1 = sequential)
    pub max_parallel_personas: usize,

    /// Skip personas whose artifact already exists
    pub skip_existing: bool,
}

/// Input and output locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    /// Persona catalog: {"characters": [{"name", "system_prompt"}]}
    pub personas_file: String,

    /// Optional directory holding <SCALE>.json question overrides
    #[serde(skip_serializing_if = "Option::is_none")]
    pub questions_dir: Option<String>,

    /// Root of all generated artifacts
    pub output_dir: String,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level: trace, debug, info, warn, error
    pub level: String,

    /// Log file path (empty = no file logging)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// Maximum log file size in MB before rotation
    pub max_file_size_mb: u64,

    /// Number of rotated log files to keep
    pub max_files: u32,

    /// Enable JSON formatted logging
    pub json_format: bool,
}

// Default implementations

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            timeout_secs: 120,
            failure_policy: FailurePolicy::Substitute,
            retry: RetryPolicy::default(),
        }
    }
}

impl Default for QuestionnaireSettings {
    fn default() -> Self {
        Self { temperature: 0.6 }
    }
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            rounds: 20,
            combined_rounds: 40,
            window: 20,
            combined_window: 16,
            background_cap: 12,
            combined_background_cap: 6,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_parallel_personas: 1,
            skip_existing: false,
        }
    }
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            personas_file: "characters.json".to_string(),
            questions_dir: None,
            output_dir: "output".to_string(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            max_file_size_mb: 100,
            max_files: 5,
            json_format: false,
        }
    }
}

const CONFIG_FILE_NAME: &str = "persona-sim.toml";

impl AppConfig {
    /// Load configuration from file with environment variable overrides
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut config = Self::default();

        // 1. Load from config file if it exists
        let config_file = Self::find_config_file(config_path)?;
        if let Some(path) = config_file {
            debug!(path = %path.display(), "Loading configuration file");
            config = Self::from_file(&path)?;
            info!(path = %path.display(), "Configuration loaded from file");
        }

        // 2. Apply environment variable overrides
        config.apply_env_overrides();

        // 3. Expand paths
        config.expand_paths();

        // 4. Validate
        config.validate()?;

        Ok(config)
    }

    /// Parse a TOML file without overrides or validation
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::IoRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| Error::ConfigParse {
            message: format!("{}: {}", path.display(), e.message()),
            source: Some(e),
        })
    }

    /// Find the configuration file to use
    fn find_config_file(explicit_path: Option<&str>) -> Result<Option<PathBuf>> {
        // If explicit path provided, use it (error if not found)
        if let Some(path) = explicit_path {
            let path = PathBuf::from(expand_path(path));
            if path.exists() {
                return Ok(Some(path));
            }
            return Err(Error::ConfigNotFound { path });
        }

        // Search in standard locations
        let search_paths = [
            // Current directory
            PathBuf::from(CONFIG_FILE_NAME),
            // User config directory
            dirs::config_dir()
                .map(|p| p.join("persona-sim").join("config.toml"))
                .unwrap_or_default(),
            // Home directory
            dirs::home_dir()
                .map(|p| p.join(".persona-sim").join("config.toml"))
                .unwrap_or_default(),
        ];

        for path in &search_paths {
            if !path.as_os_str().is_empty() && path.exists() {
                debug!(path = %path.display(), "Found configuration file");
                return Ok(Some(path.clone()));
            }
        }

        debug!("No configuration file found, using defaults");
        Ok(None)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // Generation settings
        if let Ok(val) = std::env::var("PERSONA_SIM_BASE_URL") {
            self.generation.base_url = val;
        }
        if self.generation.api_key.is_empty() {
            if let Ok(val) = std::env::var("OPENAI_API_KEY") {
                self.generation.api_key = val;
            }
        }
        if let Ok(val) = std::env::var("PERSONA_SIM_API_KEY") {
            self.generation.api_key = val;
        }
        if let Ok(val) = std::env::var("PERSONA_SIM_MODEL") {
            self.generation.model = val;
        }
        if let Ok(val) = std::env::var("PERSONA_SIM_TIMEOUT_SECS") {
            if let Ok(n) = val.parse() {
                self.generation.timeout_secs = n;
            }
        }
        if let Ok(val) = std::env::var("PERSONA_SIM_MAX_ATTEMPTS") {
            if let Ok(n) = val.parse() {
                self.generation.retry.max_attempts = n;
            }
        }
        if let Ok(val) = std::env::var("PERSONA_SIM_FAILURE_POLICY") {
            match val.to_lowercase().as_str() {
                "substitute" => self.generation.failure_policy = FailurePolicy::Substitute,
                "abort" => self.generation.failure_policy = FailurePolicy::Abort,
                _ => {}
            }
        }

        // Dialogue settings
        if let Ok(val) = std::env::var("PERSONA_SIM_ROUNDS") {
            if let Ok(n) = val.parse() {
                self.dialogue.rounds = n;
            }
        }
        if let Ok(val) = std::env::var("PERSONA_SIM_COMBINED_ROUNDS") {
            if let Ok(n) = val.parse() {
                self.dialogue.combined_rounds = n;
            }
        }

        // Pipeline settings
        if let Ok(val) = std::env::var("PERSONA_SIM_MAX_PARALLEL") {
            if let Ok(n) = val.parse() {
                self.pipeline.max_parallel_personas = n;
            }
        }

        // Paths
        if let Ok(val) = std::env::var("PERSONA_SIM_PERSONAS_FILE") {
            self.paths.personas_file = val;
        }
        if let Ok(val) = std::env::var("PERSONA_SIM_QUESTIONS_DIR") {
            self.paths.questions_dir = Some(val);
        }
        if let Ok(val) = std::env::var("PERSONA_SIM_OUTPUT_DIR") {
            self.paths.output_dir = val;
        }

        // Logging settings
        if let Ok(val) = std::env::var("PERSONA_SIM_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = std::env::var("PERSONA_SIM_LOG_FILE") {
            self.logging.file = Some(val);
        }
        if let Ok(val) = std::env::var("PERSONA_SIM_LOG_JSON") {
            self.logging.json_format = val.to_lowercase() == "true" || val == "1";
        }
    }

    /// Expand ~ and other path variables
    fn expand_paths(&mut self) {
        self.paths.personas_file = expand_path(&self.paths.personas_file);
        self.paths.output_dir = expand_path(&self.paths.output_dir);

        if let Some(ref dir) = self.paths.questions_dir {
            self.paths.questions_dir = Some(expand_path(dir));
        }
        if let Some(ref file) = self.logging.file {
            self.logging.file = Some(expand_path(file));
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let generation = &self.generation;
        if !generation.base_url.starts_with("http://") && !generation.base_url.starts_with("https://") {
            return Err(Error::config_field_invalid(
                "generation.base_url",
                "base_url must start with http:// or https://",
            ));
        }
        if generation.model.trim().is_empty() {
            return Err(Error::config_field_invalid("generation.model", "model cannot be empty"));
        }
        if generation.timeout_secs == 0 {
            return Err(Error::config_field_invalid(
                "generation.timeout_secs",
                "timeout_secs must be greater than 0",
            ));
        }
        if generation.retry.max_attempts == 0 {
            return Err(Error::config_field_invalid(
                "generation.retry.max_attempts",
                "max_attempts must be at least 1",
            ));
        }

        if !(0.0..=1.0).contains(&self.questionnaire.temperature) {
            return Err(Error::config_field_invalid(
                "questionnaire.temperature",
                "temperature must be between 0.0 and 1.0",
            ));
        }

        let dialogue = &self.dialogue;
        if dialogue.rounds == 0 {
            return Err(Error::config_field_invalid("dialogue.rounds", "rounds must be at least 1"));
        }
        if dialogue.combined_rounds == 0 {
            return Err(Error::config_field_invalid(
                "dialogue.combined_rounds",
                "combined_rounds must be at least 1",
            ));
        }
        if dialogue.window == 0 || dialogue.combined_window == 0 {
            return Err(Error::config_field_invalid(
                "dialogue.window",
                "transcript windows must be at least 1",
            ));
        }

        if self.pipeline.max_parallel_personas == 0 {
            return Err(Error::config_field_invalid(
                "pipeline.max_parallel_personas",
                "max_parallel_personas must be at least 1",
            ));
        }

        if self.paths.output_dir.trim().is_empty() {
            return Err(Error::config_field_invalid("paths.output_dir", "output_dir cannot be empty"));
        }

        // Validate log level
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(Error::config_field_invalid(
                "logging.level",
                format!(
                    "Invalid log level '{}'. Must be one of: {}",
                    self.logging.level,
                    valid_levels.join(", ")
                ),
            ));
        }

        Ok(())
    }

    /// Gateway configuration derived from the generation section
    pub fn openai_config(&self) -> OpenAiConfig {
        OpenAiConfig {
            base_url: self.generation.base_url.clone(),
            api_key: self.generation.api_key.clone(),
            model: self.generation.model.clone(),
            timeout_secs: self.generation.timeout_secs,
            retry: self.generation.retry.clone(),
        }
    }

    /// Settings for single-scale sessions
    pub fn session_settings(&self) -> DialogueSettings {
        DialogueSettings {
            rounds: self.dialogue.rounds,
            window: self.dialogue.window,
        }
    }

    /// Settings for combined sessions
    pub fn combined_session_settings(&self) -> DialogueSettings {
        DialogueSettings {
            rounds: self.dialogue.combined_rounds,
            window: self.dialogue.combined_window,
        }
    }

    pub fn personas_file(&self) -> PathBuf {
        PathBuf::from(&self.paths.personas_file)
    }

    pub fn questions_dir(&self) -> Option<PathBuf> {
        self.paths.questions_dir.as_ref().map(PathBuf::from)
    }

    pub fn output_dir(&self) -> PathBuf {
        PathBuf::from(&self.paths.output_dir)
    }

    /// Copy with the API key masked, for display
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if !copy.generation.api_key.is_empty() {
            copy.generation.api_key = "********".to_string();
        }
        copy
    }
}

/// Expand ~ and environment variables in paths
fn expand_path(path: &str) -> String {
    shellexpand::full(path)
        .unwrap_or_else(|_| std::borrow::Cow::Borrowed(path))
        .into_owned()
}

/// Initialize a new configuration file, returning its path
pub fn init_config(path: Option<&str>, force: bool) -> Result<PathBuf> {
    let config_path = path
        .map(|p| PathBuf::from(expand_path(p)))
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));

    // Check if file exists
    if config_path.exists() && !force {
        return Err(Error::Config(format!(
            "Configuration file already exists: {}. Use --force to overwrite.",
            config_path.display()
        )));
    }

    // Create parent directories
    if let Some(parent) = config_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| Error::IoWrite {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
    }

    fs::write(&config_path, generate_default_config()).map_err(|e| Error::IoWrite {
        path: config_path.clone(),
        source: e,
    })?;

    info!(path = %config_path.display(), "Configuration file created");
    Ok(config_path)
}

/// Generate default configuration content with comments
fn generate_default_config() -> String {
    r#"# persona-sim configuration

[generation]
# OpenAI-compatible API base URL (OpenAI, Ollama, vLLM, LM Studio, etc.)
base_url = "https://api.openai.com/v1"

# API key (leave empty to use OPENAI_API_KEY, or for local servers)
api_key = ""

# Model identifier
model = "gpt-4o-mini"

# Per-request timeout in seconds
timeout_secs = 120

# On a call that still fails after retries:
#   "substitute" records "[ERROR] <kind>: <message>" and continues
#   "abort" fails the persona's run
failure_policy = "substitute"

[generation.retry]
# Total attempts per call, including the first
max_attempts = 3

# Delay before retry n (0-based): base + U[0,1) * (jitter + n * growth), in ms
base_delay_ms = 1250
jitter_ms = 1250
jitter_growth_ms = 1000

[questionnaire]
# Sampling temperature for questionnaire answers
temperature = 0.6

[dialogue]
# Rounds per session (each round is one counterpart line and one persona reply)
rounds = 20
combined_rounds = 40

# Recent turns shown to each call
window = 20
combined_window = 16

# Questionnaire answers per scale used to seed the opener
background_cap = 12
combined_background_cap = 6

[pipeline]
# Personas processed concurrently (1 = sequential)
max_parallel_personas = 1

# Skip personas whose output already exists
skip_existing = false

[paths]
# Persona catalog
personas_file = "characters.json"

# Directory with PHQ9.json / GAD7.json / ASRM.json question overrides
# questions_dir = "questions"

# Root of all generated artifacts
output_dir = "output"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log file path (comment out to disable file logging)
# file = "logs/persona-sim.log"

# Maximum log file size in MB before rotation
max_file_size_mb = 100

# Number of rotated log files to keep
max_files = 5

# Enable JSON formatted logging
json_format = false
"#
    .to_string()
}
