use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Upper bound for `cache.ttl_hours` (one year)
pub const MAX_CACHE_TTL_HOURS: u64 = 24 * 365;

/// Environment variable overriding `app.deployment_mode`
pub const DEPLOYMENT_MODE_ENV: &str = "VIDSCRIBE_DEPLOYMENT_MODE";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application settings
    pub app: AppConfig,

    /// Transcript and article cache
    pub cache: CacheConfig,

    /// Local speech-to-text
    pub speech: SpeechConfig,

    /// Article generation service
    pub generator: GeneratorConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentMode {
    Production,
    /// Also keeps an mp3 copy of every downloaded video under `media_root`
    Development,
}

impl std::str::FromStr for DeploymentMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "production" | "prod" => Ok(DeploymentMode::Production),
            "development" | "dev" => Ok(DeploymentMode::Development),
            other => anyhow::bail!("Unknown deployment mode: {}", other),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub deployment_mode: DeploymentMode,

    /// Directory for durable audio copies (development mode)
    pub media_root: PathBuf,

    /// Temporary directory for downloads (system temp dir if unset)
    pub temp_dir: Option<PathBuf>,

    /// Caption language when none is given on the command line
    pub default_language: String,

    /// Size of the blocking worker pool (processor count if unset)
    pub worker_threads: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub enabled: bool,

    /// Cache directory (platform cache dir if unset)
    pub dir: Option<PathBuf>,

    /// Entry lifetime in hours
    pub ttl_hours: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpeechBackend {
    /// openai-whisper command line tool
    WhisperCli,
    /// In-process whisper.cpp (requires the `whisper` feature)
    WhisperRs,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    pub backend: SpeechBackend,

    /// Model size name (tiny, base, small, medium, large)
    pub model: String,

    /// ggml model file for the in-process backend
    pub model_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Generative model id
    pub model: String,

    /// Environment variable holding the API key
    pub api_key_env: String,

    /// Generative Language API base URL
    pub endpoint: String,

    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app: AppConfig {
                deployment_mode: DeploymentMode::Production,
                media_root: PathBuf::from("media"),
                temp_dir: None,
                default_language: "en".to_string(),
                worker_threads: None,
            },
            cache: CacheConfig {
                enabled: true,
                dir: None,
                ttl_hours: 24,
            },
            speech: SpeechConfig {
                backend: SpeechBackend::WhisperCli,
                model: "tiny".to_string(),
                model_path: None,
            },
            generator: GeneratorConfig {
                model: "gemini-2.5-flash".to_string(),
                api_key_env: "GEMINI_API_KEY".to_string(),
                endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
                timeout_seconds: 120,
            },
        }
    }
}

impl Config {
    /// Load configuration from file or create default
    pub async fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        let mut config = if config_path.exists() {
            let content = fs_err::read_to_string(&config_path)
                .context("Failed to read config file")?;

            Self::from_yaml(&content)?
        } else {
            let config = Self::default();
            config.save().await?;
            config
        };

        if let Ok(mode) = std::env::var(DEPLOYMENT_MODE_ENV) {
            config.app.deployment_mode = mode.parse()?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from YAML
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(content)
            .context("Failed to parse config file")?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self)
            .context("Failed to serialize config")?;

        fs_err::write(&config_path, content)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    pub fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?;

        Ok(config_dir.join("vidscribe").join("config.yaml"))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.cache.ttl_hours == 0 {
            anyhow::bail!("cache.ttl_hours must be greater than zero");
        }

        if self.cache.ttl_hours > MAX_CACHE_TTL_HOURS {
            anyhow::bail!("cache.ttl_hours must be at most {}", MAX_CACHE_TTL_HOURS);
        }

        if self.app.worker_threads == Some(0) {
            anyhow::bail!("app.worker_threads must be greater than zero");
        }

        if self.app.default_language.trim().is_empty() {
            anyhow::bail!("app.default_language must not be empty");
        }

        if self.speech.backend == SpeechBackend::WhisperRs && self.speech.model_path.is_none() {
            anyhow::bail!("speech.model_path is required for the whisper-rs backend");
        }

        Ok(())
    }

    /// Number of blocking workers
    pub fn worker_threads(&self) -> usize {
        self.app.worker_threads.unwrap_or_else(num_cpus::get).max(1)
    }

    /// Directory for temporary audio
    pub fn temp_dir(&self) -> PathBuf {
        self.app.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Directory holding cache entries
    pub fn cache_dir(&self) -> PathBuf {
        self.cache.dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("/tmp"))
                .join("vidscribe")
        })
    }

    /// Entry lifetime as a duration
    pub fn cache_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.cache.ttl_hours.saturating_mul(3600))
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Deployment Mode: {:?}", self.app.deployment_mode);
        println!("  Media Root: {}", self.app.media_root.display());
        println!("  Temp Dir: {}", self.temp_dir().display());
        println!("  Default Language: {}", self.app.default_language);
        println!("  Worker Threads: {}", self.worker_threads());
        println!("  Cache: {} ({}, {}h TTL)",
            if self.cache.enabled { "enabled" } else { "disabled" },
            self.cache_dir().display(),
            self.cache.ttl_hours
        );
        println!("  Speech Backend: {:?} (model {})", self.speech.backend, self.speech.model);
        if let Some(path) = &self.speech.model_path {
            println!("  Model Path: {}", path.display());
        }
        println!("  Generator: {} (key from ${})", self.generator.model, self.generator.api_key_env);
    }
}
