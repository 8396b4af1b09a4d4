//! loopcheck configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::semantic::MIN_CONFIDENCE_FLOOR;

/// Providers that talk to a local server and need no API key
pub const LOCAL_PROVIDERS: [&str; 3] = ["lmstudio", "ollama", "generic"];

/// Main loopcheck configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level used when `--log-level` is not given
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,

    /// LLM provider configuration
    pub llm: LlmConfig,

    /// Batch validation settings
    pub validation: ValidationConfig,

    /// Function inventory settings
    pub inventory: InventoryConfig,

    /// Semantic alternative search settings
    pub semantic: SemanticConfig,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Only the semantic search needs an LLM, so the API key is checked only
    /// when alternatives are requested.
    pub fn validate(&self, alternatives: bool) -> Result<()> {
        if self.validation.concurrency == 0 {
            return Err(eyre::eyre!("validation.concurrency must be at least 1"));
        }
        if !(MIN_CONFIDENCE_FLOOR..=1.0).contains(&self.semantic.min_confidence) {
            return Err(eyre::eyre!(
                "semantic.min-confidence must be between {} and 1.0, got {}",
                MIN_CONFIDENCE_FLOOR,
                self.semantic.min_confidence
            ));
        }
        if alternatives && self.llm.requires_api_key() && std::env::var(&self.llm.api_key_env).is_err() {
            return Err(eyre::eyre!(
                "LLM API key not found. Set the {} environment variable.",
                self.llm.api_key_env
            ));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .loopcheck.yml
        let local_config = PathBuf::from(".loopcheck.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/loopcheck/loopcheck.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("loopcheck").join("loopcheck.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name: anthropic, openai, lmstudio, ollama or generic
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL, provider default when unset
    #[serde(rename = "base-url")]
    pub base_url: Option<String>,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "anthropic".to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            base_url: None,
            max_tokens: 4096,
            timeout_ms: 120_000,
        }
    }
}

impl LlmConfig {
    pub fn requires_api_key(&self) -> bool {
        !LOCAL_PROVIDERS.contains(&self.provider.as_str())
    }

    /// Base URL to use, falling back to the provider's well-known endpoint
    pub fn effective_base_url(&self) -> String {
        if let Some(url) = self.base_url.as_ref().filter(|u| !u.is_empty()) {
            return url.trim_end_matches('/').to_string();
        }
        match self.provider.as_str() {
            "anthropic" => "https://api.anthropic.com",
            "openai" => "https://api.openai.com/v1",
            "ollama" => "http://localhost:11434/v1",
            _ => "http://localhost:1234/v1",
        }
        .to_string()
    }
}

/// Batch validation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Directory holding loop specification JSON files, relative to the root
    #[serde(rename = "loops-dir")]
    pub loops_dir: PathBuf,

    /// Loops validated concurrently in batch mode
    pub concurrency: usize,

    /// Deadline around each semantic query in milliseconds
    #[serde(rename = "llm-deadline-ms")]
    pub llm_deadline_ms: u64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            loops_dir: PathBuf::from("growth-loops"),
            concurrency: 8,
            llm_deadline_ms: 60_000,
        }
    }
}

/// Function inventory settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryConfig {
    /// Directory names pruned from the walk wherever they appear
    #[serde(rename = "exclude-dirs")]
    pub exclude_dirs: Vec<String>,

    /// Files larger than this are treated as generated and skipped
    #[serde(rename = "max-file-bytes")]
    pub max_file_bytes: u64,

    /// Lines of source kept per function
    #[serde(rename = "preview-lines")]
    pub preview_lines: usize,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            exclude_dirs: [
                "venv",
                ".venv",
                "__pycache__",
                ".git",
                "node_modules",
                ".pytest_cache",
                "build",
                "dist",
                ".tox",
                ".mypy_cache",
                "tests",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            max_file_bytes: 1_000_000,
            preview_lines: 20,
        }
    }
}

/// Semantic alternative search settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SemanticConfig {
    /// Candidate functions sent per request
    #[serde(rename = "max-candidates")]
    pub max_candidates: usize,

    /// Alternatives below this confidence are dropped
    #[serde(rename = "min-confidence")]
    pub min_confidence: f64,

    /// Docstring characters sent per candidate
    #[serde(rename = "doc-chars")]
    pub doc_chars: usize,

    /// Source preview characters sent per candidate
    #[serde(rename = "preview-chars")]
    pub preview_chars: usize,
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            max_candidates: 20,
            min_confidence: 0.6,
            doc_chars: 200,
            preview_chars: 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.llm.provider, "anthropic");
        assert_eq!(config.validation.concurrency, 8);
        assert_eq!(config.validation.loops_dir, PathBuf::from("growth-loops"));
        assert_eq!(config.semantic.max_candidates, 20);
        assert!(config.inventory.exclude_dirs.iter().any(|d| d == "__pycache__"));
        assert!(config.log_level.is_none());
    }

    #[test]
    fn test_llm_base_url_defaults() {
        let mut config = LlmConfig::default();
        assert_eq!(config.effective_base_url(), "https://api.anthropic.com");

        config.provider = "lmstudio".to_string();
        assert_eq!(config.effective_base_url(), "http://localhost:1234/v1");

        config.provider = "ollama".to_string();
        assert_eq!(config.effective_base_url(), "http://localhost:11434/v1");

        config.base_url = Some("http://gpu-box:8000/v1/".to_string());
        assert_eq!(config.effective_base_url(), "http://gpu-box:8000/v1");
    }

    #[test]
    fn test_local_providers_need_no_key() {
        let mut config = Config::default();
        config.llm.provider = "ollama".to_string();
        config.llm.api_key_env = "LOOPCHECK_TEST_KEY_THAT_IS_NEVER_SET".to_string();
        assert!(config.validate(true).is_ok());

        config.llm.provider = "anthropic".to_string();
        assert!(config.validate(true).is_err());
        assert!(config.validate(false).is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.validation.concurrency = 0;
        assert!(config.validate(false).is_err());

        let mut config = Config::default();
        config.semantic.min_confidence = 1.5;
        assert!(config.validate(false).is_err());

        config.semantic.min_confidence = 0.3;
        assert!(config.validate(false).is_err());

        config.semantic.min_confidence = 0.6;
        assert!(config.validate(false).is_ok());
    }

    #[test]
    fn test_deserialize_config() {
        let yaml = r#"
log-level: debug
llm:
  provider: lmstudio
  model: qwen2.5-coder
  base-url: http://localhost:1234/v1
  max-tokens: 2048
validation:
  loops-dir: specs/loops
  concurrency: 2
  llm-deadline-ms: 5000
inventory:
  exclude-dirs: [vendor]
  max-file-bytes: 5000
semantic:
  min-confidence: 0.8
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert_eq!(config.llm.provider, "lmstudio");
        assert_eq!(config.llm.max_tokens, 2048);
        assert_eq!(config.validation.loops_dir, PathBuf::from("specs/loops"));
        assert_eq!(config.validation.llm_deadline_ms, 5000);
        assert_eq!(config.inventory.exclude_dirs, vec!["vendor"]);
        assert_eq!(config.inventory.preview_lines, 20);
        assert_eq!(config.semantic.min_confidence, 0.8);
        assert_eq!(config.semantic.doc_chars, 200);
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lc.yml");
        fs::write(&path, "validation:\n  concurrency: 3\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.validation.concurrency, 3);

        let missing = dir.path().join("missing.yml");
        assert!(Config::load(Some(&missing)).is_err());
    }
}
