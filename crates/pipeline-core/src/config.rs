use crate::error::{PipelineError, Result};
use crate::paths;
use crate::types::ImageSlot;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// StorageConfig / ObjectsConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_database")]
    pub database: String,
}

fn default_database() -> String {
    paths::DEFAULT_DATABASE.to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectsConfig {
    #[serde(default = "default_uploads_dir")]
    pub dir: String,
    /// Base URL uploaded files are served from. Defaults to a `file://` URL
    /// of the uploads directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_base_url: Option<String>,
}

fn default_uploads_dir() -> String {
    paths::DEFAULT_UPLOADS_DIR.to_string()
}

impl Default for ObjectsConfig {
    fn default() -> Self {
        Self {
            dir: default_uploads_dir(),
            public_base_url: None,
        }
    }
}

impl ObjectsConfig {
    pub fn public_base_url(&self, root: &Path) -> String {
        match &self.public_base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("file://{}", paths::resolve(root, &self.dir).display()),
        }
    }
}

// ---------------------------------------------------------------------------
// AI providers
// ---------------------------------------------------------------------------

/// Canonical provider names accepted in config.
pub const PROVIDERS: &[&str] = &["gemini", "claude", "gpt4", "qwen", "ark", "deepseek"];

/// Map the loose provider names users type onto the canonical set.
/// Anything unrecognised falls back to `gemini`.
pub fn normalize_provider(name: &str) -> &'static str {
    let n = name.trim().to_lowercase();
    match n.as_str() {
        "gpt4" | "gpt-4" | "openai" | "gpt" => "gpt4",
        "claude" | "anthropic" => "claude",
        "qwen" | "dashscope" => "qwen",
        "ark" | "doubao" | "volc" | "volces" => "ark",
        "deepseek" => "deepseek",
        _ => "gemini",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub provider: String,
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub api_key_env: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_timeout_seconds() -> u64 {
    60
}

impl ProviderConfig {
    /// Defaults for a provider, reached through its OpenAI-compatible
    /// chat-completions endpoint.
    pub fn for_provider(name: &str) -> Self {
        let provider = normalize_provider(name);
        let (base_url, model, api_key_env) = match provider {
            "claude" => ("https://api.anthropic.com/v1", "claude-sonnet-4-5", "ANTHROPIC_API_KEY"),
            "gpt4" => ("https://api.openai.com/v1", "gpt-4.1", "OPENAI_API_KEY"),
            "deepseek" => ("https://api.deepseek.com", "deepseek-chat", "DEEPSEEK_API_KEY"),
            "qwen" => (
                "https://dashscope.aliyuncs.com/compatible-mode/v1",
                "qwen-plus",
                "DASHSCOPE_API_KEY",
            ),
            "ark" => ("https://ark.cn-beijing.volces.com/api/v3", "", "ARK_API_KEY"),
            _ => (
                "https://generativelanguage.googleapis.com/v1beta/openai",
                "gemini-1.5-flash-001",
                "GEMINI_API_KEY",
            ),
        };
        Self {
            provider: provider.to_string(),
            base_url: base_url.to_string(),
            model: model.to_string(),
            api_key_env: api_key_env.to_string(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default = "default_extract_provider")]
    pub extract: ProviderConfig,
    #[serde(default = "default_generate_provider")]
    pub generate: ProviderConfig,
}

fn default_extract_provider() -> ProviderConfig {
    ProviderConfig::for_provider("gemini")
}

fn default_generate_provider() -> ProviderConfig {
    ProviderConfig::for_provider("claude")
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            extract: default_extract_provider(),
            generate: default_generate_provider(),
        }
    }
}

// ---------------------------------------------------------------------------
// ContentConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentConfig {
    #[serde(default = "default_image_sets")]
    pub image_sets: usize,
    #[serde(default = "default_slots")]
    pub slots: Vec<ImageSlot>,
    #[serde(default = "default_bullet_points")]
    pub bullet_points: usize,
}

fn default_image_sets() -> usize {
    3
}

fn default_slots() -> Vec<ImageSlot> {
    ImageSlot::all().to_vec()
}

fn default_bullet_points() -> usize {
    5
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            image_sets: default_image_sets(),
            slots: default_slots(),
            bullet_points: default_bullet_points(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    pub project: ProjectConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub objects: ObjectsConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub content: ContentConfig,
}

fn default_version() -> u32 {
    1
}

impl Config {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            version: default_version(),
            project: ProjectConfig {
                name: project_name.into(),
                description: None,
            },
            storage: StorageConfig::default(),
            objects: ObjectsConfig::default(),
            ai: AiConfig::default(),
            content: ContentConfig::default(),
        }
    }

    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(PipelineError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        for (label, provider) in [("extract", &self.ai.extract), ("generate", &self.ai.generate)] {
            if !PROVIDERS.contains(&provider.provider.as_str()) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!(
                        "unknown provider '{}' in ai.{label}; it will be treated as '{}'",
                        provider.provider,
                        normalize_provider(&provider.provider)
                    ),
                });
            }
            if provider.base_url.trim().is_empty() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("ai.{label}.base_url is empty"),
                });
            }
            if provider.model.trim().is_empty() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("ai.{label}.model is empty"),
                });
            }
        }

        if self.content.image_sets == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "content.image_sets must be at least 1".to_string(),
            });
        }

        if self.content.slots.len() != ImageSlot::all().len() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "content.slots lists {} slots; listings expect {}",
                    self.content.slots.len(),
                    ImageSlot::all().len()
                ),
            });
        }

        let mut seen = HashSet::new();
        for slot in &self.content.slots {
            if !seen.insert(*slot) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("duplicate slot '{slot}' in content.slots"),
                });
            }
        }

        warnings
    }
}
