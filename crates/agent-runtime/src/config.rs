//! Runtime Configuration
//!
//! Everything the binary needs from the environment, read once at startup.
//! Missing or malformed values are `AgentError::Config` and stop the process
//! before the first prompt.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use agent_core::error::{AgentError, Result};
use agent_core::provider::GenerationOptions;
use agent_core::responder::ResponderConfig;

/// CA bundle picked up automatically when present in the working directory
pub const DEFAULT_CA_CERT: &str = "zscaler-cert.pem";

const DEFAULT_OLLAMA_MODEL: &str = "llama3.2:1b";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Which model endpoint to talk to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderKind {
    Ollama,
    OpenAi,
}

impl FromStr for ProviderKind {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAi),
            other => Err(AgentError::Config(format!(
                "unknown LLM_PROVIDER '{other}' (expected 'ollama' or 'openai')"
            ))),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ollama => write!(f, "ollama"),
            Self::OpenAi => write!(f, "openai"),
        }
    }
}

/// Ollama provider configuration
#[derive(Clone, Debug)]
pub struct OllamaConfig {
    /// Ollama host URL
    pub host: String,

    /// Ollama port
    pub port: u16,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost".into(),
            port: 11434,
            timeout_secs: 120,
        }
    }
}

impl OllamaConfig {
    /// Base URL; a port already present in `host` wins over `port`
    pub fn base_url(&self) -> String {
        let host = self.host.trim_end_matches('/');
        let authority = host.split_once("://").map_or(host, |(_, rest)| rest);
        if authority.contains(':') {
            host.to_string()
        } else {
            format!("{host}:{}", self.port)
        }
    }
}

/// OpenAI-compatible provider configuration
#[derive(Clone)]
pub struct OpenAiConfig {
    pub api_key: String,

    /// API root, e.g. `https://api.openai.com/v1`
    pub base_url: String,

    /// Extra PEM root certificate (corporate TLS proxies)
    pub ca_cert_path: Option<PathBuf>,

    /// Skip certificate validation entirely
    pub accept_invalid_certs: bool,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("ca_cert_path", &self.ca_cert_path)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Process-wide configuration
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    pub provider: ProviderKind,
    pub model: String,
    pub temperature: f32,
    pub system_prompt: Option<String>,
    /// Describe the tools in the system prompt for models without native
    /// function calling
    pub tool_prompt: bool,
    pub ollama: OllamaConfig,
    pub openai: Option<OpenAiConfig>,
}

impl RuntimeConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`; blank values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let provider = get("LLM_PROVIDER")
            .map_or(Ok(ProviderKind::Ollama), |v| v.parse())?;

        let timeout_secs = parse_var(&get, "LLM_TIMEOUT_SECS", 120_u64)?;
        let temperature = parse_var(&get, "LLM_TEMPERATURE", 0.0_f32)?;
        if !(0.0..=2.0).contains(&temperature) {
            return Err(AgentError::Config(format!(
                "LLM_TEMPERATURE must be between 0 and 2, got {temperature}"
            )));
        }

        let ollama = OllamaConfig {
            host: get("OLLAMA_HOST").unwrap_or_else(|| OllamaConfig::default().host),
            port: parse_var(&get, "OLLAMA_PORT", OllamaConfig::default().port)?,
            timeout_secs,
        };

        let openai = match get("OPENAI_API_KEY") {
            Some(api_key) => Some(OpenAiConfig {
                api_key,
                base_url: get("OPENAI_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.into()),
                ca_cert_path: get("OPENAI_CA_CERT").map(PathBuf::from).or_else(|| {
                    Path::new(DEFAULT_CA_CERT)
                        .exists()
                        .then(|| PathBuf::from(DEFAULT_CA_CERT))
                }),
                accept_invalid_certs: parse_bool(&get, "OPENAI_INSECURE_TLS")?,
                timeout_secs,
            }),
            None if provider == ProviderKind::OpenAi => {
                return Err(AgentError::Config(
                    "OPENAI_API_KEY must be set when LLM_PROVIDER=openai".into(),
                ));
            }
            None => None,
        };

        let model = get("LLM_MODEL").unwrap_or_else(|| match provider {
            ProviderKind::Ollama => DEFAULT_OLLAMA_MODEL.into(),
            ProviderKind::OpenAi => DEFAULT_OPENAI_MODEL.into(),
        });

        Ok(Self {
            provider,
            model,
            temperature,
            system_prompt: get("LLM_SYSTEM_PROMPT"),
            tool_prompt: parse_bool(&get, "LLM_TOOL_PROMPT")?,
            ollama,
            openai,
        })
    }

    /// Generation options for chat turns
    pub fn generation(&self) -> GenerationOptions {
        GenerationOptions {
            model: self.model.clone(),
            temperature: self.temperature,
            ..Default::default()
        }
    }

    /// Responder settings derived from this configuration
    pub fn responder_config(&self) -> ResponderConfig {
        ResponderConfig {
            instructions: self.system_prompt.clone(),
            generation: self.generation(),
            inject_tool_descriptions: self.tool_prompt,
        }
    }
}

fn parse_var<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    get(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse()
            .map_err(|_| AgentError::Config(format!("invalid value for {key}: '{raw}'")))
    })
}

fn parse_bool<G>(get: &G, key: &str) -> Result<bool>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key).map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        None | Some("0" | "false" | "no" | "off") => Ok(false),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some(other) => Err(AgentError::Config(format!("invalid value for {key}: '{other}'"))),
    }
}
