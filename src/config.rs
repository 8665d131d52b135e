use std::env;
use std::fmt;

pub const DEFAULT_OPENAI_IMAGES_URL: &str = "https://api.openai.com/v1/images/generations";
pub const DEFAULT_DEEPINFRA_SDXL_URL: &str = "https://api.deepinfra.com/v1/inference/stability-ai/sdxl?version=28fb12be4e4d05ff054e10eabd20e429efb98293056db1067ccdbb8ac2733b86";
pub const DEFAULT_PORT: u16 = 8080;

#[derive(Clone)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub endpoint: String,
}

#[derive(Debug, Clone)]
pub struct DeepInfraConfig {
    pub endpoint: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: Option<u16>,
    pub json_logs: bool,
    pub openai: OpenAiConfig,
    pub deepinfra: DeepInfraConfig,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        OpenAiConfig {
            api_key: None,
            endpoint: DEFAULT_OPENAI_IMAGES_URL.to_string(),
        }
    }
}

// The key must never reach the logs.
impl fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl OpenAiConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let api_key = env::var("OPENAI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());
        let endpoint =
            env::var("OPENAI_IMAGES_URL").unwrap_or_else(|_| DEFAULT_OPENAI_IMAGES_URL.to_string());

        OpenAiConfig { api_key, endpoint }
    }

    pub fn with_credentials(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

impl Default for DeepInfraConfig {
    fn default() -> Self {
        DeepInfraConfig {
            endpoint: DEFAULT_DEEPINFRA_SDXL_URL.to_string(),
        }
    }
}

impl DeepInfraConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let endpoint = env::var("DEEPINFRA_SDXL_URL")
            .unwrap_or_else(|_| DEFAULT_DEEPINFRA_SDXL_URL.to_string());
        DeepInfraConfig { endpoint }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: None,
            json_logs: false,
            openai: OpenAiConfig::default(),
            deepinfra: DeepInfraConfig::default(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let port = env::var("PORT").ok().and_then(|port| port.parse().ok());
        let json_logs = env::var("LUMIERE_LOG_JSON")
            .ok()
            .map_or(false, |val| val == "true");

        Config {
            port,
            json_logs,
            openai: OpenAiConfig::from_env(),
            deepinfra: DeepInfraConfig::from_env(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_openai(mut self, config: OpenAiConfig) -> Self {
        self.openai = config;
        self
    }

    pub fn with_deepinfra(mut self, config: DeepInfraConfig) -> Self {
        self.deepinfra = config;
        self
    }

    pub fn port_or_default(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }
}
