use std::time::Duration;

/// Builder-style configuration for the HTTP embedder. Empty fields fall
/// back to provider defaults.
#[derive(Debug, Clone, Default)]
pub struct EmbedConfig {
    pub api_key: String,
    pub model: String,
    pub dimension: usize,
    pub base_url: String,
    pub timeout: Option<Duration>,
}

impl EmbedConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_dimension(mut self, dim: usize) -> Self {
        self.dimension = dim;
        self
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
