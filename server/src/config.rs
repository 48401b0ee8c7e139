use anyhow::{Context, Result};

const DEFAULT_UPLOAD_LIMIT_BYTES: usize = 5 * 1024 * 1024;

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Empty means any origin, without credentials.
    pub cors_allowed_origins: Vec<String>,
    pub upload_limit_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cors_allowed_origins: Vec::new(),
            upload_limit_bytes: DEFAULT_UPLOAD_LIMIT_BYTES,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let cors_allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .filter_map(|s| {
                let trimmed = s.trim();
                if trimmed.is_empty() || trimmed == "*" {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            })
            .collect::<Vec<_>>();

        let upload_limit_bytes = match std::env::var("UPLOAD_LIMIT_BYTES") {
            Ok(raw) => raw
                .trim()
                .parse::<usize>()
                .with_context(|| format!("invalid UPLOAD_LIMIT_BYTES {raw:?}"))?,
            Err(_) => DEFAULT_UPLOAD_LIMIT_BYTES,
        };

        Ok(Self {
            cors_allowed_origins,
            upload_limit_bytes,
        })
    }
}
