use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

const MIB: usize = 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct MarkdownConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub upload: UploadConfig,
    pub security: SecurityConfig,
    pub conversion: ConversionConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    pub max_size_bytes: usize,
}

impl UploadConfig {
    /// Human-readable form of the limit, used in rejection messages.
    pub fn limit_display(&self) -> String {
        if self.max_size_bytes % MIB == 0 {
            format!("{}MB", self.max_size_bytes / MIB)
        } else {
            format!("{} bytes", self.max_size_bytes)
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConversionConfig {
    pub timeout_secs: u64,
}

impl MarkdownConfig {
    pub fn load() -> Result<Self, AppError> {
        // Load common config (handles .env and APP__ prefix)
        let common = core_config::Config::load()?;
        let is_prod = common.environment.is_prod();

        Ok(MarkdownConfig {
            common,
            upload: UploadConfig {
                max_size_bytes: get_env("MAX_UPLOAD_BYTES", Some("10485760"), is_prod)?
                    .parse()
                    .map_err(|e| {
                        AppError::ConfigError(anyhow::anyhow!("Invalid MAX_UPLOAD_BYTES: {}", e))
                    })?,
            },
            security: SecurityConfig {
                allowed_origins: get_env(
                    "ALLOWED_ORIGINS",
                    Some("http://localhost:3000,https://www.markdownai.xyz"),
                    is_prod,
                )?
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect(),
            },
            conversion: ConversionConfig {
                timeout_secs: get_env("CONVERSION_TIMEOUT_SECS", Some("30"), is_prod)?
                    .parse()
                    .map_err(|e| {
                        AppError::ConfigError(anyhow::anyhow!(
                            "Invalid CONVERSION_TIMEOUT_SECS: {}",
                            e
                        ))
                    })?,
            },
        })
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required in production but not set",
                    key
                ))))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required but not set",
                    key
                ))))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::UploadConfig;

    #[test]
    fn limit_display_reports_whole_mib_limits_in_mb() {
        let upload = UploadConfig {
            max_size_bytes: 10 * 1024 * 1024,
        };
        assert_eq!(upload.limit_display(), "10MB");
    }

    #[test]
    fn limit_display_falls_back_to_bytes() {
        let upload = UploadConfig {
            max_size_bytes: 1024,
        };
        assert_eq!(upload.limit_display(), "1024 bytes");
    }
}
