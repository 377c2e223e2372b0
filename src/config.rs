use anyhow::{Context, Result};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    // Remote language center
    pub url: String,
    pub username: String,
    pub password: String,
    pub timeout: Duration,

    // Resolution
    pub platform: String,
    /// Seconds before remote staleness is re-checked; `None` loads once.
    pub update_after: Option<u64>,
    pub locale: String,
    pub fallback_locale: String,

    // Storage
    pub cache_path: String,
    pub lang_path: String,

    // Batch warm
    pub warm_platforms: Vec<String>,
}

impl Config {
    /// Defaults for everything except the API base URL.
    pub fn new(url: &str) -> Self {
        Self {
            url: normalize_url(url),
            username: String::new(),
            password: String::new(),
            timeout: Duration::from_secs(10),
            platform: "web".to_string(),
            update_after: Some(60),
            locale: "en".to_string(),
            fallback_locale: "en".to_string(),
            cache_path: "storage/languagecenter.json".to_string(),
            lang_path: "resources/lang".to_string(),
            warm_platforms: vec!["web".to_string()],
        }
    }

    pub fn from_env() -> Result<Self> {
        let url = std::env::var("LANGUAGE_CENTER_URL").context("LANGUAGE_CENTER_URL not set")?;
        let mut config = Self::new(&url);

        // Credentials
        config.username = std::env::var("LANGUAGE_CENTER_USERNAME").unwrap_or_default();
        config.password = std::env::var("LANGUAGE_CENTER_PASSWORD").unwrap_or_default();

        if let Ok(platform) = std::env::var("LANGUAGE_CENTER_PLATFORM") {
            config.platform = platform;
        }

        if let Ok(raw) = std::env::var("LANGUAGE_CENTER_UPDATE_AFTER") {
            config.update_after = parse_update_after(&raw)
                .with_context(|| format!("Invalid LANGUAGE_CENTER_UPDATE_AFTER: {}", raw))?;
        }

        if let Ok(raw) = std::env::var("LANGUAGE_CENTER_TIMEOUT") {
            let secs: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("Invalid LANGUAGE_CENTER_TIMEOUT: {}", raw))?;
            config.timeout = Duration::from_secs(secs);
        }

        if let Ok(path) = std::env::var("LANGUAGE_CENTER_CACHE_PATH") {
            config.cache_path = path;
        }
        if let Ok(path) = std::env::var("LANGUAGE_CENTER_LANG_PATH") {
            config.lang_path = path;
        }

        if let Ok(raw) = std::env::var("LANGUAGE_CENTER_WARM_PLATFORMS") {
            let platforms: Vec<String> = raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if !platforms.is_empty() {
                config.warm_platforms = platforms;
            }
        }

        // Application locales
        if let Ok(locale) = std::env::var("APP_LOCALE") {
            config.locale = locale;
        }
        if let Ok(locale) = std::env::var("APP_FALLBACK_LOCALE") {
            config.fallback_locale = locale;
        }

        Ok(config)
    }

    pub fn with_credentials(mut self, username: &str, password: &str) -> Self {
        self.username = username.to_string();
        self.password = password.to_string();
        self
    }

    pub fn with_update_after(mut self, update_after: Option<u64>) -> Self {
        self.update_after = update_after;
        self
    }

    pub fn with_locales(mut self, locale: &str, fallback_locale: &str) -> Self {
        self.locale = locale.to_string();
        self.fallback_locale = fallback_locale.to_string();
        self
    }
}

fn normalize_url(url: &str) -> String {
    let url = url.trim();
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{}/", url)
    }
}

/// `off`, `null`, `none` or an empty value disable periodic checks.
fn parse_update_after(raw: &str) -> Result<Option<u64>> {
    let value = raw.trim();
    match value.to_ascii_lowercase().as_str() {
        "" | "off" | "null" | "none" => Ok(None),
        _ => Ok(Some(value.parse()?)),
    }
}
