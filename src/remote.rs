//! HTTP boundary to the remote language center.
//!
//! No caching and no retries happen here; callers decide what a failure means.

use crate::cache::StringEntry;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::language::Language;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct RemoteClient {
    client: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
}

impl RemoteClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            base_url: config.url.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    /// `GET {base}languages?timestamp=on`
    pub async fn list_languages(&self) -> Result<Vec<Language>> {
        let url = format!("{}languages", self.base_url);
        debug!("Fetching languages from {}", url);

        let response = self
            .client
            .get(&url)
            .basic_auth(&self.username, Some(&self.password))
            .query(&[("timestamp", "on")])
            .send()
            .await?;

        let response = ensure_success(response).await?;
        Ok(response.json().await?)
    }

    /// `GET {base}strings?platform={platform}&language={locale}`
    pub async fn list_strings(&self, locale: &str, platform: &str) -> Result<Vec<StringEntry>> {
        let url = format!("{}strings", self.base_url);
        debug!("Fetching strings for {}/{}", locale, platform);

        let response = self
            .client
            .get(&url)
            .basic_auth(&self.username, Some(&self.password))
            .query(&[("platform", platform), ("language", locale)])
            .send()
            .await?;

        let response = ensure_success(response).await?;
        Ok(response.json().await?)
    }

    /// `POST {base}string` registering `key` so a translator can fill it in.
    ///
    /// The key is validated before any request is made.
    pub async fn create_string(
        &self,
        key: &str,
        value: &str,
        platform: &str,
        comment: Option<&str>,
    ) -> Result<()> {
        let (category, name) = split_key(key)?;
        let url = format!("{}string", self.base_url);
        debug!("Creating string {} ({}) on {}", key, platform, url);

        let mut form = vec![
            ("platform", platform),
            ("category", category.as_str()),
            ("key", name.as_str()),
            ("value", value),
        ];
        if let Some(comment) = comment {
            form.push(("comment", comment));
        }

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.username, Some(&self.password))
            .form(&form)
            .send()
            .await?;

        ensure_success(response).await?;
        Ok(())
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
    Err(Error::RemoteStatus { status, body })
}

/// Split `group.item` into the display category and name the API expects.
///
/// `user_profile.first_name` becomes `("User profile", "First name")`.
pub fn split_key(key: &str) -> Result<(String, String)> {
    match key.find('.') {
        Some(pos) if pos > 0 => Ok((
            humanize(&key[..pos]),
            humanize(&key[pos + 1..]),
        )),
        _ => Err(Error::InvalidKey(key.to_string())),
    }
}

fn humanize(segment: &str) -> String {
    let mut chars = segment.chars();
    let capitalized = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
        None => String::new(),
    };
    capitalized.replace('_', " ")
}
