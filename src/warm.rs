//! Batch cache warming.
//!
//! Refreshes the language list, then every (language, platform) string
//! bucket, retrying transient remote failures. One failing bucket does not
//! stop the others.

use crate::error::Result;
use crate::resolver::TranslationResolver;
use crate::retry::{is_retryable, with_retry_if, RetryConfig};
use futures::future::join_all;
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, Default, Serialize)]
pub struct WarmReport {
    /// (locale, platform, strings stored)
    pub refreshed: Vec<(String, String, usize)>,
    /// (locale, platform, error)
    pub failed: Vec<(String, String, String)>,
}

impl WarmReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn total_strings(&self) -> usize {
        self.refreshed.iter().map(|(_, _, count)| count).sum()
    }
}

/// Warm with the default retry policy.
pub async fn warm_cache(resolver: &TranslationResolver, platforms: &[String]) -> Result<WarmReport> {
    warm_cache_with(resolver, platforms, &RetryConfig::warm_refresh()).await
}

/// Warm every known language for each of `platforms`.
///
/// A failed language refresh falls back to the cached language set; it only
/// fails the warm when no languages are known at all.
pub async fn warm_cache_with(
    resolver: &TranslationResolver,
    platforms: &[String],
    retry: &RetryConfig,
) -> Result<WarmReport> {
    if let Err(e) =
        with_retry_if(retry, "Refresh languages", || resolver.refresh_languages(), is_retryable).await
    {
        if !resolver.load_cached_languages()? {
            return Err(e);
        }
        warn!("Language refresh failed, warming cached languages: {}", e);
    }

    let languages = resolver.languages();
    info!(
        "Warming {} language(s) across {} platform(s)",
        languages.len(),
        platforms.len()
    );

    let jobs = languages.iter().flat_map(|locale| {
        platforms.iter().map(move |platform| async move {
            let name = format!("Refresh strings {}/{}", locale, platform);
            let result = with_retry_if(
                retry,
                &name,
                || resolver.refresh_strings(locale, platform),
                is_retryable,
            )
            .await;
            (locale.clone(), platform.clone(), result)
        })
    });

    let mut report = WarmReport::default();
    for (locale, platform, result) in join_all(jobs).await {
        match result {
            Ok(count) => {
                info!("Warmed {} string(s) for {}/{}", count, locale, platform);
                report.refreshed.push((locale, platform, count));
            }
            Err(e) => {
                warn!("Failed to warm {}/{}: {}", locale, platform, e);
                report.failed.push((locale, platform, e.to_string()));
            }
        }
    }

    Ok(report)
}
