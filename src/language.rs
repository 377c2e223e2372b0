//! Language registry: the set of locales known to the language center.
//!
//! Languages are held in memory, mirrored to the durable store, and refreshed
//! from the remote API once the configured update interval has passed.

use crate::error::Result;
use crate::locale::LocaleContext;
use crate::remote::RemoteClient;
use crate::store::{CacheStore, LANGUAGES_KEY, LANGUAGES_TIMESTAMP_KEY};
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

/// A language as reported by the language center.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    pub codename: String,

    #[serde(default, deserialize_with = "flag")]
    pub is_fallback: bool,

    /// Unix seconds of the last edit to any string in this language.
    #[serde(default, deserialize_with = "nullable_timestamp")]
    pub timestamp: i64,
}

fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
        Null(Option<()>),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(value) => value,
        Flag::Int(value) => value != 0,
        Flag::Null(_) => false,
    })
}

fn nullable_timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    Ok(Option::<i64>::deserialize(deserializer)?.unwrap_or(0))
}

#[derive(Debug, Default)]
struct RegistryState {
    languages: Vec<Language>,
    /// Fallback codename last handed out as a locale update.
    applied_fallback: Option<String>,
}

pub struct LanguageRegistry {
    store: Arc<dyn CacheStore>,
    update_after: Option<u64>,
    state: RwLock<RegistryState>,
    refresh_lock: tokio::sync::Mutex<()>,
}

impl LanguageRegistry {
    pub fn new(store: Arc<dyn CacheStore>, update_after: Option<u64>) -> Self {
        Self {
            store,
            update_after,
            state: RwLock::new(RegistryState::default()),
            refresh_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Make sure languages are available, loading or refreshing as needed.
    ///
    /// The first call adopts the stored snapshot, or fetches from the remote
    /// when nothing is stored (a failure then propagates). Later calls only
    /// re-check staleness. Returns a new locale context when the flagged
    /// fallback language differs from the one previously applied.
    pub async fn ensure_loaded(
        &self,
        remote: &RemoteClient,
        now: i64,
        ctx: &LocaleContext,
    ) -> Result<Option<LocaleContext>> {
        if !self.is_loaded() {
            let _guard = self.refresh_lock.lock().await;
            if !self.load_cached()? {
                info!("No cached languages, fetching from language center");
                self.fetch(remote, now).await?;
            }
        }

        self.refresh_if_stale(remote, now).await?;
        Ok(self.locale_update(ctx))
    }

    /// Adopt the stored language set when none is held yet. Returns whether
    /// languages are available afterwards.
    pub fn load_cached(&self) -> Result<bool> {
        if self.is_loaded() {
            return Ok(true);
        }

        match self.store.get_as::<Vec<Language>>(LANGUAGES_KEY)? {
            Some(languages) if !languages.is_empty() => {
                debug!("Loaded {} languages from cache", languages.len());
                self.replace(languages);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Refresh when `now - update_after` is past the stored refresh time.
    ///
    /// A failed refresh keeps the existing languages and timestamp; it only
    /// propagates when there is nothing to fall back on. Returns whether a
    /// refresh happened.
    pub async fn refresh_if_stale(&self, remote: &RemoteClient, now: i64) -> Result<bool> {
        let Some(update_after) = self.update_after else {
            return Ok(false);
        };

        let threshold = now.saturating_sub(i64::try_from(update_after).unwrap_or(i64::MAX));
        if threshold <= self.last_refreshed()? {
            return Ok(false);
        }

        let _guard = self.refresh_lock.lock().await;
        // Another task may have refreshed while we waited.
        if threshold <= self.last_refreshed()? {
            return Ok(false);
        }

        match self.fetch(remote, now).await {
            Ok(()) => Ok(true),
            Err(e) if self.is_loaded() => {
                warn!("Language refresh failed, keeping cached languages: {}", e);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Unconditional refresh from the remote API.
    pub async fn refresh(&self, remote: &RemoteClient, now: i64) -> Result<()> {
        let _guard = self.refresh_lock.lock().await;
        self.fetch(remote, now).await
    }

    async fn fetch(&self, remote: &RemoteClient, now: i64) -> Result<()> {
        let languages = remote.list_languages().await?;

        self.store.put_as(LANGUAGES_KEY, &languages)?;
        self.store.put_as(LANGUAGES_TIMESTAMP_KEY, &now)?;

        info!("Refreshed {} languages from language center", languages.len());
        self.replace(languages);
        Ok(())
    }

    fn replace(&self, languages: Vec<Language>) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.languages = languages;
    }

    fn last_refreshed(&self) -> Result<i64> {
        Ok(self
            .store
            .get_as::<i64>(LANGUAGES_TIMESTAMP_KEY)?
            .unwrap_or(0))
    }

    /// The flagged fallback, when it changed since it was last applied.
    pub fn locale_update(&self, ctx: &LocaleContext) -> Option<LocaleContext> {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());

        // With several flagged languages the last one wins.
        let flagged = state
            .languages
            .iter()
            .filter(|language| language.is_fallback)
            .last()
            .map(|language| language.codename.clone())?;

        if state.applied_fallback.as_deref() == Some(flagged.as_str()) {
            return None;
        }

        debug!("Fallback language is now {}", flagged);
        state.applied_fallback = Some(flagged.clone());
        Some(ctx.with_locale(&flagged))
    }

    pub fn is_loaded(&self) -> bool {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        !state.languages.is_empty()
    }

    pub fn languages(&self) -> Vec<Language> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.languages.clone()
    }

    pub fn codenames(&self) -> Vec<String> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.languages.iter().map(|l| l.codename.clone()).collect()
    }
}
