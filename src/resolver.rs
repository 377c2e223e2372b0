//! Translation resolver: the public entry point for looking up strings.
//!
//! A lookup walks the candidate locales, trying the synced string cache and
//! then the static string tables for each. When nothing is found the key is
//! registered with the language center, a placeholder is written to the cache,
//! and the lookup runs exactly once more. If that still finds nothing, the key
//! itself is returned.

use crate::cache::StringCache;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::language::LanguageRegistry;
use crate::loader::{lookup_item, Lines, StaticLoader, DEFAULT_NAMESPACE};
use crate::locale::LocaleContext;
use crate::metrics::ResolverMetrics;
use crate::remote::RemoteClient;
use crate::replace::make_replacements;
use crate::store::CacheStore;
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

/// What to look up: a bare key, or a key with auto-creation details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupRequest {
    Bare(String),
    Detailed {
        key: String,
        /// Placeholder registered with the remote and shown until translated.
        default_string: Option<String>,
        platform: Option<String>,
        comment: Option<String>,
    },
}

impl LookupRequest {
    pub fn detailed(key: &str) -> Self {
        LookupRequest::Detailed {
            key: key.to_string(),
            default_string: None,
            platform: None,
            comment: None,
        }
    }

    pub fn with_default_string(self, value: &str) -> Self {
        self.into_detailed(|default_string, _, _| *default_string = Some(value.to_string()))
    }

    pub fn with_platform(self, value: &str) -> Self {
        self.into_detailed(|_, platform, _| *platform = Some(value.to_string()))
    }

    pub fn with_comment(self, value: &str) -> Self {
        self.into_detailed(|_, _, comment| *comment = Some(value.to_string()))
    }

    fn into_detailed<F>(self, update: F) -> Self
    where
        F: FnOnce(&mut Option<String>, &mut Option<String>, &mut Option<String>),
    {
        let mut request = match self {
            LookupRequest::Bare(key) => LookupRequest::detailed(&key),
            detailed => detailed,
        };
        if let LookupRequest::Detailed {
            default_string,
            platform,
            comment,
            ..
        } = &mut request
        {
            update(default_string, platform, comment);
        }
        request
    }

    pub fn key(&self) -> &str {
        match self {
            LookupRequest::Bare(key) => key,
            LookupRequest::Detailed { key, .. } => key,
        }
    }

    /// Canonical form. Platform precedence: the request's own, then
    /// `platform`, then `default_platform`.
    fn into_lookup(self, platform: Option<&str>, default_platform: &str) -> Lookup {
        let (key, default_string, own_platform, comment) = match self {
            LookupRequest::Bare(key) => (key, None, None, None),
            LookupRequest::Detailed {
                key,
                default_string,
                platform,
                comment,
            } => (key, default_string, platform, comment),
        };

        Lookup {
            default_string: default_string.unwrap_or_else(|| key.clone()),
            platform: own_platform
                .or_else(|| platform.map(str::to_string))
                .unwrap_or_else(|| default_platform.to_string()),
            comment,
            key,
        }
    }
}

impl From<&str> for LookupRequest {
    fn from(key: &str) -> Self {
        LookupRequest::Bare(key.to_string())
    }
}

impl From<String> for LookupRequest {
    fn from(key: String) -> Self {
        LookupRequest::Bare(key)
    }
}

impl From<&String> for LookupRequest {
    fn from(key: &String) -> Self {
        LookupRequest::Bare(key.clone())
    }
}

#[derive(Debug, Clone)]
struct Lookup {
    key: String,
    default_string: String,
    platform: String,
    comment: Option<String>,
}

/// `namespace::group.item`, with the namespace optional.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedKey {
    pub namespace: String,
    pub group: String,
    pub item: String,
}

impl ParsedKey {
    pub fn parse(key: &str) -> Result<Self> {
        let (namespace, rest) = match key.split_once("::") {
            Some((namespace, rest)) if !namespace.is_empty() => (namespace, rest),
            _ => (DEFAULT_NAMESPACE, key),
        };

        match rest.split_once('.') {
            Some((group, item)) if !group.is_empty() => Ok(Self {
                namespace: namespace.to_string(),
                group: group.to_string(),
                item: item.to_string(),
            }),
            _ => Err(Error::InvalidKey(key.to_string())),
        }
    }

    /// Key under which the string cache and the remote know this string.
    pub fn cache_key(&self) -> String {
        format!("{}.{}", self.group, self.item)
    }
}

/// A resolved value: a string, or a non-empty array/object from a static table.
#[derive(Debug, Clone, PartialEq)]
pub enum Translation {
    Text(String),
    Array(Value),
}

impl Translation {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Translation::Text(text) => Some(text),
            Translation::Array(_) => None,
        }
    }

    pub fn into_text(self) -> Option<String> {
        match self {
            Translation::Text(text) => Some(text),
            Translation::Array(_) => None,
        }
    }
}

impl fmt::Display for Translation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Translation::Text(text) => f.write_str(text),
            Translation::Array(value) => write!(f, "{}", value),
        }
    }
}

type GroupKey = (String, String, String);

pub struct TranslationResolver {
    remote: RemoteClient,
    registry: LanguageRegistry,
    strings: StringCache,
    loader: Arc<dyn StaticLoader>,
    loaded: RwLock<HashMap<GroupKey, Lines>>,
    context: RwLock<LocaleContext>,
    platform: String,
    metrics: ResolverMetrics,
}

impl TranslationResolver {
    pub fn new(
        config: &Config,
        store: Arc<dyn CacheStore>,
        loader: Arc<dyn StaticLoader>,
    ) -> Result<Self> {
        Ok(Self {
            remote: RemoteClient::new(config)?,
            registry: LanguageRegistry::new(store.clone(), config.update_after),
            strings: StringCache::new(store, config.update_after),
            loader,
            loaded: RwLock::new(HashMap::new()),
            context: RwLock::new(LocaleContext::new(&config.locale, &config.fallback_locale)),
            platform: config.platform.clone(),
            metrics: ResolverMetrics::new(),
        })
    }

    /// Resolve with the current locale, default platform and fallback chain.
    pub async fn get(&self, key: &str, replacements: &[(&str, &str)]) -> Result<Translation> {
        self.resolve(key, replacements, None, None, true).await
    }

    /// Resolve `request` to a string or array.
    ///
    /// Fails only for keys without a `.` separator (before any I/O) and when
    /// the language center is unreachable with nothing cached yet. A key that
    /// stays missing after auto-creation comes back unchanged.
    pub async fn resolve(
        &self,
        request: impl Into<LookupRequest>,
        replacements: &[(&str, &str)],
        locale: Option<&str>,
        platform: Option<&str>,
        fallback_chain: bool,
    ) -> Result<Translation> {
        let lookup = request.into().into_lookup(platform, &self.platform);
        let key = ParsedKey::parse(&lookup.key)?;

        self.ensure_languages().await?;
        let locales = self.locale_context().candidates(locale, fallback_chain);

        if let Some(line) = self.find_line(&key, &locales, &lookup.platform, replacements).await? {
            return Ok(line);
        }

        // Missing everywhere: register it, then look once more.
        self.create_missing(&key, &lookup).await;

        if let Some(line) = self.find_line(&key, &locales, &lookup.platform, replacements).await? {
            return Ok(line);
        }

        debug!("No translation for {} in {:?}", lookup.key, locales);
        Ok(Translation::Text(lookup.key))
    }

    async fn find_line(
        &self,
        key: &ParsedKey,
        locales: &[String],
        platform: &str,
        replacements: &[(&str, &str)],
    ) -> Result<Option<Translation>> {
        let cache_key = key.cache_key();
        let languages = self.registry.languages();

        for locale in locales {
            self.strings
                .ensure_loaded(&self.remote, &languages, locale, platform)
                .await?;

            if let Some(value) = self.strings.lookup(locale, platform, &cache_key) {
                self.metrics.record_cache_hit();
                return Ok(Some(Translation::Text(make_replacements(&value, replacements))));
            }

            if let Some(line) = self.static_line(key, locale, replacements)? {
                self.metrics.record_static_hit();
                return Ok(Some(line));
            }
        }

        self.metrics.record_miss();
        Ok(None)
    }

    fn static_line(
        &self,
        key: &ParsedKey,
        locale: &str,
        replacements: &[(&str, &str)],
    ) -> Result<Option<Translation>> {
        let group_key = (key.namespace.clone(), key.group.clone(), locale.to_string());

        let cached = {
            let loaded = self.loaded.read().unwrap_or_else(|e| e.into_inner());
            loaded
                .get(&group_key)
                .map(|lines| lookup_item(lines, &key.item).cloned())
        };

        let value = match cached {
            Some(value) => value,
            None => {
                let lines = self.loader.load(&key.namespace, &key.group, locale)?;
                let value = lookup_item(&lines, &key.item).cloned();
                self.loaded
                    .write()
                    .unwrap_or_else(|e| e.into_inner())
                    .insert(group_key, lines);
                value
            }
        };

        Ok(match value {
            Some(Value::String(text)) => Some(Translation::Text(make_replacements(&text, replacements))),
            Some(Value::Array(items)) if !items.is_empty() => Some(Translation::Array(Value::Array(items))),
            Some(Value::Object(map)) if !map.is_empty() => Some(Translation::Array(Value::Object(map))),
            _ => None,
        })
    }

    /// Register a missing key remotely and cache its placeholder everywhere.
    /// Failures are logged, never returned.
    async fn create_missing(&self, key: &ParsedKey, lookup: &Lookup) {
        let cache_key = key.cache_key();

        self.metrics.record_remote_call();
        match self
            .remote
            .create_string(
                &cache_key,
                &lookup.default_string,
                &lookup.platform,
                lookup.comment.as_deref(),
            )
            .await
        {
            Ok(()) => info!("Registered missing string {} ({})", cache_key, lookup.platform),
            Err(e) => {
                self.metrics.record_remote_failure();
                warn!("Failed to register missing string {}: {}", cache_key, e);
            }
        }

        if let Err(e) = self.strings.upsert(
            None,
            &lookup.platform,
            &cache_key,
            &lookup.default_string,
            &self.registry.codenames(),
        ) {
            warn!("Failed to cache placeholder for {}: {}", cache_key, e);
        }
        self.metrics.record_string_created();
    }

    async fn ensure_languages(&self) -> Result<()> {
        let ctx = self.locale_context();
        let update = self
            .registry
            .ensure_loaded(&self.remote, Utc::now().timestamp(), &ctx)
            .await?;
        self.apply_locale_update(update);
        Ok(())
    }

    fn apply_locale_update(&self, update: Option<LocaleContext>) {
        if let Some(next) = update {
            info!("Locale set to fallback language {}", next.locale());
            *self.context.write().unwrap_or_else(|e| e.into_inner()) = next;
        }
    }

    /// Force a language refresh, bypassing the staleness check.
    pub async fn refresh_languages(&self) -> Result<()> {
        self.registry
            .refresh(&self.remote, Utc::now().timestamp())
            .await?;
        let update = self.registry.locale_update(&self.locale_context());
        self.apply_locale_update(update);
        Ok(())
    }

    /// Adopt the stored language set when none is held. Returns whether any
    /// languages are available.
    pub fn load_cached_languages(&self) -> Result<bool> {
        if !self.registry.load_cached()? {
            return Ok(false);
        }
        let update = self.registry.locale_update(&self.locale_context());
        self.apply_locale_update(update);
        Ok(true)
    }

    /// Force a string refresh of one bucket, bypassing the staleness check.
    pub async fn refresh_strings(&self, locale: &str, platform: &str) -> Result<usize> {
        self.strings.refresh(&self.remote, locale, platform).await
    }

    /// Set the current, fallback and default locale in one step.
    pub fn set_locale(&self, locale: &str) {
        self.context
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .set_locale(locale);
    }

    pub fn locale(&self) -> String {
        self.locale_context().locale().to_string()
    }

    pub fn fallback_locale(&self) -> String {
        self.locale_context().fallback().to_string()
    }

    pub fn locale_context(&self) -> LocaleContext {
        self.context.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Codenames of the known languages.
    pub fn languages(&self) -> Vec<String> {
        self.registry.codenames()
    }

    pub fn default_platform(&self) -> &str {
        &self.platform
    }

    pub fn metrics(&self) -> &ResolverMetrics {
        &self.metrics
    }
}
