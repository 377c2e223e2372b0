//! String cache: locale -> platform -> key -> value, mirrored in memory and
//! persisted to the durable store as one snapshot.
//!
//! Buckets are refreshed when a language reports edits newer than the last
//! sync of that locale. A refresh replaces the whole (locale, platform) bucket;
//! a failed refresh leaves the previous snapshot untouched.

use crate::error::Result;
use crate::language::Language;
use crate::remote::RemoteClient;
use crate::store::{locale_timestamp_key, CacheStore, STRINGS_KEY};
use chrono::Utc;
use futures::future::join_all;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, info, warn};

/// One string as returned by the language center.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringEntry {
    pub key: String,

    #[serde(default, deserialize_with = "nullable_string")]
    pub value: String,

    /// Locale the server says this string belongs to.
    #[serde(default)]
    pub language: String,
}

fn nullable_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

type Bucket = BTreeMap<String, String>;

/// The cached strings of every locale and platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StringTable(BTreeMap<String, BTreeMap<String, Bucket>>);

impl StringTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, locale: &str, platform: &str, key: &str) -> Option<&str> {
        self.0
            .get(locale)
            .and_then(|platforms| platforms.get(platform))
            .and_then(|bucket| bucket.get(key))
            .map(String::as_str)
    }

    pub fn insert(&mut self, locale: &str, platform: &str, key: &str, value: &str) {
        self.0
            .entry(locale.to_string())
            .or_default()
            .entry(platform.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
    }

    pub fn has_bucket(&self, locale: &str, platform: &str) -> bool {
        self.0
            .get(locale)
            .is_some_and(|platforms| platforms.contains_key(platform))
    }

    pub fn locales(&self) -> Vec<String> {
        self.0.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Write `entry` under the locale it was fetched for and under the locale
    /// the server reported for it. The two may differ.
    pub fn record_entry(&mut self, entry: &StringEntry, platform: &str, also_under: &str) {
        self.insert(also_under, platform, &entry.key, &entry.value);
        if !entry.language.is_empty() && entry.language != also_under {
            self.insert(&entry.language, platform, &entry.key, &entry.value);
        }
    }

    /// Replace the (locale, platform) bucket with `entries`.
    pub fn replace_bucket(&mut self, locale: &str, platform: &str, entries: &[StringEntry]) {
        self.0
            .entry(locale.to_string())
            .or_default()
            .insert(platform.to_string(), Bucket::new());

        for entry in entries {
            self.record_entry(entry, platform, locale);
        }
    }
}

pub struct StringCache {
    store: Arc<dyn CacheStore>,
    update_after: Option<u64>,
    table: RwLock<StringTable>,
    loaded: RwLock<bool>,
    bucket_locks: Mutex<HashMap<(String, String), Arc<tokio::sync::Mutex<()>>>>,
}

impl StringCache {
    pub fn new(store: Arc<dyn CacheStore>, update_after: Option<u64>) -> Self {
        Self {
            store,
            update_after,
            table: RwLock::new(StringTable::new()),
            loaded: RwLock::new(false),
            bucket_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Sweep every known language for staleness, refresh what is stale, then
    /// reload the snapshot from the store.
    ///
    /// A language is stale when it reports edits newer than its last sync.
    /// The requested locale is also fetched when its platform bucket was never
    /// synced, even with periodic checks disabled. Refresh failures are logged
    /// and the previous snapshot kept; one only propagates when it hit the
    /// requested locale and left it without a bucket.
    pub async fn ensure_loaded(
        &self,
        remote: &RemoteClient,
        languages: &[Language],
        locale: &str,
        platform: &str,
    ) -> Result<()> {
        if !*self.loaded.read().unwrap_or_else(|e| e.into_inner()) {
            self.load_snapshot()?;
        }

        let mut stale = Vec::new();
        for language in languages {
            if self.needs_refresh(language, locale, platform)? {
                stale.push(language);
            }
        }

        let results = join_all(
            stale
                .iter()
                .map(|language| self.refresh_if_stale(remote, language, locale, platform)),
        )
        .await;

        for (language, result) in stale.iter().zip(results) {
            let Err(e) = result else { continue };

            let unserved = language.codename == locale && !self.has_bucket(locale, platform);
            if unserved && e.is_remote() {
                return Err(e);
            }
            warn!(
                "Failed to refresh strings for {}/{}, using cached copy: {}",
                language.codename, platform, e
            );
        }

        self.load_snapshot()
    }

    /// Fetch the (locale, platform) bucket and replace it.
    ///
    /// On error nothing is written; the caller decides whether to log it.
    pub async fn refresh(&self, remote: &RemoteClient, locale: &str, platform: &str) -> Result<usize> {
        let lock = self.bucket_lock(locale, platform);
        let _guard = lock.lock().await;
        self.fetch_bucket(remote, locale, platform).await
    }

    async fn refresh_if_stale(
        &self,
        remote: &RemoteClient,
        language: &Language,
        requested: &str,
        platform: &str,
    ) -> Result<bool> {
        let lock = self.bucket_lock(&language.codename, platform);
        let _guard = lock.lock().await;

        // A concurrent sweep may have synced this bucket while we waited.
        if !self.needs_refresh(language, requested, platform)? {
            return Ok(false);
        }

        self.fetch_bucket(remote, &language.codename, platform).await?;
        Ok(true)
    }

    async fn fetch_bucket(&self, remote: &RemoteClient, locale: &str, platform: &str) -> Result<usize> {
        let entries = remote.list_strings(locale, platform).await?;
        self.commit_bucket(locale, platform, &entries)?;

        info!("Synced {} strings for {}/{}", entries.len(), locale, platform);
        Ok(entries.len())
    }

    fn commit_bucket(&self, locale: &str, platform: &str, entries: &[StringEntry]) -> Result<()> {
        let mut table = self.table.write().unwrap_or_else(|e| e.into_inner());
        let mut next = table.clone();
        next.replace_bucket(locale, platform, entries);

        self.store.put_as(STRINGS_KEY, &next)?;
        self.store
            .put_as(&locale_timestamp_key(locale), &Utc::now().timestamp())?;

        *table = next;
        Ok(())
    }

    fn needs_refresh(&self, language: &Language, requested: &str, platform: &str) -> Result<bool> {
        if self.update_after.is_some() {
            let synced = self
                .store
                .get_as::<i64>(&locale_timestamp_key(&language.codename))?
                .unwrap_or(0);
            if language.timestamp > synced {
                return Ok(true);
            }
        }

        Ok(language.codename == requested && !self.has_bucket(requested, platform))
    }

    fn has_bucket(&self, locale: &str, platform: &str) -> bool {
        let table = self.table.read().unwrap_or_else(|e| e.into_inner());
        table.has_bucket(locale, platform)
    }

    fn bucket_lock(&self, locale: &str, platform: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.bucket_locks.lock().unwrap_or_else(|e| e.into_inner());
        locks
            .entry((locale.to_string(), platform.to_string()))
            .or_default()
            .clone()
    }

    fn load_snapshot(&self) -> Result<()> {
        if let Some(snapshot) = self.store.get_as::<StringTable>(STRINGS_KEY)? {
            *self.table.write().unwrap_or_else(|e| e.into_inner()) = snapshot;
        }
        *self.loaded.write().unwrap_or_else(|e| e.into_inner()) = true;
        Ok(())
    }

    /// In-memory read; never touches the store or the network.
    pub fn lookup(&self, locale: &str, platform: &str, key: &str) -> Option<String> {
        let table = self.table.read().unwrap_or_else(|e| e.into_inner());
        let value = table.get(locale, platform, key).map(str::to_string);
        debug!(
            "Cache {} for {}/{}/{}",
            if value.is_some() { "hit" } else { "miss" },
            locale,
            platform,
            key
        );
        value
    }

    /// Write one value and persist.
    ///
    /// Without a locale the value goes into every locale in the snapshot plus
    /// every locale in `known_locales`.
    pub fn upsert(
        &self,
        locale: Option<&str>,
        platform: &str,
        key: &str,
        value: &str,
        known_locales: &[String],
    ) -> Result<()> {
        let mut table = self.table.write().unwrap_or_else(|e| e.into_inner());

        let locales: BTreeSet<String> = match locale {
            Some(locale) => BTreeSet::from([locale.to_string()]),
            None => table
                .locales()
                .into_iter()
                .chain(known_locales.iter().cloned())
                .collect(),
        };

        let mut next = table.clone();
        for locale in &locales {
            next.insert(locale, platform, key, value);
        }

        self.store.put_as(STRINGS_KEY, &next)?;
        *table = next;
        Ok(())
    }

    pub fn snapshot(&self) -> StringTable {
        self.table.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}
