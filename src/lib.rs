//! Localized string resolution backed by a remote language center.
//!
//! Lookups try the synced string cache first and the static string tables
//! second, walking the locale fallback chain. Missing keys are registered
//! with the language center so translators can fill them in.
//!
//! # Example
//!
//! ```rust,ignore
//! use language_center::{Config, FileStore, JsonFileLoader, TranslationResolver};
//! use std::sync::Arc;
//!
//! let config = Config::from_env()?;
//! let resolver = TranslationResolver::new(
//!     &config,
//!     Arc::new(FileStore::new(&config.cache_path)),
//!     Arc::new(JsonFileLoader::new(&config.lang_path)),
//! )?;
//!
//! let line = resolver.get("greeting.hello", &[("name", "Sam")]).await?;
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod language;
pub mod loader;
pub mod locale;
pub mod metrics;
pub mod remote;
pub mod replace;
pub mod resolver;
pub mod retry;
pub mod scheduler;
pub mod store;
pub mod warm;

pub use cache::{StringEntry, StringTable};
pub use config::Config;
pub use error::{Error, Result};
pub use language::Language;
pub use loader::{JsonFileLoader, MemoryLoader, StaticLoader};
pub use locale::LocaleContext;
pub use metrics::{MetricsReport, ResolverMetrics};
pub use resolver::{LookupRequest, Translation, TranslationResolver};
pub use store::{CacheStore, FileStore, MemoryStore};
pub use warm::{warm_cache, WarmReport};
