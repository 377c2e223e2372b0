use anyhow::{bail, Context, Result};
use language_center::{
    config::Config, scheduler, warm_cache, FileStore, JsonFileLoader, TranslationResolver,
};
use std::sync::Arc;
use tracing::{info, warn};

const USAGE: &str = "Usage:
  language-center cache [platform...]   Refresh languages and strings
  language-center get <key> [locale]    Resolve one key
  language-center schedule <cron>       Re-warm the cache on a cron schedule";

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("language_center=info".parse()?),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some((command, rest)) = args.split_first() else {
        bail!("{}", USAGE);
    };

    // Load configuration from environment
    let config = Config::from_env()?;
    let resolver = Arc::new(
        TranslationResolver::new(
            &config,
            Arc::new(FileStore::new(&config.cache_path)),
            Arc::new(JsonFileLoader::new(&config.lang_path)),
        )
        .context("Failed to create resolver")?,
    );

    match command.as_str() {
        "cache" => {
            let platforms = if rest.is_empty() {
                config.warm_platforms.clone()
            } else {
                rest.to_vec()
            };

            info!("Warming cache for platforms: {}", platforms.join(", "));
            let report = warm_cache(&resolver, &platforms).await?;

            for (locale, platform, error) in &report.failed {
                warn!("✗ {}/{}: {}", locale, platform, error);
            }
            info!(
                "✓ Cached {} strings in {} bucket(s)",
                report.total_strings(),
                report.refreshed.len()
            );

            if !report.is_complete() {
                bail!("{} bucket(s) failed to refresh", report.failed.len());
            }
        }
        "get" => {
            let Some(key) = rest.first() else {
                bail!("{}", USAGE);
            };
            let locale = rest.get(1).map(String::as_str);

            let line = resolver
                .resolve(key, &[], locale, None, true)
                .await
                .with_context(|| format!("Failed to resolve {}", key))?;
            println!("{}", line);
        }
        "schedule" => {
            let Some(cron) = rest.first() else {
                bail!("{}", USAGE);
            };

            let mut scheduler =
                scheduler::start_warm_scheduler(resolver, config.warm_platforms.clone(), cron)
                    .await?;

            tokio::signal::ctrl_c()
                .await
                .context("Failed to listen for shutdown signal")?;
            info!("Shutting down scheduler");
            scheduler.shutdown().await?;
        }
        other => bail!("Unknown command: {}\n{}", other, USAGE),
    }

    Ok(())
}
