use crate::resolver::TranslationResolver;
use crate::warm::warm_cache;
use anyhow::Result;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

/// Start a scheduler that re-warms the string cache on `cron`.
///
/// Cron format: "second minute hour day month day_of_week".
pub async fn start_warm_scheduler(
    resolver: Arc<TranslationResolver>,
    platforms: Vec<String>,
    cron: &str,
) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    info!("Scheduling cache warm (cron: {})", cron);

    let job = Job::new_async(cron, move |_uuid, _l| {
        let resolver = Arc::clone(&resolver);
        let platforms = platforms.clone();

        Box::pin(async move {
            info!("⏰ Scheduled cache warm triggered");
            match warm_cache(&resolver, &platforms).await {
                Ok(report) if report.is_complete() => {
                    info!("✓ Warmed {} strings", report.total_strings());
                }
                Ok(report) => {
                    warn!(
                        "Cache warm finished with {} failed bucket(s)",
                        report.failed.len()
                    );
                }
                Err(e) => error!("Scheduled cache warm failed: {}", e),
            }
        })
    })?;

    scheduler.add(job).await?;
    scheduler.start().await?;
    info!("✓ Scheduler started");

    Ok(scheduler)
}
