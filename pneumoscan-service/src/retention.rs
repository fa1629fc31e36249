use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::{analysis::AnalysisStore, uploads::UploadStore};

/// Shortest sweep period the sweeper will run with.
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy)]
pub struct RetentionPolicy {
    /// Files and analyses older than this are removed.
    pub max_age: Duration,
    pub sweep_interval: Duration,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub files_removed: usize,
    pub analyses_evicted: usize,
}

pub async fn sweep_once(
    uploads: &UploadStore,
    analyses: &dyn AnalysisStore,
    max_age: Duration,
) -> SweepReport {
    let files_removed = match uploads.remove_older_than(max_age).await {
        Ok(count) => count,
        Err(e) => {
            error!("Failed to sweep {}: {}", uploads.dir().display(), e);
            0
        }
    };
    let analyses_evicted = analyses.evict_older_than(max_age).await;

    SweepReport {
        files_removed,
        analyses_evicted,
    }
}

/// Sweep immediately, then every `policy.sweep_interval`.
pub fn spawn_sweeper(
    uploads: Arc<UploadStore>,
    analyses: Arc<dyn AnalysisStore>,
    policy: RetentionPolicy,
) -> JoinHandle<()> {
    info!(
        "Retention: removing uploads and analyses older than {:?}, sweeping every {:?}",
        policy.max_age, policy.sweep_interval
    );

    let period = policy.sweep_interval.max(MIN_SWEEP_INTERVAL);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            let report = sweep_once(&uploads, analyses.as_ref(), policy.max_age).await;
            if report == SweepReport::default() {
                debug!("Retention sweep removed 0 files and 0 analyses");
            } else {
                info!(
                    "Retention sweep removed {} files and {} analyses",
                    report.files_removed, report.analyses_evicted
                );
            }
        }
    })
}
