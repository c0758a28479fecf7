//! Fire-and-forget background jobs.
//!
//! Submit hands work to the tokio runtime and returns immediately; there is
//! no cancellation and no retry. Callers observe a job only through the
//! progress store under its token.

use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::import::progress::ProgressStore;

#[derive(Clone)]
pub struct JobQueue {
    progress: Arc<dyn ProgressStore>,
}

impl JobQueue {
    pub fn new(progress: Arc<dyn ProgressStore>) -> Self {
        Self { progress }
    }

    /// Detach a job. On failure the progress entry is rewritten with a
    /// terminal `Failed: ...` message (keeping the last observed percent) so
    /// pollers never see a silently stalled import. The handle is returned
    /// for tests; API callers discard it.
    pub fn submit<F>(&self, kind: &'static str, token: String, fut: F) -> JoinHandle<()>
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let progress = self.progress.clone();
        tokio::spawn(async move {
            info!(job = kind, token = %token, "starting job");
            match fut.await {
                Ok(()) => info!(job = kind, token = %token, "job finished"),
                Err(e) => {
                    error!(job = kind, token = %token, error = %e, "job failed");
                    let (pct, _) = progress.get(&token).await;
                    progress.set(&token, pct, &format!("Failed: {e}")).await;
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::progress::InMemoryProgress;
    use anyhow::anyhow;

    #[tokio::test]
    async fn failed_job_writes_terminal_state() {
        let progress: Arc<dyn ProgressStore> = Arc::new(InMemoryProgress::new());
        let queue = JobQueue::new(progress.clone());

        progress.set("t1", 40, "Processed 4/10").await;
        queue
            .submit("csv_import", "t1".to_string(), async {
                Err(anyhow!("disk on fire"))
            })
            .await
            .unwrap();

        let (pct, msg) = progress.get("t1").await;
        assert_eq!(pct, 40);
        assert_eq!(msg, "Failed: disk on fire");
    }

    #[tokio::test]
    async fn successful_job_leaves_progress_untouched() {
        let progress: Arc<dyn ProgressStore> = Arc::new(InMemoryProgress::new());
        let queue = JobQueue::new(progress.clone());

        progress.set("t1", 100, "Completed").await;
        queue
            .submit("csv_import", "t1".to_string(), async { Ok(()) })
            .await
            .unwrap();

        assert_eq!(progress.get("t1").await, (100, "Completed".to_string()));
    }
}
