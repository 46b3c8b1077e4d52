//! Teacher-side polling of aggregated quiz results.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::QuizResultsReport;
use crate::backend::Backend;
use crate::protocol::Id;

/// Polls `/quiz-results/:id` while alive, keeping the last good report.
pub struct ResultsPoller {
    quiz_id: Id,
    latest: watch::Receiver<Option<QuizResultsReport>>,
    task: JoinHandle<()>,
}

impl ResultsPoller {
    pub fn spawn(backend: Arc<dyn Backend>, quiz_id: Id, period: Duration) -> Self {
        let (tx, latest) = watch::channel(None);
        let id = quiz_id.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                match backend.quiz_results(&id).await {
                    Ok(report) => {
                        debug!(
                            "Quiz {} has {} submissions",
                            id, report.stats.total_submissions
                        );
                        tx.send_replace(Some(report));
                    }
                    Err(e) => warn!("Failed to fetch quiz results for {}: {}", id, e),
                }
            }
        });

        Self {
            quiz_id,
            latest,
            task,
        }
    }

    pub fn quiz_id(&self) -> &Id {
        &self.quiz_id
    }

    pub fn latest(&self) -> Option<QuizResultsReport> {
        self.latest.borrow().clone()
    }
}

impl Drop for ResultsPoller {
    fn drop(&mut self) {
        self.task.abort();
    }
}
