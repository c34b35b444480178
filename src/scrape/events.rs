use crate::scrape::session::RunState;
use crate::types::{ProductRecord, Severity};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Everything a running scrape tells the outside world.
#[derive(Debug, Clone)]
pub enum ScrapeEvent {
    Log { message: String, severity: Severity },
    Progress { done: usize, total: usize },
    StatusChanged(String),
    /// Emitted once per processed category, also when it produced nothing.
    CategoryRecords {
        category: String,
        records: Vec<ProductRecord>,
    },
    RunFinished {
        records: Vec<ProductRecord>,
        state: RunState,
    },
    RunFailed(String),
}

impl ScrapeEvent {
    /// Completed share of the run, `0.0..=1.0`, for progress events.
    pub fn fraction(&self) -> Option<f64> {
        match self {
            ScrapeEvent::Progress { total: 0, .. } => Some(1.0),
            ScrapeEvent::Progress { done, total } => Some(*done as f64 / *total as f64),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ScrapeEvent::RunFinished { .. } | ScrapeEvent::RunFailed(_)
        )
    }
}

/// One-way event output. Implementations must not block the worker.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: ScrapeEvent);
}

impl EventSink for mpsc::UnboundedSender<ScrapeEvent> {
    fn emit(&self, event: ScrapeEvent) {
        // a dropped receiver just means nobody is listening anymore
        let _ = self.send(event);
    }
}

pub fn channel() -> (Arc<dyn EventSink>, mpsc::UnboundedReceiver<ScrapeEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Arc::new(tx), rx)
}
