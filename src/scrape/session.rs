use crate::types::ProductRecord;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Stopped,
    Failed,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Completed | RunState::Stopped | RunState::Failed)
    }
}

/// Outcome of one category. Failures show up as an empty `records` list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryResult {
    pub category: String,
    pub url: Option<String>,
    pub located: usize,
    pub records: Vec<ProductRecord>,
    pub screenshot: Option<PathBuf>,
}

impl CategoryResult {
    pub fn empty(category: &str) -> Self {
        Self {
            category: category.to_string(),
            url: None,
            located: 0,
            records: Vec::new(),
            screenshot: None,
        }
    }
}

/// Aggregated state of one run, owned by the orchestrator while it runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeSession {
    pub id: Uuid,
    pub site: String,
    pub started_at: DateTime<Local>,
    pub finished_at: Option<DateTime<Local>>,
    pub state: RunState,
    pub results: Vec<CategoryResult>,
}

impl ScrapeSession {
    pub fn new(site: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            site: site.to_string(),
            started_at: Local::now(),
            finished_at: None,
            state: RunState::Idle,
            results: Vec::new(),
        }
    }

    pub fn start(&mut self) {
        self.started_at = Local::now();
        self.state = RunState::Running;
    }

    pub fn push(&mut self, result: CategoryResult) {
        self.results.push(result);
    }

    pub fn finish(&mut self, state: RunState) {
        self.state = state;
        self.finished_at = Some(Local::now());
    }

    pub fn records(&self) -> Vec<ProductRecord> {
        self.results
            .iter()
            .flat_map(|r| r.records.iter().cloned())
            .collect()
    }

    pub fn record_count(&self) -> usize {
        self.results.iter().map(|r| r.records.len()).sum()
    }
}
