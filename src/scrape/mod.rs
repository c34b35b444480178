pub mod cancel;
pub mod events;
pub mod orchestrator;
pub mod session;

pub use cancel::CancellationToken;
pub use events::{channel, EventSink, ScrapeEvent};
pub use orchestrator::{ScrapeOrchestrator, ScrapeRequest};
pub use session::{CategoryResult, RunState, ScrapeSession};
