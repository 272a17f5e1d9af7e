//! Post-deadline grading pipeline: service adapters, result persistence, the
//! grading orchestrator, and the task queue and scheduler that drive it.

pub mod activation;
pub mod clients;
pub mod error;
pub mod extraction;
pub mod orchestrator;
pub mod persistence;
pub mod pipeline;
pub mod queue;
pub mod scheduler;
pub mod scoring;

pub use error::{GradingError, GradingResult};
pub use orchestrator::{EvaluationOutcome, EvaluationSummary, GradingOrchestrator};
pub use pipeline::GradingPipeline;
pub use queue::{Job, JobHandler, QueueStats, RetryPolicy, TaskQueue};
pub use scheduler::Scheduler;
