//! Paginated question generation.

mod client;
mod orchestrator;
mod plan;

pub use client::{GenerationRequest, HttpQuestionGenerator, QuestionGenerator};
pub use orchestrator::{
    GenerationNotice, GenerationReport, GenerationStatus, OrchestratorConfig, PageState,
    PageStatus, QuestionOrchestrator,
};
pub use plan::GenerationPlan;
