#[macro_use]
pub mod wire;
pub mod activities;
pub mod adapters;
pub mod combined;
pub mod highlight;
pub mod keyword;
pub mod orchestrator;
pub mod runner;
pub mod sentence;

pub use orchestrator::{QueryObject, QueryObjectImpl};
pub use runner::{QueryPipelineWorkflow, QueryPipelineWorkflowImpl, VideoPipelineWorkflow, VideoPipelineWorkflowImpl};
