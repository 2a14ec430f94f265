pub mod activities;
pub mod config;
pub mod deps;
pub mod error;
pub mod types;

pub use activities::{Transcriber, VideoDownloader, VideoSearcher};
pub use config::AppConfig;
pub use deps::PipelineDeps;
pub use error::{PipelineError, PipelineResult};
pub use types::*;
