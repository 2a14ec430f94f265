//! Provider-agnostic LLM client used for structured extraction over transcripts.
//!
//! Both providers expose the same shape: `extract::<T>(...)` for schema-validated
//! JSON output, plus `chat_completion`/`complete` for free-text prompts.

pub mod claude;
pub mod openai;
pub mod util;

pub use claude::Claude;
pub use openai::{OpenAi, StructuredOutput};
