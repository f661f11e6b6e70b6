pub mod cli;
pub mod config;
pub mod generator;
pub mod llm;

// Re-export commonly used types
pub use config::Config;
pub use generator::workflow::{CancelFlag, PipelineError, PipelineRunner, launch};
