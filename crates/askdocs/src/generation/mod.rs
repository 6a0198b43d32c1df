//! Prompt assembly and answer generation

pub mod citation;
pub mod client;
pub mod context;
pub mod prompt;

pub use citation::build_references;
pub use client::GenerationClient;
pub use context::format_context;
pub use prompt::{Prompt, PromptAssembler, PromptTemplate};
