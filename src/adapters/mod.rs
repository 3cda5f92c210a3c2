pub mod classifier;
pub mod config;
pub mod emitter;
pub mod llm;
