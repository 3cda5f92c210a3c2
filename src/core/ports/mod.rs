pub mod classifier;
pub mod emitter;
pub mod llm;
