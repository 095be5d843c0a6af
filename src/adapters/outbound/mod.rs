pub mod llm;
pub mod templating;
