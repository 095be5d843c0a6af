pub mod inbound;
pub mod outbound;

pub use outbound::llm;
pub use outbound::templating;
