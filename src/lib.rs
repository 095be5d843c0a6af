#![warn(clippy::uninlined_format_args)]

pub mod adapters;
pub mod application;
pub mod config;
pub mod core;
pub mod demos;
pub mod paths;
pub mod viz;

pub use crate::adapters::inbound::cli::{Cli, Commands};
pub use crate::config::VizConfig;
pub use crate::core::ports::{ProgressSink, Workflow};
pub use crate::viz::{Viz, run};
