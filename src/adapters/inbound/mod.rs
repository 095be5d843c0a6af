//! Inbound adapters translate external stimuli (CLI/HTTP) into session calls.

pub mod cli;
pub mod server;
