pub mod client;
pub mod config;
pub mod terminal;

pub use client::{ClientError, JobOutcome, Session};
pub use config::ClientConfig;
