pub mod activity;
pub mod agent;
pub mod config;
pub mod error;
pub mod precedents;
pub mod prompts;
pub mod research;
pub mod state;
pub mod stream;
pub mod types;

pub use types::*;
