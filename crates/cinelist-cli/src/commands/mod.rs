pub mod browse;
pub mod config;
pub mod list;
pub mod membership;
pub mod prompts;
pub mod session;
pub mod ui;
