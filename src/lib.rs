pub mod analyzer;
pub mod catalog;
pub mod config;
pub mod mood;
pub mod provider;
pub mod recommend;
pub mod server;
pub mod similarity;
pub mod track;

/// Application name for XDG paths
pub const APP_NAME: &str = "moodtune";
