// ABOUTME: Configuration for ProposeKit
// ABOUTME: Environment variable names and the Settings value built from them

pub mod constants;
pub mod settings;

pub use settings::{ConfigError, Settings};
