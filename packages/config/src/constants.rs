// ABOUTME: Environment variable name constants
// ABOUTME: Centralized definitions of all environment variable names used across ProposeKit

// Storage
pub const PROPOSEKIT_DATABASE_PATH: &str = "PROPOSEKIT_DATABASE_PATH";
pub const PROPOSEKIT_MAX_DB_CONNECTIONS: &str = "PROPOSEKIT_MAX_DB_CONNECTIONS";

// Content generation
pub const ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";
pub const ANTHROPIC_MODEL: &str = "ANTHROPIC_MODEL";
pub const PROPOSEKIT_GENERATION_TIMEOUT_SECS: &str = "PROPOSEKIT_GENERATION_TIMEOUT_SECS";

// Public links
pub const PROPOSEKIT_PUBLIC_BASE_URL: &str = "PROPOSEKIT_PUBLIC_BASE_URL";

// Defaults
pub const DEFAULT_DATABASE_PATH: &str = "proposekit.db";
pub const DEFAULT_MAX_DB_CONNECTIONS: u32 = 5;
pub const DEFAULT_GENERATION_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_PUBLIC_BASE_URL: &str = "https://proposekit.com";
