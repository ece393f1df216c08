/// Database connection and table creation
pub mod database;

/// Seed envelope configuration loading from config.toml
pub mod envelopes;
