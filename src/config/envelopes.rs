//! Seed envelope configuration loading from config.toml
//!
//! The envelopes defined in config.toml are used to seed the database at
//! tenant initialization or when envelopes are missing. Seeding is keyed by
//! envelope name and is idempotent.

use crate::entities::EnvelopeKind;
use crate::errors::{Error, Result};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Tenant the seed set belongs to
    pub tenant: String,
    /// List of envelope configurations to seed
    pub envelopes: Vec<EnvelopeConfig>,
}

/// Configuration for a single envelope
#[derive(Debug, Deserialize, Clone)]
pub struct EnvelopeConfig {
    /// Name of the envelope
    pub name: String,
    /// Display icon
    #[serde(default)]
    pub icon: String,
    /// Whether the envelope resets monthly or accumulates yearly
    pub kind: EnvelopeKind,
    /// Stable role tag (e.g., `"carry_over"`), if any
    #[serde(default)]
    pub role: Option<String>,
    /// Budget ceiling (monthly) or goal target (yearly)
    pub planned_amount: f64,
}

/// Loads envelope configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - Required fields are missing
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads envelope configuration from the default location (./config.toml)
pub fn load_default_config() -> Result<Config> {
    load_config("config.toml")
}

/// Seeds the configured envelopes for the configured tenant.
///
/// Envelopes are matched by name; existing ones are left untouched so a
/// re-run never clobbers live balances.
pub async fn seed_envelopes(db: &DatabaseConnection, config: &Config) -> Result<usize> {
    let mut created = 0;

    for seed in &config.envelopes {
        let existing =
            crate::core::envelope::get_envelope_by_name(db, &config.tenant, &seed.name).await?;
        if existing.is_some() {
            continue;
        }

        crate::core::envelope::create_envelope(
            db,
            &config.tenant,
            seed.name.clone(),
            seed.icon.clone(),
            seed.kind,
            seed.role.clone(),
            seed.planned_amount,
        )
        .await?;
        info!(envelope = %seed.name, "Seeded envelope");
        created += 1;
    }

    Ok(created)
}
