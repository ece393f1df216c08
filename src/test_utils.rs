//! Shared test utilities.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    core::envelope::{create_envelope, get_envelope_by_id},
    entities::{EnvelopeKind, envelope},
    errors::{Error, Result},
};
use chrono::{DateTime, TimeZone, Utc};
use sea_orm::DatabaseConnection;

/// Tenant every test fixture records under.
pub const TEST_TENANT: &str = "default";

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates an envelope under [`TEST_TENANT`] with no icon or role.
pub async fn create_test_envelope(
    db: &DatabaseConnection,
    name: &str,
    kind: EnvelopeKind,
    planned_amount: f64,
) -> Result<envelope::Model> {
    create_envelope(
        db,
        TEST_TENANT,
        name.to_string(),
        String::new(),
        kind,
        None,
        planned_amount,
    )
    .await
}

/// Sets up a fresh database with one monthly "Food" envelope planned at
/// 300.0, the most common fixture for ledger tests.
pub async fn setup_with_monthly_envelope() -> Result<(DatabaseConnection, envelope::Model)> {
    let db = setup_test_db().await?;
    let envelope = create_test_envelope(&db, "Food", EnvelopeKind::Monthly, 300.0).await?;
    Ok((db, envelope))
}

/// Creates the yearly carry-over pool month closing transfers into.
pub async fn create_carry_over_envelope(db: &DatabaseConnection) -> Result<envelope::Model> {
    create_envelope(
        db,
        TEST_TENANT,
        "Unused funds".to_string(),
        String::new(),
        EnvelopeKind::Yearly,
        Some(envelope::ROLE_CARRY_OVER.to_string()),
        0.0,
    )
    .await
}

/// Re-reads an envelope to observe balance changes made by an operation
/// under test.
pub async fn refresh_envelope(
    db: &DatabaseConnection,
    envelope_id: i64,
) -> Result<envelope::Model> {
    get_envelope_by_id(db, envelope_id)
        .await?
        .ok_or_else(|| Error::EnvelopeNotFound {
            name: format!("id {envelope_id}"),
        })
}

/// Builds a UTC timestamp at noon on the given day.
#[allow(clippy::unwrap_used)]
pub fn test_date(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).single().unwrap()
}
