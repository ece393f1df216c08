//! Envelope business logic - lookups, creation, and balance updates.
//!
//! Balance changes go through atomic database-level updates so that a
//! read-modify-write cycle can never lose a concurrent update.

use crate::{
    entities::{Envelope, EnvelopeKind, envelope},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};

/// Retrieves all envelopes of a tenant, ordered alphabetically by name.
pub async fn get_envelopes_for_tenant(
    db: &DatabaseConnection,
    tenant_id: &str,
) -> Result<Vec<envelope::Model>> {
    Envelope::find()
        .filter(envelope::Column::TenantId.eq(tenant_id))
        .order_by_asc(envelope::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves all envelopes of a given kind for a tenant, ordered by name.
pub async fn get_envelopes_by_kind<C>(
    db: &C,
    tenant_id: &str,
    kind: EnvelopeKind,
) -> Result<Vec<envelope::Model>>
where
    C: ConnectionTrait,
{
    Envelope::find()
        .filter(envelope::Column::TenantId.eq(tenant_id))
        .filter(envelope::Column::Kind.eq(kind))
        .order_by_asc(envelope::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds an envelope by its display name within a tenant.
pub async fn get_envelope_by_name<C>(
    db: &C,
    tenant_id: &str,
    name: &str,
) -> Result<Option<envelope::Model>>
where
    C: ConnectionTrait,
{
    Envelope::find()
        .filter(envelope::Column::TenantId.eq(tenant_id))
        .filter(envelope::Column::Name.eq(name))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds an envelope by its stable role tag within a tenant.
///
/// Roles decouple semantic lookups (e.g., the carry-over pool) from display
/// names, so a rename cannot silently break the linkage.
pub async fn get_envelope_by_role<C>(
    db: &C,
    tenant_id: &str,
    role: &str,
) -> Result<Option<envelope::Model>>
where
    C: ConnectionTrait,
{
    Envelope::find()
        .filter(envelope::Column::TenantId.eq(tenant_id))
        .filter(envelope::Column::Role.eq(role))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds an envelope by its unique ID.
pub async fn get_envelope_by_id<C>(db: &C, envelope_id: i64) -> Result<Option<envelope::Model>>
where
    C: ConnectionTrait,
{
    Envelope::find_by_id(envelope_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Creates a new envelope with a zero starting balance.
///
/// Validates that the name is not empty and the planned amount is
/// non-negative; the name is stored trimmed.
pub async fn create_envelope(
    db: &DatabaseConnection,
    tenant_id: &str,
    name: String,
    icon: String,
    kind: EnvelopeKind,
    role: Option<String>,
    planned_amount: f64,
) -> Result<envelope::Model> {
    if name.trim().is_empty() {
        return Err(Error::Config {
            message: "Envelope name cannot be empty".to_string(),
        });
    }

    if planned_amount < 0.0 || !planned_amount.is_finite() {
        return Err(Error::InvalidAmount {
            amount: planned_amount,
        });
    }

    let envelope = envelope::ActiveModel {
        tenant_id: Set(tenant_id.to_string()),
        name: Set(name.trim().to_string()),
        icon: Set(icon),
        kind: Set(kind),
        role: Set(role),
        planned_amount: Set(planned_amount),
        current_amount: Set(0.0),
        ..Default::default()
    };

    let result = envelope.insert(db).await?;
    Ok(result)
}

/// Adjusts an envelope's balance by atomically adding a delta.
///
/// Uses a single SQL UPDATE (`current_amount = current_amount + ?`) rather
/// than read-modify-write, so concurrent adjustments cannot lose updates.
pub async fn update_envelope_balance_atomic<C>(
    db: &C,
    envelope_id: i64,
    amount_delta: f64,
) -> Result<envelope::Model>
where
    C: ConnectionTrait,
{
    use sea_orm::sea_query::Expr;

    // First verify the envelope exists
    let _envelope = Envelope::find_by_id(envelope_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::EnvelopeNotFound {
            name: envelope_id.to_string(),
        })?;

    Envelope::update_many()
        .col_expr(
            envelope::Column::CurrentAmount,
            Expr::col(envelope::Column::CurrentAmount).add(amount_delta),
        )
        .filter(envelope::Column::Id.eq(envelope_id))
        .exec(db)
        .await?;

    // Return the updated envelope
    Envelope::find_by_id(envelope_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::EnvelopeNotFound {
            name: envelope_id.to_string(),
        })
}

/// Overwrites an envelope's balance with an absolute value.
///
/// This is the quota-restart primitive: the monthly refill on payday and the
/// reset at month close both set balances directly instead of accumulating.
pub async fn set_envelope_balance<C>(db: &C, envelope_id: i64, new_amount: f64) -> Result<()>
where
    C: ConnectionTrait,
{
    use sea_orm::sea_query::Expr;

    let updated = Envelope::update_many()
        .col_expr(envelope::Column::CurrentAmount, Expr::value(new_amount))
        .filter(envelope::Column::Id.eq(envelope_id))
        .exec(db)
        .await?;

    if updated.rows_affected == 0 {
        return Err(Error::EnvelopeNotFound {
            name: envelope_id.to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::entities::envelope::ROLE_CARRY_OVER;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_create_envelope_validation() -> Result<()> {
        let db = setup_test_db().await?;

        // Empty name
        let result = create_envelope(
            &db,
            TEST_TENANT,
            String::new(),
            String::new(),
            EnvelopeKind::Monthly,
            None,
            100.0,
        )
        .await;
        assert!(matches!(result.unwrap_err(), Error::Config { message: _ }));

        // Whitespace-only name
        let result = create_envelope(
            &db,
            TEST_TENANT,
            "   ".to_string(),
            String::new(),
            EnvelopeKind::Monthly,
            None,
            100.0,
        )
        .await;
        assert!(matches!(result.unwrap_err(), Error::Config { message: _ }));

        // Negative planned amount
        let result = create_envelope(
            &db,
            TEST_TENANT,
            "Test".to_string(),
            String::new(),
            EnvelopeKind::Monthly,
            None,
            -50.0,
        )
        .await;
        assert!(matches!(
            result.unwrap_err(),
            Error::InvalidAmount { amount: -50.0 }
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_create_envelope_starts_at_zero() -> Result<()> {
        let db = setup_test_db().await?;

        let envelope = create_test_envelope(&db, "Food", EnvelopeKind::Monthly, 300.0).await?;

        assert_eq!(envelope.name, "Food");
        assert_eq!(envelope.planned_amount, 300.0);
        assert_eq!(envelope.current_amount, 0.0);
        assert_eq!(envelope.kind, EnvelopeKind::Monthly);
        assert_eq!(envelope.tenant_id, TEST_TENANT);

        Ok(())
    }

    #[tokio::test]
    async fn test_get_envelope_by_name_is_tenant_scoped() -> Result<()> {
        let db = setup_test_db().await?;

        let created = create_test_envelope(&db, "Food", EnvelopeKind::Monthly, 300.0).await?;

        let found = get_envelope_by_name(&db, TEST_TENANT, "Food").await?;
        assert_eq!(found.unwrap().id, created.id);

        let other_tenant = get_envelope_by_name(&db, "someone-else", "Food").await?;
        assert!(other_tenant.is_none());

        let missing = get_envelope_by_name(&db, TEST_TENANT, "Nonexistent").await?;
        assert!(missing.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_get_envelope_by_role() -> Result<()> {
        let db = setup_test_db().await?;

        create_test_envelope(&db, "Wedding", EnvelopeKind::Yearly, 10000.0).await?;
        let carry_over = create_envelope(
            &db,
            TEST_TENANT,
            "Freedom fund".to_string(),
            "💰".to_string(),
            EnvelopeKind::Yearly,
            Some(ROLE_CARRY_OVER.to_string()),
            0.0,
        )
        .await?;

        let found = get_envelope_by_role(&db, TEST_TENANT, ROLE_CARRY_OVER).await?;
        assert_eq!(found.unwrap().id, carry_over.id);

        // Role lookups survive renames; name lookups would not
        let mut renamed: envelope::ActiveModel = carry_over.into();
        renamed.name = Set("Unallocated surplus".to_string());
        renamed.update(&db).await?;

        let still_found = get_envelope_by_role(&db, TEST_TENANT, ROLE_CARRY_OVER).await?;
        assert_eq!(still_found.unwrap().name, "Unallocated surplus");

        Ok(())
    }

    #[tokio::test]
    async fn test_get_envelopes_by_kind() -> Result<()> {
        let db = setup_test_db().await?;

        create_test_envelope(&db, "Food", EnvelopeKind::Monthly, 300.0).await?;
        create_test_envelope(&db, "Transport", EnvelopeKind::Monthly, 200.0).await?;
        create_test_envelope(&db, "Wedding", EnvelopeKind::Yearly, 10000.0).await?;

        let monthly = get_envelopes_by_kind(&db, TEST_TENANT, EnvelopeKind::Monthly).await?;
        assert_eq!(monthly.len(), 2);
        // Alphabetical order
        assert_eq!(monthly[0].name, "Food");
        assert_eq!(monthly[1].name, "Transport");

        let yearly = get_envelopes_by_kind(&db, TEST_TENANT, EnvelopeKind::Yearly).await?;
        assert_eq!(yearly.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_update_envelope_balance_atomic() -> Result<()> {
        let db = setup_test_db().await?;

        let envelope = create_test_envelope(&db, "Food", EnvelopeKind::Monthly, 300.0).await?;

        let updated = update_envelope_balance_atomic(&db, envelope.id, 75.0).await?;
        assert_eq!(updated.current_amount, 75.0);

        // Deltas accumulate and may push the balance negative (overrun)
        let updated = update_envelope_balance_atomic(&db, envelope.id, -100.0).await?;
        assert_eq!(updated.current_amount, -25.0);

        Ok(())
    }

    #[tokio::test]
    async fn test_update_envelope_balance_not_found() -> Result<()> {
        let db = setup_test_db().await?;

        let result = update_envelope_balance_atomic(&db, 999, 75.0).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::EnvelopeNotFound { name: _ }
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_set_envelope_balance_overwrites() -> Result<()> {
        let db = setup_test_db().await?;

        let envelope = create_test_envelope(&db, "Food", EnvelopeKind::Monthly, 300.0).await?;
        update_envelope_balance_atomic(&db, envelope.id, -42.0).await?;

        set_envelope_balance(&db, envelope.id, 300.0).await?;

        let refreshed = get_envelope_by_id(&db, envelope.id).await?.unwrap();
        assert_eq!(refreshed.current_amount, 300.0);

        let missing = set_envelope_balance(&db, 999, 1.0).await;
        assert!(matches!(
            missing.unwrap_err(),
            Error::EnvelopeNotFound { name: _ }
        ));

        Ok(())
    }
}
