//! Allocation engine - turns one income event into a primary income
//! transaction plus a set of envelope-crediting transfers, without
//! double-booking.
//!
//! Destinations are caller-addressed by envelope display name. The remainder
//! of the gross amount after all destinations is implicitly "available for
//! spending" and is not itself transferred anywhere.

use crate::{
    entities::{EnvelopeKind, TransactionKind, transaction},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{ConnectionTrait, DatabaseConnection, Set, TransactionTrait, prelude::ActiveModelTrait};
use tracing::{info, warn};

/// Description prefix shared by all transfer transactions, e.g.
/// `"Transfer: Wedding"`. The category fallback in analytics recognizes it
/// on rows that predate first-class category tags.
pub const TRANSFER_PREFIX: &str = "Transfer:";

/// One named destination of an income split.
#[derive(Debug, Clone, PartialEq)]
pub struct Destination {
    /// Display name of the target envelope (or of an external pool with no
    /// envelope, e.g. a joint account)
    pub name: String,
    /// Amount to route to this destination
    pub amount: f64,
}

/// A full income event: the gross amount and how to distribute it.
#[derive(Debug, Clone)]
pub struct IncomePlan {
    /// Gross income amount
    pub gross_amount: f64,
    /// Description for the income transaction
    pub description: String,
    /// Fixed contributions to named destinations
    pub destinations: Vec<Destination>,
    /// Whether to restart every monthly envelope at its planned quota
    /// (payday behavior); a plain "other income" leaves envelopes alone
    pub refill_monthly: bool,
}

/// Outcome of [`record_income`].
#[derive(Debug)]
pub struct IncomeResult {
    /// The primary income transaction
    pub income: transaction::Model,
    /// One transfer transaction per routed destination
    pub transfers: Vec<transaction::Model>,
    /// Number of monthly envelopes refilled to their quota
    pub refilled: usize,
}

/// Records an income event and distributes it according to the plan.
///
/// Validation happens before any write: the gross amount must be positive
/// and finite, every destination amount non-negative and finite, and the
/// destination sum must not exceed the gross amount (`OverAllocation`). A
/// rejected plan produces zero transactions.
///
/// Each destination with a positive amount is resolved by envelope name
/// within the tenant. A resolved envelope is credited and the transfer is
/// recorded against it; an unresolved name still records the transfer
/// (unlinked) - that is how money leaving the main pool toward external
/// destinations is represented. The optional quota refill overwrites each
/// monthly envelope's balance with its planned amount; it is an overwrite,
/// not an accumulation, which is what makes budgets "restart" on payday.
pub async fn record_income(
    db: &DatabaseConnection,
    tenant_id: &str,
    plan: IncomePlan,
) -> Result<IncomeResult> {
    if plan.gross_amount <= 0.0 || !plan.gross_amount.is_finite() {
        return Err(Error::InvalidAmount {
            amount: plan.gross_amount,
        });
    }
    for destination in &plan.destinations {
        if destination.amount < 0.0 || !destination.amount.is_finite() {
            return Err(Error::InvalidAmount {
                amount: destination.amount,
            });
        }
    }

    let allocated: f64 = plan.destinations.iter().map(|d| d.amount).sum();
    if allocated > plan.gross_amount {
        return Err(Error::OverAllocation {
            gross: plan.gross_amount,
            allocated,
        });
    }

    let now = Utc::now();
    let txn = db.begin().await?;

    let income = insert_transaction(
        &txn,
        tenant_id,
        TransactionKind::Income,
        plan.gross_amount,
        plan.description.clone(),
        None,
        now,
        None,
    )
    .await?;

    let mut transfers = Vec::new();
    for destination in plan.destinations.iter().filter(|d| d.amount > 0.0) {
        let envelope =
            crate::core::envelope::get_envelope_by_name(&txn, tenant_id, &destination.name)
                .await?;

        let envelope_id = match envelope {
            Some(envelope) => {
                crate::core::envelope::update_envelope_balance_atomic(
                    &txn,
                    envelope.id,
                    destination.amount,
                )
                .await?;
                Some(envelope.id)
            }
            None => {
                // External destination (e.g. joint account): the money still
                // leaves the pool, it just has no envelope to land in.
                warn!(destination = %destination.name, "No envelope for destination; recording unlinked transfer");
                None
            }
        };

        let transfer = insert_transaction(
            &txn,
            tenant_id,
            TransactionKind::Expense,
            destination.amount,
            format!("{TRANSFER_PREFIX} {}", destination.name),
            Some(destination.name.clone()),
            now,
            envelope_id,
        )
        .await?;
        transfers.push(transfer);
    }

    let mut refilled = 0;
    if plan.refill_monthly {
        let monthly =
            crate::core::envelope::get_envelopes_by_kind(&txn, tenant_id, EnvelopeKind::Monthly)
                .await?;
        for envelope in monthly {
            if envelope.planned_amount > 0.0 {
                crate::core::envelope::set_envelope_balance(
                    &txn,
                    envelope.id,
                    envelope.planned_amount,
                )
                .await?;
                refilled += 1;
            }
        }
    }

    txn.commit().await?;

    info!(
        gross = plan.gross_amount,
        transfers = transfers.len(),
        refilled,
        "Recorded income"
    );

    Ok(IncomeResult {
        income,
        transfers,
        refilled,
    })
}

#[allow(clippy::too_many_arguments)]
async fn insert_transaction<C>(
    db: &C,
    tenant_id: &str,
    kind: TransactionKind,
    amount: f64,
    description: String,
    category: Option<String>,
    date: DateTime<Utc>,
    envelope_id: Option<i64>,
) -> Result<transaction::Model>
where
    C: ConnectionTrait,
{
    let model = transaction::ActiveModel {
        tenant_id: Set(tenant_id.to_string()),
        kind: Set(kind),
        amount: Set(amount),
        description: Set(description),
        category: Set(category),
        date: Set(date),
        envelope_id: Set(envelope_id),
        ..Default::default()
    };

    model.insert(db).await.map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::period::Period;
    use crate::test_utils::*;

    fn plan(gross: f64, destinations: Vec<(&str, f64)>, refill: bool) -> IncomePlan {
        IncomePlan {
            gross_amount: gross,
            description: "Monthly salary".to_string(),
            destinations: destinations
                .into_iter()
                .map(|(name, amount)| Destination {
                    name: name.to_string(),
                    amount,
                })
                .collect(),
            refill_monthly: refill,
        }
    }

    #[tokio::test]
    async fn test_income_split_across_envelopes() -> Result<()> {
        // Scenario: income 5000, destinations {A: 1000, B: 500}
        let db = setup_test_db().await?;
        let a = create_test_envelope(&db, "A", EnvelopeKind::Yearly, 10000.0).await?;
        let b = create_test_envelope(&db, "B", EnvelopeKind::Yearly, 5000.0).await?;

        let result = record_income(
            &db,
            TEST_TENANT,
            plan(5000.0, vec![("A", 1000.0), ("B", 500.0)], false),
        )
        .await?;

        assert_eq!(result.income.kind, TransactionKind::Income);
        assert_eq!(result.income.amount, 5000.0);
        assert_eq!(result.income.envelope_id, None);

        assert_eq!(result.transfers.len(), 2);
        assert_eq!(result.transfers[0].kind, TransactionKind::Expense);
        assert_eq!(result.transfers[0].amount, 1000.0);
        assert_eq!(result.transfers[0].envelope_id, Some(a.id));
        assert_eq!(result.transfers[0].description, "Transfer: A");
        assert_eq!(result.transfers[0].category.as_deref(), Some("A"));
        assert_eq!(result.transfers[1].amount, 500.0);
        assert_eq!(result.transfers[1].envelope_id, Some(b.id));

        assert_eq!(refresh_envelope(&db, a.id).await?.current_amount, 1000.0);
        assert_eq!(refresh_envelope(&db, b.id).await?.current_amount, 500.0);

        Ok(())
    }

    #[tokio::test]
    async fn test_over_allocation_rejected_with_no_writes() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_envelope(&db, "A", EnvelopeKind::Yearly, 10000.0).await?;

        let result = record_income(
            &db,
            TEST_TENANT,
            plan(1000.0, vec![("A", 800.0), ("B", 300.0)], false),
        )
        .await;

        match result.unwrap_err() {
            Error::OverAllocation { gross, allocated } => {
                assert_eq!(gross, 1000.0);
                assert_eq!(allocated, 1100.0);
            }
            other => panic!("expected OverAllocation, got {other:?}"),
        }

        // Zero transactions persisted
        let period = Period::current();
        assert!(
            crate::core::ledger::transactions_in_period(&db, TEST_TENANT, period)
                .await?
                .is_empty()
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_exact_allocation_is_allowed() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_envelope(&db, "A", EnvelopeKind::Yearly, 10000.0).await?;

        let result = record_income(&db, TEST_TENANT, plan(1000.0, vec![("A", 1000.0)], false))
            .await?;
        assert_eq!(result.transfers.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_negative_destination_rejected() -> Result<()> {
        let db = setup_test_db().await?;

        let result =
            record_income(&db, TEST_TENANT, plan(1000.0, vec![("A", -10.0)], false)).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::InvalidAmount { amount: _ }
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_unresolved_destination_records_unlinked_transfer() -> Result<()> {
        let db = setup_test_db().await?;

        let result = record_income(
            &db,
            TEST_TENANT,
            plan(4000.0, vec![("Joint account", 1500.0)], false),
        )
        .await?;

        assert_eq!(result.transfers.len(), 1);
        assert_eq!(result.transfers[0].envelope_id, None);
        assert_eq!(result.transfers[0].description, "Transfer: Joint account");
        assert_eq!(
            result.transfers[0].category.as_deref(),
            Some("Joint account")
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_zero_amount_destinations_are_skipped() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_envelope(&db, "A", EnvelopeKind::Yearly, 10000.0).await?;

        let result = record_income(
            &db,
            TEST_TENANT,
            plan(1000.0, vec![("A", 0.0), ("B", 0.0)], false),
        )
        .await?;

        assert!(result.transfers.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_refill_overwrites_monthly_quotas() -> Result<()> {
        let db = setup_test_db().await?;
        let food = create_test_envelope(&db, "Food", EnvelopeKind::Monthly, 300.0).await?;
        let transport = create_test_envelope(&db, "Transport", EnvelopeKind::Monthly, 200.0).await?;
        let goal = create_test_envelope(&db, "Wedding", EnvelopeKind::Yearly, 10000.0).await?;

        // Leftovers (or overruns) from last cycle
        crate::core::envelope::set_envelope_balance(&db, food.id, 42.0).await?;
        crate::core::envelope::set_envelope_balance(&db, transport.id, -15.0).await?;
        crate::core::envelope::set_envelope_balance(&db, goal.id, 800.0).await?;

        let result = record_income(&db, TEST_TENANT, plan(5000.0, vec![], true)).await?;
        assert_eq!(result.refilled, 2);

        // Overwritten to the quota, not accumulated
        assert_eq!(refresh_envelope(&db, food.id).await?.current_amount, 300.0);
        assert_eq!(refresh_envelope(&db, transport.id).await?.current_amount, 200.0);
        // Yearly envelopes are not part of the refill
        assert_eq!(refresh_envelope(&db, goal.id).await?.current_amount, 800.0);

        Ok(())
    }

    #[tokio::test]
    async fn test_other_income_has_no_side_effects() -> Result<()> {
        let db = setup_test_db().await?;
        let food = create_test_envelope(&db, "Food", EnvelopeKind::Monthly, 300.0).await?;

        let result = record_income(
            &db,
            TEST_TENANT,
            IncomePlan {
                gross_amount: 250.0,
                description: "Sold old bike".to_string(),
                destinations: vec![],
                refill_monthly: false,
            },
        )
        .await?;

        assert!(result.transfers.is_empty());
        assert_eq!(result.refilled, 0);
        assert_eq!(refresh_envelope(&db, food.id).await?.current_amount, 0.0);

        Ok(())
    }
}
