//! Ledger core - records, edits, and deletes transactions.
//!
//! Every operation applies the transaction row and its envelope side effect
//! as one atomic unit: both commit together or not at all. A partially
//! applied operation (row persisted, balance not updated, or vice versa)
//! would be a correctness violation.
//!
//! The single most error-prone invariant here is the sign asymmetry between
//! envelope kinds, see [`expense_balance_delta`].

use crate::{
    entities::{EnvelopeKind, Transaction, TransactionKind, transaction},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{Set, TransactionTrait, prelude::*};
use tracing::debug;

/// Balance delta applied to an envelope when an expense of `amount` is
/// recorded against it.
///
/// Monthly envelopes track "funds remaining", so an expense spends the budget
/// down (and may push it negative - an overrun). Yearly envelopes track
/// "amount accumulated toward the goal", so an expense against one is a
/// contribution and *adds* to the balance. This asymmetry is deliberate and
/// carried by the envelope kind, never by the amount's sign.
#[must_use]
pub const fn expense_balance_delta(kind: EnvelopeKind, amount: f64) -> f64 {
    match kind {
        EnvelopeKind::Monthly => -amount,
        EnvelopeKind::Yearly => amount,
    }
}

fn validate_amount(amount: f64) -> Result<()> {
    if amount <= 0.0 || !amount.is_finite() {
        return Err(Error::InvalidAmount { amount });
    }
    Ok(())
}

/// Creates a new transaction and applies its envelope side effect.
///
/// The amount must be a strictly positive magnitude; direction is carried by
/// `kind`. If the transaction is an expense attributed to an envelope, the
/// envelope balance is adjusted per [`expense_balance_delta`] in the same
/// database transaction. Income transactions never touch envelope balances.
#[allow(clippy::too_many_arguments)]
pub async fn record_transaction(
    db: &DatabaseConnection,
    tenant_id: &str,
    kind: TransactionKind,
    amount: f64,
    description: String,
    category: Option<String>,
    date: DateTime<Utc>,
    envelope_id: Option<i64>,
) -> Result<transaction::Model> {
    validate_amount(amount)?;

    let txn = db.begin().await?;

    if kind == TransactionKind::Expense {
        if let Some(envelope_id) = envelope_id {
            let envelope = crate::core::envelope::get_envelope_by_id(&txn, envelope_id)
                .await?
                .filter(|e| e.tenant_id == tenant_id)
                .ok_or_else(|| Error::EnvelopeNotFound {
                    name: envelope_id.to_string(),
                })?;

            let delta = expense_balance_delta(envelope.kind, amount);
            crate::core::envelope::update_envelope_balance_atomic(&txn, envelope_id, delta)
                .await?;
        }
    }

    let transaction_model = transaction::ActiveModel {
        tenant_id: Set(tenant_id.to_string()),
        kind: Set(kind),
        amount: Set(amount),
        description: Set(description),
        category: Set(category),
        date: Set(date),
        envelope_id: Set(envelope_id),
        ..Default::default()
    };

    let result = transaction_model.insert(&txn).await?;
    txn.commit().await?;

    debug!(id = result.id, amount, "Recorded transaction");
    Ok(result)
}

/// Records an expense, optionally attributed to an envelope.
pub async fn record_expense(
    db: &DatabaseConnection,
    tenant_id: &str,
    amount: f64,
    description: String,
    date: DateTime<Utc>,
    envelope_id: Option<i64>,
) -> Result<transaction::Model> {
    record_transaction(
        db,
        tenant_id,
        TransactionKind::Expense,
        amount,
        description,
        None,
        date,
        envelope_id,
    )
    .await
}

/// Retrieves a transaction by id within a tenant.
pub async fn get_transaction_by_id<C>(
    db: &C,
    tenant_id: &str,
    transaction_id: i64,
) -> Result<Option<transaction::Model>>
where
    C: ConnectionTrait,
{
    Transaction::find_by_id(transaction_id)
        .filter(transaction::Column::TenantId.eq(tenant_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Changes a transaction's amount (and optionally its description),
/// adjusting the linked envelope by the difference.
///
/// `delta = old_amount - new_amount`: a reduction returns funds to the
/// envelope, an increase consumes more. Unlike recording, the delta is
/// applied identically for monthly and yearly envelopes - an edit corrects
/// the recorded magnitude, whichever direction the original effect had.
pub async fn edit_transaction(
    db: &DatabaseConnection,
    tenant_id: &str,
    transaction_id: i64,
    new_amount: f64,
    new_description: Option<String>,
) -> Result<transaction::Model> {
    validate_amount(new_amount)?;

    let txn = db.begin().await?;

    let original = get_transaction_by_id(&txn, tenant_id, transaction_id)
        .await?
        .ok_or(Error::TransactionNotFound { id: transaction_id })?;

    let delta = original.amount - new_amount;

    if original.kind == TransactionKind::Expense {
        if let Some(envelope_id) = original.envelope_id {
            crate::core::envelope::update_envelope_balance_atomic(&txn, envelope_id, delta)
                .await?;
        }
    }

    let mut active: transaction::ActiveModel = original.into();
    active.amount = Set(new_amount);
    if let Some(description) = new_description {
        active.description = Set(description);
    }
    let updated = active.update(&txn).await?;

    txn.commit().await?;

    debug!(id = transaction_id, delta, "Edited transaction");
    Ok(updated)
}

/// Deletes a transaction, fully reversing its envelope effect.
///
/// For an expense attributed to an envelope the full amount is added back to
/// the envelope balance before the row is removed.
pub async fn delete_transaction(
    db: &DatabaseConnection,
    tenant_id: &str,
    transaction_id: i64,
) -> Result<()> {
    let txn = db.begin().await?;

    let transaction = get_transaction_by_id(&txn, tenant_id, transaction_id)
        .await?
        .ok_or(Error::TransactionNotFound { id: transaction_id })?;

    if transaction.kind == TransactionKind::Expense {
        if let Some(envelope_id) = transaction.envelope_id {
            crate::core::envelope::update_envelope_balance_atomic(
                &txn,
                envelope_id,
                transaction.amount,
            )
            .await?;
        }
    }

    transaction.delete(&txn).await?;
    txn.commit().await?;

    debug!(id = transaction_id, "Deleted transaction");
    Ok(())
}

/// Retrieves all of a tenant's transactions dated within a period.
pub async fn transactions_in_period<C>(
    db: &C,
    tenant_id: &str,
    period: crate::period::Period,
) -> Result<Vec<transaction::Model>>
where
    C: ConnectionTrait,
{
    Transaction::find()
        .filter(transaction::Column::TenantId.eq(tenant_id))
        .filter(transaction::Column::Date.gte(period.start()))
        .filter(transaction::Column::Date.lt(period.end_exclusive()))
        .all(db)
        .await
        .map_err(Into::into)
}

/// Re-derives an envelope's lifetime net debit by re-summing its attributed
/// expenses. Used for reconciliation: the engine never stores this figure.
pub async fn attributed_expense_total(
    db: &DatabaseConnection,
    tenant_id: &str,
    envelope_id: i64,
) -> Result<f64> {
    let rows = Transaction::find()
        .filter(transaction::Column::TenantId.eq(tenant_id))
        .filter(transaction::Column::EnvelopeId.eq(envelope_id))
        .filter(transaction::Column::Kind.eq(TransactionKind::Expense))
        .all(db)
        .await?;

    Ok(rows.iter().map(|t| t.amount).sum())
}
