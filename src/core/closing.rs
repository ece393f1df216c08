//! Month-closing engine.
//!
//! Closing finalizes a period exactly once: it computes the period's net
//! balance from the transaction history, transfers a positive balance into
//! the carry-over envelope, and resets every monthly envelope to zero. A
//! period goes `Open -> Closed` and never back; re-closing is rejected.
//!
//! The transferred amount is the *ledger's* net balance, not the envelopes'
//! leftover sum: envelope balances can disagree with the ledger when a
//! transaction bypassed envelope attribution, and the transaction history is
//! the ground truth.

use crate::{
    entities::{EnvelopeKind, TransactionKind, envelope::ROLE_CARRY_OVER, transaction},
    errors::{Error, Result},
    period::Period,
};
use chrono::{DateTime, Utc};
use sea_orm::{Condition, DatabaseConnection, Set, TransactionTrait, prelude::*};
use tracing::info;

/// Reserved description marker identifying a closing transaction.
pub const CLOSING_MARKER: &str = "Month closing";

/// Secondary marker carried by the surplus-transfer closing transaction.
pub const BALANCE_TRANSFER_MARKER: &str = "balance transfer";

/// Filter condition excluding closing transactions from ordinary
/// aggregation - counting the closing transfer as the period's own expense
/// would double-book the balance it represents.
#[must_use]
pub fn non_closing_condition() -> Condition {
    Condition::any()
        .add(transaction::Column::Description.contains(CLOSING_MARKER))
        .add(transaction::Column::Description.contains(BALANCE_TRANSFER_MARKER))
        .not()
}

/// Result of closing a period.
#[derive(Debug, Clone)]
pub struct ClosingSummary {
    /// The period that was closed
    pub period: Period,
    /// Total income over the period (closing transactions excluded)
    pub total_income: f64,
    /// Total expenses over the period (closing transactions excluded)
    pub total_expenses: f64,
    /// Net balance: income minus expenses
    pub month_balance: f64,
    /// Sum of positive monthly-envelope balances just before the reset.
    /// Informational only - it never affects the transferred amount.
    pub unused_funds: f64,
    /// The synthetic closing transaction created for the period
    pub closing_transaction: transaction::Model,
}

/// Closes the period containing `now`.
///
/// Runs entirely inside one database transaction, so the double-close guard's
/// check-then-act is serialized by the store and the transfer, the closing
/// row, and the envelope resets commit together or not at all.
///
/// # Errors
/// - [`Error::AlreadyClosed`] if a closing transaction already exists in the
///   period; the payload carries the prior closing date.
/// - [`Error::InconsistentState`] if the balance is positive but no envelope
///   carries the carry-over role - failing loudly instead of dropping the
///   surplus from the ledger.
pub async fn close_month(
    db: &DatabaseConnection,
    tenant_id: &str,
    now: DateTime<Utc>,
) -> Result<ClosingSummary> {
    let period = Period::containing(now);
    let txn = db.begin().await?;

    // Guard before any mutation: one closing transaction per period, ever.
    let existing = crate::entities::Transaction::find()
        .filter(transaction::Column::TenantId.eq(tenant_id))
        .filter(transaction::Column::Description.contains(CLOSING_MARKER))
        .filter(transaction::Column::Date.gte(period.start()))
        .filter(transaction::Column::Date.lt(period.end_exclusive()))
        .one(&txn)
        .await?;
    if let Some(prior) = existing {
        return Err(Error::AlreadyClosed {
            closed_on: prior.date,
        });
    }

    let month_transactions = crate::entities::Transaction::find()
        .filter(transaction::Column::TenantId.eq(tenant_id))
        .filter(transaction::Column::Date.gte(period.start()))
        .filter(transaction::Column::Date.lt(period.end_exclusive()))
        .filter(non_closing_condition())
        .all(&txn)
        .await?;

    let total_income: f64 = month_transactions
        .iter()
        .filter(|t| t.kind == TransactionKind::Income)
        .map(|t| t.amount)
        .sum();
    let total_expenses: f64 = month_transactions
        .iter()
        .filter(|t| t.kind == TransactionKind::Expense)
        .map(|t| t.amount)
        .sum();
    let month_balance = total_income - total_expenses;

    let monthly_envelopes =
        crate::core::envelope::get_envelopes_by_kind(&txn, tenant_id, EnvelopeKind::Monthly)
            .await?;
    let unused_funds: f64 = monthly_envelopes
        .iter()
        .map(|e| e.current_amount)
        .filter(|amount| *amount > 0.0)
        .sum();

    let closing_transaction = if month_balance > 0.0 {
        let carry_over =
            crate::core::envelope::get_envelope_by_role(&txn, tenant_id, ROLE_CARRY_OVER)
                .await?
                .ok_or_else(|| Error::InconsistentState {
                    message: format!(
                        "No envelope carries the '{ROLE_CARRY_OVER}' role; cannot transfer the month balance"
                    ),
                })?;

        crate::core::envelope::update_envelope_balance_atomic(&txn, carry_over.id, month_balance)
            .await?;

        insert_closing_transaction(
            &txn,
            tenant_id,
            month_balance,
            format!("{CLOSING_MARKER} {} - {BALANCE_TRANSFER_MARKER}", period.label()),
            now,
            Some(carry_over.id),
        )
        .await?
    } else {
        // A closing transaction exists for every closed period, surplus or
        // not - it is what the double-close guard keys on.
        insert_closing_transaction(
            &txn,
            tenant_id,
            0.0,
            format!(
                "{CLOSING_MARKER} {} - deficit {:.2}",
                period.label(),
                month_balance.abs()
            ),
            now,
            None,
        )
        .await?
    };

    // Overruns are forgiven, not carried forward: every monthly envelope
    // restarts the new period at zero regardless of sign.
    for envelope in &monthly_envelopes {
        crate::core::envelope::set_envelope_balance(&txn, envelope.id, 0.0).await?;
    }

    txn.commit().await?;

    info!(
        period = %period,
        month_balance,
        unused_funds,
        "Closed month"
    );

    Ok(ClosingSummary {
        period,
        total_income,
        total_expenses,
        month_balance,
        unused_funds,
        closing_transaction,
    })
}

async fn insert_closing_transaction<C>(
    db: &C,
    tenant_id: &str,
    amount: f64,
    description: String,
    date: DateTime<Utc>,
    envelope_id: Option<i64>,
) -> Result<transaction::Model>
where
    C: ConnectionTrait,
{
    let model = transaction::ActiveModel {
        tenant_id: Set(tenant_id.to_string()),
        kind: Set(TransactionKind::Expense),
        amount: Set(amount),
        description: Set(description),
        category: Set(None),
        date: Set(date),
        envelope_id: Set(envelope_id),
        ..Default::default()
    };

    model.insert(db).await.map_err(Into::into)
}
