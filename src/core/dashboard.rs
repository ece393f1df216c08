//! Current-month dashboard snapshot.
//!
//! A read-only projection of where the tenant stands right now: the
//! lifetime main-account balance, this month's totals, envelope cards, and
//! the latest ledger entries. Like the analytics report this is recomputed
//! from the ledger on every call.
//!
//! Once the month has been closed, the month window shrinks to the rows
//! dated strictly after the closing transaction - the closed portion already
//! lives in the carry-over transfer, and counting it again would double-book
//! it.

use crate::{
    core::closing::{CLOSING_MARKER, non_closing_condition},
    entities::{EnvelopeKind, TransactionKind, envelope, transaction},
    errors::Result,
    period::Period,
};
use sea_orm::{DatabaseConnection, QueryOrder, prelude::*};
use serde::Serialize;

/// How many ledger entries the snapshot's recent-activity list holds.
const RECENT_TRANSACTION_LIMIT: usize = 10;

/// One envelope's card on the dashboard.
///
/// For monthly envelopes `spent` is derived from the live balance (see
/// [`monthly_spent`]) and `activity_count` is the number of expenses
/// attributed to the envelope within the month window. For yearly envelopes
/// `spent` mirrors the accumulated balance and the count stays zero.
#[derive(Debug, Clone, Serialize)]
pub struct EnvelopeCard {
    /// The envelope itself, with its live balance
    pub envelope: envelope::Model,
    /// Amount consumed (monthly) or accumulated (yearly)
    pub spent: f64,
    /// Attributed expenses within the month window
    pub activity_count: usize,
}

/// The full dashboard view for one tenant.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    /// The month being summarized
    pub period: Period,
    /// Lifetime main-account balance, closing bookkeeping excluded
    pub balance: f64,
    /// Income within the month window
    pub total_income: f64,
    /// Expenses within the month window
    pub total_expenses: f64,
    /// Monthly envelope cards, most active first
    pub monthly_envelopes: Vec<EnvelopeCard>,
    /// Yearly envelope cards, alphabetical
    pub yearly_envelopes: Vec<EnvelopeCard>,
    /// Latest entries of the month window, newest first
    pub recent_transactions: Vec<transaction::Model>,
    /// Whether a closing transaction exists for this month
    pub is_month_closed: bool,
}

/// Amount spent out of a monthly envelope, derived from its balance.
///
/// The balance counts down from the quota, so a positive balance means
/// `planned - current` was consumed, a negative one means the whole quota
/// plus the overrun. A balance at or above the plan reads as untouched,
/// which is what a freshly refilled envelope looks like.
#[must_use]
pub fn monthly_spent(planned: f64, current: f64) -> f64 {
    if current < 0.0 {
        planned + current.abs()
    } else if current >= planned {
        0.0
    } else {
        planned - current
    }
}

/// Builds the dashboard snapshot for the month containing `now`.
pub async fn snapshot(
    db: &DatabaseConnection,
    tenant_id: &str,
    now: chrono::DateTime<chrono::Utc>,
) -> Result<DashboardSnapshot> {
    let period = Period::containing(now);

    // Lifetime balance over the whole ledger, markers excluded
    let all_transactions = crate::entities::Transaction::find()
        .filter(transaction::Column::TenantId.eq(tenant_id))
        .filter(non_closing_condition())
        .all(db)
        .await?;
    let balance = all_transactions.iter().fold(0.0, |acc, tx| match tx.kind {
        TransactionKind::Income => acc + tx.amount,
        TransactionKind::Expense => acc - tx.amount,
    });

    let closing = crate::entities::Transaction::find()
        .filter(transaction::Column::TenantId.eq(tenant_id))
        .filter(transaction::Column::Description.contains(CLOSING_MARKER))
        .filter(transaction::Column::Date.gte(period.start()))
        .filter(transaction::Column::Date.lt(period.end_exclusive()))
        .one(db)
        .await?;
    let is_month_closed = closing.is_some();

    let mut month_query = crate::entities::Transaction::find()
        .filter(transaction::Column::TenantId.eq(tenant_id))
        .filter(transaction::Column::Date.lt(period.end_exclusive()))
        .filter(non_closing_condition());
    month_query = match &closing {
        Some(closing_tx) => month_query.filter(transaction::Column::Date.gt(closing_tx.date)),
        None => month_query.filter(transaction::Column::Date.gte(period.start())),
    };
    let month_transactions = month_query
        .order_by_desc(transaction::Column::Date)
        .order_by_desc(transaction::Column::Id)
        .all(db)
        .await?;

    let mut total_income = 0.0;
    let mut total_expenses = 0.0;
    for tx in &month_transactions {
        match tx.kind {
            TransactionKind::Income => total_income += tx.amount,
            TransactionKind::Expense => total_expenses += tx.amount,
        }
    }

    let envelopes = crate::core::envelope::get_envelopes_for_tenant(db, tenant_id).await?;

    let mut monthly_envelopes = Vec::new();
    let mut yearly_envelopes = Vec::new();
    for env in envelopes {
        match env.kind {
            EnvelopeKind::Monthly => {
                let activity_count = month_transactions
                    .iter()
                    .filter(|tx| {
                        tx.kind == TransactionKind::Expense && tx.envelope_id == Some(env.id)
                    })
                    .count();
                monthly_envelopes.push(EnvelopeCard {
                    spent: monthly_spent(env.planned_amount, env.current_amount),
                    activity_count,
                    envelope: env,
                });
            }
            EnvelopeKind::Yearly => {
                yearly_envelopes.push(EnvelopeCard {
                    spent: env.current_amount,
                    activity_count: 0,
                    envelope: env,
                });
            }
        }
    }
    // Busiest envelopes first; ties alphabetical. The fetch already ordered
    // by name, so the yearly list needs no re-sort.
    monthly_envelopes.sort_by(|a, b| {
        b.activity_count
            .cmp(&a.activity_count)
            .then_with(|| a.envelope.name.cmp(&b.envelope.name))
    });

    let recent_transactions = month_transactions
        .into_iter()
        .take(RECENT_TRANSACTION_LIMIT)
        .collect();

    Ok(DashboardSnapshot {
        period,
        balance,
        total_income,
        total_expenses,
        monthly_envelopes,
        yearly_envelopes,
        recent_transactions,
        is_month_closed,
    })
}
