//! Month-grouped transaction history.
//!
//! The archive is the ledger sliced into calendar months, newest month
//! first, with per-month totals and expense category breakdowns. Closing
//! bookkeeping rows are excluded throughout; the months they summarized are
//! already fully represented by their ordinary transactions.

use crate::{
    core::{analytics::resolve_category, closing::non_closing_condition},
    entities::{Envelope, TransactionKind, envelope, transaction},
    errors::Result,
    period::Period,
};
use sea_orm::{DatabaseConnection, QueryOrder, prelude::*};
use serde::Serialize;
use std::collections::BTreeMap;

/// Display reference to a linked envelope.
#[derive(Debug, Clone, Serialize)]
pub struct EnvelopeRef {
    /// Envelope name
    pub name: String,
    /// Display icon
    pub icon: String,
}

/// One ledger entry as the archive presents it.
#[derive(Debug, Clone, Serialize)]
pub struct ArchivedTransaction {
    /// The ledger row
    pub transaction: transaction::Model,
    /// The linked envelope, when there is one
    pub envelope: Option<EnvelopeRef>,
    /// Resolved display category
    pub category: String,
}

/// One month of history.
#[derive(Debug, Clone, Serialize)]
pub struct ArchivedMonth {
    /// The month
    pub period: Period,
    /// Income total
    pub total_income: f64,
    /// Expense total
    pub total_expenses: f64,
    /// `total_income - total_expenses`
    pub balance: f64,
    /// Expense totals bucketed by resolved category
    pub categories: BTreeMap<String, f64>,
    /// Every ledger entry dated within the month, newest first
    pub transactions: Vec<ArchivedTransaction>,
}

/// Builds the archive for a tenant: all months with any activity, newest
/// first.
pub async fn get_archive(
    db: &DatabaseConnection,
    tenant_id: &str,
) -> Result<Vec<ArchivedMonth>> {
    let rows = crate::entities::Transaction::find()
        .filter(transaction::Column::TenantId.eq(tenant_id))
        .filter(non_closing_condition())
        .order_by_desc(transaction::Column::Date)
        .order_by_desc(transaction::Column::Id)
        .find_also_related(Envelope)
        .all(db)
        .await?;

    Ok(group_by_month(rows))
}

fn group_by_month(
    rows: Vec<(transaction::Model, Option<envelope::Model>)>,
) -> Vec<ArchivedMonth> {
    let mut by_period: BTreeMap<Period, ArchivedMonth> = BTreeMap::new();

    for (tx, linked_envelope) in rows {
        let period = Period::containing(tx.date);
        let month = by_period.entry(period).or_insert_with(|| ArchivedMonth {
            period,
            total_income: 0.0,
            total_expenses: 0.0,
            balance: 0.0,
            categories: BTreeMap::new(),
            transactions: Vec::new(),
        });

        let category =
            resolve_category(&tx, linked_envelope.as_ref().map(|e| e.name.as_str()));

        match tx.kind {
            TransactionKind::Income => month.total_income += tx.amount,
            TransactionKind::Expense => {
                month.total_expenses += tx.amount;
                *month.categories.entry(category.clone()).or_insert(0.0) += tx.amount;
            }
        }

        month.transactions.push(ArchivedTransaction {
            transaction: tx,
            envelope: linked_envelope.map(|e| EnvelopeRef {
                name: e.name,
                icon: e.icon,
            }),
            category,
        });
    }

    let mut months: Vec<ArchivedMonth> = by_period.into_values().rev().collect();
    for month in &mut months {
        month.balance = month.total_income - month.total_expenses;
    }
    months
}
