//! Analytics engine - stateless projections over the transaction history.
//!
//! Nothing here mutates state or caches aggregates: every invocation
//! re-derives its figures from the transaction and envelope history, so the
//! results are always consistent with the ledger. The database touchpoint is
//! a single fetch in [`build_report`]; all of the actual math lives in pure
//! functions that tests exercise directly.

use crate::{
    entities::{Envelope, EnvelopeKind, TransactionKind, envelope, transaction},
    errors::Result,
    period::Period,
};
use sea_orm::{DatabaseConnection, QueryOrder, prelude::*};
use serde::Serialize;
use std::collections::BTreeMap;

/// Catch-all category for expenses with no envelope, tag, or recognizable
/// description.
pub const OTHER_CATEGORY: &str = "Other";

/// Pseudo-category for transfer-labeled expenses that match no more specific
/// rule.
pub const TRANSFERS_CATEGORY: &str = "Transfers";

/// Aggregates for one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyTrend {
    /// The month being aggregated
    pub period: Period,
    /// Total income
    pub income: f64,
    /// Total expenses
    pub expenses: f64,
    /// `income - expenses`
    pub savings: f64,
    /// Expense totals bucketed by category
    pub categories: BTreeMap<String, f64>,
}

/// One entry of the all-time category ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    /// Category name
    pub name: String,
    /// Total spent under this category across all months
    pub total: f64,
}

/// Spending statistics for one monthly envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnvelopeEfficiency {
    /// Envelope name
    pub name: String,
    /// Display icon
    pub icon: String,
    /// Monthly budget ceiling
    pub planned_amount: f64,
    /// `total_spent / (planned * active_months)` as a percentage
    pub efficiency: i64,
    /// Share of active months where spending exceeded the plan, as a percentage
    pub overrun_rate: i64,
    /// Total spent under this envelope's category across all months
    pub total_spent: f64,
    /// Average spend per active month, rounded
    pub avg_monthly_spent: i64,
}

/// Progress and projection for one yearly goal envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalProjection {
    /// Envelope name
    pub name: String,
    /// Display icon
    pub icon: String,
    /// Amount accumulated so far
    pub current: f64,
    /// Goal target
    pub target: f64,
    /// `current / target` as a percentage
    pub progress: i64,
    /// Coarse estimate: `current / months_of_history`, rounded
    pub avg_monthly_contribution: i64,
    /// Estimated months until the goal is reached; `None` when the goal is
    /// already met or nothing is being contributed
    pub months_to_goal: Option<i64>,
}

/// Last month vs. the month before it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodComparison {
    /// Absolute income delta
    pub income_change: f64,
    /// Absolute expense delta
    pub expense_change: f64,
    /// Absolute savings delta
    pub savings_change: f64,
    /// Income delta as a percentage of the prior month (0 when the baseline
    /// is not positive)
    pub income_change_percent: i64,
    /// Expense delta as a percentage of the prior month
    pub expense_change_percent: i64,
    /// Savings delta as a percentage of the prior month
    pub savings_change_percent: i64,
}

/// How the trailing-window average handles histories shorter than the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum MovingAverageMode {
    /// Apply the window divisor only once a full window of history exists;
    /// below that, report the raw sums
    #[default]
    FullWindowOnly,
    /// Always divide by however many months are actually present
    AvailablePeriods,
}

/// Trailing 3-month averages of the headline figures.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovingAverages {
    /// Average (or raw-sum, see [`MovingAverageMode`]) income
    pub avg_income: f64,
    /// Average expenses
    pub avg_expenses: f64,
    /// Average savings
    pub avg_savings: f64,
    /// Number of months actually covered by the window
    pub periods: usize,
}

/// Tuning knobs for [`build_report`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalyticsOptions {
    /// Short-history behavior of the moving averages
    pub moving_average: MovingAverageMode,
}

/// The full analytics view.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsReport {
    /// Chronological per-month aggregates
    pub monthly_trends: Vec<MonthlyTrend>,
    /// All-time category totals, biggest first
    pub category_ranking: Vec<CategoryTotal>,
    /// Efficiency statistics per monthly envelope
    pub envelope_analysis: Vec<EnvelopeEfficiency>,
    /// Goal projections per yearly envelope (carry-over pool excluded)
    pub goal_analysis: Vec<GoalProjection>,
    /// Last month vs. previous month; absent with under two months of history
    pub month_comparison: Option<PeriodComparison>,
    /// Trailing-window averages
    pub moving_averages: MovingAverages,
}

/// Builds the full analytics report for a tenant.
pub async fn build_report(
    db: &DatabaseConnection,
    tenant_id: &str,
    options: AnalyticsOptions,
) -> Result<AnalyticsReport> {
    let rows = crate::entities::Transaction::find()
        .filter(transaction::Column::TenantId.eq(tenant_id))
        .filter(crate::core::closing::non_closing_condition())
        .order_by_asc(transaction::Column::Date)
        .find_also_related(Envelope)
        .all(db)
        .await?;

    let envelopes = crate::core::envelope::get_envelopes_for_tenant(db, tenant_id).await?;

    let monthly_trends = build_trends(&rows);
    let category_ranking = rank_categories(&monthly_trends);

    let monthly_envelopes: Vec<&envelope::Model> = envelopes
        .iter()
        .filter(|e| e.kind == EnvelopeKind::Monthly)
        .collect();
    let envelope_analysis = analyze_envelopes(&monthly_trends, &monthly_envelopes);

    let goal_envelopes: Vec<&envelope::Model> = envelopes
        .iter()
        .filter(|e| {
            e.kind == EnvelopeKind::Yearly
                && e.role.as_deref() != Some(envelope::ROLE_CARRY_OVER)
        })
        .collect();
    let goal_analysis = analyze_goals(&goal_envelopes, monthly_trends.len());

    let month_comparison = compare_latest_months(&monthly_trends);
    let moving_averages = moving_averages(&monthly_trends, options.moving_average);

    Ok(AnalyticsReport {
        monthly_trends,
        category_ranking,
        envelope_analysis,
        goal_analysis,
        month_comparison,
        moving_averages,
    })
}

/// Resolves the category of a transaction.
///
/// Resolution order: linked envelope's name, then the first-class category
/// tag, then description-substring inference for untagged rows (a migration
/// aid, not a steady-state mechanism), then the catch-all.
#[must_use]
pub fn resolve_category(tx: &transaction::Model, envelope_name: Option<&str>) -> String {
    if let Some(name) = envelope_name {
        return name.to_string();
    }
    if let Some(category) = &tx.category {
        return category.clone();
    }
    infer_category(&tx.description)
}

fn infer_category(description: &str) -> String {
    let lowered = description.to_lowercase();
    if lowered.contains("transfer: joint account") {
        "Joint account".to_string()
    } else if lowered.contains("transfer: investments") {
        "Investments".to_string()
    } else if lowered.contains("transfer:") {
        TRANSFERS_CATEGORY.to_string()
    } else {
        OTHER_CATEGORY.to_string()
    }
}

/// Groups transactions into chronological per-month aggregates.
#[must_use]
pub fn build_trends(
    rows: &[(transaction::Model, Option<envelope::Model>)],
) -> Vec<MonthlyTrend> {
    let mut by_period: BTreeMap<Period, MonthlyTrend> = BTreeMap::new();

    for (tx, linked_envelope) in rows {
        let period = Period::containing(tx.date);
        let trend = by_period.entry(period).or_insert_with(|| MonthlyTrend {
            period,
            income: 0.0,
            expenses: 0.0,
            savings: 0.0,
            categories: BTreeMap::new(),
        });

        match tx.kind {
            TransactionKind::Income => trend.income += tx.amount,
            TransactionKind::Expense => {
                trend.expenses += tx.amount;
                let category =
                    resolve_category(tx, linked_envelope.as_ref().map(|e| e.name.as_str()));
                *trend.categories.entry(category).or_insert(0.0) += tx.amount;
            }
        }
    }

    let mut trends: Vec<MonthlyTrend> = by_period.into_values().collect();
    for trend in &mut trends {
        trend.savings = trend.income - trend.expenses;
    }
    trends
}

/// Sums each category across all months and ranks them, biggest first.
#[must_use]
pub fn rank_categories(trends: &[MonthlyTrend]) -> Vec<CategoryTotal> {
    let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
    for trend in trends {
        for (category, amount) in &trend.categories {
            *totals.entry(category.as_str()).or_insert(0.0) += amount;
        }
    }

    let mut ranking: Vec<CategoryTotal> = totals
        .into_iter()
        .map(|(name, total)| CategoryTotal {
            name: name.to_string(),
            total,
        })
        .collect();
    ranking.sort_by(|a, b| {
        b.total
            .partial_cmp(&a.total)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.name.cmp(&b.name))
    });
    ranking
}

/// Computes spending efficiency and overrun statistics per monthly envelope.
///
/// Only months with nonzero spend under the envelope's category count as
/// active; an envelope that was never spent from reports all zeros rather
/// than failing on the empty divisor.
#[must_use]
pub fn analyze_envelopes(
    trends: &[MonthlyTrend],
    monthly_envelopes: &[&envelope::Model],
) -> Vec<EnvelopeEfficiency> {
    monthly_envelopes
        .iter()
        .map(|env| {
            let mut active_months = 0u32;
            let mut overrun_count = 0u32;
            let mut total_spent = 0.0;

            for trend in trends {
                let spent = trend.categories.get(&env.name).copied().unwrap_or(0.0);
                if spent > env.planned_amount {
                    overrun_count += 1;
                }
                if spent > 0.0 {
                    active_months += 1;
                }
                total_spent += spent;
            }

            let (efficiency, overrun_rate, avg_monthly_spent) =
                if active_months > 0 && env.planned_amount > 0.0 {
                    let months = f64::from(active_months);
                    (
                        round_pct(total_spent / (env.planned_amount * months) * 100.0),
                        round_pct(f64::from(overrun_count) / months * 100.0),
                        round_pct(total_spent / months),
                    )
                } else {
                    (0, 0, 0)
                };

            EnvelopeEfficiency {
                name: env.name.clone(),
                icon: env.icon.clone(),
                planned_amount: env.planned_amount,
                efficiency,
                overrun_rate,
                total_spent,
                avg_monthly_spent,
            }
        })
        .collect()
}

/// Computes progress and months-to-completion per yearly goal envelope.
#[must_use]
pub fn analyze_goals(
    goal_envelopes: &[&envelope::Model],
    months_of_history: usize,
) -> Vec<GoalProjection> {
    goal_envelopes
        .iter()
        .map(|env| {
            let current = env.current_amount;
            let target = env.planned_amount;

            let progress = if target > 0.0 {
                round_pct(current / target * 100.0)
            } else {
                0
            };

            // A coarse estimate, not a true moving average: lifetime
            // accumulation spread over the months of recorded history.
            let months_with_data = months_of_history.max(1);
            #[allow(clippy::cast_precision_loss)]
            let avg_monthly_contribution = current / months_with_data as f64;

            let remaining = target - current;
            let months_to_goal = if avg_monthly_contribution > 0.0 && remaining > 0.0 {
                Some(round_up(remaining / avg_monthly_contribution))
            } else {
                None
            };

            GoalProjection {
                name: env.name.clone(),
                icon: env.icon.clone(),
                current,
                target,
                progress,
                avg_monthly_contribution: round_pct(avg_monthly_contribution),
                months_to_goal,
            }
        })
        .collect()
}

/// Compares the latest trend month against the one before it.
#[must_use]
pub fn compare_latest_months(trends: &[MonthlyTrend]) -> Option<PeriodComparison> {
    let [.., previous, last] = trends else {
        return None;
    };

    Some(PeriodComparison {
        income_change: last.income - previous.income,
        expense_change: last.expenses - previous.expenses,
        savings_change: last.savings - previous.savings,
        income_change_percent: pct_change(last.income, previous.income),
        expense_change_percent: pct_change(last.expenses, previous.expenses),
        savings_change_percent: pct_change(last.savings, previous.savings),
    })
}

fn pct_change(current: f64, baseline: f64) -> i64 {
    if baseline > 0.0 {
        round_pct((current - baseline) / baseline * 100.0)
    } else {
        0
    }
}

/// Averages the headline figures over the trailing 3 months.
#[must_use]
pub fn moving_averages(trends: &[MonthlyTrend], mode: MovingAverageMode) -> MovingAverages {
    let window = &trends[trends.len().saturating_sub(3)..];
    let periods = window.len();

    let mut avg_income: f64 = window.iter().map(|t| t.income).sum();
    let mut avg_expenses: f64 = window.iter().map(|t| t.expenses).sum();
    let mut avg_savings: f64 = window.iter().map(|t| t.savings).sum();

    let divisor = match mode {
        MovingAverageMode::FullWindowOnly => (periods >= 3).then_some(3.0),
        #[allow(clippy::cast_precision_loss)]
        MovingAverageMode::AvailablePeriods => (periods > 0).then_some(periods as f64),
    };
    if let Some(divisor) = divisor {
        avg_income /= divisor;
        avg_expenses /= divisor;
        avg_savings /= divisor;
    }

    MovingAverages {
        avg_income,
        avg_expenses,
        avg_savings,
        periods,
    }
}

// Display percentages and month counts are small; truncation cannot occur in
// practice and sign is meaningful.
#[allow(clippy::cast_possible_truncation)]
fn round_pct(value: f64) -> i64 {
    value.round() as i64
}

#[allow(clippy::cast_possible_truncation)]
fn round_up(value: f64) -> i64 {
    value.ceil() as i64
}
