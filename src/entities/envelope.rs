//! Envelope entity - A labeled budgeting bucket.
//!
//! Monthly envelopes represent "remaining budget" and reset to zero at every
//! month close; yearly envelopes represent "amount saved so far" and
//! accumulate toward a fixed target. `current_amount` is a signed running
//! balance: a monthly envelope can go negative (overrun) and a yearly one can
//! exceed its target (goal exceeded).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle behavior of an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeKind {
    /// Resets to zero every closing cycle; `current_amount` = funds remaining
    #[sea_orm(string_value = "monthly")]
    Monthly,
    /// Accumulates toward `planned_amount`; `current_amount` = amount saved
    #[sea_orm(string_value = "yearly")]
    Yearly,
}

/// Envelope database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "envelopes")]
pub struct Model {
    /// Unique identifier for the envelope
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning tenant; every core operation is scoped to one tenant
    pub tenant_id: String,
    /// Human-readable name, unique within the tenant (e.g., "Groceries")
    pub name: String,
    /// Display icon, carried through untouched
    pub icon: String,
    /// Whether this envelope resets monthly or accumulates yearly
    pub kind: EnvelopeKind,
    /// Stable role tag resolved at configuration time (e.g., `"carry_over"`
    /// for the unallocated-surplus pool), decoupled from the display name
    pub role: Option<String>,
    /// Budget ceiling (monthly) or goal target (yearly); non-negative
    pub planned_amount: f64,
    /// Signed running balance
    pub current_amount: f64,
}

/// Defines relationships between Envelope and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One envelope has many transactions
    #[sea_orm(has_many = "super::transaction::Entity")]
    Transactions,
}

impl Related<super::transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Role tag of the envelope that receives each period's positive net balance.
pub const ROLE_CARRY_OVER: &str = "carry_over";
