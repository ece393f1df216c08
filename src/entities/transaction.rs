//! Transaction entity - One income or expense event in the ledger.
//!
//! `amount` is a strictly positive magnitude; direction is carried by `kind`,
//! never by sign. An expense may be attributed to exactly one envelope via the
//! nullable `envelope_id`; income transactions and unattributed transfers have
//! none. The envelope never holds a reference back, so there are no ownership
//! cycles.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Direction of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Money entering the main pool
    #[sea_orm(string_value = "income")]
    Income,
    /// Money leaving the main pool (spend, transfer, or closing transfer)
    #[sea_orm(string_value = "expense")]
    Expense,
}

/// Transaction database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    /// Unique identifier for the transaction
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning tenant
    pub tenant_id: String,
    /// Income or expense; direction is never encoded in the amount's sign
    pub kind: TransactionKind,
    /// Strictly positive magnitude
    pub amount: f64,
    /// Free-text description; a description bearing the closing marker makes
    /// this a closing transaction, excluded from ordinary aggregation
    pub description: String,
    /// First-class category tag; set at creation for transfers, `None` for
    /// rows whose category is derived from the envelope or description
    pub category: Option<String>,
    /// When the transaction occurred
    pub date: DateTimeUtc,
    /// Envelope this expense is attributed to, if any
    pub envelope_id: Option<i64>,
}

/// Defines relationships between Transaction and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each transaction optionally belongs to one envelope
    #[sea_orm(
        belongs_to = "super::envelope::Entity",
        from = "Column::EnvelopeId",
        to = "super::envelope::Column::Id"
    )]
    Envelope,
}

impl Related<super::envelope::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Envelope.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
