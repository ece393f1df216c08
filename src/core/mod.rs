//! Core business logic - framework-agnostic ledger operations.
//!
//! Every operation takes an explicit `tenant_id`; the core holds no global
//! tenant state. Mutating operations (ledger, allocation, closing) each run
//! inside a single database transaction, which also serializes them per
//! store - analytics, dashboard, and archive are pure reads.

/// Allocation engine - splits income events across envelopes
pub mod allocation;
/// Analytics engine - stateless projections over the transaction history
pub mod analytics;
/// Archive - month-grouped transaction history
pub mod archive;
/// Month-closing engine
pub mod closing;
/// Dashboard snapshot of the current month
pub mod dashboard;
/// Envelope lookups, creation, and balance updates
pub mod envelope;
/// Ledger core - record, edit, and delete transactions
pub mod ledger;
