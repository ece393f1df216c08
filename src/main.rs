use dotenvy::dotenv;
use envelope_ledger::{
    config,
    core::dashboard,
    errors::Result,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();

    // 3. Load the envelope configuration
    let app_config = config::envelopes::load_default_config()?;
    info!(
        tenant = %app_config.tenant,
        envelopes = app_config.envelopes.len(),
        "Loaded configuration"
    );

    // 4. Initialize the database
    let db = config::database::create_connection().await?;
    config::database::create_tables(&db).await?;
    info!("Database initialized");

    // 5. Seed configured envelopes (no-op on re-runs)
    let created = config::envelopes::seed_envelopes(&db, &app_config).await?;
    info!(created, "Envelope seeding complete");

    // 6. Print the current-month standing
    let snapshot = dashboard::snapshot(&db, &app_config.tenant, chrono::Utc::now()).await?;
    info!(
        period = %snapshot.period,
        balance = snapshot.balance,
        income = snapshot.total_income,
        expenses = snapshot.total_expenses,
        closed = snapshot.is_month_closed,
        "Current month"
    );
    for card in snapshot.monthly_envelopes.iter().chain(&snapshot.yearly_envelopes) {
        info!(
            envelope = %card.envelope.name,
            kind = ?card.envelope.kind,
            planned = card.envelope.planned_amount,
            balance = card.envelope.current_amount,
            spent = card.spent,
            "Envelope"
        );
    }

    Ok(())
}
