use settleup::api::{LedgerState, app};
use settleup::config::CONFIG;
use settleup::infrastructure::ledger::in_memory::{InMemoryLedger, LedgerUser};
use settleup::SettleError;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

// Demo book so a client can settle against something right away.
async fn seed(ledger: &InMemoryLedger) -> Result<(), SettleError> {
    ledger.add_user(LedgerUser::new("alice", "Alice", Some("alice@okaxis"))).await;
    ledger.add_user(LedgerUser::new("bob", "Bob", Some("bob@oksbi"))).await;
    ledger.add_user(LedgerUser::new("carol", "Carol", None)).await;
    ledger.add_user(LedgerUser::new("dave", "Dave", Some("dave@ybl"))).await;

    ledger.record_debt("alice", "bob", 450.0, Some("goa-trip")).await?;
    ledger.record_debt("alice", "carol", 120.5, Some("flat")).await?;
    ledger.record_debt("dave", "alice", 300.0, Some("goa-trip")).await?;
    ledger.record_debt("carol", "bob", 75.25, Some("flat")).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&CONFIG.log_level))
        .init();
    info!(config = ?*CONFIG, "starting ledger server");

    let ledger = InMemoryLedger::new();
    seed(&ledger).await?;
    let state = Arc::new(LedgerState::from_config(ledger, &CONFIG));

    let addr = SocketAddr::from(([127, 0, 0, 1], CONFIG.port));
    info!("Server running at http://{}", addr);
    info!("Swagger UI at http://{}/swagger-ui", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}
