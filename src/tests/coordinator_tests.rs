use super::{ScriptedLedger, balance, build_coordinator, seeded_ledger};
use crate::core::errors::SettleError;
use crate::core::models::{BalanceSnapshot, PaymentChannel, SettlementStatus};
use crate::core::state::WorkflowState;
use crate::infrastructure::ledger::LedgerService;
use crate::infrastructure::notifications::in_memory::Notification;

#[tokio::test]
async fn test_cash_settlement_end_to_end() {
    let ledger = seeded_ledger().await;
    let (coordinator, notifications, _) = build_coordinator(ledger.session("me"));

    let state = coordinator.open(Some("trip".to_string())).await.unwrap();
    let balances = state.balances().unwrap();
    assert_eq!(balances.i_owe.len(), 2);
    assert_eq!(balances.debt_to("bob").unwrap().amount, 50.0);

    coordinator.select_counterparty("bob").await.unwrap();
    coordinator.set_amount("20").await.unwrap();
    coordinator.set_note("Dinner").await.unwrap();
    let state = coordinator.submit().await.unwrap();

    match &state {
        WorkflowState::CashDone { settlement, balances } => {
            assert_eq!(settlement.payee, "bob");
            assert_eq!(settlement.amount, 20.0);
            assert_eq!(settlement.status, SettlementStatus::Completed);
            assert_eq!(settlement.note.as_deref(), Some("Dinner"));
            let refreshed = balances.as_ref().unwrap();
            assert_eq!(refreshed.debt_to("bob").unwrap().amount, 30.0);
        }
        other => panic!("expected CashDone, got {:?}", other),
    }
    assert!(!state.is_open());
    assert_eq!(
        notifications.events(),
        vec![
            Notification::Success("Settlement recorded!".to_string()),
            Notification::Refresh(Some("trip".to_string())),
        ]
    );

    let page = ledger.settlements_for("me", Default::default()).await.unwrap();
    assert_eq!(page.count, 1);
}

#[tokio::test]
async fn test_upi_settlement_end_to_end() {
    let ledger = seeded_ledger().await;
    let (coordinator, notifications, launcher) = build_coordinator(ledger.session("me"));

    coordinator.open(Some("trip".to_string())).await.unwrap();
    coordinator.select_counterparty("bob").await.unwrap();
    coordinator.use_full_amount().await.unwrap();
    coordinator.set_channel(PaymentChannel::Upi).await.unwrap();
    let state = coordinator.submit().await.unwrap();

    let payment = state.pending_payment().unwrap().clone();
    assert!(matches!(state, WorkflowState::UpiAwaitingAppReturn { .. }));
    assert_eq!(payment.settlement.status, SettlementStatus::Pending);
    assert_eq!(
        launcher.last_uri().unwrap(),
        "upi://pay?pa=bob@upi&pn=Bob%20Kumar&am=50&cu=INR&tn=SplitEase%20Settlement"
    );
    // Nothing moves on the ledger until confirmation.
    let balances = ledger.balances_for("me", Some("trip")).await.unwrap();
    assert_eq!(balances.debt_to("bob").unwrap().amount, 50.0);

    let state = coordinator.confirm_upi(Some(" TXN123 ")).await.unwrap();
    match &state {
        WorkflowState::UpiDone { settlement, balances } => {
            assert_eq!(settlement.id, payment.settlement_id());
            assert_eq!(settlement.status, SettlementStatus::Completed);
            assert_eq!(settlement.transaction_ref.as_deref(), Some("TXN123"));
            assert!(balances.as_ref().unwrap().debt_to("bob").is_none());
        }
        other => panic!("expected UpiDone, got {:?}", other),
    }
    assert_eq!(notifications.successes(), vec!["Payment confirmed!".to_string()]);
    assert_eq!(notifications.refresh_count(), 1);
}

#[tokio::test]
async fn test_amount_above_balance_never_reaches_ledger() {
    let ledger = ScriptedLedger::new();
    let (coordinator, notifications, _) = build_coordinator(ledger.clone());

    coordinator.open(None).await.unwrap();
    coordinator.select_counterparty("bob").await.unwrap();
    let state = coordinator.set_amount("75").await.unwrap();
    assert_eq!(state.error(), Some("Amount cannot exceed ₹50.00"));

    let err = coordinator.submit().await.unwrap_err();
    assert!(matches!(err, SettleError::Validation(ref f) if f.field == "amount"));
    let state = coordinator.state().await;
    assert!(matches!(state, WorkflowState::DraftEditing { .. }));
    assert_eq!(state.draft().unwrap().amount_input, "75");
    assert_eq!(ledger.count("settle"), 0);
    assert!(notifications.events().is_empty());
}

#[tokio::test]
async fn test_amount_validation_rules() {
    let ledger = ScriptedLedger::new();
    let (coordinator, _, _) = build_coordinator(ledger.clone());
    coordinator.open(None).await.unwrap();
    coordinator.select_counterparty("bob").await.unwrap();

    for (input, expected) in [
        ("", "Enter a valid amount."),
        ("abc", "Enter a valid amount."),
        ("NaN", "Enter a valid amount."),
        ("0", "Amount must be greater than 0"),
        ("-5", "Amount must be greater than 0"),
        ("10.555", "Amount cannot have more than 2 decimal places"),
    ] {
        coordinator.set_amount(input).await.unwrap();
        let err = coordinator.submit().await.unwrap_err();
        assert_eq!(err.user_message(), expected, "input {:?}", input);
    }
    assert_eq!(ledger.count("settle"), 0);

    coordinator.set_amount("0.29").await.unwrap();
    assert!(coordinator.state().await.error().is_none());
    coordinator.submit().await.unwrap();
    assert_eq!(ledger.count("settle:bob:0.29"), 1);
}

#[tokio::test]
async fn test_full_amount_matches_balance_exactly() {
    let ledger = ScriptedLedger::new();
    let (coordinator, _, _) = build_coordinator(ledger.clone());
    coordinator.open(None).await.unwrap();
    coordinator.select_counterparty("carol").await.unwrap();

    let state = coordinator.use_full_amount().await.unwrap();
    assert_eq!(state.draft().unwrap().amount_input, "20.5");
    coordinator.submit().await.unwrap();
    assert_eq!(ledger.count("settle:carol:20.5"), 1);
}

#[tokio::test]
async fn test_full_amount_settles_balances_with_extra_precision() {
    for owed in [100.0 / 3.0, 0.1 + 0.2] {
        let ledger = ScriptedLedger::new();
        ledger.set_balances(None, BalanceSnapshot::new(vec![], vec![balance("bob", "Bob Kumar", None, owed)]));
        let (coordinator, _, _) = build_coordinator(ledger.clone());
        coordinator.open(None).await.unwrap();
        coordinator.select_counterparty("bob").await.unwrap();

        let state = coordinator.use_full_amount().await.unwrap();
        assert_eq!(state.draft().unwrap().amount_input, owed.to_string());
        assert!(state.error().is_none());

        let state = coordinator.submit().await.unwrap();
        assert!(matches!(state, WorkflowState::CashDone { .. }));
        assert_eq!(ledger.count(&format!("settle:bob:{}", owed)), 1);
    }
}

#[tokio::test]
async fn test_partial_amount_still_limited_to_two_decimals() {
    let ledger = ScriptedLedger::new();
    ledger.set_balances(None, BalanceSnapshot::new(vec![], vec![balance("bob", "Bob Kumar", None, 100.0 / 3.0)]));
    let (coordinator, _, _) = build_coordinator(ledger.clone());
    coordinator.open(None).await.unwrap();
    coordinator.select_counterparty("bob").await.unwrap();

    let state = coordinator.set_amount("33.333").await.unwrap();
    assert_eq!(state.error(), Some("Amount cannot have more than 2 decimal places"));
    assert!(coordinator.submit().await.is_err());
    assert_eq!(ledger.count("settle"), 0);

    coordinator.set_amount("33.33").await.unwrap();
    coordinator.submit().await.unwrap();
    assert_eq!(ledger.count("settle:bob:33.33"), 1);
}

#[tokio::test]
async fn test_upi_unavailable_without_recipient_id() {
    let ledger = ScriptedLedger::new();
    let (coordinator, _, _) = build_coordinator(ledger.clone());
    coordinator.open(None).await.unwrap();
    coordinator.select_counterparty("carol").await.unwrap();

    let err = coordinator.set_channel(PaymentChannel::Upi).await.unwrap_err();
    assert_eq!(err.user_message(), "Carol has not registered a UPI ID");
    let state = coordinator.state().await;
    assert_eq!(state.draft().unwrap().payment_channel, PaymentChannel::Cash);
    assert_eq!(ledger.count("upi"), 0);
}

#[tokio::test]
async fn test_note_is_cash_only() {
    let ledger = ScriptedLedger::new();
    let (coordinator, _, _) = build_coordinator(ledger);
    coordinator.open(None).await.unwrap();
    coordinator.select_counterparty("bob").await.unwrap();

    coordinator.set_note("  for the cab  ").await.unwrap();
    assert_eq!(
        coordinator.state().await.draft().unwrap().note.as_deref(),
        Some("for the cab")
    );

    let state = coordinator.set_channel(PaymentChannel::Upi).await.unwrap();
    assert_eq!(state.draft().unwrap().note, None);
    let err = coordinator.set_note("lunch").await.unwrap_err();
    assert!(matches!(err, SettleError::Validation(ref f) if f.field == "note"));

    coordinator.set_channel(PaymentChannel::Cash).await.unwrap();
    let err = coordinator.set_note(&"x".repeat(256)).await.unwrap_err();
    assert_eq!(err.user_message(), "Note cannot exceed 255 characters");
}

#[tokio::test]
async fn test_server_rejection_keeps_draft_and_message() {
    let ledger = ScriptedLedger::new();
    ledger.fail("settle", SettleError::rejected(409, "Balance already settled"));
    let (coordinator, notifications, _) = build_coordinator(ledger.clone());

    coordinator.open(None).await.unwrap();
    coordinator.select_counterparty("bob").await.unwrap();
    coordinator.set_amount("25").await.unwrap();
    let err = coordinator.submit().await.unwrap_err();

    assert_eq!(err, SettleError::rejected(409, "Balance already settled"));
    let state = coordinator.state().await;
    assert!(matches!(state, WorkflowState::DraftEditing { .. }));
    assert_eq!(state.error(), Some("Balance already settled"));
    assert_eq!(state.draft().unwrap().amount_input, "25");
    assert_eq!(notifications.errors(), vec!["Balance already settled".to_string()]);
    assert_eq!(notifications.refresh_count(), 0);

    // Retry without re-typing.
    ledger.succeed("settle");
    let state = coordinator.submit().await.unwrap();
    assert!(matches!(state, WorkflowState::CashDone { .. }));
    assert_eq!(ledger.count("settle:bob:25"), 2);
}

#[tokio::test]
async fn test_network_failure_uses_fallback_message() {
    let ledger = ScriptedLedger::new();
    ledger.fail("settle", SettleError::Network("Connection refused".to_string()));
    let (coordinator, notifications, _) = build_coordinator(ledger);

    coordinator.open(None).await.unwrap();
    coordinator.select_counterparty("bob").await.unwrap();
    coordinator.set_amount("10").await.unwrap();
    assert!(coordinator.submit().await.is_err());
    assert_eq!(coordinator.state().await.error(), Some("Failed to create settlement"));
    assert_eq!(notifications.errors(), vec!["Failed to create settlement".to_string()]);
}

#[tokio::test]
async fn test_balance_load_failure_and_retry() {
    let ledger = ScriptedLedger::new();
    ledger.fail("fetch", SettleError::Auth("Missing session".to_string()));
    let (coordinator, notifications, _) = build_coordinator(ledger.clone());

    let err = coordinator.open(None).await.unwrap_err();
    assert!(err.is_auth());
    let state = coordinator.state().await;
    assert_eq!(
        state,
        WorkflowState::Failed {
            error: "Not authenticated: Missing session".to_string()
        }
    );
    assert!(notifications.events().is_empty());

    ledger.succeed("fetch");
    let state = coordinator.refresh().await.unwrap();
    assert!(matches!(state, WorkflowState::BalancesReady { .. }));
}

#[tokio::test]
async fn test_all_settled_and_creditor_selection() {
    let ledger = ScriptedLedger::new();
    let (coordinator, _, _) = build_coordinator(ledger.clone());

    coordinator.open(None).await.unwrap();
    let err = coordinator.select_counterparty("dave").await.unwrap_err();
    assert_eq!(err.user_message(), "You do not owe dave anything");

    ledger.set_balances(None, BalanceSnapshot::default());
    let state = coordinator.refresh().await.unwrap();
    assert!(state.balances().unwrap().is_all_settled());
    let err = coordinator.select_counterparty("bob").await.unwrap_err();
    assert_eq!(err.user_message(), "You don't owe anyone money");
    assert!(matches!(coordinator.state().await, WorkflowState::BalancesReady { .. }));
}

#[tokio::test]
async fn test_non_positive_balances_are_dropped() {
    let ledger = ScriptedLedger::new();
    let mut snapshot = super::default_snapshot();
    snapshot.i_owe.push(super::balance("erin", "Erin", None, 0.0));
    snapshot.owed_to_me.push(super::balance("frank", "Frank", None, -3.0));
    ledger.set_balances(None, snapshot);
    let (coordinator, _, _) = build_coordinator(ledger);

    let state = coordinator.open(None).await.unwrap();
    let balances = state.balances().unwrap();
    assert_eq!(balances.i_owe.len(), 2);
    assert_eq!(balances.owed_to_me.len(), 1);
    assert!(balances.i_owe.iter().chain(&balances.owed_to_me).all(|b| b.amount > 0.0));
}

#[tokio::test]
async fn test_resubmit_while_submitting_is_rejected() {
    let ledger = ScriptedLedger::new();
    let (coordinator, _, _) = build_coordinator(ledger.clone());
    coordinator.open(None).await.unwrap();
    coordinator.select_counterparty("bob").await.unwrap();
    coordinator.set_amount("10").await.unwrap();

    let gate = ledger.gate("settle");
    let background = coordinator.clone();
    let first = tokio::spawn(async move { background.submit().await });
    gate.entered().await;

    assert!(matches!(coordinator.state().await, WorkflowState::Submitting { .. }));
    let err = coordinator.submit().await.unwrap_err();
    assert!(matches!(err, SettleError::InvalidTransition { .. }));
    assert!(coordinator.set_amount("20").await.is_err());
    assert!(coordinator.open(None).await.is_err());

    gate.release();
    let state = first.await.unwrap().unwrap();
    assert!(matches!(state, WorkflowState::CashDone { .. }));
    assert_eq!(ledger.count("settle"), 1);
}

#[tokio::test]
async fn test_confirm_failure_keeps_pending_payment() {
    let ledger = ScriptedLedger::new();
    ledger.fail("confirm", SettleError::rejected(404, "Settlement upi-1 not found"));
    let (coordinator, notifications, launcher) = build_coordinator(ledger.clone());

    coordinator.open(None).await.unwrap();
    coordinator.select_counterparty("bob").await.unwrap();
    coordinator.set_amount("50").await.unwrap();
    coordinator.set_channel(PaymentChannel::Upi).await.unwrap();
    coordinator.submit().await.unwrap();

    let err = coordinator.confirm_upi(Some("REF-1")).await.unwrap_err();
    assert_eq!(err.user_message(), "Settlement upi-1 not found");
    match coordinator.state().await {
        WorkflowState::UpiConfirming {
            payment,
            transaction_ref,
            in_flight,
            error,
        } => {
            assert_eq!(payment.settlement_id(), "upi-1");
            assert_eq!(transaction_ref.as_deref(), Some("REF-1"));
            assert!(!in_flight);
            assert_eq!(error.as_deref(), Some("Settlement upi-1 not found"));
        }
        other => panic!("expected UpiConfirming, got {:?}", other),
    }
    assert_eq!(notifications.errors().len(), 1);

    // Retry re-opens the same link and clears the reference.
    let state = coordinator.retry_upi().await.unwrap();
    assert!(matches!(state, WorkflowState::UpiAwaitingAppReturn { .. }));
    assert_eq!(launcher.launched().len(), 2);
    assert_eq!(launcher.launched()[0], launcher.launched()[1]);

    ledger.succeed("confirm");
    let state = coordinator.confirm_upi(None).await.unwrap();
    assert!(matches!(state, WorkflowState::UpiDone { .. }));
    assert_eq!(ledger.count("confirm:upi-1:-"), 1);
}

#[tokio::test]
async fn test_cancel_upi_is_best_effort() {
    let ledger = ScriptedLedger::new();
    ledger.fail("cancel", SettleError::Network("Request timeout".to_string()));
    let (coordinator, notifications, _) = build_coordinator(ledger.clone());

    coordinator.open(None).await.unwrap();
    coordinator.select_counterparty("bob").await.unwrap();
    coordinator.set_amount("12.5").await.unwrap();
    coordinator.set_channel(PaymentChannel::Upi).await.unwrap();
    coordinator.submit().await.unwrap();

    let state = coordinator.cancel_upi().await.unwrap();
    assert_eq!(state, WorkflowState::Idle);
    assert_eq!(ledger.count("cancel:upi-1"), 1);
    assert!(notifications.events().is_empty());
    assert!(coordinator.confirm_upi(None).await.is_err());
}

#[tokio::test]
async fn test_upi_creation_rejected_returns_to_draft() {
    let ledger = ScriptedLedger::new();
    ledger.fail("upi", SettleError::rejected(400, "Recipient has not registered a UPI ID"));
    let (coordinator, notifications, launcher) = build_coordinator(ledger);

    coordinator.open(None).await.unwrap();
    coordinator.select_counterparty("bob").await.unwrap();
    coordinator.set_amount("5").await.unwrap();
    coordinator.set_channel(PaymentChannel::Upi).await.unwrap();
    assert!(coordinator.submit().await.is_err());

    let state = coordinator.state().await;
    assert_eq!(state.draft().unwrap().payment_channel, PaymentChannel::Upi);
    assert_eq!(state.error(), Some("Recipient has not registered a UPI ID"));
    assert!(launcher.launched().is_empty());
    assert_eq!(notifications.errors().len(), 1);
}

#[tokio::test]
async fn test_transitions_outside_their_states() {
    let ledger = ScriptedLedger::new();
    let (coordinator, _, _) = build_coordinator(ledger);

    assert!(coordinator.select_counterparty("bob").await.is_err());
    assert!(coordinator.submit().await.is_err());
    assert!(coordinator.confirm_upi(None).await.is_err());
    assert!(coordinator.retry_upi().await.is_err());
    assert!(coordinator.cancel_upi().await.is_err());
    assert_eq!(coordinator.close().await, WorkflowState::Idle);
}

#[tokio::test]
async fn test_reselecting_resets_the_draft() {
    let ledger = ScriptedLedger::new();
    let (coordinator, _, _) = build_coordinator(ledger);
    coordinator.open(None).await.unwrap();
    coordinator.select_counterparty("bob").await.unwrap();
    coordinator.set_amount("10").await.unwrap();
    coordinator.set_channel(PaymentChannel::Upi).await.unwrap();

    let state = coordinator.select_counterparty("carol").await.unwrap();
    let draft = state.draft().unwrap();
    assert_eq!(draft.counterparty_id, "carol");
    assert_eq!(draft.amount_input, "");
    assert_eq!(draft.payment_channel, PaymentChannel::Cash);
}

#[tokio::test]
async fn test_scoped_fetch_passes_scope_to_ledger() {
    let ledger = ScriptedLedger::new();
    ledger.set_balances(Some("trip"), BalanceSnapshot::default());
    let (coordinator, _, _) = build_coordinator(ledger.clone());

    let state = coordinator.open(Some("trip".to_string())).await.unwrap();
    assert!(state.balances().unwrap().is_all_settled());
    assert_eq!(coordinator.scope().await.as_deref(), Some("trip"));
    assert_eq!(ledger.calls(), vec!["fetch:trip".to_string()]);
    assert_eq!(coordinator.ledger().balance_summary(None).await.unwrap().you_owe, 70.5);
}

fn u1_ledger() -> ScriptedLedger {
    let ledger = ScriptedLedger::new();
    ledger.set_balances(
        None,
        BalanceSnapshot::new(vec![], vec![super::balance("u1", "U One", Some("u1@bank"), 50.0)]),
    );
    ledger
}

#[tokio::test]
async fn test_cash_submit_calls_ledger_once_then_refetches() {
    let ledger = u1_ledger();
    let (coordinator, _, _) = build_coordinator(ledger.clone());

    coordinator.open(None).await.unwrap();
    coordinator.select_counterparty("u1").await.unwrap();
    coordinator.set_amount("50").await.unwrap();
    coordinator.set_channel(PaymentChannel::Cash).await.unwrap();
    coordinator.set_note("dinner").await.unwrap();
    let state = coordinator.submit().await.unwrap();

    match state {
        WorkflowState::CashDone { settlement, .. } => assert_eq!(settlement.note.as_deref(), Some("dinner")),
        other => panic!("expected CashDone, got {:?}", other),
    }
    assert_eq!(
        ledger.calls(),
        vec!["fetch:".to_string(), "settle:u1:50".to_string(), "fetch:".to_string()]
    );
}

#[tokio::test]
async fn test_upi_submit_then_confirm_with_reference() {
    let ledger = u1_ledger();
    let (coordinator, notifications, launcher) = build_coordinator(ledger.clone());

    coordinator.open(None).await.unwrap();
    coordinator.select_counterparty("u1").await.unwrap();
    coordinator.set_amount("50").await.unwrap();
    coordinator.set_channel(PaymentChannel::Upi).await.unwrap();
    let state = coordinator.submit().await.unwrap();

    assert!(matches!(state, WorkflowState::UpiAwaitingAppReturn { .. }));
    assert_eq!(ledger.count("upi:u1:50"), 1);
    assert!(launcher.last_uri().unwrap().contains("pa=u1@bank&pn=U%20One&am=50"));

    let state = coordinator.confirm_upi(Some("TXN123")).await.unwrap();
    assert!(matches!(state, WorkflowState::UpiDone { .. }));
    assert_eq!(ledger.count("confirm:upi-1:TXN123"), 1);
    assert_eq!(notifications.successes().len(), 1);
    assert_eq!(notifications.refresh_count(), 1);
}

fn test_config(currency: &str) -> crate::config::Config {
    crate::config::Config {
        port: 0,
        ledger_base_url: "http://127.0.0.1:9/api".to_string(),
        log_level: "debug".to_string(),
        jwt_secret: "test-secret".to_string(),
        session_token: Some("token".to_string()),
        request_timeout: std::time::Duration::from_secs(1),
        upi_currency: currency.to_string(),
        upi_transaction_note: "Flat rent".to_string(),
    }
}

#[tokio::test]
async fn test_headless_wiring_from_config() {
    use crate::core::coordinator::{CoordinatorOptions, SettlementCoordinator};
    use crate::infrastructure::ledger::http::HttpLedger;
    use crate::infrastructure::notifications::TracingNotifications;
    use crate::infrastructure::payment_app::LoggingLauncher;

    let config = test_config("EUR");
    let ledger = ScriptedLedger::new();
    let coordinator = SettlementCoordinator::new(ledger.clone(), TracingNotifications, LoggingLauncher)
        .with_options(CoordinatorOptions::from_config(&config));
    assert_eq!(coordinator.options().transaction_note, "Flat rent");

    coordinator.open(None).await.unwrap();
    coordinator.select_counterparty("bob").await.unwrap();
    let state = coordinator.set_amount("51").await.unwrap();
    assert_eq!(state.error(), Some("Amount cannot exceed 50.00€"));

    coordinator.set_amount("50").await.unwrap();
    coordinator.set_channel(PaymentChannel::Upi).await.unwrap();
    let state = coordinator.submit().await.unwrap();
    let link = &state.pending_payment().unwrap().link;
    assert_eq!(link.currency, "EUR");
    assert!(link.to_uri().ends_with("&cu=EUR&tn=Flat%20rent"));
    assert!(matches!(coordinator.confirm_upi(None).await.unwrap(), WorkflowState::UpiDone { .. }));

    // Nothing listens on the discard port.
    let http = HttpLedger::from_config(&config).unwrap();
    let err = http.fetch_balances(None).await.unwrap_err();
    assert!(matches!(err, SettleError::Network(_)));
}
