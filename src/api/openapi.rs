use utoipa::{
    Modify, OpenApi,
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
};

use crate::{
    api::models::{ErrorResponse, LoginRequest, LoginResponse},
    constants::constants::SESSION_COOKIE,
    core::models::{
        ActivityEntry, ActivityKind, Balance, BalanceSnapshot, BalanceSummary, CancelUpiRequest, ConfirmUpiRequest,
        PaymentChannel, SettlementEnvelope, SettlementPage, SettlementRecord, SettlementRequest, SettlementStatus,
        UpiSettlementIntent, UpiSettlementRequest,
    },
};

struct SessionCookie;

impl Modify for SessionCookie {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "session",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(SESSION_COOKIE))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        super::handlers::login,
        super::handlers::get_balances,
        super::handlers::get_balance_summary,
        super::handlers::list_settlements,
        super::handlers::create_settlement,
        super::handlers::create_upi_settlement,
        super::handlers::confirm_upi_settlement,
        super::handlers::cancel_upi_settlement,
        super::handlers::get_recent_activity
    ),
    components(schemas(
        LoginRequest,
        LoginResponse,
        ErrorResponse,
        Balance,
        BalanceSnapshot,
        BalanceSummary,
        PaymentChannel,
        SettlementStatus,
        SettlementRecord,
        SettlementRequest,
        SettlementEnvelope,
        SettlementPage,
        UpiSettlementRequest,
        UpiSettlementIntent,
        ConfirmUpiRequest,
        CancelUpiRequest,
        ActivityKind,
        ActivityEntry
    )),
    modifiers(&SessionCookie),
    info(
        title = "SettleUp Ledger API",
        description = "Development ledger for balances, cash settlements and two-phase UPI settlements",
        version = "0.1.0"
    )
)]
pub struct ApiDoc;
