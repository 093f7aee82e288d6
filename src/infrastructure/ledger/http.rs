use crate::config::Config;
use crate::constants::constants::{
    ACTIVITY_PATH, BALANCES_PATH, LOGIN_PATH, SESSION_COOKIE, SETTLEMENTS_PATH, SUMMARY_PATH, UPI_CANCEL_PATH,
    UPI_CONFIRM_PATH, UPI_SETTLEMENTS_PATH,
};
use crate::core::errors::SettleError;
use crate::core::models::{
    ActivityEntry, BalanceSnapshot, BalanceSummary, CancelUpiRequest, ConfirmUpiRequest, SettlementEnvelope,
    SettlementPage, SettlementQuery, SettlementRecord, SettlementRequest, UpiSettlementIntent, UpiSettlementRequest,
};
use crate::infrastructure::ledger::LedgerService;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, header};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

#[derive(Serialize)]
struct LoginBody<'a> {
    #[serde(rename = "userId")]
    user_id: &'a str,
}

#[derive(Deserialize)]
struct LoginReply {
    token: String,
}

/// REST client for the ledger service. The session cookie is attached to every request.
#[derive(Clone)]
pub struct HttpLedger {
    base_url: String,
    client: Client,
    session_token: Option<String>,
}

impl HttpLedger {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SettleError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SettleError::Internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(HttpLedger {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            session_token: None,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, SettleError> {
        let ledger = HttpLedger::new(&config.ledger_base_url, config.request_timeout)?;
        Ok(match &config.session_token {
            Some(token) => ledger.with_session(token.clone()),
            None => ledger,
        })
    }

    pub fn with_session(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }

    /// Opens a session on a development ledger and keeps its token.
    pub async fn login(self, user_id: &str) -> Result<Self, SettleError> {
        let request = self
            .client
            .post(self.url(LOGIN_PATH))
            .json(&LoginBody { user_id });
        let reply: LoginReply = self.send(request).await?;
        Ok(self.with_session(reply.token))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.session_token {
            Some(token) => request.header(header::COOKIE, format!("{}={}", SESSION_COOKIE, token)),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, SettleError> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| SettleError::Network(describe_transport_error(&e)))?;
        let response = check_status(response).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| SettleError::Network(format!("Invalid response body: {}", e)))
    }
}

fn describe_transport_error(err: &reqwest::Error) -> String {
    if err.is_connect() {
        "Connection refused".to_string()
    } else if err.is_timeout() {
        "Request timeout".to_string()
    } else {
        err.to_string()
    }
}

async fn check_status(response: Response) -> Result<Response, SettleError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response
        .json::<ErrorBody>()
        .await
        .ok()
        .and_then(|body| body.message)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("Request failed").to_string());
    debug!(status = status.as_u16(), %message, "ledger rejected request");
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(SettleError::Auth(message)),
        _ => Err(SettleError::rejected(status.as_u16(), message)),
    }
}

fn scope_params(scope: Option<&str>) -> Vec<(&'static str, String)> {
    scope.map(|s| vec![("scope", s.to_string())]).unwrap_or_default()
}

#[async_trait]
impl LedgerService for HttpLedger {
    async fn fetch_balances(&self, scope: Option<&str>) -> Result<BalanceSnapshot, SettleError> {
        let request = self.client.get(self.url(BALANCES_PATH)).query(&scope_params(scope));
        self.send(request).await
    }

    async fn create_settlement(&self, request: SettlementRequest) -> Result<SettlementRecord, SettleError> {
        let request = self.client.post(self.url(SETTLEMENTS_PATH)).json(&request);
        let envelope: SettlementEnvelope = self.send(request).await?;
        Ok(envelope.settlement)
    }

    async fn create_upi_settlement(&self, request: UpiSettlementRequest) -> Result<UpiSettlementIntent, SettleError> {
        let request = self.client.post(self.url(UPI_SETTLEMENTS_PATH)).json(&request);
        self.send(request).await
    }

    async fn confirm_upi_payment(
        &self,
        settlement_id: &str,
        transaction_ref: Option<&str>,
    ) -> Result<SettlementRecord, SettleError> {
        let body = ConfirmUpiRequest {
            settlement_id: settlement_id.to_string(),
            transaction_ref: transaction_ref.map(String::from),
        };
        let request = self.client.put(self.url(UPI_CONFIRM_PATH)).json(&body);
        let envelope: SettlementEnvelope = self.send(request).await?;
        Ok(envelope.settlement)
    }

    async fn cancel_upi_payment(&self, settlement_id: &str) -> Result<SettlementRecord, SettleError> {
        let body = CancelUpiRequest {
            settlement_id: settlement_id.to_string(),
        };
        let request = self.client.put(self.url(UPI_CANCEL_PATH)).json(&body);
        let envelope: SettlementEnvelope = self.send(request).await?;
        Ok(envelope.settlement)
    }

    async fn balance_summary(&self, scope: Option<&str>) -> Result<BalanceSummary, SettleError> {
        let request = self.client.get(self.url(SUMMARY_PATH)).query(&scope_params(scope));
        self.send(request).await
    }

    async fn list_settlements(&self, query: SettlementQuery) -> Result<SettlementPage, SettleError> {
        let request = self.client.get(self.url(SETTLEMENTS_PATH)).query(&query);
        self.send(request).await
    }

    async fn recent_activity(&self, limit: usize) -> Result<Vec<ActivityEntry>, SettleError> {
        let request = self.client.get(self.url(ACTIVITY_PATH)).query(&[("limit", limit)]);
        self.send(request).await
    }
}
