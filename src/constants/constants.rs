// Deep link defaults
pub const DEFAULT_CURRENCY: &str = "INR";
pub const DEFAULT_UPI_NOTE: &str = "SplitEase Settlement";
pub const UPI_SCHEME: &str = "upi://pay";

// Draft limits
pub const MAX_NOTE_LENGTH: usize = 255;
pub const MAX_SETTLEMENT_AMOUNT: f64 = 1_000_000.0;

// Notification messages
pub const SETTLEMENT_RECORDED: &str = "Settlement recorded!";
pub const PAYMENT_CONFIRMED: &str = "Payment confirmed!";
pub const SETTLEMENT_FAILED: &str = "Failed to create settlement";
pub const CONFIRMATION_FAILED: &str = "Failed to confirm payment";
pub const BALANCES_FAILED: &str = "Failed to load balances";

// Ledger routes, relative to the base URL
pub const BALANCES_PATH: &str = "/balances";
pub const SETTLEMENTS_PATH: &str = "/settlements";
pub const SUMMARY_PATH: &str = "/settlements/summary";
pub const UPI_SETTLEMENTS_PATH: &str = "/upi-settlements";
pub const UPI_CONFIRM_PATH: &str = "/upi-settlements/confirm";
pub const UPI_CANCEL_PATH: &str = "/upi-settlements/cancel";
pub const ACTIVITY_PATH: &str = "/activity";
pub const LOGIN_PATH: &str = "/login";

// Session
pub const SESSION_COOKIE: &str = "session";
pub const SESSION_TTL_SECS: usize = 3600;

pub const DEFAULT_ACTIVITY_LIMIT: usize = 20;
pub const DEFAULT_PAGE_LIMIT: usize = 50;
