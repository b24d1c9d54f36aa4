//! Core domain types shared by the Smartlogic and PAC components.

use uuid::Uuid;

/// Prefix of every generated transaction id.
const TRANSACTION_ID_PREFIX: &str = "tid_";

// ---------------------------------------------------------------------------
// TransactionId
// ---------------------------------------------------------------------------

/// Trace identifier sent as `X-Request-Id` on outbound calls.
///
/// One id is generated per component operation, so every call made on behalf
/// of the same inbound request carries the same value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransactionId(String);

impl TransactionId {
    /// Generate a new time-sortable transaction id.
    pub fn new() -> Self {
        Self(format!("{TRANSACTION_ID_PREFIX}{}", Uuid::now_v7().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
