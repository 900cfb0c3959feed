//! Types for the bank-aggregation side of the app: connected banks and the
//! link sessions used to connect new ones.
//!
//! The aggregation service itself is an opaque collaborator; these types
//! only cover what the client needs to list, sync, and remove connections.

use serde::{Deserialize, Serialize};
use time::Date;

/// The health of a bank connection as reported by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BankLinkStatus {
    /// The connection is healthy and syncing.
    Connected,
    /// The connection needs the user to re-authenticate with the bank.
    RequiresReauth,
    /// The user disconnected the bank; historical transactions remain.
    Disconnected,
}

/// A bank account connected through the aggregation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankLink {
    /// The aggregation service's ID for this connection.
    pub id: String,
    /// The display name of the institution, e.g., "ASB".
    pub institution_name: String,
    /// The display name of the linked account.
    pub account_name: String,
    /// The health of the connection.
    pub status: BankLinkStatus,
    /// The last day transactions were synced from this connection, if ever.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_synced: Option<Date>,
}

/// A short-lived session token used to open the aggregation service's
/// account-picker UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkSession {
    /// The token to hand to the aggregation SDK.
    pub link_token: String,
}
