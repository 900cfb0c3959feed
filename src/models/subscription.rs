//! Types for the payments side of the app: the user's subscription and the
//! plans on offer.

use serde::{Deserialize, Serialize};
use time::Date;

/// The user's current subscription, as reported by the payments service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatus {
    /// The ID of the plan the user is subscribed to, absent on the free
    /// tier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
    /// Whether the subscription is currently active.
    pub active: bool,
    /// The next renewal date, absent when cancelled or on the free tier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renews_at: Option<Date>,
}

/// A subscription plan the user can check out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    /// The payment service's ID for the plan.
    pub id: String,
    /// The display name of the plan.
    pub name: String,
    /// The monthly price in the smallest currency unit.
    pub price_cents: i64,
}

/// A hosted checkout session created by the payments service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSession {
    /// The URL to redirect the user to.
    pub url: String,
}
