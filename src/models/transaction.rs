//! This file defines the type `Transaction`, the core type of the budgeting
//! part of the application, along with its wire-adjacent helper types.

use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::Date;

use crate::models::CategoryId;

/// The ID of a transaction, assigned by the remote service.
pub type TransactionId = i64;

/// Whether a transaction records money earned or money spent.
///
/// The amount of a transaction is always stored unsigned; the sign is
/// carried by this type instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Money earned, e.g., wages.
    Income,
    /// Money spent, e.g., groceries.
    Expense,
}

impl Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionType::Income => write!(f, "income"),
            TransactionType::Expense => write!(f, "expense"),
        }
    }
}

/// The error returned when a string is neither "income" nor "expense".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTransactionTypeError(String);

impl Display for ParseTransactionTypeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "\"{}\" is not \"income\" or \"expense\"", self.0)
    }
}

impl std::error::Error for ParseTransactionTypeError {}

impl FromStr for TransactionType {
    type Err = ParseTransactionTypeError;

    /// Parses a transaction type, ignoring case and surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "income" => Ok(TransactionType::Income),
            "expense" => Ok(TransactionType::Expense),
            _ => Err(ParseTransactionTypeError(s.to_owned())),
        }
    }
}

/// The bank and account a transaction was pulled from, when it originated
/// from a connected bank rather than manual entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankLinkInfo {
    /// The display name of the bank, e.g., "Kiwibank".
    pub bank: String,
    /// The display name of the account, e.g., "Everyday Checking".
    pub account: String,
}

/// An expense or income, i.e. an event where money was either spent or
/// earned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The amount of money spent or earned. Always positive; the direction
    /// is given by [Transaction::transaction_type].
    pub amount: f64,
    /// A text description of what the transaction was for. May be empty.
    #[serde(default)]
    pub description: String,
    /// The category the transaction belongs to.
    pub category_id: CategoryId,
    /// The calendar day the transaction happened on. No time component.
    pub date: Date,
    /// Whether this transaction is income or an expense.
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// Set when the transaction was synced from a connected bank account.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_link: Option<BankLinkInfo>,
}

/// The fields the user supplies when creating or editing a transaction.
///
/// The ID is assigned by the remote service on creation, so drafts do not
/// carry one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDraft {
    /// The unsigned amount of the transaction.
    pub amount: f64,
    /// A text description of the transaction. May be empty.
    #[serde(default)]
    pub description: String,
    /// The category the transaction belongs to.
    pub category_id: CategoryId,
    /// The calendar day the transaction happened on.
    pub date: Date,
    /// Whether this transaction is income or an expense.
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
}

impl TransactionDraft {
    /// Attach an ID (and optional bank metadata) to a draft, producing the
    /// record the client expects the server to create.
    pub fn into_transaction(
        self,
        id: TransactionId,
        bank_link: Option<BankLinkInfo>,
    ) -> Transaction {
        Transaction {
            id,
            amount: self.amount,
            description: self.description,
            category_id: self.category_id,
            date: self.date,
            transaction_type: self.transaction_type,
            bank_link,
        }
    }
}

/// The period a server-computed transaction summary covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryPeriod {
    /// Totals for the current calendar month only.
    CurrentMonth,
    /// Totals over the full transaction history.
    AllTime,
}

impl SummaryPeriod {
    /// Every period the service computes summaries for.
    pub const ALL: [SummaryPeriod; 2] = [SummaryPeriod::CurrentMonth, SummaryPeriod::AllTime];

    /// The query-parameter value for this period.
    pub fn as_str(self) -> &'static str {
        match self {
            SummaryPeriod::CurrentMonth => "current_month",
            SummaryPeriod::AllTime => "all_time",
        }
    }
}

/// Server-computed income/expense totals for one [SummaryPeriod].
///
/// Summaries are aggregates the client cannot cheaply patch, so any mutation
/// that could change totals invalidates them wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSummary {
    /// Total income over the period.
    pub income: f64,
    /// Total expenses over the period.
    pub expenses: f64,
    /// Income minus expenses.
    pub net: f64,
}

/// A row the server rejected during a bulk import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedRow {
    /// The zero-based index of the row in the submitted CSV (excluding the
    /// header line).
    pub row_index: usize,
    /// The server's reason for rejecting the row.
    pub error: String,
}

/// The outcome of one bulk import call, reported verbatim by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkImportResult {
    /// How many rows the server inserted.
    pub imported_count: u64,
    /// The names of categories the server created because a row referenced
    /// a category name that did not exist yet.
    #[serde(default)]
    pub created_categories: Vec<String>,
    /// Rows the server rejected, with reasons.
    #[serde(default)]
    pub failed_rows: Vec<FailedRow>,
}
