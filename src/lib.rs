//! Pennywise is a web app for managing your budget and personal finances.
//!
//! This library is the client-side core of the app: it parses and serializes
//! transaction CSV files, coordinates bulk imports against the remote REST
//! service, and keeps client-side query caches consistent as the user adds,
//! edits, deletes, and imports transactions.
//!
//! The main entry point is [BudgetClient], which owns an HTTP client for the
//! remote service and a [QueryCache] that is patched optimistically on
//! mutations and invalidated according to fixed rules.

#![warn(missing_docs)]

mod api;
mod cache;
mod client;
mod config;
mod csv;
mod error;
mod import;
mod models;

#[cfg(test)]
mod test_utils;

pub use api::{ApiClient, BudgetApi};
pub use cache::{CacheStatus, Entry, EntrySnapshot, Mutation, QueryCache, TransactionsSnapshot};
pub use client::{BudgetClient, CsvImportOutcome};
pub use config::ClientConfig;
pub use csv::{
    CsvRow, EXPORT_HEADER, IMPORT_HEADER, ParsedCsv, SkippedRow, parse_transactions_csv,
    serialize_rows, serialize_transactions,
};
pub use error::Error;
pub use import::import_rows;
pub use models::{
    BankLink, BankLinkInfo, BankLinkStatus, BudgetGoal, BudgetStatus, BulkImportResult, Category,
    CategoryDraft, CategoryId, CategoryType, CheckoutSession, FailedRow, LinkSession, Plan,
    SubscriptionStatus, SummaryPeriod, Transaction, TransactionDraft, TransactionId,
    TransactionSummary, TransactionType, YearMonth,
};
