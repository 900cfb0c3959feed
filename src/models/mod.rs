//! The data model shared between the client and the remote service.
//!
//! These types mirror the JSON shapes the service produces and consumes.
//! They are owned by the service; the client only ever holds cached copies.

mod bank;
mod budget;
mod category;
mod subscription;
mod transaction;

pub use bank::{BankLink, BankLinkStatus, LinkSession};
pub use budget::{BudgetGoal, BudgetStatus, YearMonth};
pub use category::{Category, CategoryDraft, CategoryId, CategoryType};
pub use subscription::{CheckoutSession, Plan, SubscriptionStatus};
pub use transaction::{
    BankLinkInfo, BulkImportResult, FailedRow, SummaryPeriod, Transaction, TransactionDraft,
    TransactionId, TransactionSummary, TransactionType,
};
