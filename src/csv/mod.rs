//! Functions to parse and serialize transaction CSV files.
//!
//! The parser is deliberately permissive: columns may appear in any order
//! under any casing as long as the header text contains the expected words,
//! and malformed rows are skipped rather than failing the whole document.
//! Quoting is the simple kind where a `"` toggles an in-field state during
//! which commas are literal; it is not RFC 4180.

mod parse;
mod serialize;

pub use parse::{ParsedCsv, SkippedRow, parse_transactions_csv};
pub use serialize::{EXPORT_HEADER, IMPORT_HEADER, serialize_rows, serialize_transactions};

use time::Date;

use crate::models::TransactionType;

/// One transaction line parsed from (or destined for) a CSV document.
///
/// Transient: rows exist only during import and export and are never cached.
/// Unlike [crate::models::Transaction], the category is referenced by name
/// rather than ID; the server resolves names during import, creating any
/// categories that do not exist yet.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvRow {
    /// The calendar day of the transaction.
    pub date: Date,
    /// Whether the row is income or an expense. The amount is unsigned;
    /// this field carries the sign.
    pub transaction_type: TransactionType,
    /// The name of the category, resolved server-side during import.
    pub category: String,
    /// A text description. Empty when the source document had no
    /// description column.
    pub description: String,
    /// The unsigned amount of the transaction.
    pub amount: f64,
}
